//! Static food catalog and the randomized daily menu builder: one item
//! per main meal, then snacks drawn until the plan lands within reach of
//! the calorie target or the draw cap runs out.

use rand::Rng;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};

/// Stop filling once the plan is within this many calories of the target.
pub const SNACK_GAP: f64 = 100.0;

/// Upper bound on snack draws; guarantees termination even when the
/// snack pool cannot close the gap.
pub const MAX_SNACK_DRAWS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

impl MealType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Breakfast => "Breakfast",
            Self::Lunch => "Lunch",
            Self::Dinner => "Dinner",
            Self::Snack => "Snack",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CatalogItem {
    pub name: &'static str,
    pub calories: i64,
    pub meal_type: MealType,
    pub tags: &'static [&'static str],
}

pub const FOOD_CATALOG: &[CatalogItem] = &[
    CatalogItem {
        name: "Oatmeal & Berries",
        calories: 350,
        meal_type: MealType::Breakfast,
        tags: &["Healthy", "Carbs"],
    },
    CatalogItem {
        name: "Egg White Omelet",
        calories: 250,
        meal_type: MealType::Breakfast,
        tags: &["Low Fat", "High Protein"],
    },
    CatalogItem {
        name: "Keto Avocado Plate",
        calories: 400,
        meal_type: MealType::Breakfast,
        tags: &["Keto", "High Fat"],
    },
    CatalogItem {
        name: "Grilled Chicken Salad",
        calories: 450,
        meal_type: MealType::Lunch,
        tags: &["Low Carb", "High Protein"],
    },
    CatalogItem {
        name: "Quinoa & Black Beans",
        calories: 500,
        meal_type: MealType::Lunch,
        tags: &["Vegan", "High Fiber"],
    },
    CatalogItem {
        name: "Salmon with Asparagus",
        calories: 600,
        meal_type: MealType::Dinner,
        tags: &["High Protein", "Healthy Fats"],
    },
    CatalogItem {
        name: "Lean Beef Stir Fry",
        calories: 700,
        meal_type: MealType::Dinner,
        tags: &["High Protein"],
    },
    CatalogItem {
        name: "Protein Shake",
        calories: 180,
        meal_type: MealType::Snack,
        tags: &["High Protein"],
    },
    CatalogItem {
        name: "Almonds (30g)",
        calories: 170,
        meal_type: MealType::Snack,
        tags: &["Keto", "Healthy Fats"],
    },
    CatalogItem {
        name: "Apple",
        calories: 80,
        meal_type: MealType::Snack,
        tags: &["Healthy", "Carbs"],
    },
];

/// One line of a generated plan; owned so plans can live on a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanItem {
    pub name: String,
    pub calories: i64,
    pub meal_type: MealType,
}

impl From<&CatalogItem> for PlanItem {
    fn from(item: &CatalogItem) -> Self {
        Self {
            name: item.name.to_string(),
            calories: item.calories,
            meal_type: item.meal_type,
        }
    }
}

fn bucket(meal: MealType) -> Vec<&'static CatalogItem> {
    FOOD_CATALOG
        .iter()
        .filter(|item| item.meal_type == meal)
        .collect()
}

fn pick_one<R: Rng + ?Sized>(rng: &mut R, meal: MealType) -> Option<PlanItem> {
    let items = bucket(meal);
    items.choose(rng).map(|item| PlanItem::from(*item))
}

fn fill_snacks<R: Rng + ?Sized>(
    rng: &mut R,
    snacks: &[&CatalogItem],
    mut total: i64,
    target_calories: f64,
) -> Vec<PlanItem> {
    let mut picked = Vec::new();
    let mut draws = 0;
    #[allow(clippy::cast_precision_loss)]
    while (total as f64) < target_calories - SNACK_GAP && draws < MAX_SNACK_DRAWS {
        let Some(item) = snacks.choose(rng) else { break };
        total += item.calories;
        picked.push(PlanItem::from(*item));
        draws += 1;
    }
    picked
}

/// Build a day's menu: exactly one random Breakfast, Lunch, and Dinner,
/// then random Snacks while the running total is more than `SNACK_GAP`
/// below the target, capped at `MAX_SNACK_DRAWS` draws. Duplicate snacks
/// are allowed; there is no seed control.
#[must_use]
pub fn generate_menu(target_calories: f64) -> Vec<PlanItem> {
    let mut rng = rand::rng();
    let mut plan: Vec<PlanItem> = Vec::new();
    for meal in [MealType::Breakfast, MealType::Lunch, MealType::Dinner] {
        if let Some(item) = pick_one(&mut rng, meal) {
            plan.push(item);
        }
    }
    let total = plan_total(&plan);
    let snacks = bucket(MealType::Snack);
    plan.extend(fill_snacks(&mut rng, &snacks, total, target_calories));
    plan
}

#[must_use]
pub fn plan_total(plan: &[PlanItem]) -> i64 {
    plan.iter().map(|item| item.calories).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_has_all_buckets() {
        assert_eq!(FOOD_CATALOG.len(), 10);
        assert_eq!(bucket(MealType::Breakfast).len(), 3);
        assert_eq!(bucket(MealType::Lunch).len(), 2);
        assert_eq!(bucket(MealType::Dinner).len(), 2);
        assert_eq!(bucket(MealType::Snack).len(), 3);
    }

    #[test]
    fn menu_always_covers_the_three_mains() {
        for _ in 0..50 {
            let plan = generate_menu(2000.0);
            assert!(plan.len() >= 3);
            assert_eq!(plan[0].meal_type, MealType::Breakfast);
            assert_eq!(plan[1].meal_type, MealType::Lunch);
            assert_eq!(plan[2].meal_type, MealType::Dinner);
            assert!(plan.iter().skip(3).all(|i| i.meal_type == MealType::Snack));
            for item in &plan {
                assert!(FOOD_CATALOG.iter().any(|c| c.name == item.name));
            }
        }
    }

    #[test]
    fn low_target_adds_no_snacks() {
        for _ in 0..20 {
            let plan = generate_menu(0.0);
            assert_eq!(plan.len(), 3);
        }
    }

    #[test]
    fn snack_draws_are_capped_even_with_zero_calorie_snacks() {
        const FREEBIE: CatalogItem = CatalogItem {
            name: "Celery Stick",
            calories: 0,
            meal_type: MealType::Snack,
            tags: &[],
        };
        let mut rng = rand::rng();
        let picked = fill_snacks(&mut rng, &[&FREEBIE], 0, 10_000.0);
        assert_eq!(picked.len(), MAX_SNACK_DRAWS);
    }

    #[test]
    fn filling_stops_inside_the_gap() {
        let mut rng = rand::rng();
        let snacks = bucket(MealType::Snack);
        // already within 100 kcal of the target
        assert!(fill_snacks(&mut rng, &snacks, 1900, 2000.0).is_empty());
        // nothing to draw from
        assert!(fill_snacks(&mut rng, &[], 0, 2000.0).is_empty());
    }

    #[test]
    fn plan_total_sums_calories() {
        let plan = vec![
            PlanItem {
                name: "Apple".into(),
                calories: 80,
                meal_type: MealType::Snack,
            },
            PlanItem {
                name: "Protein Shake".into(),
                calories: 180,
                meal_type: MealType::Snack,
            },
        ];
        assert_eq!(plan_total(&plan), 260);
        assert_eq!(plan_total(&[]), 0);
    }
}

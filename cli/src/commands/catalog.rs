use anyhow::Result;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use nutritrack_core::goals::{DEFAULT_GOAL, GOAL_CATALOG};
use nutritrack_core::menu::FOOD_CATALOG;

pub(crate) fn cmd_goals(json: bool) -> Result<()> {
    if json {
        let goals: Vec<serde_json::Value> = GOAL_CATALOG
            .iter()
            .map(|(name, delta)| {
                serde_json::json!({
                    "name": name,
                    "calorie_delta": delta,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&goals)?);
        return Ok(());
    }

    #[derive(Tabled)]
    struct GoalRow {
        #[tabled(rename = "Goal")]
        name: &'static str,
        #[tabled(rename = "Adjustment")]
        adjustment: String,
    }

    let rows: Vec<GoalRow> = GOAL_CATALOG
        .iter()
        .map(|&(name, delta)| GoalRow {
            name,
            adjustment: if delta == 0 {
                "0".to_string()
            } else {
                format!("{delta:+}")
            },
        })
        .collect();

    let mut table = Table::new(rows);
    table
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..)).with(Alignment::right()));
    println!("{table}");
    println!("Default when none match: {DEFAULT_GOAL}");
    Ok(())
}

pub(crate) fn cmd_foods(json: bool) -> Result<()> {
    if json {
        let foods: Vec<serde_json::Value> = FOOD_CATALOG
            .iter()
            .map(|item| {
                serde_json::json!({
                    "name": item.name,
                    "calories": item.calories,
                    "meal_type": item.meal_type.as_str(),
                    "tags": item.tags,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&foods)?);
        return Ok(());
    }

    #[derive(Tabled)]
    struct FoodRow {
        #[tabled(rename = "Item")]
        name: &'static str,
        #[tabled(rename = "Meal")]
        meal: &'static str,
        #[tabled(rename = "Calories")]
        calories: i64,
        #[tabled(rename = "Tags")]
        tags: String,
    }

    let rows: Vec<FoodRow> = FOOD_CATALOG
        .iter()
        .map(|item| FoodRow {
            name: item.name,
            meal: item.meal_type.as_str(),
            calories: item.calories,
            tags: item.tags.join(", "),
        })
        .collect();

    let mut table = Table::new(rows);
    table
        .with(Style::rounded())
        .with(Modify::new(Columns::new(2..3)).with(Alignment::right()));
    println!("{table}");
    Ok(())
}

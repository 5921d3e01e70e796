//! Metabolic arithmetic: BMR, TDEE, BMI, and the goal-adjusted calorie
//! target. Everything here is pure; inputs are taken at face value
//! (garbage in, garbage out) to match the stored-profile convention.

use crate::goals;
use crate::models::{BmiCategory, Sex};

/// Activity labels and their TDEE multipliers.
pub const ACTIVITY_LEVELS: &[(&str, f64)] = &[
    ("Sedentary (Office Job)", 1.2),
    ("Lightly Active (1-3 days)", 1.375),
    ("Moderately Active (3-5 days)", 1.55),
    ("Very Active (6-7 days)", 1.725),
    ("Athlete (2x per day)", 1.9),
];

/// Multiplier applied when an activity label is not in the table.
/// Unknown labels silently fall back to sedentary; stored profiles with
/// stale labels keep producing a target instead of failing.
pub const DEFAULT_ACTIVITY_MULTIPLIER: f64 = 1.2;

/// Calorie targets never drop below this floor, no matter the goals.
pub const MIN_TARGET_CALORIES: f64 = 1200.0;

/// Basal metabolic rate, Mifflin-St Jeor.
#[must_use]
pub fn bmr(weight_kg: f64, height_cm: f64, age: f64, sex: Sex) -> f64 {
    let base = 10.0 * weight_kg + 6.25 * height_cm - 5.0 * age;
    match sex {
        Sex::Male => base + 5.0,
        Sex::Female => base - 161.0,
    }
}

/// Exact-label lookup over `ACTIVITY_LEVELS`.
#[must_use]
pub fn activity_multiplier(label: &str) -> f64 {
    ACTIVITY_LEVELS
        .iter()
        .find(|(name, _)| *name == label)
        .map_or(DEFAULT_ACTIVITY_MULTIPLIER, |(_, m)| *m)
}

/// Total daily energy expenditure.
#[must_use]
pub fn tdee(bmr: f64, activity_label: &str) -> f64 {
    bmr * activity_multiplier(activity_label)
}

/// Body mass index from metric inputs.
#[must_use]
pub fn bmi(weight_kg: f64, height_cm: f64) -> f64 {
    let height_m = height_cm / 100.0;
    weight_kg / (height_m * height_m)
}

/// Band thresholds: <18.5, [18.5, 24.9), [25, 29.9), else Obese.
/// Values in [24.9, 25) fall through to Obese; the half-open gap is the
/// stored convention and is kept as-is.
#[must_use]
pub fn bmi_category(bmi: f64) -> BmiCategory {
    if bmi < 18.5 {
        BmiCategory::Underweight
    } else if (18.5..24.9).contains(&bmi) {
        BmiCategory::HealthyWeight
    } else if (25.0..29.9).contains(&bmi) {
        BmiCategory::Overweight
    } else {
        BmiCategory::Obese
    }
}

/// TDEE plus the summed goal deltas, clamped to the safety floor.
/// Goal names outside the catalog contribute 0, so the sum is
/// order-independent.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn target_from_goals<S: AsRef<str>>(tdee: f64, goal_names: &[S]) -> f64 {
    let adjustment: i64 = goal_names
        .iter()
        .map(|name| goals::delta_for(name.as_ref()))
        .sum();
    (tdee + adjustment as f64).max(MIN_TARGET_CALORIES)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bmr_matches_reference_values() {
        // 10*70 + 6.25*175 - 5*30 + 5
        assert!((bmr(70.0, 175.0, 30.0, Sex::Male) - 1648.75).abs() < 1e-9);
        // same inputs, female offset
        assert!((bmr(70.0, 175.0, 30.0, Sex::Female) - 1482.75).abs() < 1e-9);
    }

    #[test]
    fn bmr_monotonic_in_weight_height_and_age() {
        let base = bmr(70.0, 175.0, 30.0, Sex::Male);
        assert!(bmr(71.0, 175.0, 30.0, Sex::Male) > base);
        assert!(bmr(70.0, 176.0, 30.0, Sex::Male) > base);
        assert!(bmr(70.0, 175.0, 31.0, Sex::Male) < base);
    }

    #[test]
    fn bmr_accepts_nonsense_without_failing() {
        // No validation by design; the result is garbage but defined.
        let out = bmr(-10.0, 0.0, -5.0, Sex::Female);
        assert!(out.is_finite());
    }

    #[test]
    fn known_activity_labels_resolve() {
        assert!((activity_multiplier("Sedentary (Office Job)") - 1.2).abs() < 1e-9);
        assert!((activity_multiplier("Athlete (2x per day)") - 1.9).abs() < 1e-9);
    }

    #[test]
    fn unknown_activity_label_falls_back_to_sedentary() {
        assert!((activity_multiplier("Extremely Active") - 1.2).abs() < 1e-9);
        assert!((activity_multiplier("") - 1.2).abs() < 1e-9);
        // case matters: lookup is exact
        assert!((activity_multiplier("sedentary (office job)") - 1.2).abs() < 1e-9);
        let b = 1650.0;
        assert!((tdee(b, "no such label") - tdee(b, "Sedentary (Office Job)")).abs() < 1e-9);
    }

    #[test]
    fn bmi_reference_value() {
        // 72 / 1.75^2
        assert!((bmi(72.0, 175.0) - 23.510_204_081_632_65).abs() < 1e-9);
    }

    #[test]
    fn bmi_bands() {
        assert_eq!(bmi_category(17.0), BmiCategory::Underweight);
        assert_eq!(bmi_category(18.5), BmiCategory::HealthyWeight);
        assert_eq!(bmi_category(24.89), BmiCategory::HealthyWeight);
        assert_eq!(bmi_category(25.0), BmiCategory::Overweight);
        assert_eq!(bmi_category(29.89), BmiCategory::Overweight);
        assert_eq!(bmi_category(29.9), BmiCategory::Obese);
        assert_eq!(bmi_category(35.0), BmiCategory::Obese);
    }

    #[test]
    fn bmi_gap_between_bands_classifies_as_obese() {
        // [24.9, 25) is outside both middle bands; falls to the else arm.
        assert_eq!(bmi_category(24.9), BmiCategory::Obese);
        assert_eq!(bmi_category(24.95), BmiCategory::Obese);
    }

    #[test]
    fn target_is_permutation_invariant() {
        let a = ["Build Muscle (Lean Bulk)", "Heart Health (Low Sodium)"];
        let b = ["Heart Health (Low Sodium)", "Build Muscle (Lean Bulk)"];
        assert!((target_from_goals(2000.0, &a) - target_from_goals(2000.0, &b)).abs() < 1e-9);
        assert!((target_from_goals(2000.0, &a) - 2200.0).abs() < 1e-9);
    }

    #[test]
    fn empty_goals_yield_clamped_tdee() {
        let none: [&str; 0] = [];
        assert!((target_from_goals(1800.0, &none) - 1800.0).abs() < 1e-9);
        assert!((target_from_goals(900.0, &none) - 1200.0).abs() < 1e-9);
    }

    #[test]
    fn target_never_drops_below_floor() {
        let goals = ["Lose Weight (Aggressive)", "Lose Weight (Standard)"];
        // 1500 - 1250 would be 250; the floor wins.
        assert!((target_from_goals(1500.0, &goals) - 1200.0).abs() < 1e-9);
    }

    #[test]
    fn non_catalog_goals_contribute_zero() {
        let goals = ["Eat More Vegetables", "Maintain Current Weight"];
        assert!((target_from_goals(2100.0, &goals) - 2100.0).abs() < 1e-9);
    }
}

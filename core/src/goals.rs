//! Static goal catalog: named dietary/fitness goals and their signed
//! daily calorie deltas. Lookup is by exact name; absent names count as
//! zero so summing is linear and order-independent.

/// Goal applied when a stored goal list sanitizes down to nothing.
pub const DEFAULT_GOAL: &str = "Maintain Current Weight";

pub const GOAL_CATALOG: &[(&str, i64)] = &[
    ("Maintain Current Weight", 0),
    ("Lose Weight (Slow & Steady)", -250),
    ("Lose Weight (Standard)", -500),
    ("Lose Weight (Aggressive)", -750),
    ("Weight Gain (Muscle)", 300),
    ("Build Muscle (Lean Bulk)", 300),
    ("Build Muscle (Dirty Bulk)", 600),
    ("Marathon / Ultra Training", 800),
    ("Triathlon Training", 700),
    ("Cycling (Endurance)", 600),
    ("Swimming (Competitive)", 500),
    ("Strength Training / Powerlifting", 400),
    ("CrossFit / HIIT Performance", 450),
    ("Manage Type 2 Diabetes (Low Sugar)", -200),
    ("Heart Health (Low Sodium)", -100),
    ("PCOS Management", -250),
    ("IBS / Low FODMAP", 0),
    ("Celiac / Gluten Free", 0),
    ("Keto / Low Carb Adaptation", 0),
    ("Intermittent Fasting (16:8)", 0),
    ("Pregnancy (2nd/3rd Trimester)", 350),
    ("Breastfeeding", 500),
    ("Improve Energy / Fatigue", 0),
];

/// Calorie delta for a goal name; 0 when the name is not in the catalog.
#[must_use]
pub fn delta_for(name: &str) -> i64 {
    GOAL_CATALOG
        .iter()
        .find(|(goal, _)| *goal == name)
        .map_or(0, |(_, delta)| *delta)
}

#[must_use]
pub fn is_catalog_goal(name: &str) -> bool {
    GOAL_CATALOG.iter().any(|(goal, _)| *goal == name)
}

/// Catalog names in display order (alphabetical, as the picker shows them).
#[must_use]
pub fn catalog_names() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = GOAL_CATALOG.iter().map(|(goal, _)| *goal).collect();
    names.sort_unstable();
    names
}

/// Filter a stored goal list down to current catalog members, keeping
/// first-seen order and dropping repeats. Names no longer in the catalog
/// vanish silently; an empty result falls back to the default goal.
#[must_use]
pub fn sanitize_goals<S: AsRef<str>>(raw: &[S]) -> Vec<String> {
    let mut kept: Vec<String> = Vec::new();
    for name in raw {
        let name = name.as_ref().trim();
        if is_catalog_goal(name) && !kept.iter().any(|k| k == name) {
            kept.push(name.to_string());
        }
    }
    if kept.is_empty() {
        kept.push(DEFAULT_GOAL.to_string());
    }
    kept
}

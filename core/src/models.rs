use anyhow::{Result, bail};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{calc, goals};

pub const PENDING_STATUS: &str = "pending";
pub const APPROVED_STATUS: &str = "approved";

/// Biological sex as used by the Mifflin-St Jeor equation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sex {
    Male,
    Female,
}

impl Sex {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Male => "Male",
            Self::Female => "Female",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "male" | "m" => Ok(Self::Male),
            "female" | "f" => Ok(Self::Female),
            _ => bail!("Invalid sex: {s}. Use male or female"),
        }
    }
}

/// Log entry categories, stored in the log tab's `type` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryCategory {
    Food,
    Manual,
    Exercise,
    #[serde(rename = "Profile_Settings")]
    ProfileSettings,
}

impl EntryCategory {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Food => "Food",
            Self::Manual => "Manual",
            Self::Exercise => "Exercise",
            Self::ProfileSettings => "Profile_Settings",
        }
    }

    /// Exact match against the stored cell value. Rows carrying anything
    /// else are treated as malformed.
    #[must_use]
    pub fn from_cell(cell: &str) -> Option<Self> {
        match cell {
            "Food" => Some(Self::Food),
            "Manual" => Some(Self::Manual),
            "Exercise" => Some(Self::Exercise),
            "Profile_Settings" => Some(Self::ProfileSettings),
            _ => None,
        }
    }
}

pub fn validate_category(s: &str) -> Result<EntryCategory> {
    match s.trim().to_lowercase().as_str() {
        "food" => Ok(EntryCategory::Food),
        "manual" => Ok(EntryCategory::Manual),
        "exercise" => Ok(EntryCategory::Exercise),
        "profile_settings" | "profile-settings" => Ok(EntryCategory::ProfileSettings),
        _ => bail!("Invalid category: {s}. Use food, manual, exercise, or profile_settings"),
    }
}

/// BMI classification bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BmiCategory {
    Underweight,
    #[serde(rename = "Healthy Weight")]
    HealthyWeight,
    Overweight,
    Obese,
}

impl BmiCategory {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Underweight => "Underweight",
            Self::HealthyWeight => "Healthy Weight",
            Self::Overweight => "Overweight",
            Self::Obese => "Obese",
        }
    }
}

/// One row of the `users` tab. The status cell is kept raw; approval is a
/// normalized comparison, not a parse.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    pub username: String,
    pub password: String,
    pub display_name: String,
    pub created_date: String,
    pub status: String,
}

impl Credential {
    #[must_use]
    pub fn is_approved(&self) -> bool {
        self.status.trim().eq_ignore_ascii_case(APPROVED_STATUS)
    }
}

/// Profile inputs as entered by the user. Derived numbers are computed by
/// `Profile::build`, never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProfile {
    pub weight_kg: f64,
    pub height_cm: f64,
    pub age: i64,
    pub sex: Sex,
    pub activity: String,
    pub goals: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub username: String,
    pub date: String,
    pub weight_kg: f64,
    pub height_cm: f64,
    pub age: i64,
    pub sex: Sex,
    pub activity: String,
    pub goals: Vec<String>,
    pub bmr: f64,
    pub tdee: f64,
    pub target_calories: f64,
    pub bmi: f64,
    pub bmi_category: BmiCategory,
}

impl Profile {
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn build(username: &str, date: &str, input: &NewProfile) -> Self {
        let bmr = calc::bmr(input.weight_kg, input.height_cm, input.age as f64, input.sex);
        let tdee = calc::tdee(bmr, &input.activity);
        let target_calories = calc::target_from_goals(tdee, &input.goals);
        let bmi = calc::bmi(input.weight_kg, input.height_cm);
        Self {
            username: username.to_string(),
            date: date.to_string(),
            weight_kg: input.weight_kg,
            height_cm: input.height_cm,
            age: input.age,
            sex: input.sex,
            activity: input.activity.clone(),
            goals: input.goals.clone(),
            bmr,
            tdee,
            target_calories,
            bmi,
            bmi_category: calc::bmi_category(bmi),
        }
    }
}

/// One row of the log tab. Calories are signed: intake rows are positive,
/// Exercise rows hold the burn magnitude (legacy rows may be negative).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub date: String,
    pub name: String,
    pub calories: i64,
    pub category: EntryCategory,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl LogEntry {
    #[must_use]
    pub fn burn_magnitude(&self) -> i64 {
        self.calories.abs()
    }
}

/// One day's slice of the session log plus intake/burn totals.
#[derive(Debug, Clone, Serialize)]
pub struct DailyReport {
    pub date: String,
    pub entries: Vec<LogEntry>,
    pub intake: i64,
    pub burned: i64,
    pub net: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining: Option<f64>,
}

impl DailyReport {
    /// Totals over a day's entries: intake counts Food and Manual rows,
    /// burned counts Exercise magnitude, profile markers count as neither.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_entries(date: &str, entries: Vec<LogEntry>, target: Option<f64>) -> Self {
        let mut intake = 0;
        let mut burned = 0;
        for e in &entries {
            match e.category {
                EntryCategory::Food | EntryCategory::Manual => intake += e.calories,
                EntryCategory::Exercise => burned += e.burn_magnitude(),
                EntryCategory::ProfileSettings => {}
            }
        }
        let net = intake - burned;
        let remaining = target.map(|t| t - net as f64);
        Self {
            date: date.to_string(),
            entries,
            intake,
            burned,
            net,
            target,
            remaining,
        }
    }
}

pub fn validate_date_str(s: &str) -> Result<String> {
    let trimmed = s.trim();
    if NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").is_err() {
        bail!("Invalid date: {s}. Use YYYY-MM-DD");
    }
    Ok(trimmed.to_string())
}

pub fn validate_registration(username: &str, password: &str, display_name: &str) -> Result<()> {
    if username.trim().is_empty() {
        bail!("Username must not be empty");
    }
    if password.is_empty() {
        bail!("Password must not be empty");
    }
    if display_name.trim().is_empty() {
        bail!("Display name must not be empty");
    }
    Ok(())
}

#[must_use]
pub fn today_string() -> String {
    chrono::Local::now().format("%Y-%m-%d").to_string()
}

#[must_use]
pub fn profile_marker_name(display_name: &str, weight_kg: f64) -> String {
    format!("Profile Update: {display_name} ({weight_kg}kg)")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::goals::DEFAULT_GOAL;

    #[test]
    fn sex_parse_accepts_short_and_mixed_case() {
        assert_eq!(Sex::parse("Male").unwrap(), Sex::Male);
        assert_eq!(Sex::parse(" f ").unwrap(), Sex::Female);
        assert_eq!(Sex::parse("M").unwrap(), Sex::Male);
        assert!(Sex::parse("other").is_err());
    }

    #[test]
    fn category_cell_round_trip() {
        for cat in [
            EntryCategory::Food,
            EntryCategory::Manual,
            EntryCategory::Exercise,
            EntryCategory::ProfileSettings,
        ] {
            assert_eq!(EntryCategory::from_cell(cat.as_str()), Some(cat));
        }
        assert_eq!(EntryCategory::from_cell("Snack"), None);
        assert_eq!(EntryCategory::from_cell("food"), None);
    }

    #[test]
    fn category_serializes_as_stored_string() {
        let json = serde_json::to_string(&EntryCategory::ProfileSettings).unwrap();
        assert_eq!(json, "\"Profile_Settings\"");
    }

    #[test]
    fn approved_check_trims_and_ignores_case() {
        let mut cred = Credential {
            username: "alice".into(),
            password: "pw".into(),
            display_name: "Alice".into(),
            created_date: "2024-01-01".into(),
            status: "  Approved ".into(),
        };
        assert!(cred.is_approved());
        cred.status = "pending".into();
        assert!(!cred.is_approved());
        cred.status = "rejected".into();
        assert!(!cred.is_approved());
    }

    #[test]
    fn profile_build_computes_derived_fields() {
        let input = NewProfile {
            weight_kg: 72.0,
            height_cm: 175.0,
            age: 29,
            sex: Sex::Male,
            activity: "Moderately Active (3-5 days)".into(),
            goals: vec!["Build Muscle (Lean Bulk)".into()],
        };
        let p = Profile::build("alice", "2024-06-01", &input);
        assert!((p.bmr - 1673.75).abs() < 1e-9);
        assert!((p.tdee - 1673.75 * 1.55).abs() < 1e-9);
        assert!((p.target_calories - (1673.75 * 1.55 + 300.0)).abs() < 1e-9);
        assert!((p.bmi - 23.51).abs() < 0.01);
        assert_eq!(p.bmi_category, BmiCategory::HealthyWeight);
    }

    #[test]
    fn profile_build_keeps_custom_goals_verbatim() {
        let input = NewProfile {
            weight_kg: 60.0,
            height_cm: 165.0,
            age: 40,
            sex: Sex::Female,
            activity: "Sedentary (Office Job)".into(),
            goals: vec!["My Own Goal".into(), DEFAULT_GOAL.into()],
        };
        let p = Profile::build("bob", "2024-06-01", &input);
        assert_eq!(p.goals, vec!["My Own Goal".to_string(), DEFAULT_GOAL.to_string()]);
    }

    #[test]
    fn daily_report_splits_intake_and_burn() {
        let entries = vec![
            LogEntry {
                date: "2024-06-01".into(),
                name: "Oatmeal & Berries".into(),
                calories: 350,
                category: EntryCategory::Food,
                amount: None,
                unit: None,
            },
            LogEntry {
                date: "2024-06-01".into(),
                name: "Evening Run".into(),
                calories: 300,
                category: EntryCategory::Exercise,
                amount: Some(5.0),
                unit: Some("km".into()),
            },
            LogEntry {
                date: "2024-06-01".into(),
                name: "Profile Update: Alice (72kg)".into(),
                calories: 2894,
                category: EntryCategory::ProfileSettings,
                amount: None,
                unit: None,
            },
        ];
        let report = DailyReport::from_entries("2024-06-01", entries, Some(2000.0));
        assert_eq!(report.intake, 350);
        assert_eq!(report.burned, 300);
        assert_eq!(report.net, 50);
        assert_eq!(report.remaining, Some(1950.0));
        assert_eq!(report.entries.len(), 3);
    }

    #[test]
    fn legacy_negative_exercise_rows_count_as_burn() {
        let entries = vec![LogEntry {
            date: "2024-06-01".into(),
            name: "Gym".into(),
            calories: -400,
            category: EntryCategory::Exercise,
            amount: None,
            unit: None,
        }];
        let report = DailyReport::from_entries("2024-06-01", entries, None);
        assert_eq!(report.burned, 400);
        assert_eq!(report.net, -400);
        assert_eq!(report.remaining, None);
    }

    #[test]
    fn date_validation() {
        assert_eq!(validate_date_str(" 2024-06-01 ").unwrap(), "2024-06-01");
        assert!(validate_date_str("06/01/2024").is_err());
        assert!(validate_date_str("2024-13-01").is_err());
    }

    #[test]
    fn registration_validation_rejects_blank_fields() {
        assert!(validate_registration("alice", "pw", "Alice").is_ok());
        assert!(validate_registration("  ", "pw", "Alice").is_err());
        assert!(validate_registration("alice", "", "Alice").is_err());
        assert!(validate_registration("alice", "pw", " ").is_err());
    }

    #[test]
    fn marker_name_formats_weight() {
        assert_eq!(
            profile_marker_name("Alice", 72.5),
            "Profile Update: Alice (72.5kg)"
        );
        assert_eq!(profile_marker_name("Bob", 80.0), "Profile Update: Bob (80kg)");
    }
}

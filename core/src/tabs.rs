//! Typed access to the workbook's three tabs. Rows travel as string
//! maps; the converters here turn them into domain structs and drop
//! anything malformed without comment. A spreadsheet accumulates stray
//! and half-filled rows over the years, and a scan must shrug them off.

use anyhow::Result;

use crate::goals;
use crate::models::{Credential, EntryCategory, LogEntry, NewProfile, Profile, Sex};
use crate::sheet::{Row, TAB_LOG, TAB_PROFILES, TAB_USERS, TabStore};

/// Owns the storage backend and speaks in domain types. Every read is a
/// full-tab scan; every write is a single append or a whole-tab rewrite,
/// exactly the operations the store contract offers.
pub struct Workbook {
    store: Box<dyn TabStore>,
}

impl Workbook {
    #[must_use]
    pub fn new(store: Box<dyn TabStore>) -> Self {
        Self { store }
    }

    #[must_use]
    pub fn store(&self) -> &dyn TabStore {
        self.store.as_ref()
    }

    // --- users tab ---

    pub fn credentials(&self) -> Result<Vec<Credential>> {
        let rows = self.store.read_all(TAB_USERS)?;
        Ok(rows.iter().filter_map(credential_from_row).collect())
    }

    /// Case-sensitive exact match on the stored username.
    pub fn find_credential(&self, username: &str) -> Result<Option<Credential>> {
        Ok(self
            .credentials()?
            .into_iter()
            .find(|c| c.username == username))
    }

    pub fn append_credential(&self, credential: &Credential) -> Result<()> {
        self.store.append(TAB_USERS, &credential_to_row(credential))
    }

    // --- profiles tab ---

    /// Latest row wins: the last parseable row for the username is the
    /// authoritative profile. `None` means "no profile yet", not an error.
    pub fn latest_profile(&self, username: &str) -> Result<Option<Profile>> {
        Ok(self.profile_history(username)?.pop())
    }

    /// All parseable rows for the username in table order; append order
    /// doubles as chronology, so this is the trend history.
    pub fn profile_history(&self, username: &str) -> Result<Vec<Profile>> {
        let rows = self.store.read_all(TAB_PROFILES)?;
        Ok(rows
            .iter()
            .filter_map(profile_from_row)
            .filter(|p| p.username == username)
            .collect())
    }

    pub fn append_profile(&self, profile: &Profile) -> Result<()> {
        self.store.append(TAB_PROFILES, &profile_to_row(profile))
    }

    // --- log tab ---

    pub fn log_entries(&self) -> Result<Vec<LogEntry>> {
        let rows = self.store.read_all(TAB_LOG)?;
        Ok(rows.iter().filter_map(entry_from_row).collect())
    }

    pub fn append_entry(&self, entry: &LogEntry) -> Result<()> {
        self.store.append(TAB_LOG, &entry_to_row(entry))
    }

    /// Replace one day's rows: read the whole tab, keep rows whose date
    /// cell differs (raw rows survive untouched, parseable or not),
    /// append the replacements, overwrite the tab. No locking; last
    /// writer wins, at most one concurrent writer assumed. Returns the
    /// number of rows removed.
    pub fn rewrite_day(&self, date: &str, replacement: &[LogEntry]) -> Result<usize> {
        let rows = self.store.read_all(TAB_LOG)?;
        let before = rows.len();
        let mut kept: Vec<Row> = rows
            .into_iter()
            .filter(|r| r.get("date").map(String::as_str) != Some(date))
            .collect();
        let removed = before - kept.len();
        kept.extend(replacement.iter().map(entry_to_row));
        self.store.rewrite(TAB_LOG, &kept)?;
        Ok(removed)
    }
}

fn cell(row: &Row, key: &str) -> String {
    row.get(key).cloned().unwrap_or_default()
}

fn parse_int_cell(value: &str) -> Option<i64> {
    let t = value.trim();
    if let Ok(v) = t.parse::<i64>() {
        return Some(v);
    }
    // Spreadsheet numerics sometimes come back as floats.
    t.parse::<f64>().ok().map(|v| v.round() as i64)
}

fn parse_float_cell(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok()
}

pub(crate) fn credential_from_row(row: &Row) -> Option<Credential> {
    let username = row.get("username")?.clone();
    if username.trim().is_empty() {
        return None;
    }
    Some(Credential {
        username,
        password: cell(row, "password"),
        display_name: cell(row, "name"),
        created_date: cell(row, "created_date"),
        status: cell(row, "status"),
    })
}

fn credential_to_row(credential: &Credential) -> Row {
    Row::from([
        ("username".to_string(), credential.username.clone()),
        ("password".to_string(), credential.password.clone()),
        ("name".to_string(), credential.display_name.clone()),
        ("created_date".to_string(), credential.created_date.clone()),
        ("status".to_string(), credential.status.clone()),
    ])
}

/// Stored inputs only; derived numbers are always recomputed, so a
/// profile saved under an older formula rereads with current math.
pub(crate) fn profile_from_row(row: &Row) -> Option<Profile> {
    let username = row.get("username")?.clone();
    if username.trim().is_empty() {
        return None;
    }
    let weight_kg = parse_float_cell(row.get("weight")?)?;
    let height_cm = parse_float_cell(row.get("height")?)?;
    let age = parse_int_cell(row.get("age")?)?;
    let sex = Sex::parse(row.get("gender")?).ok()?;
    let goals = goals::sanitize_goals(&split_goals(&cell(row, "goals")));
    let input = NewProfile {
        weight_kg,
        height_cm,
        age,
        sex,
        activity: cell(row, "activity"),
        goals,
    };
    Some(Profile::build(&username, &cell(row, "date"), &input))
}

fn profile_to_row(profile: &Profile) -> Row {
    Row::from([
        ("username".to_string(), profile.username.clone()),
        ("date".to_string(), profile.date.clone()),
        ("weight".to_string(), profile.weight_kg.to_string()),
        ("height".to_string(), profile.height_cm.to_string()),
        ("age".to_string(), profile.age.to_string()),
        ("gender".to_string(), profile.sex.as_str().to_string()),
        ("activity".to_string(), profile.activity.clone()),
        ("goals".to_string(), profile.goals.join(", ")),
    ])
}

fn split_goals(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|g| !g.is_empty())
        .map(str::to_string)
        .collect()
}

pub(crate) fn entry_from_row(row: &Row) -> Option<LogEntry> {
    let date = row.get("date")?.trim().to_string();
    if date.is_empty() {
        return None;
    }
    let calories = parse_int_cell(row.get("calories")?)?;
    let category = EntryCategory::from_cell(row.get("type")?.trim())?;
    let unit = row
        .get("unit")
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string);
    Some(LogEntry {
        date,
        name: cell(row, "name"),
        calories,
        category,
        amount: row.get("amount").and_then(|v| parse_float_cell(v)),
        unit,
    })
}

fn entry_to_row(entry: &LogEntry) -> Row {
    let mut row = Row::from([
        ("date".to_string(), entry.date.clone()),
        ("name".to_string(), entry.name.clone()),
        ("calories".to_string(), entry.calories.to_string()),
        ("type".to_string(), entry.category.as_str().to_string()),
    ]);
    if let Some(amount) = entry.amount {
        row.insert("amount".to_string(), amount.to_string());
    }
    if let Some(unit) = &entry.unit {
        row.insert("unit".to_string(), unit.clone());
    }
    row
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::goals::DEFAULT_GOAL;
    use crate::sheet::MemoryStore;

    fn row(pairs: &[(&str, &str)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    fn profile_row(username: &str, date: &str, weight: &str, goals: &str) -> Row {
        row(&[
            ("username", username),
            ("date", date),
            ("weight", weight),
            ("height", "175"),
            ("age", "30"),
            ("gender", "Male"),
            ("activity", "Sedentary (Office Job)"),
            ("goals", goals),
        ])
    }

    fn book_with(tab: &str, rows: Vec<Row>) -> Workbook {
        Workbook::new(Box::new(MemoryStore::new().with_rows(tab, rows)))
    }

    #[test]
    fn latest_profile_is_last_matching_row() {
        let book = book_with(
            TAB_PROFILES,
            vec![
                profile_row("alice", "2024-06-01", "70", DEFAULT_GOAL),
                profile_row("bob", "2024-06-02", "82", DEFAULT_GOAL),
                profile_row("alice", "2024-06-05", "69", DEFAULT_GOAL),
            ],
        );
        let latest = book.latest_profile("alice").unwrap().unwrap();
        assert_eq!(latest.date, "2024-06-05");
        assert!((latest.weight_kg - 69.0).abs() < 1e-9);
        assert_eq!(book.profile_history("alice").unwrap().len(), 2);
        assert!(book.latest_profile("carol").unwrap().is_none());
    }

    #[test]
    fn malformed_profile_rows_are_dropped() {
        let book = book_with(
            TAB_PROFILES,
            vec![
                profile_row("alice", "2024-06-01", "seventy", DEFAULT_GOAL),
                row(&[("username", "alice"), ("weight", "70")]),
                {
                    let mut r = profile_row("alice", "2024-06-02", "70", DEFAULT_GOAL);
                    r.insert("gender".to_string(), "robot".to_string());
                    r
                },
                profile_row("alice", "2024-06-03", "71", DEFAULT_GOAL),
            ],
        );
        let history = book.profile_history("alice").unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].date, "2024-06-03");
    }

    #[test]
    fn goals_round_trip_through_the_store() {
        let book = book_with(TAB_PROFILES, Vec::new());
        let input = NewProfile {
            weight_kg: 70.0,
            height_cm: 175.0,
            age: 30,
            sex: Sex::Male,
            activity: "Sedentary (Office Job)".into(),
            goals: vec![
                "Build Muscle (Lean Bulk)".into(),
                "Heart Health (Low Sodium)".into(),
            ],
        };
        book.append_profile(&Profile::build("alice", "2024-06-01", &input))
            .unwrap();

        let raw = book.store().read_all(TAB_PROFILES).unwrap();
        assert_eq!(
            raw[0]["goals"],
            "Build Muscle (Lean Bulk), Heart Health (Low Sodium)"
        );

        let reloaded = book.latest_profile("alice").unwrap().unwrap();
        assert_eq!(
            reloaded.goals,
            vec![
                "Build Muscle (Lean Bulk)".to_string(),
                "Heart Health (Low Sodium)".to_string()
            ]
        );
    }

    #[test]
    fn stale_goals_sanitize_to_default_on_read() {
        let book = book_with(
            TAB_PROFILES,
            vec![profile_row(
                "alice",
                "2024-06-01",
                "70",
                "Beach Body 2019, Juice Cleanse",
            )],
        );
        let profile = book.latest_profile("alice").unwrap().unwrap();
        assert_eq!(profile.goals, vec![DEFAULT_GOAL.to_string()]);
    }

    #[test]
    fn credential_lookup_is_case_sensitive() {
        let book = book_with(
            TAB_USERS,
            vec![row(&[
                ("username", "Alice"),
                ("password", "pw"),
                ("name", "Alice A."),
                ("created_date", "2024-01-01"),
                ("status", "approved"),
            ])],
        );
        assert!(book.find_credential("Alice").unwrap().is_some());
        assert!(book.find_credential("alice").unwrap().is_none());
    }

    #[test]
    fn log_scan_drops_malformed_rows() {
        let book = book_with(
            TAB_LOG,
            vec![
                row(&[
                    ("date", "2024-06-01"),
                    ("name", "Apple"),
                    ("calories", "80"),
                    ("type", "Food"),
                ]),
                // unknown category
                row(&[
                    ("date", "2024-06-01"),
                    ("name", "???"),
                    ("calories", "10"),
                    ("type", "Snackz"),
                ]),
                // unparseable calories
                row(&[
                    ("date", "2024-06-01"),
                    ("name", "???"),
                    ("calories", "lots"),
                    ("type", "Food"),
                ]),
                // blank date
                row(&[
                    ("date", " "),
                    ("name", "???"),
                    ("calories", "10"),
                    ("type", "Food"),
                ]),
                // float-shaped calories survive
                row(&[
                    ("date", "2024-06-02"),
                    ("name", "Shake"),
                    ("calories", "180.0"),
                    ("type", "Food"),
                ]),
            ],
        );
        let entries = book.log_entries().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].calories, 180);
    }

    #[test]
    fn entry_row_round_trip_keeps_amount_and_unit() {
        let book = book_with(TAB_LOG, Vec::new());
        book.append_entry(&LogEntry {
            date: "2024-06-01".into(),
            name: "Morning Run".into(),
            calories: 320,
            category: EntryCategory::Exercise,
            amount: Some(5.5),
            unit: Some("km".into()),
        })
        .unwrap();
        let entries = book.log_entries().unwrap();
        assert_eq!(entries[0].amount, Some(5.5));
        assert_eq!(entries[0].unit.as_deref(), Some("km"));
        assert_eq!(entries[0].category, EntryCategory::Exercise);
    }

    #[test]
    fn rewrite_day_touches_only_matching_rows() {
        let stray = row(&[("note", "not even a log row")]);
        let book = book_with(
            TAB_LOG,
            vec![
                row(&[
                    ("date", "2024-06-01"),
                    ("name", "Apple"),
                    ("calories", "80"),
                    ("type", "Food"),
                ]),
                row(&[
                    ("date", "2024-06-02"),
                    ("name", "Salad"),
                    ("calories", "450"),
                    ("type", "Food"),
                ]),
                row(&[
                    ("date", "2024-06-01"),
                    ("name", "Shake"),
                    ("calories", "180"),
                    ("type", "Food"),
                ]),
                stray.clone(),
            ],
        );

        let removed = book
            .rewrite_day(
                "2024-06-01",
                &[LogEntry {
                    date: "2024-06-01".into(),
                    name: "Oatmeal & Berries".into(),
                    calories: 350,
                    category: EntryCategory::Food,
                    amount: None,
                    unit: None,
                }],
            )
            .unwrap();
        assert_eq!(removed, 2);

        let raw = book.store().read_all(TAB_LOG).unwrap();
        assert_eq!(raw.len(), 3);
        // the stray unparseable row survives the rewrite untouched
        assert!(raw.iter().any(|r| r.get("note").is_some()));

        let entries = book.log_entries().unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().any(|e| e.name == "Oatmeal & Berries"));
        assert!(entries.iter().any(|e| e.name == "Salad"));
    }

    #[test]
    fn rewrite_day_with_empty_replacement_deletes_the_day() {
        let book = book_with(
            TAB_LOG,
            vec![row(&[
                ("date", "2024-06-01"),
                ("name", "Apple"),
                ("calories", "80"),
                ("type", "Food"),
            ])],
        );
        let removed = book.rewrite_day("2024-06-01", &[]).unwrap();
        assert_eq!(removed, 1);
        assert!(book.log_entries().unwrap().is_empty());
    }
}

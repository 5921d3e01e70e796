use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use serde::Serialize;
use std::io::{self, BufRead, Write};
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use nutritrack_core::models::{EntryCategory, LogEntry};
use nutritrack_core::service::{CloudState, NutriService, Session};

use crate::config::Config;
use crate::sheets::RemoteSheetStore;

/// Resolve an optional date argument to a `YYYY-MM-DD` string.
/// Accepts the keywords today/yesterday/tomorrow; defaults to today.
pub(crate) fn parse_date(date_str: Option<String>) -> Result<String> {
    let date = match date_str.as_deref() {
        None | Some("today") => Local::now().date_naive(),
        Some("yesterday") => Local::now().date_naive() - chrono::Duration::days(1),
        Some("tomorrow") => Local::now().date_naive() + chrono::Duration::days(1),
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d").with_context(|| {
            format!("Invalid date '{s}'. Use YYYY-MM-DD or today/yesterday/tomorrow")
        })?,
    };
    Ok(date.format("%Y-%m-%d").to_string())
}

/// Build the service over the best store available: the Google Sheets
/// workbook when a service account is configured, the local database
/// otherwise. An unusable store degrades to offline mode with a warning
/// instead of blocking the command.
pub(crate) fn open_service(config: &Config) -> NutriService {
    match config.load_service_account() {
        Ok(Some(key)) => match RemoteSheetStore::new(key, &config.workbook_name) {
            Ok(store) => NutriService::new(Box::new(store)),
            Err(e) => degrade_offline(&format!("Could not connect to Google Sheets: {e:#}")),
        },
        Ok(None) => match NutriService::open(&config.db_path) {
            Ok(service) => service,
            Err(e) => degrade_offline(&format!("Could not open the local database: {e:#}")),
        },
        Err(e) => degrade_offline(&format!("Service account is unusable: {e:#}")),
    }
}

fn degrade_offline(reason: &str) -> NutriService {
    eprintln!("Warning: {reason}");
    eprintln!("Running in offline mode; changes stay on this device.");
    NutriService::offline()
}

pub(crate) fn warn_cloud(cloud: &CloudState) {
    if let CloudState::SessionOnly(reason) = cloud {
        eprintln!("Warning: Not saved to the store ({reason}); kept in this session only.");
    }
}

// --- session file ---

pub(crate) fn load_session(config: &Config) -> Result<Session> {
    let raw = std::fs::read_to_string(&config.session_path)
        .context("Not logged in. Run `nutritrack login` first")?;
    serde_json::from_str(&raw).context("Session file is corrupted; log in again")
}

pub(crate) fn save_session(config: &Config, session: &Session) -> Result<()> {
    let raw = serde_json::to_string_pretty(session)?;
    std::fs::write(&config.session_path, raw).context("Failed to write session file")?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(
            &config.session_path,
            std::fs::Permissions::from_mode(0o600),
        )
        .context("Failed to set session file permissions")?;
    }
    Ok(())
}

/// Remove the session file. Returns whether one existed.
pub(crate) fn clear_session(config: &Config) -> Result<bool> {
    match std::fs::remove_file(&config.session_path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e).context("Failed to remove session file"),
    }
}

// --- terminal IO ---

pub(crate) fn prompt_line(prompt: &str) -> Result<String> {
    eprint!("{prompt}");
    io::stderr().flush()?;
    let stdin = io::stdin();
    let line = stdin.lock().lines().next().context("No input")??;
    Ok(line.trim().to_string())
}

pub(crate) fn print_entry_table(entries: &[LogEntry]) {
    #[derive(Tabled)]
    struct EntryRow {
        #[tabled(rename = "#")]
        idx: usize,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Type")]
        category: String,
        #[tabled(rename = "Calories")]
        calories: String,
        #[tabled(rename = "Amount")]
        amount: String,
    }

    let rows: Vec<EntryRow> = entries
        .iter()
        .enumerate()
        .map(|(i, e)| EntryRow {
            idx: i + 1,
            name: truncate(&e.name, 40),
            category: e.category.as_str().to_string(),
            calories: if e.category == EntryCategory::Exercise {
                format!("-{}", e.burn_magnitude())
            } else {
                e.calories.to_string()
            },
            amount: match (e.amount, e.unit.as_deref()) {
                (Some(a), Some(u)) => format!("{a} {u}"),
                (Some(a), None) => a.to_string(),
                _ => String::new(),
            },
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(3..4)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

pub(crate) fn json_error(message: &str) -> String {
    #[derive(Serialize)]
    struct CliError<'a> {
        error: &'a str,
    }
    serde_json::to_string(&CliError { error: message })
        .unwrap_or_else(|_| format!("{{\"error\":\"{message}\"}}"))
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let end = s.char_indices().nth(max - 3).map_or(s.len(), |(i, _)| i);
        format!("{}...", &s[..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_config(dir: &std::path::Path) -> Config {
        Config {
            data_dir: dir.to_path_buf(),
            db_path: dir.join("nutritrack.db"),
            session_path: dir.join("session.json"),
            workbook_name: "NutriTrack_Data".to_string(),
        }
    }

    fn sample_session() -> Session {
        Session {
            id: "token-1234".to_string(),
            username: "alice".to_string(),
            display_name: "Alice".to_string(),
            started: "2024-06-01".to_string(),
            profile: None,
            log: Vec::new(),
            plan: None,
        }
    }

    #[test]
    fn test_parse_date_none_is_today() {
        let today = Local::now().date_naive().format("%Y-%m-%d").to_string();
        assert_eq!(parse_date(None).unwrap(), today);
        assert_eq!(parse_date(Some("today".to_string())).unwrap(), today);
    }

    #[test]
    fn test_parse_date_keywords() {
        let today = Local::now().date_naive();
        assert_eq!(
            parse_date(Some("yesterday".to_string())).unwrap(),
            (today - chrono::Duration::days(1))
                .format("%Y-%m-%d")
                .to_string()
        );
        assert_eq!(
            parse_date(Some("tomorrow".to_string())).unwrap(),
            (today + chrono::Duration::days(1))
                .format("%Y-%m-%d")
                .to_string()
        );
    }

    #[test]
    fn test_parse_date_iso_and_invalid() {
        assert_eq!(
            parse_date(Some("2024-01-15".to_string())).unwrap(),
            "2024-01-15"
        );
        assert!(parse_date(Some("nope".to_string())).is_err());
        assert!(parse_date(Some("2024-13-01".to_string())).is_err());
    }

    #[test]
    fn test_session_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let config = temp_config(dir.path());

        assert!(load_session(&config).is_err());
        assert!(!clear_session(&config).unwrap());

        save_session(&config, &sample_session()).unwrap();
        let loaded = load_session(&config).unwrap();
        assert_eq!(loaded.id, "token-1234");
        assert_eq!(loaded.username, "alice");
        assert!(loaded.log.is_empty());

        assert!(clear_session(&config).unwrap());
        assert!(load_session(&config).is_err());
    }

    #[test]
    fn test_corrupt_session_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = temp_config(dir.path());
        std::fs::write(&config.session_path, "not json").unwrap();
        assert!(load_session(&config).is_err());
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello world this is long", 10), "hello w...");
        // multi-byte characters must not split
        assert_eq!(truncate("Crème fraîche", 10), "Crème f...");
    }

    #[test]
    fn test_json_error_shape() {
        assert_eq!(json_error("nope"), "{\"error\":\"nope\"}");
    }
}

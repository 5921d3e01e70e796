//! Bulk-load a tab from a CSV export. Headers are matched by name,
//! case-insensitively; rows that fail the tab's domain parse are
//! counted and skipped instead of poisoning the store.

use std::io::Read;

use anyhow::{Context, Result, bail};
use serde::Serialize;

use crate::sheet::{LOG_HEADERS, Row, TAB_LOG, TAB_PROFILES, TAB_USERS, TabStore, headers_for};
use crate::tabs;

/// Summary of what a tab import would do / did.
#[derive(Debug, Clone, Serialize)]
pub struct ImportSummary {
    pub tab: String,
    pub rows_read: usize,
    pub rows_imported: usize,
    pub rows_skipped: usize,
    pub dry_run: bool,
}

/// Parse a CSV export of one tab from any reader. The header row must
/// carry the tab's column names; extra columns are ignored and the
/// trailing log columns (amount, unit) are optional.
pub fn parse_tab_csv<R: Read>(tab: &str, reader: R) -> Result<Vec<Row>> {
    let known = headers_for(tab).with_context(|| format!("Unknown tab '{tab}'"))?;
    let required: &[&str] = match tab {
        TAB_LOG => &LOG_HEADERS[..4],
        _ => known,
    };

    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers().context("Failed to read CSV headers")?.clone();
    let col =
        |name: &str| -> Option<usize> { headers.iter().position(|h| h.eq_ignore_ascii_case(name)) };

    for name in required {
        if col(name).is_none() {
            bail!("Missing required column: {name}");
        }
    }

    let mut rows = Vec::new();
    for (line_num, result) in rdr.records().enumerate() {
        let record = result.with_context(|| format!("Failed to parse CSV row {}", line_num + 2))?;
        let mut row = Row::new();
        for name in known {
            if let Some(i) = col(name) {
                if let Some(value) = record.get(i) {
                    row.insert((*name).to_string(), value.trim().to_string());
                }
            }
        }
        if row.values().all(|v| v.is_empty()) {
            continue; // skip blank rows
        }
        rows.push(row);
    }
    Ok(rows)
}

/// Append parsed rows to the store. When `dry_run` is true nothing is
/// written; the summary still reports what would happen.
pub fn import_tab(
    store: &dyn TabStore,
    tab: &str,
    rows: &[Row],
    dry_run: bool,
) -> Result<ImportSummary> {
    let mut rows_imported = 0;
    let mut rows_skipped = 0;
    for row in rows {
        if row_parses(tab, row) {
            if !dry_run {
                store.append(tab, row)?;
            }
            rows_imported += 1;
        } else {
            rows_skipped += 1;
        }
    }
    Ok(ImportSummary {
        tab: tab.to_string(),
        rows_read: rows.len(),
        rows_imported,
        rows_skipped,
        dry_run,
    })
}

fn row_parses(tab: &str, row: &Row) -> bool {
    match tab {
        TAB_USERS => tabs::credential_from_row(row).is_some(),
        TAB_PROFILES => tabs::profile_from_row(row).is_some(),
        TAB_LOG => tabs::entry_from_row(row).is_some(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheet::MemoryStore;

    const LOG_CSV: &str = "\
date,name,calories,type,amount,unit
2024-06-01,Apple,80,Food,,
2024-06-01,Morning Run,320,Exercise,5.0,km
2024-06-01,Bad Row,lots,Food,,
,,,,,
2024-06-02,Shake,180,Food,,
";

    #[test]
    fn parses_log_export_and_skips_blank_lines() {
        let rows = parse_tab_csv(TAB_LOG, LOG_CSV.as_bytes()).unwrap();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0]["name"], "Apple");
        assert_eq!(rows[1]["unit"], "km");
    }

    #[test]
    fn header_match_is_case_insensitive_and_ignores_extras() {
        let csv = "\
Date,NAME,Calories,Type,Notes
2024-06-01,Apple,80,Food,crisp
";
        let rows = parse_tab_csv(TAB_LOG, csv.as_bytes()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["calories"], "80");
        assert!(!rows[0].contains_key("Notes"));
    }

    #[test]
    fn missing_required_column_fails() {
        let csv = "date,name,calories\n2024-06-01,Apple,80\n";
        assert!(parse_tab_csv(TAB_LOG, csv.as_bytes()).is_err());
        assert!(parse_tab_csv("scratch", csv.as_bytes()).is_err());
    }

    #[test]
    fn import_appends_valid_rows_and_counts_skips() {
        let store = MemoryStore::new();
        let rows = parse_tab_csv(TAB_LOG, LOG_CSV.as_bytes()).unwrap();
        let summary = import_tab(&store, TAB_LOG, &rows, false).unwrap();
        assert_eq!(summary.rows_read, 4);
        assert_eq!(summary.rows_imported, 3);
        assert_eq!(summary.rows_skipped, 1);
        assert_eq!(store.read_all(TAB_LOG).unwrap().len(), 3);
    }

    #[test]
    fn dry_run_writes_nothing() {
        let store = MemoryStore::new();
        let rows = parse_tab_csv(TAB_LOG, LOG_CSV.as_bytes()).unwrap();
        let summary = import_tab(&store, TAB_LOG, &rows, true).unwrap();
        assert!(summary.dry_run);
        assert_eq!(summary.rows_imported, 3);
        assert!(store.read_all(TAB_LOG).unwrap().is_empty());
    }

    #[test]
    fn users_export_round_trips() {
        let csv = "\
username,password,name,created_date,status
alice,pw,Alice,2024-01-01,approved
,missing-username,X,2024-01-01,pending
";
        let store = MemoryStore::new();
        let rows = parse_tab_csv(TAB_USERS, csv.as_bytes()).unwrap();
        let summary = import_tab(&store, TAB_USERS, &rows, false).unwrap();
        assert_eq!(summary.rows_imported, 1);
        assert_eq!(summary.rows_skipped, 1);
    }
}

//! The tabular store contract. A workbook is a set of named tabs; each
//! tab is a header row plus data rows, surfaced as one string map per
//! row keyed by header name. Backends only ever scan a whole tab, append
//! one row, or clear-and-rewrite a whole tab; row order is insertion
//! order and doubles as chronology.

use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::{Result, bail};

pub type Row = HashMap<String, String>;

pub const TAB_USERS: &str = "users";
pub const TAB_PROFILES: &str = "profiles";
/// The log lives on the workbook's original first tab.
pub const TAB_LOG: &str = "Sheet1";

pub const ALL_TABS: &[&str] = &[TAB_USERS, TAB_PROFILES, TAB_LOG];

pub const USERS_HEADERS: &[&str] = &["username", "password", "name", "created_date", "status"];
pub const PROFILES_HEADERS: &[&str] = &[
    "username", "date", "weight", "height", "age", "gender", "activity", "goals",
];
pub const LOG_HEADERS: &[&str] = &["date", "name", "calories", "type", "amount", "unit"];

#[must_use]
pub fn headers_for(tab: &str) -> Option<&'static [&'static str]> {
    match tab {
        TAB_USERS => Some(USERS_HEADERS),
        TAB_PROFILES => Some(PROFILES_HEADERS),
        TAB_LOG => Some(LOG_HEADERS),
        _ => None,
    }
}

/// Order a row's values by the tab header; absent fields become empty
/// cells so every written row has the full column count.
#[must_use]
pub fn row_to_cells(headers: &[&str], row: &Row) -> Vec<String> {
    headers
        .iter()
        .map(|h| row.get(*h).cloned().unwrap_or_default())
        .collect()
}

/// Zip a cell row up with the header. Short rows are padded with empty
/// strings, surplus cells are dropped, and rows whose cells are all
/// blank yield `None` (skipped by every reader).
#[must_use]
pub fn cells_to_row<S: AsRef<str>>(headers: &[S], cells: &[String]) -> Option<Row> {
    if cells.iter().all(|c| c.trim().is_empty()) {
        return None;
    }
    let mut row = Row::new();
    for (i, header) in headers.iter().enumerate() {
        let value = cells.get(i).cloned().unwrap_or_default();
        row.insert(header.as_ref().to_string(), value);
    }
    Some(row)
}

/// Storage behind the workbook. Implementations are process-lifetime
/// singletons; every call is synchronous and may fail, and callers treat
/// a missing tab as the store-unavailable condition.
pub trait TabStore: Send + Sync {
    fn read_all(&self, tab: &str) -> Result<Vec<Row>>;
    fn append(&self, tab: &str, row: &Row) -> Result<()>;
    fn rewrite(&self, tab: &str, rows: &[Row]) -> Result<()>;
}

/// In-memory backend: offline sessions and tests.
pub struct MemoryStore {
    tabs: Mutex<HashMap<String, Vec<Row>>>,
}

impl MemoryStore {
    /// A workbook with the three known tabs present and empty.
    #[must_use]
    pub fn new() -> Self {
        let mut tabs = HashMap::new();
        for tab in ALL_TABS {
            tabs.insert((*tab).to_string(), Vec::new());
        }
        Self {
            tabs: Mutex::new(tabs),
        }
    }

    /// A workbook with no tabs at all; reads and writes fail the way a
    /// deleted spreadsheet does.
    #[must_use]
    pub fn unprovisioned() -> Self {
        Self {
            tabs: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn with_rows(self, tab: &str, rows: Vec<Row>) -> Self {
        {
            let mut tabs = self
                .tabs
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            tabs.insert(tab.to_string(), rows);
        }
        self
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TabStore for MemoryStore {
    fn read_all(&self, tab: &str) -> Result<Vec<Row>> {
        let tabs = self
            .tabs
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        match tabs.get(tab) {
            Some(rows) => Ok(rows.clone()),
            None => bail!("Worksheet '{tab}' not found"),
        }
    }

    fn append(&self, tab: &str, row: &Row) -> Result<()> {
        let mut tabs = self
            .tabs
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        match tabs.get_mut(tab) {
            Some(rows) => {
                rows.push(row.clone());
                Ok(())
            }
            None => bail!("Worksheet '{tab}' not found"),
        }
    }

    fn rewrite(&self, tab: &str, rows: &[Row]) -> Result<()> {
        let mut tabs = self
            .tabs
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        match tabs.get_mut(tab) {
            Some(existing) => {
                *existing = rows.to_vec();
                Ok(())
            }
            None => bail!("Worksheet '{tab}' not found"),
        }
    }
}

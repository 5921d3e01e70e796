use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use anyhow::{Context, Result, bail};
use rusqlite::{Connection, params};

use crate::sheet::{ALL_TABS, Row, TabStore};

/// Durable workbook backend on SQLite. Tab names live in `tabs`; data
/// rows live in `rows` as JSON objects, ordered by rowid so insertion
/// order survives. The connection sits behind a mutex because the store
/// contract takes `&self` from multiple threads.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        let store = SqliteStore {
            conn: Mutex::new(conn),
        };
        store.migrate()?;
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = SqliteStore {
            conn: Mutex::new(conn),
        };
        store.migrate()?;
        Ok(store)
    }

    fn migrate(&self) -> Result<()> {
        let conn = self.lock();
        let version: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

        if version < 1 {
            conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS tabs (
                    name TEXT PRIMARY KEY
                );

                CREATE TABLE IF NOT EXISTS rows (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    tab TEXT NOT NULL REFERENCES tabs(name),
                    data TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_rows_tab ON rows(tab);

                PRAGMA user_version = 1;",
            )?;
        }

        // The three known tabs always exist, like a freshly shared workbook.
        for tab in ALL_TABS {
            conn.execute("INSERT OR IGNORE INTO tabs (name) VALUES (?1)", params![tab])?;
        }
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn tab_exists(conn: &Connection, tab: &str) -> Result<bool> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM tabs WHERE name = ?1",
            params![tab],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}

impl TabStore for SqliteStore {
    fn read_all(&self, tab: &str) -> Result<Vec<Row>> {
        let conn = self.lock();
        if !Self::tab_exists(&conn, tab)? {
            bail!("Worksheet '{tab}' not found");
        }
        let mut stmt = conn.prepare("SELECT data FROM rows WHERE tab = ?1 ORDER BY id")?;
        let payloads = stmt.query_map(params![tab], |row| row.get::<_, String>(0))?;

        let mut rows = Vec::new();
        for payload in payloads {
            let payload = payload?;
            // Payloads that no longer parse as a string map are dropped.
            if let Ok(row) = serde_json::from_str::<Row>(&payload) {
                rows.push(row);
            }
        }
        Ok(rows)
    }

    fn append(&self, tab: &str, row: &Row) -> Result<()> {
        let conn = self.lock();
        if !Self::tab_exists(&conn, tab)? {
            bail!("Worksheet '{tab}' not found");
        }
        let data = serde_json::to_string(row)?;
        conn.execute(
            "INSERT INTO rows (tab, data) VALUES (?1, ?2)",
            params![tab, data],
        )?;
        Ok(())
    }

    fn rewrite(&self, tab: &str, rows: &[Row]) -> Result<()> {
        let mut conn = self.lock();
        if !Self::tab_exists(&conn, tab)? {
            bail!("Worksheet '{tab}' not found");
        }
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM rows WHERE tab = ?1", params![tab])?;
        {
            let mut stmt = tx.prepare("INSERT INTO rows (tab, data) VALUES (?1, ?2)")?;
            for row in rows {
                stmt.execute(params![tab, serde_json::to_string(row)?])?;
            }
        }
        tx.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheet::{TAB_LOG, TAB_PROFILES, TAB_USERS};

    fn row(pairs: &[(&str, &str)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn fresh_store_has_empty_known_tabs() {
        let store = SqliteStore::open_in_memory().unwrap();
        for tab in [TAB_USERS, TAB_PROFILES, TAB_LOG] {
            assert!(store.read_all(tab).unwrap().is_empty());
        }
    }

    #[test]
    fn migrate_is_idempotent() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .append(TAB_USERS, &row(&[("username", "alice")]))
            .unwrap();
        store.migrate().unwrap();
        assert_eq!(store.read_all(TAB_USERS).unwrap().len(), 1);
    }

    #[test]
    fn append_preserves_insertion_order() {
        let store = SqliteStore::open_in_memory().unwrap();
        for day in ["2024-06-01", "2024-06-02", "2024-06-03"] {
            store.append(TAB_LOG, &row(&[("date", day)])).unwrap();
        }
        let rows = store.read_all(TAB_LOG).unwrap();
        let dates: Vec<&str> = rows.iter().map(|r| r["date"].as_str()).collect();
        assert_eq!(dates, vec!["2024-06-01", "2024-06-02", "2024-06-03"]);
    }

    #[test]
    fn rewrite_replaces_tab_contents() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .append(TAB_LOG, &row(&[("date", "2024-06-01"), ("name", "Apple")]))
            .unwrap();
        store
            .append(TAB_LOG, &row(&[("date", "2024-06-01"), ("name", "Shake")]))
            .unwrap();
        store
            .rewrite(TAB_LOG, &[row(&[("date", "2024-06-02"), ("name", "Salad")])])
            .unwrap();
        let rows = store.read_all(TAB_LOG).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["name"], "Salad");
    }

    #[test]
    fn unknown_tab_is_an_error() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert!(store.read_all("scratch").is_err());
        assert!(store.append("scratch", &Row::new()).is_err());
        assert!(store.rewrite("scratch", &[]).is_err());
    }

    #[test]
    fn unparseable_payloads_are_dropped() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .append(TAB_LOG, &row(&[("date", "2024-06-01")]))
            .unwrap();
        store
            .lock()
            .execute(
                "INSERT INTO rows (tab, data) VALUES (?1, ?2)",
                params![TAB_LOG, "not json at all"],
            )
            .unwrap();
        store
            .lock()
            .execute(
                "INSERT INTO rows (tab, data) VALUES (?1, ?2)",
                params![TAB_LOG, "[1, 2, 3]"],
            )
            .unwrap();
        let rows = store.read_all(TAB_LOG).unwrap();
        assert_eq!(rows.len(), 1);
    }
}

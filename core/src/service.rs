//! High-level service API. The CLI and the HTTP server both call
//! through `NutriService`; all per-user state lives on an explicit
//! `Session` value owned by the caller, never in globals.

use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::SqliteStore;
use crate::menu::{self, PlanItem};
use crate::models::{
    Credential, DailyReport, EntryCategory, LogEntry, NewProfile, PENDING_STATUS, Profile,
    profile_marker_name, today_string, validate_registration,
};
use crate::sheet::{MemoryStore, TabStore};
use crate::tabs::Workbook;

/// Where a mutation landed. The session mirror always has it; the store
/// may not, and the divergence is reported rather than rolled back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "detail", rename_all = "snake_case")]
pub enum CloudState {
    Synced,
    SessionOnly(String),
}

impl CloudState {
    #[must_use]
    pub fn is_synced(&self) -> bool {
        matches!(self, Self::Synced)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RegisterOutcome {
    Created { username: String, message: String },
    DuplicateUser { message: String },
}

#[derive(Debug)]
pub enum LoginOutcome {
    Approved {
        session: Session,
        warning: Option<String>,
    },
    Pending,
    InvalidCredentials,
}

/// Everything a logged-in caller carries between requests: identity,
/// the cached profile, the log mirror, and the generated plan. The CLI
/// serializes one of these to disk; the server holds them in a token
/// map keyed by `id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub username: String,
    pub display_name: String,
    pub started: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<Profile>,
    #[serde(default)]
    pub log: Vec<LogEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<Vec<PlanItem>>,
}

impl Session {
    fn new(username: &str, display_name: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            username: username.to_string(),
            display_name: display_name.to_string(),
            started: today_string(),
            profile: None,
            log: Vec::new(),
            plan: None,
        }
    }

    /// The mirror's rows for one day, in insertion order.
    #[must_use]
    pub fn day_entries(&self, date: &str) -> Vec<LogEntry> {
        self.log.iter().filter(|e| e.date == date).cloned().collect()
    }
}

pub struct NutriService {
    book: Option<Workbook>,
}

impl NutriService {
    /// Service over the local SQLite workbook.
    pub fn open(db_path: &Path) -> Result<Self> {
        Ok(Self::new(Box::new(SqliteStore::open(db_path)?)))
    }

    #[must_use]
    pub fn new(store: Box<dyn TabStore>) -> Self {
        Self {
            book: Some(Workbook::new(store)),
        }
    }

    /// Volatile store; state lasts as long as the process.
    #[must_use]
    pub fn new_in_memory() -> Self {
        Self::new(Box::new(MemoryStore::new()))
    }

    /// No store at all. Mutations stay on the session and report
    /// `CloudState::SessionOnly`; account operations fail outright.
    #[must_use]
    pub fn offline() -> Self {
        Self { book: None }
    }

    #[must_use]
    pub fn is_offline(&self) -> bool {
        self.book.is_none()
    }

    /// Direct access to the attached store, for bulk operations that
    /// bypass the session layer.
    #[must_use]
    pub fn store(&self) -> Option<&dyn TabStore> {
        self.book.as_ref().map(Workbook::store)
    }

    fn require_book(&self) -> Result<&Workbook> {
        self.book
            .as_ref()
            .context("Offline mode: the account store is unavailable")
    }

    fn persist<F>(&self, op: F) -> CloudState
    where
        F: FnOnce(&Workbook) -> Result<()>,
    {
        match &self.book {
            None => CloudState::SessionOnly("offline mode, kept in this session only".to_string()),
            Some(book) => match op(book) {
                Ok(()) => CloudState::Synced,
                Err(e) => CloudState::SessionOnly(format!("{e:#}")),
            },
        }
    }

    // --- accounts ---

    /// Appends a pending credential row unless the username is taken.
    /// The duplicate scan is a case-sensitive exact match.
    pub fn register(
        &self,
        username: &str,
        password: &str,
        display_name: &str,
    ) -> Result<RegisterOutcome> {
        validate_registration(username, password, display_name)?;
        let book = self.require_book()?;
        if book.find_credential(username)?.is_some() {
            return Ok(RegisterOutcome::DuplicateUser {
                message: "Username already exists.".to_string(),
            });
        }
        book.append_credential(&Credential {
            username: username.to_string(),
            password: password.to_string(),
            display_name: display_name.to_string(),
            created_date: today_string(),
            status: PENDING_STATUS.to_string(),
        })?;
        Ok(RegisterOutcome::Created {
            username: username.to_string(),
            message: "Account created! Awaiting admin approval.".to_string(),
        })
    }

    /// Exact (username, password) scan, then the status gate. A failed
    /// credential scan is a store error, distinct from "no match". On
    /// approval the session is loaded with the latest profile and the
    /// full log; a failure in either load degrades to a warning instead
    /// of blocking the login.
    pub fn login(&self, username: &str, password: &str) -> Result<LoginOutcome> {
        let book = self.require_book()?;
        let matched = book
            .credentials()?
            .into_iter()
            .find(|c| c.username == username && c.password == password);
        let Some(credential) = matched else {
            return Ok(LoginOutcome::InvalidCredentials);
        };
        if !credential.is_approved() {
            return Ok(LoginOutcome::Pending);
        }

        let mut session = Session::new(&credential.username, &credential.display_name);
        let mut warning = None;
        match book.latest_profile(username) {
            Ok(profile) => session.profile = profile,
            Err(e) => warning = Some(format!("Could not load profile: {e:#}")),
        }
        match book.log_entries() {
            Ok(log) => session.log = log,
            Err(e) => {
                if warning.is_none() {
                    warning = Some(format!("Could not load log: {e:#}"));
                }
            }
        }
        Ok(LoginOutcome::Approved { session, warning })
    }

    // --- profile ---

    /// Recompute the derived numbers, stamp today's date, and append the
    /// snapshot plus a `Profile_Settings` marker row to the log. The
    /// session is updated first; persistence failures surface in the
    /// returned `CloudState`.
    pub fn save_profile(&self, session: &mut Session, input: &NewProfile) -> (Profile, CloudState) {
        let date = today_string();
        let profile = Profile::build(&session.username, &date, input);
        session.profile = Some(profile.clone());

        let marker = LogEntry {
            date,
            name: profile_marker_name(&session.display_name, profile.weight_kg),
            calories: profile.target_calories as i64,
            category: EntryCategory::ProfileSettings,
            amount: None,
            unit: None,
        };
        session.log.push(marker.clone());

        let cloud = self.persist(|book| {
            book.append_profile(&profile)?;
            book.append_entry(&marker)
        });
        (profile, cloud)
    }

    pub fn profile_history(&self, username: &str) -> Result<Vec<Profile>> {
        self.require_book()?.profile_history(username)
    }

    // --- plan ---

    pub fn generate_plan(&self, session: &mut Session) -> Result<Vec<PlanItem>> {
        let profile = session
            .profile
            .as_ref()
            .context("Set up your profile first")?;
        let plan = menu::generate_menu(profile.target_calories);
        session.plan = Some(plan.clone());
        Ok(plan)
    }

    /// Quick-add one generated plan item to the log as a Food entry.
    pub fn log_from_plan(
        &self,
        session: &mut Session,
        index: usize,
        date: &str,
    ) -> Result<(LogEntry, CloudState)> {
        let plan = session
            .plan
            .as_ref()
            .context("No generated plan; generate one first")?;
        let Some(item) = plan.get(index) else {
            bail!("No plan item #{index} (plan has {} items)", plan.len());
        };
        let entry = LogEntry {
            date: date.to_string(),
            name: item.name.clone(),
            calories: item.calories,
            category: EntryCategory::Food,
            amount: None,
            unit: None,
        };
        Ok(self.push_entry(session, entry))
    }

    // --- log ---

    pub fn log_manual(
        &self,
        session: &mut Session,
        date: &str,
        name: &str,
        calories: i64,
    ) -> (LogEntry, CloudState) {
        let entry = LogEntry {
            date: date.to_string(),
            name: name.to_string(),
            calories,
            category: EntryCategory::Manual,
            amount: None,
            unit: None,
        };
        self.push_entry(session, entry)
    }

    /// Exercise rows store the burn magnitude; the sign is normalized
    /// so "-300" and "300" record the same workout.
    pub fn log_exercise(
        &self,
        session: &mut Session,
        date: &str,
        name: &str,
        calories_burned: i64,
        amount: Option<f64>,
        unit: Option<String>,
    ) -> (LogEntry, CloudState) {
        let entry = LogEntry {
            date: date.to_string(),
            name: name.to_string(),
            calories: calories_burned.abs(),
            category: EntryCategory::Exercise,
            amount,
            unit,
        };
        self.push_entry(session, entry)
    }

    fn push_entry(&self, session: &mut Session, entry: LogEntry) -> (LogEntry, CloudState) {
        session.log.push(entry.clone());
        let cloud = self.persist(|book| book.append_entry(&entry));
        (entry, cloud)
    }

    /// Pure in-memory aggregate over the session mirror; never touches
    /// the store.
    #[must_use]
    pub fn day_report(&self, session: &Session, date: &str) -> DailyReport {
        let entries = session.day_entries(date);
        let target = session.profile.as_ref().map(|p| p.target_calories);
        DailyReport::from_entries(date, entries, target)
    }

    /// Replace one day's entries in the mirror and the store. Returns
    /// the number of mirror rows replaced.
    pub fn rewrite_day(
        &self,
        session: &mut Session,
        date: &str,
        replacement: Vec<LogEntry>,
    ) -> (usize, CloudState) {
        let before = session.log.len();
        session.log.retain(|e| e.date != date);
        let removed = before - session.log.len();
        session.log.extend(replacement.iter().cloned());
        let cloud = self.persist(|book| book.rewrite_day(date, &replacement).map(|_| ()));
        (removed, cloud)
    }

    /// Drop one entry of a day by its position in that day's list.
    pub fn remove_entry(
        &self,
        session: &mut Session,
        date: &str,
        index: usize,
    ) -> Result<(LogEntry, CloudState)> {
        let mut day = session.day_entries(date);
        if index >= day.len() {
            bail!("No entry #{index} on {date} ({} entries)", day.len());
        }
        let removed = day.remove(index);
        let (_, cloud) = self.rewrite_day(session, date, day);
        Ok((removed, cloud))
    }

    /// Pull the store's truth back into the session, discarding any
    /// divergence accumulated by failed writes.
    pub fn reload(&self, session: &mut Session) -> Result<()> {
        let book = self.require_book()?;
        session.profile = book.latest_profile(&session.username)?;
        session.log = book.log_entries()?;
        Ok(())
    }
}

use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::path::PathBuf;

use nutritrack_core::service_account::ServiceAccountKey;

const DEFAULT_WORKBOOK: &str = "NutriTrack_Data";

pub struct Config {
    pub data_dir: PathBuf,
    pub db_path: PathBuf,
    pub session_path: PathBuf,
    pub workbook_name: String,
}

impl Config {
    pub fn load() -> Result<Self> {
        let data_dir = match std::env::var_os("NUTRITRACK_DATA_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => ProjectDirs::from("", "", "nutritrack")
                .context("Could not determine home directory")?
                .data_dir()
                .to_path_buf(),
        };
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;

        let workbook_name =
            std::env::var("NUTRITRACK_WORKBOOK").unwrap_or_else(|_| DEFAULT_WORKBOOK.to_string());

        Ok(Config {
            db_path: data_dir.join("nutritrack.db"),
            session_path: data_dir.join("session.json"),
            workbook_name,
            data_dir,
        })
    }

    /// Locate the service-account payload, if any is configured.
    ///
    /// Sources, first match wins: `NUTRITRACK_SERVICE_ACCOUNT` (inline
    /// JSON), `NUTRITRACK_SERVICE_ACCOUNT_FILE` (path), then
    /// `service_account.json` in the data directory. `Ok(None)` means no
    /// payload anywhere, so the local database should be used instead.
    pub fn load_service_account(&self) -> Result<Option<ServiceAccountKey>> {
        if let Ok(payload) = std::env::var("NUTRITRACK_SERVICE_ACCOUNT") {
            if !payload.trim().is_empty() {
                return ServiceAccountKey::from_json(&payload).map(Some);
            }
        }
        if let Ok(path) = std::env::var("NUTRITRACK_SERVICE_ACCOUNT_FILE") {
            let payload = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read service account file: {path}"))?;
            return ServiceAccountKey::from_json(&payload).map(Some);
        }
        let path = self.data_dir.join("service_account.json");
        if path.exists() {
            let payload = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            return ServiceAccountKey::from_json(&payload).map(Some);
        }
        Ok(None)
    }
}

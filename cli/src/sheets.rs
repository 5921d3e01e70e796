//! Google Sheets backend for the tabular store contract. Auth is a
//! service account: an RS256 JWT is exchanged for a bearer token and
//! cached until shortly before expiry. The workbook is addressed by its
//! display name and resolved to a spreadsheet id through the Drive API
//! once per process. The store trait is synchronous, so the async
//! reqwest calls are bridged through a stored runtime handle.

use std::future::Future;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};

use nutritrack_core::service_account::{STORE_SCOPES, ServiceAccountKey};
use nutritrack_core::sheet::{Row, TabStore, cells_to_row, headers_for, row_to_cells};

const DRIVE_FILES_URL: &str = "https://www.googleapis.com/drive/v3/files";
const SHEETS_BASE_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const SPREADSHEET_MIME: &str = "application/vnd.google-apps.spreadsheet";

/// Refresh the cached access token this long before it actually expires.
const TOKEN_SLACK: Duration = Duration::from_secs(60);

#[derive(Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: String,
    aud: &'a str,
    iat: u64,
    exp: u64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Deserialize)]
struct DriveFileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Deserialize)]
struct DriveFile {
    id: String,
}

#[derive(Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

struct CachedToken {
    value: String,
    good_until: Instant,
}

pub struct RemoteSheetStore {
    client: reqwest::Client,
    rt: tokio::runtime::Handle,
    key: ServiceAccountKey,
    workbook: String,
    token: Mutex<Option<CachedToken>>,
    spreadsheet_id: Mutex<Option<String>>,
}

impl RemoteSheetStore {
    /// Must be created from inside a multi-thread tokio runtime; the
    /// handle is kept to bridge the synchronous trait onto reqwest.
    pub fn new(key: ServiceAccountKey, workbook: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(format!(
                "nutritrack/{} (nutrition tracker)",
                env!("CARGO_PKG_VERSION")
            ))
            .timeout(Duration::from_secs(15))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            rt: tokio::runtime::Handle::try_current()
                .context("The Sheets store needs a tokio runtime")?,
            key,
            workbook: workbook.to_string(),
            token: Mutex::new(None),
            spreadsheet_id: Mutex::new(None),
        })
    }

    fn block_on<F: Future>(&self, fut: F) -> F::Output {
        if tokio::runtime::Handle::try_current().is_ok() {
            tokio::task::block_in_place(|| self.rt.block_on(fut))
        } else {
            self.rt.block_on(fut)
        }
    }

    // --- auth ---

    fn signed_jwt(&self) -> Result<String> {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .context("System clock is before the epoch")?
            .as_secs();
        let claims = Claims {
            iss: &self.key.client_email,
            scope: STORE_SCOPES.join(" "),
            aud: &self.key.token_uri,
            iat: now,
            exp: now + 3600,
        };
        let key = EncodingKey::from_rsa_pem(self.key.private_key.as_bytes())
            .context("Invalid service account private key")?;
        jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &key)
            .context("Failed to sign service account JWT")
    }

    async fn fetch_token(&self) -> Result<CachedToken> {
        let assertion = self.signed_jwt()?;
        let resp = self
            .client
            .post(&self.key.token_uri)
            .form(&[
                ("grant_type", JWT_BEARER_GRANT),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await
            .context("Failed to reach the token endpoint")?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            bail!("Token exchange failed ({status}): {body}");
        }
        let token: TokenResponse = resp.json().await.context("Failed to parse token response")?;
        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(TOKEN_SLACK);
        Ok(CachedToken {
            value: token.access_token,
            good_until: Instant::now() + lifetime,
        })
    }

    async fn access_token(&self) -> Result<String> {
        {
            let cached = self.token.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(token) = cached.as_ref() {
                if Instant::now() < token.good_until {
                    return Ok(token.value.clone());
                }
            }
        }
        let fresh = self.fetch_token().await?;
        let value = fresh.value.clone();
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = Some(fresh);
        Ok(value)
    }

    // --- workbook resolution ---

    async fn spreadsheet_id(&self) -> Result<String> {
        {
            let cached = self
                .spreadsheet_id
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if let Some(id) = cached.as_ref() {
                return Ok(id.clone());
            }
        }
        let token = self.access_token().await?;
        let query = format!(
            "name = '{}' and mimeType = '{SPREADSHEET_MIME}' and trashed = false",
            self.workbook.replace('\'', "\\'")
        );
        let resp = self
            .client
            .get(DRIVE_FILES_URL)
            .bearer_auth(&token)
            .query(&[
                ("q", query.as_str()),
                ("fields", "files(id)"),
                ("pageSize", "1"),
            ])
            .send()
            .await
            .context("Failed to reach the Drive API")?;
        if !resp.status().is_success() {
            let status = resp.status();
            bail!("Drive lookup failed ({status})");
        }
        let list: DriveFileList = resp.json().await.context("Failed to parse Drive response")?;
        let Some(file) = list.files.into_iter().next() else {
            bail!("Workbook '{}' not found in Drive", self.workbook);
        };
        *self
            .spreadsheet_id
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(file.id.clone());
        Ok(file.id)
    }

    // --- values API ---

    fn range_url(spreadsheet_id: &str, tab: &str, suffix: &str) -> String {
        let range = percent_encode_component(tab);
        format!("{SHEETS_BASE_URL}/{spreadsheet_id}/values/{range}{suffix}")
    }

    async fn fetch_grid(&self, tab: &str) -> Result<Vec<Vec<String>>> {
        let token = self.access_token().await?;
        let id = self.spreadsheet_id().await?;
        let resp = self
            .client
            .get(Self::range_url(&id, tab, ""))
            .bearer_auth(&token)
            .send()
            .await
            .context("Failed to reach the Sheets API")?;
        check_range_status(&resp, tab)?;
        let range: ValueRange = resp.json().await.context("Failed to parse Sheets response")?;
        Ok(range
            .values
            .into_iter()
            .map(|cells| cells.into_iter().map(cell_text).collect())
            .collect())
    }

    async fn append_cells(&self, tab: &str, cells: Vec<String>) -> Result<()> {
        let token = self.access_token().await?;
        let id = self.spreadsheet_id().await?;
        let resp = self
            .client
            .post(Self::range_url(&id, tab, ":append"))
            .bearer_auth(&token)
            .query(&[
                ("valueInputOption", "RAW"),
                ("insertDataOption", "INSERT_ROWS"),
            ])
            .json(&serde_json::json!({ "values": [cells] }))
            .send()
            .await
            .context("Failed to reach the Sheets API")?;
        ensure_write_ok(resp, tab).await
    }

    /// Clear the tab, then write the header row and all data rows back.
    async fn overwrite_cells(&self, tab: &str, grid: Vec<Vec<String>>) -> Result<()> {
        let token = self.access_token().await?;
        let id = self.spreadsheet_id().await?;
        let resp = self
            .client
            .post(Self::range_url(&id, tab, ":clear"))
            .bearer_auth(&token)
            .json(&serde_json::json!({}))
            .send()
            .await
            .context("Failed to reach the Sheets API")?;
        ensure_write_ok(resp, tab).await?;

        let resp = self
            .client
            .put(Self::range_url(&id, tab, ""))
            .bearer_auth(&token)
            .query(&[("valueInputOption", "RAW")])
            .json(&serde_json::json!({ "values": grid }))
            .send()
            .await
            .context("Failed to reach the Sheets API")?;
        ensure_write_ok(resp, tab).await
    }
}

impl TabStore for RemoteSheetStore {
    fn read_all(&self, tab: &str) -> Result<Vec<Row>> {
        let headers = headers_for(tab).with_context(|| format!("Worksheet '{tab}' not found"))?;
        let grid = self.block_on(self.fetch_grid(tab))?;
        Ok(grid_to_rows(headers, grid))
    }

    fn append(&self, tab: &str, row: &Row) -> Result<()> {
        let headers = headers_for(tab).with_context(|| format!("Worksheet '{tab}' not found"))?;
        self.block_on(self.append_cells(tab, row_to_cells(headers, row)))
    }

    fn rewrite(&self, tab: &str, rows: &[Row]) -> Result<()> {
        let headers = headers_for(tab).with_context(|| format!("Worksheet '{tab}' not found"))?;
        self.block_on(self.overwrite_cells(tab, rows_to_grid(headers, rows)))
    }
}

/// The first grid row is the header; data rows map positionally onto the
/// canonical headers for the tab. Blank rows drop out here.
fn grid_to_rows(headers: &[&str], grid: Vec<Vec<String>>) -> Vec<Row> {
    grid.into_iter()
        .skip(1)
        .filter_map(|cells| cells_to_row(headers, &cells))
        .collect()
}

fn rows_to_grid(headers: &[&str], rows: &[Row]) -> Vec<Vec<String>> {
    let mut grid = Vec::with_capacity(rows.len() + 1);
    grid.push(headers.iter().map(ToString::to_string).collect());
    grid.extend(rows.iter().map(|row| row_to_cells(headers, row)));
    grid
}

/// Formatted Sheets cells arrive as JSON scalars of mixed types;
/// everything becomes cell text.
fn cell_text(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// The Sheets API answers an unknown range with 400, which for this
/// store means the worksheet is missing.
fn check_range_status(resp: &reqwest::Response, tab: &str) -> Result<()> {
    let status = resp.status();
    if status == reqwest::StatusCode::BAD_REQUEST || status == reqwest::StatusCode::NOT_FOUND {
        bail!("Worksheet '{tab}' not found");
    }
    if !status.is_success() {
        bail!("Sheets read failed ({status})");
    }
    Ok(())
}

async fn ensure_write_ok(resp: reqwest::Response, tab: &str) -> Result<()> {
    let status = resp.status();
    if status == reqwest::StatusCode::BAD_REQUEST || status == reqwest::StatusCode::NOT_FOUND {
        bail!("Worksheet '{tab}' not found");
    }
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        bail!("Sheets write failed ({status}): {body}");
    }
    Ok(())
}

/// Minimal percent-encoding for a URL path segment: everything outside
/// the RFC 3986 unreserved set is escaped, so tab names with spaces or
/// quotes survive.
fn percent_encode_component(input: &str) -> String {
    let mut encoded = String::with_capacity(input.len() * 3);
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                encoded.push(byte as char);
            }
            _ => {
                encoded.push('%');
                encoded.push(char::from(HEX_CHARS[(byte >> 4) as usize]));
                encoded.push(char::from(HEX_CHARS[(byte & 0x0F) as usize]));
            }
        }
    }
    encoded
}

const HEX_CHARS: [u8; 16] = *b"0123456789ABCDEF";

#[cfg(test)]
mod tests {
    use super::*;
    use nutritrack_core::sheet::LOG_HEADERS;

    #[test]
    fn percent_encode_escapes_reserved_bytes() {
        assert_eq!(percent_encode_component("Sheet1"), "Sheet1");
        assert_eq!(percent_encode_component("My Tab"), "My%20Tab");
        assert_eq!(percent_encode_component("a'b/c"), "a%27b%2Fc");
    }

    #[test]
    fn cell_text_stringifies_scalars() {
        assert_eq!(cell_text(serde_json::json!("Apple")), "Apple");
        assert_eq!(cell_text(serde_json::json!(80)), "80");
        assert_eq!(cell_text(serde_json::json!(2.5)), "2.5");
        assert_eq!(cell_text(serde_json::json!(true)), "true");
        assert_eq!(cell_text(serde_json::Value::Null), "");
    }

    #[test]
    fn grid_skips_header_and_blank_rows() {
        let grid = vec![
            vec!["date".into(), "name".into(), "calories".into()],
            vec!["2024-06-01".into(), "Apple".into(), "80".into()],
            vec![String::new(), String::new(), String::new()],
            vec!["2024-06-02".into(), "Shake".into()],
        ];
        let rows = grid_to_rows(LOG_HEADERS, grid);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["date"], "2024-06-01");
        assert_eq!(rows[0]["calories"], "80");
        // short rows are padded out to the full header
        assert_eq!(rows[1]["calories"], "");
        assert_eq!(rows[1]["unit"], "");
    }

    #[test]
    fn rewrite_grid_leads_with_the_header_row() {
        let row: Row = [
            ("date".to_string(), "2024-06-01".to_string()),
            ("name".to_string(), "Apple".to_string()),
            ("calories".to_string(), "80".to_string()),
            ("type".to_string(), "Food".to_string()),
        ]
        .into_iter()
        .collect();
        let grid = rows_to_grid(LOG_HEADERS, &[row]);
        assert_eq!(grid.len(), 2);
        assert_eq!(grid[0], LOG_HEADERS.to_vec());
        assert_eq!(grid[1][0], "2024-06-01");
        assert_eq!(grid[1][2], "80");
        // cells without a header column are padded empty
        assert_eq!(grid[1][4], "");
    }

    #[test]
    fn range_urls_nest_under_the_spreadsheet() {
        let url = RemoteSheetStore::range_url("abc123", "Sheet1", ":append");
        assert_eq!(
            url,
            "https://sheets.googleapis.com/v4/spreadsheets/abc123/values/Sheet1:append"
        );
    }
}

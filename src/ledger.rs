// Ledger client: a small blocking client for the Sheets v4 values API,
// behind a trait so the submission flow can run against other stores.

use anyhow::{bail, Context, Result};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::Config;

/// The remote store of previously submitted runs.
pub trait Ledger {
    /// Every row of `sheet`, each as a list of cell strings.
    fn fetch_rows(&self, sheet: &str) -> Result<Vec<Vec<String>>>;

    /// Append one row after the last row of `sheet`.
    fn append_row(&self, sheet: &str, row: &[String]) -> Result<()>;
}

/// Blocking Sheets API client bound to one spreadsheet.
#[derive(Clone)]
pub struct SheetsClient {
    client: Client,
    base_url: String,
    spreadsheet_id: String,
    range: String,
    token: Option<String>,
}

/// Body of a `values.get` response. Sheets drops `values` entirely when
/// the range is empty.
#[derive(Deserialize, Debug)]
pub struct ValueRange {
    #[serde(default)]
    pub range: Option<String>,
    #[serde(default)]
    pub values: Vec<Vec<Value>>,
}

#[derive(Serialize)]
struct AppendBody<'a> {
    values: [&'a [String]; 1],
}

/// Summary Sheets returns after an append.
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct AppendResponse {
    #[serde(default)]
    pub table_range: Option<String>,
    #[serde(default)]
    pub updates: Option<Value>,
}

/// `'Sheet Name'!A2:ZZZ100000`, with quotes inside the name doubled.
pub fn a1_range(sheet: &str, range: &str) -> String {
    format!("'{}'!{}", sheet.replace('\'', "''"), range)
}

fn cell_text(v: Value) -> String {
    match v {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

impl ValueRange {
    pub fn into_rows(self) -> Vec<Vec<String>> {
        self.values
            .into_iter()
            .map(|row| row.into_iter().map(cell_text).collect())
            .collect()
    }
}

impl SheetsClient {
    pub fn new(client: Client, config: &Config) -> Self {
        SheetsClient {
            client,
            base_url: config.api_base.trim_end_matches('/').to_string(),
            spreadsheet_id: config.spreadsheet_id.clone(),
            range: config.range.clone(),
            token: None,
        }
    }

    /// Store an OAuth access token for subsequent requests.
    pub fn set_token(&mut self, token: &str) {
        self.token = Some(token.to_string());
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    fn auth_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        match &self.token {
            Some(t) => {
                let val = HeaderValue::from_str(&format!("Bearer {}", t))
                    .context("Access token is not a valid header value")?;
                headers.insert(AUTHORIZATION, val);
            }
            None => bail!("No access token set on the ledger client"),
        }
        Ok(headers)
    }

    /// `{base}/v4/spreadsheets/{id}/values/{range}{suffix}` with the id and
    /// range percent-encoded as path segments.
    pub fn values_url(&self, sheet: &str, suffix: &str) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .with_context(|| format!("Invalid API base url {}", self.base_url))?;
        let range = format!("{}{}", a1_range(sheet, &self.range), suffix);
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("API base url cannot carry a path"))?
            .pop_if_empty()
            .extend(["v4", "spreadsheets", self.spreadsheet_id.as_str(), "values", range.as_str()]);
        Ok(url)
    }
}

impl Ledger for SheetsClient {
    fn fetch_rows(&self, sheet: &str) -> Result<Vec<Vec<String>>> {
        let url = self.values_url(sheet, "")?;
        log::debug!("GET {}", url);
        let res = self
            .client
            .get(url)
            .headers(self.auth_headers()?)
            .send()
            .context("Failed to send ledger read request")?;
        if !res.status().is_success() {
            let status = res.status();
            let txt = res.text().unwrap_or_else(|_| "".into());
            bail!("Ledger read failed: {} - {}", status, txt);
        }
        let body: ValueRange = res.json().context("Parsing ledger values json")?;
        let rows = body.into_rows();
        if rows.is_empty() {
            log::info!("no rows found on sheet {}", sheet);
        }
        Ok(rows)
    }

    fn append_row(&self, sheet: &str, row: &[String]) -> Result<()> {
        let mut url = self.values_url(sheet, ":append")?;
        url.query_pairs_mut()
            .append_pair("valueInputOption", "RAW")
            .append_pair("insertDataOption", "INSERT_ROWS");
        log::debug!("POST {}", url);
        let res = self
            .client
            .post(url)
            .headers(self.auth_headers()?)
            .json(&AppendBody { values: [row] })
            .send()
            .context("Failed to send ledger append request")?;
        if !res.status().is_success() {
            let status = res.status();
            let txt = res.text().unwrap_or_else(|_| "".into());
            bail!("Ledger append failed: {} - {}", status, txt);
        }
        let summary: AppendResponse = res.json().unwrap_or_default();
        log::info!(
            "appended row to {}",
            summary.table_range.as_deref().unwrap_or(sheet)
        );
        Ok(())
    }
}

//! HTTP client for the WISA `OUDERMLR_N` roster query.

use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use secrecy::{ExposeSecret, SecretString};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use url::Url;

use arkmailer_core::{RosterRecord, RosterSource, SyncError, SyncResult};

use crate::reference_date::{format_reference_date, reference_date};
use crate::{WisaError, WisaResult};

/// Name of the stored query returning pupils and their contact addresses.
pub const ROSTER_QUERY: &str = "OUDERMLR_N";

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings for a WISA instance.
#[derive(Debug, Clone)]
pub struct WisaConfig {
    /// Base URL of the WISA web service.
    pub base_url: String,
    pub username: String,
    pub password: SecretString,
    /// Institution number(s) passed verbatim to the query.
    pub institution_numbers: String,
    pub timeout: Duration,
    /// Where to keep a copy of the last roster, if anywhere.
    pub snapshot_path: Option<PathBuf>,
}

/// Roster source backed by the WISA query API.
#[derive(Debug)]
pub struct WisaClient {
    http_client: reqwest::Client,
    config: WisaConfig,
}

impl WisaClient {
    /// Creates a client.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid or the HTTP client cannot
    /// be created.
    pub fn new(config: WisaConfig) -> WisaResult<Self> {
        Url::parse(&config.base_url)?;

        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| WisaError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            config,
        })
    }

    /// Builds the query URL for a reference date.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL cannot be extended.
    pub fn query_url(&self, date: NaiveDate) -> WisaResult<Url> {
        let mut url = Url::parse(&format!(
            "{}/QUERY/{ROSTER_QUERY}",
            self.config.base_url.trim_end_matches('/')
        ))?;

        url.query_pairs_mut()
            .append_pair("werkdatum", &format_reference_date(date))
            .append_pair("instellingsnummer", &self.config.institution_numbers)
            .append_pair("_username_", &self.config.username)
            .append_pair("_password_", self.config.password.expose_secret())
            .append_pair("format", "json");

        Ok(url)
    }

    /// Fetches the roster as of `date`.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, a non-success status or a body
    /// that is not a list of roster records.
    #[instrument(skip(self), fields(date = %date))]
    pub async fn fetch_records(&self, date: NaiveDate) -> WisaResult<Vec<RosterRecord>> {
        let url = self.query_url(date)?;
        debug!("Querying roster");

        let response = self.http_client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(WisaError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let document: serde_json::Value = response
            .json()
            .await
            .map_err(|e| WisaError::Parse(e.without_url().to_string()))?;

        if let Some(path) = &self.config.snapshot_path {
            write_snapshot(path, &document).await;
        }

        let records: Vec<RosterRecord> =
            serde_json::from_value(document).map_err(|e| WisaError::Parse(e.to_string()))?;

        info!(records = records.len(), "Roster loaded");
        Ok(records)
    }
}

#[async_trait]
impl RosterSource for WisaClient {
    async fn fetch_roster(&self) -> SyncResult<Vec<RosterRecord>> {
        let date = reference_date(Local::now().date_naive());
        self.fetch_records(date)
            .await
            .map_err(|e| SyncError::fetch("roster", e.to_string()))
    }
}

async fn write_snapshot(path: &Path, document: &serde_json::Value) {
    let result = async {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let body = serde_json::to_string_pretty(document).map_err(std::io::Error::other)?;
        tokio::fs::write(path, body).await
    }
    .await;

    match result {
        Ok(()) => debug!(path = %path.display(), "Roster snapshot written"),
        Err(error) => warn!(path = %path.display(), %error, "Failed to write roster snapshot"),
    }
}

//! OAuth2 authentication for Google APIs from authorized-user token files.

use chrono::{DateTime, Duration, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use crate::{GoogleError, GoogleResult};

/// Google's OAuth2 token endpoint.
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// OAuth2 client registration, as found in a downloaded client config.
#[derive(Debug, Clone)]
pub struct ClientSecrets {
    pub client_id: String,
    pub client_secret: SecretString,
    pub token_uri: String,
}

#[derive(Deserialize)]
struct ClientSecretsBody {
    client_id: String,
    client_secret: String,
    #[serde(default)]
    token_uri: Option<String>,
}

impl ClientSecrets {
    /// Parses a client config document.
    ///
    /// Accepts the `{"installed": {..}}` and `{"web": {..}}` layouts as well
    /// as a bare object.
    ///
    /// # Errors
    ///
    /// Returns [`GoogleError::Config`] if the document is not a client config.
    pub fn from_json(raw: &str) -> GoogleResult<Self> {
        let value: serde_json::Value = serde_json::from_str(raw)
            .map_err(|e| GoogleError::Config(format!("Invalid client config JSON: {e}")))?;

        let body = value
            .get("installed")
            .or_else(|| value.get("web"))
            .cloned()
            .unwrap_or(value);

        let body: ClientSecretsBody = serde_json::from_value(body)
            .map_err(|e| GoogleError::Config(format!("Invalid client config: {e}")))?;

        Ok(Self {
            client_id: body.client_id,
            client_secret: SecretString::from(body.client_secret),
            token_uri: body
                .token_uri
                .unwrap_or_else(|| DEFAULT_TOKEN_URI.to_string()),
        })
    }
}

/// On-disk authorized-user credentials.
///
/// Unknown fields are preserved when the file is rewritten.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct AuthorizedUser {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    token: Option<String>,
    refresh_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    client_secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    token_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expiry: Option<DateTime<Utc>>,
    #[serde(flatten)]
    extra: serde_json::Map<String, serde_json::Value>,
}

/// OAuth2 token endpoint response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
    #[serde(default)]
    refresh_token: Option<String>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_expired(&self, grace_period: Duration) -> bool {
        Utc::now() + grace_period >= self.expires_at
    }
}

/// Access-token cache backed by an authorized-user token file.
///
/// The access token stored in the file is reused while it is valid; once it
/// is about to expire it is refreshed with the stored refresh token and the
/// file is rewritten.
#[derive(Debug)]
pub struct TokenCache {
    token_file: PathBuf,
    secrets: Option<ClientSecrets>,
    scopes: Vec<String>,
    http_client: reqwest::Client,
    cached_token: Arc<RwLock<Option<CachedToken>>>,
    /// Set after a rejected token; skips the stored access token once.
    force_refresh: AtomicBool,
    /// Grace period before expiry to trigger refresh (default: 5 minutes).
    grace_period: Duration,
}

impl TokenCache {
    /// Creates a token cache for a token file.
    ///
    /// `secrets` supplies the client id and secret when the file does not
    /// carry them.
    pub fn new(
        token_file: impl Into<PathBuf>,
        secrets: Option<ClientSecrets>,
        scopes: Vec<String>,
    ) -> Self {
        Self {
            token_file: token_file.into(),
            secrets,
            scopes,
            http_client: reqwest::Client::new(),
            cached_token: Arc::new(RwLock::new(None)),
            force_refresh: AtomicBool::new(false),
            grace_period: Duration::minutes(5),
        }
    }

    /// Path of the backing token file.
    #[must_use]
    pub fn token_file(&self) -> &Path {
        &self.token_file
    }

    /// Gets a valid access token, refreshing if necessary.
    #[instrument(skip(self), fields(token_file = %self.token_file.display()))]
    pub async fn get_token(&self) -> GoogleResult<String> {
        {
            let cache = self.cached_token.read().await;
            if let Some(ref token) = *cache {
                if !token.is_expired(self.grace_period) {
                    debug!("Using cached token");
                    return Ok(token.access_token.clone());
                }
            }
        }

        let mut stored = self.load().await?;
        let force = self.force_refresh.swap(false, Ordering::SeqCst);

        let token = match stored_token(&stored) {
            Some(token) if !force && !token.is_expired(self.grace_period) => {
                debug!("Using token from file");
                token
            }
            _ => {
                debug!("Refreshing access token");
                let token = self.refresh(&mut stored).await?;
                self.persist(&stored).await;
                token
            }
        };

        {
            let mut cache = self.cached_token.write().await;
            *cache = Some(token.clone());
        }

        Ok(token.access_token)
    }

    /// Invalidates the cached token, forcing a refresh on next use.
    pub async fn invalidate(&self) {
        let mut cache = self.cached_token.write().await;
        *cache = None;
        self.force_refresh.store(true, Ordering::SeqCst);
    }

    async fn load(&self) -> GoogleResult<AuthorizedUser> {
        let path = self.token_file.display().to_string();
        let raw = tokio::fs::read_to_string(&self.token_file)
            .await
            .map_err(|e| GoogleError::token_file(&path, e.to_string()))?;
        serde_json::from_str(&raw).map_err(|e| GoogleError::token_file(&path, e.to_string()))
    }

    async fn persist(&self, stored: &AuthorizedUser) {
        let written = match serde_json::to_string_pretty(stored) {
            Ok(body) => tokio::fs::write(&self.token_file, body)
                .await
                .map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };
        if let Err(error) = written {
            warn!(token_file = %self.token_file.display(), %error, "Failed to persist token file");
        }
    }

    async fn refresh(&self, stored: &mut AuthorizedUser) -> GoogleResult<CachedToken> {
        let client_id = stored
            .client_id
            .clone()
            .or_else(|| self.secrets.as_ref().map(|s| s.client_id.clone()))
            .ok_or_else(|| GoogleError::Auth("No client_id available for refresh".to_string()))?;
        let client_secret = stored
            .client_secret
            .clone()
            .or_else(|| {
                self.secrets
                    .as_ref()
                    .map(|s| s.client_secret.expose_secret().to_string())
            })
            .ok_or_else(|| {
                GoogleError::Auth("No client_secret available for refresh".to_string())
            })?;
        let token_uri = stored
            .token_uri
            .clone()
            .or_else(|| self.secrets.as_ref().map(|s| s.token_uri.clone()))
            .unwrap_or_else(|| DEFAULT_TOKEN_URI.to_string());

        let scope = self.scopes.join(" ");
        let mut params = vec![
            ("grant_type", "refresh_token"),
            ("refresh_token", stored.refresh_token.as_str()),
            ("client_id", client_id.as_str()),
            ("client_secret", client_secret.as_str()),
        ];
        if !scope.is_empty() {
            params.push(("scope", scope.as_str()));
        }

        let response = self
            .http_client
            .post(&token_uri)
            .form(&params)
            .send()
            .await
            .map_err(|e| GoogleError::Auth(format!("Token request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GoogleError::Auth(format!(
                "Token refresh failed with status {status}: {body}"
            )));
        }

        let token_response: TokenResponse = response
            .json()
            .await
            .map_err(|e| GoogleError::Auth(format!("Failed to parse token response: {e}")))?;

        let expires_at = Utc::now() + Duration::seconds(token_response.expires_in);
        info!(
            expires_at = %expires_at.format("%Y-%m-%d %H:%M:%S UTC"),
            "Access token refreshed"
        );

        stored.token = Some(token_response.access_token.clone());
        stored.expiry = Some(expires_at);
        if let Some(refresh_token) = token_response.refresh_token {
            stored.refresh_token = refresh_token;
        }

        Ok(CachedToken {
            access_token: token_response.access_token,
            expires_at,
        })
    }
}

fn stored_token(stored: &AuthorizedUser) -> Option<CachedToken> {
    match (&stored.token, stored.expiry) {
        (Some(token), Some(expiry)) if !token.is_empty() => Some(CachedToken {
            access_token: token.clone(),
            expires_at: expiry,
        }),
        _ => None,
    }
}

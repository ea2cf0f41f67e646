//! Authenticated JSON HTTP client for Google APIs with retry handling.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::{GoogleError, GoogleResult, TokenCache};

/// Public Google APIs host.
pub const DEFAULT_BASE_URL: &str = "https://www.googleapis.com";

/// Google JSON error envelope.
#[derive(Debug, Deserialize)]
pub struct GoogleErrorEnvelope {
    pub error: GoogleErrorBody,
}

/// Body of a Google JSON error.
#[derive(Debug, Deserialize)]
pub struct GoogleErrorBody {
    #[serde(default)]
    pub code: Option<u16>,
    #[serde(default)]
    pub message: String,
}

/// Retry policy for throttled and transient responses.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts (0 = no retries).
    pub max_retries: u32,
    /// Base delay for exponential backoff.
    pub base_delay: Duration,
    /// Maximum delay cap, also applied to `Retry-After`.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (zero-based).
    ///
    /// A server-provided `Retry-After` wins over the exponential schedule.
    #[must_use]
    pub fn delay_for(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        let delay = retry_after.unwrap_or_else(|| {
            self.base_delay
                .saturating_mul(2u32.saturating_pow(attempt))
        });
        delay.min(self.max_delay)
    }
}

/// HTTP client shared by the Google connectors.
#[derive(Debug)]
pub struct GoogleClient {
    http_client: reqwest::Client,
    token_cache: Arc<TokenCache>,
    base_url: String,
    retry: RetryPolicy,
}

impl GoogleClient {
    /// Creates a client for `base_url` (normally [`DEFAULT_BASE_URL`]).
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(token_cache: Arc<TokenCache>, base_url: impl Into<String>) -> GoogleResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| GoogleError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            token_cache,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            retry: RetryPolicy::default(),
        })
    }

    /// Replaces the retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Base URL without trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Performs a GET request and decodes the JSON response.
    #[instrument(skip(self))]
    pub async fn get<T: DeserializeOwned>(&self, url: &str) -> GoogleResult<T> {
        let response = self
            .send(reqwest::Method::GET, url, None::<&()>)
            .await?;
        Ok(response.json().await?)
    }

    /// Performs a POST request and decodes the JSON response.
    #[instrument(skip(self, body))]
    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        url: &str,
        body: &B,
    ) -> GoogleResult<T> {
        let response = self.send(reqwest::Method::POST, url, Some(body)).await?;
        Ok(response.json().await?)
    }

    /// Performs a DELETE request, ignoring any response body.
    #[instrument(skip(self))]
    pub async fn delete(&self, url: &str) -> GoogleResult<()> {
        self.send(reqwest::Method::DELETE, url, None::<&()>)
            .await?;
        Ok(())
    }

    async fn send<B: Serialize>(
        &self,
        method: reqwest::Method,
        url: &str,
        body: Option<&B>,
    ) -> GoogleResult<reqwest::Response> {
        let mut retries = 0u32;
        let mut reauthenticated = false;

        loop {
            let token = self.token_cache.get_token().await?;

            let mut request = self
                .http_client
                .request(method.clone(), url)
                .bearer_auth(&token);
            if let Some(b) = body {
                request = request.json(b);
            }

            let response = request.send().await?;
            let status = response.status();

            if status.is_success() {
                return Ok(response);
            }

            if status == reqwest::StatusCode::UNAUTHORIZED && !reauthenticated {
                debug!("Access token rejected, refreshing");
                self.token_cache.invalidate().await;
                reauthenticated = true;
                continue;
            }

            let retryable = matches!(
                status,
                reqwest::StatusCode::TOO_MANY_REQUESTS
                    | reqwest::StatusCode::BAD_GATEWAY
                    | reqwest::StatusCode::SERVICE_UNAVAILABLE
                    | reqwest::StatusCode::GATEWAY_TIMEOUT
            );

            if retryable && retries < self.retry.max_retries {
                let retry_after = response
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.trim().parse::<u64>().ok())
                    .map(Duration::from_secs);
                let delay = self.retry.delay_for(retries, retry_after);
                retries += 1;
                warn!(
                    status = status.as_u16(),
                    retry = retries,
                    max_retries = self.retry.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    "Transient error, retrying"
                );
                tokio::time::sleep(delay).await;
                continue;
            }

            return Err(error_from_response(response).await);
        }
    }
}

async fn error_from_response(response: reqwest::Response) -> GoogleError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    let message = match serde_json::from_str::<GoogleErrorEnvelope>(&body) {
        Ok(envelope) if !envelope.error.message.is_empty() => envelope.error.message,
        _ if body.is_empty() => format!("HTTP {status}"),
        _ => body,
    };

    GoogleError::Api {
        status: status.as_u16(),
        message,
    }
}

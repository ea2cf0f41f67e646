//! Error types for the WISA connector.

use thiserror::Error;

/// Result type alias using `WisaError`.
pub type WisaResult<T> = Result<T, WisaError>;

/// Errors that can occur when querying WISA.
#[derive(Debug, Error)]
pub enum WisaError {
    /// Configuration validation error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// WISA answered with a non-success status.
    #[error("WISA returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The response is not a roster document.
    #[error("Failed to parse roster: {0}")]
    Parse(String),

    /// HTTP transport error, without the request URL.
    #[error("HTTP error: {0}")]
    Http(reqwest::Error),

    /// URL parsing error.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

impl From<reqwest::Error> for WisaError {
    /// The query URL carries the credentials and is never kept.
    fn from(error: reqwest::Error) -> Self {
        Self::Http(error.without_url())
    }
}

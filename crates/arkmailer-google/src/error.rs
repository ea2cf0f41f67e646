//! Error types for the Google connectors.

use thiserror::Error;

/// Result type alias using `GoogleError`.
pub type GoogleResult<T> = Result<T, GoogleError>;

/// Errors that can occur when talking to Google APIs.
#[derive(Debug, Error)]
pub enum GoogleError {
    /// Configuration validation error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// OAuth2 token acquisition or refresh failed.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// The authorized-user token file is missing or unreadable.
    #[error("Token file {path}: {message}")]
    TokenFile { path: String, message: String },

    /// Google API returned an error response.
    #[error("Google API error {status}: {message}")]
    Api { status: u16, message: String },

    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing error.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

impl GoogleError {
    /// HTTP status of an API error, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Whether the API reported 404 Not Found.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Whether the API reported 409 Conflict.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        self.status() == Some(409)
    }

    pub(crate) fn token_file(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::TokenFile {
            path: path.into(),
            message: message.into(),
        }
    }
}

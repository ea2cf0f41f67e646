//! Google Workspace connectors for arkmailer
//!
//! Implements the arkmailer-core boundary traits against the Admin SDK
//! Directory API and the Gmail API.
//!
//! # Features
//!
//! - `OAuth2` refresh of authorized-user token files
//! - Paginated group and member enumeration
//! - Status-classified membership changes (409 already member, 404 unknown)
//! - Retry of throttled and transient responses honoring `Retry-After`
//! - Plain-text report delivery
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use arkmailer_core::{GroupKeyDeriver, ObservedStateSource};
//! use arkmailer_google::{DirectoryClient, GoogleClient, TokenCache, DEFAULT_BASE_URL};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let tokens = Arc::new(TokenCache::new("tokendir.json", None, vec![]));
//! let client = Arc::new(GoogleClient::new(tokens, DEFAULT_BASE_URL)?);
//! let directory = DirectoryClient::new(
//!     client,
//!     GroupKeyDeriver::new("school.be", "ouders", ["arkls-", "arkks-"]),
//! );
//! let observed = directory.fetch_observed().await?;
//! # Ok(())
//! # }
//! ```

mod auth;
mod client;
mod directory;
mod error;
mod gmail;

pub use auth::{ClientSecrets, TokenCache, DEFAULT_TOKEN_URI};
pub use client::{GoogleClient, RetryPolicy, DEFAULT_BASE_URL};
pub use directory::{DirectoryClient, MY_CUSTOMER};
pub use error::{GoogleError, GoogleResult};
pub use gmail::GmailSender;

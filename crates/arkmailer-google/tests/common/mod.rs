//! Common test utilities for arkmailer-google integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use arkmailer_core::GroupKeyDeriver;
use arkmailer_google::{DirectoryClient, GoogleClient, RetryPolicy, TokenCache};
use chrono::{Duration as ChronoDuration, Utc};
use serde_json::{json, Value};
use tempfile::TempDir;
use wiremock::MockServer;

pub const ACCESS_TOKEN: &str = "test-access-token";

/// Writes an authorized-user token file whose access token is still valid.
pub fn write_valid_token_file(dir: &Path, token_uri: &str) -> PathBuf {
    write_token_file(
        dir,
        json!({
            "token": ACCESS_TOKEN,
            "refresh_token": "test-refresh-token",
            "client_id": "client-id",
            "client_secret": "client-secret",
            "token_uri": token_uri,
            "scopes": ["https://www.googleapis.com/auth/admin.directory.group"],
            "expiry": (Utc::now() + ChronoDuration::hours(1)).to_rfc3339(),
        }),
    )
}

/// Writes an authorized-user token file whose access token has expired.
pub fn write_expired_token_file(dir: &Path, token_uri: &str) -> PathBuf {
    write_token_file(
        dir,
        json!({
            "token": "stale-token",
            "refresh_token": "test-refresh-token",
            "client_id": "client-id",
            "client_secret": "client-secret",
            "token_uri": token_uri,
            "expiry": (Utc::now() - ChronoDuration::minutes(1)).to_rfc3339(),
        }),
    )
}

pub fn write_token_file(dir: &Path, content: Value) -> PathBuf {
    let path = dir.join("token.json");
    std::fs::write(&path, serde_json::to_string_pretty(&content).unwrap()).unwrap();
    path
}

/// Retry policy without waiting.
pub fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_retries: 3,
        base_delay: Duration::ZERO,
        max_delay: Duration::ZERO,
    }
}

/// Builds a client for the mock server with a valid token file.
pub fn google_client(server: &MockServer, dir: &TempDir) -> Arc<GoogleClient> {
    let token_file = write_valid_token_file(dir.path(), &format!("{}/token", server.uri()));
    let tokens = Arc::new(TokenCache::new(token_file, None, vec![]));
    Arc::new(
        GoogleClient::new(tokens, server.uri())
            .unwrap()
            .with_retry_policy(fast_retry()),
    )
}

pub fn directory_client(server: &MockServer, dir: &TempDir) -> DirectoryClient {
    DirectoryClient::new(
        google_client(server, dir),
        GroupKeyDeriver::new("deark.be", "ouders", ["arkls-", "arkks-"]),
    )
}

pub fn group_json(email: &str) -> Value {
    json!({
        "kind": "admin#directory#group",
        "id": format!("id-{email}"),
        "email": email,
        "name": email.split('.').next().unwrap_or_default(),
    })
}

pub fn member_json(email: &str) -> Value {
    json!({
        "kind": "admin#directory#member",
        "email": email,
        "role": "MEMBER",
        "type": "USER",
        "status": "ACTIVE",
    })
}

pub fn google_error(code: u16, message: &str) -> Value {
    json!({
        "error": {
            "code": code,
            "message": message,
            "errors": [{"domain": "global", "message": message}],
        }
    })
}

//! Report delivery through the Gmail API.

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};

use arkmailer_core::{Report, ReportSink, SyncError, SyncResult};

use crate::GoogleClient;

#[derive(Debug, Serialize)]
struct SendRequest {
    raw: String,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    #[serde(default)]
    id: Option<String>,
}

/// Sends reports as plain-text mail from the authenticated account.
#[derive(Debug)]
pub struct GmailSender {
    client: Arc<GoogleClient>,
    from: String,
    to: String,
}

impl GmailSender {
    /// Creates a sender with the report envelope addresses.
    pub fn new(client: Arc<GoogleClient>, from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            client,
            from: from.into(),
            to: to.into(),
        }
    }

    /// Renders a report as an RFC 822 message.
    #[must_use]
    pub fn render_message(&self, report: &Report) -> String {
        let body = report.body.replace("\r\n", "\n").replace('\n', "\r\n");
        format!(
            "From: {}\r\nTo: {}\r\nSubject: {}\r\nMIME-Version: 1.0\r\n\
             Content-Type: text/plain; charset=\"utf-8\"\r\n\
             Content-Transfer-Encoding: 8bit\r\n\r\n{body}",
            self.from,
            self.to,
            encode_header(&report.subject),
        )
    }
}

/// Encodes a header value as an RFC 2047 word when it is not plain ASCII.
fn encode_header(value: &str) -> String {
    if value.is_ascii() {
        value.to_string()
    } else {
        format!(
            "=?utf-8?B?{}?=",
            base64::engine::general_purpose::STANDARD.encode(value)
        )
    }
}

#[async_trait]
impl ReportSink for GmailSender {
    #[instrument(skip(self, report), fields(to = %self.to))]
    async fn deliver(&self, report: &Report) -> SyncResult<()> {
        let url = format!("{}/gmail/v1/users/me/messages/send", self.client.base_url());
        let request = SendRequest {
            raw: URL_SAFE.encode(self.render_message(report)),
        };

        let sent: SentMessage = self
            .client
            .post(&url, &request)
            .await
            .map_err(|e| SyncError::report(e.to_string()))?;

        info!(
            message_id = sent.id.as_deref().unwrap_or("unknown"),
            "Report sent"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_header() {
        assert_eq!(encode_header("Sync Report"), "Sync Report");
        assert_eq!(encode_header("Ä"), "=?utf-8?B?w4Q=?=");
    }
}

//! Slack Web API transport.
//!
//! Posts messages with `chat.postMessage` using a bot token.

use super::{NotificationTransport, PostResponse};
use crate::error::{MonitorError, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Default timeout for API requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Slack Web API base URL.
const SLACK_API_URL: &str = "https://slack.com/api/";

/// Slack Web API client.
///
/// The HTTP client is built per post, so a client that cannot be created
/// surfaces as a delivery failure rather than at construction.
#[derive(Debug, Clone)]
pub struct SlackTransport {
    api_url: String,
    timeout: Duration,
}

impl SlackTransport {
    /// Creates a transport against the public Slack API.
    pub fn new() -> Self {
        Self::with_api_url(SLACK_API_URL)
    }

    /// Creates a transport against a custom API base URL (e.g. a proxy).
    pub fn with_api_url(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    fn client(&self) -> Result<Client> {
        Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| MonitorError::notification(format!("client_error ({e})")))
    }

    fn method_url(&self, method: &str) -> Result<Url> {
        Url::parse(&self.api_url)
            .and_then(|base| base.join(method))
            .map_err(|e| MonitorError::notification(format!("invalid_api_url ({e})")))
    }

    /// Maps an HTTP status to a Slack-style error code.
    fn status_code(status: StatusCode) -> String {
        match status {
            StatusCode::TOO_MANY_REQUESTS => "ratelimited".to_string(),
            StatusCode::UNAUTHORIZED => "not_authed".to_string(),
            other => format!("http_{}", other.as_u16()),
        }
    }
}

impl Default for SlackTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NotificationTransport for SlackTransport {
    async fn post_message(&self, token: &str, channel: &str, text: &str) -> Result<PostResponse> {
        let url = self.method_url("chat.postMessage")?;
        let client = self.client()?;
        debug!("Posting {} bytes to {}", text.len(), channel);

        let response = client
            .post(url)
            .bearer_auth(token)
            .json(&ChatPostMessage { channel, text })
            .send()
            .await
            .map_err(|e| MonitorError::notification(format!("request_failed ({e})")))?;

        let status = response.status();
        if !status.is_success() {
            warn!("Slack API returned HTTP {}", status);
            return Err(MonitorError::notification(Self::status_code(status)));
        }

        let body: ChatPostMessageResponse = response
            .json()
            .await
            .map_err(|e| MonitorError::notification(format!("invalid_response ({e})")))?;

        Ok(PostResponse {
            ok: body.ok,
            error: body.error,
        })
    }
}

#[derive(Serialize)]
struct ChatPostMessage<'a> {
    channel: &'a str,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatPostMessageResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

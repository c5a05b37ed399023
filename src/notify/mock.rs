//! Mock notification transport for testing.

use super::{NotificationTransport, PostResponse};
use crate::error::{MonitorError, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// A message handed to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostedMessage {
    pub token: String,
    pub channel: String,
    pub text: String,
}

/// Records posted messages and answers with a scripted response.
#[derive(Debug, Clone)]
pub struct MockTransport {
    response: PostResponse,
    failure: Option<String>,
    posted: Arc<Mutex<Vec<PostedMessage>>>,
}

impl MockTransport {
    /// Creates a transport that accepts every message.
    pub fn new() -> Self {
        Self {
            response: PostResponse::ok(),
            failure: None,
            posted: Arc::default(),
        }
    }

    /// Answers every post with `response`.
    pub fn respond(mut self, response: PostResponse) -> Self {
        self.response = response;
        self
    }

    /// Fails every post at the transport level with `code`.
    pub fn failing(mut self, code: impl Into<String>) -> Self {
        self.failure = Some(code.into());
        self
    }

    /// Returns every message posted so far.
    pub fn posted(&self) -> Vec<PostedMessage> {
        self.posted
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NotificationTransport for MockTransport {
    async fn post_message(&self, token: &str, channel: &str, text: &str) -> Result<PostResponse> {
        self.posted
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(PostedMessage {
                token: token.to_string(),
                channel: channel.to_string(),
                text: text.to_string(),
            });

        match &self.failure {
            Some(code) => Err(MonitorError::notification(code.clone())),
            None => Ok(self.response.clone()),
        }
    }
}

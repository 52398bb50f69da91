use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_API_BASE_URL: &str = "https://slack.com/api";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error("slack api `{method}` rejected the call: {reason}")]
    Api { method: String, reason: String },
    #[error("slack api `{method}` transport failure: {reason}")]
    Transport { method: String, reason: String },
}

/// Outbound Slack Web API surface used by the bot.
///
/// Failures are reported as values and consumed by the caller; nothing in
/// this crate lets a platform call failure terminate event processing.
#[async_trait]
pub trait SlackClient: Send + Sync {
    /// `reactions.add`: attach `name` (colon-free marker) to the message
    /// identified by `channel_id` + `timestamp`.
    async fn add_reaction(
        &self,
        channel_id: &str,
        timestamp: &str,
        name: &str,
    ) -> Result<(), ClientError>;

    /// `conversations.join`
    async fn join_channel(&self, channel_id: &str) -> Result<(), ClientError>;

    /// `conversations.leave`
    async fn leave_channel(&self, channel_id: &str) -> Result<(), ClientError>;
}

/// Slack's uniform response envelope.
#[derive(Debug, Deserialize)]
struct ApiEnvelope {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

/// reqwest-backed client posting form-encoded bodies with a bearer token.
pub struct HttpSlackClient {
    http: reqwest::Client,
    bot_token: SecretString,
    base_url: String,
}

impl HttpSlackClient {
    pub fn new(bot_token: SecretString) -> Self {
        Self::with_base_url(bot_token, DEFAULT_API_BASE_URL)
    }

    pub fn with_base_url(bot_token: SecretString, base_url: impl Into<String>) -> Self {
        Self { http: reqwest::Client::new(), bot_token, base_url: base_url.into() }
    }

    async fn call(&self, method: &str, form: &[(&str, &str)]) -> Result<(), ClientError> {
        let url = format!("{}/{method}", self.base_url);
        let response = self
            .http
            .post(&url)
            .bearer_auth(self.bot_token.expose_secret())
            .form(form)
            .send()
            .await
            .map_err(|error| ClientError::Transport {
                method: method.to_owned(),
                reason: error.to_string(),
            })?;

        let envelope: ApiEnvelope =
            response.json().await.map_err(|error| ClientError::Transport {
                method: method.to_owned(),
                reason: format!("invalid response body: {error}"),
            })?;

        if envelope.ok {
            Ok(())
        } else {
            Err(ClientError::Api {
                method: method.to_owned(),
                reason: envelope.error.unwrap_or_else(|| "unknown_error".to_owned()),
            })
        }
    }
}

#[async_trait]
impl SlackClient for HttpSlackClient {
    async fn add_reaction(
        &self,
        channel_id: &str,
        timestamp: &str,
        name: &str,
    ) -> Result<(), ClientError> {
        self.call(
            "reactions.add",
            &[("channel", channel_id), ("timestamp", timestamp), ("name", name)],
        )
        .await
    }

    async fn join_channel(&self, channel_id: &str) -> Result<(), ClientError> {
        self.call("conversations.join", &[("channel", channel_id)]).await
    }

    async fn leave_channel(&self, channel_id: &str) -> Result<(), ClientError> {
        self.call("conversations.leave", &[("channel", channel_id)]).await
    }
}

//! Workspace API client
//!
//! Every call returns `{ok: bool, ...}`. A non-ok envelope is turned into
//! `MonitorError::RemoteRejection` so callers treat it exactly like a
//! transport failure.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

use super::types::{AuthInfo, BotInfo, Channel, Message, UserGroup, UserInfo};
use crate::config::MonitorConfig;
use crate::error::{MonitorError, Result};

/// The remote calls the monitoring core depends on
#[async_trait]
pub trait WorkspaceApi: Send + Sync {
    /// Identity handshake for the token
    async fn auth_test(&self) -> Result<AuthInfo>;

    /// Public and private channels the account is a member of
    async fn member_channels(&self) -> Result<Vec<Channel>>;

    /// Direct-message conversations
    async fn direct_conversations(&self, limit: u32) -> Result<Vec<Channel>>;

    /// Channel history, newest first; `oldest` is exclusive
    async fn history(&self, channel_id: &str, oldest: Option<f64>, limit: u32) -> Result<Vec<Message>>;

    /// Thread parent followed by its replies
    async fn replies(&self, channel_id: &str, thread_ts: &str) -> Result<Vec<Message>>;

    async fn user_info(&self, user_id: &str) -> Result<UserInfo>;

    async fn bot_info(&self, bot_id: &str) -> Result<BotInfo>;

    /// The whole member directory in one call
    async fn list_members(&self) -> Result<Vec<UserInfo>>;

    /// Every user group (handles only, no members)
    async fn list_user_groups(&self) -> Result<Vec<UserGroup>>;

    async fn user_group_members(&self, group_id: &str) -> Result<Vec<String>>;
}

/// Builds a client bound to one account token
pub trait ApiFactory: Send + Sync {
    fn client(&self, token: &str) -> Result<Arc<dyn WorkspaceApi>>;
}

/// Format a watermark the way the API expects its `oldest` parameter
pub fn format_ts(ts: f64) -> String {
    format!("{:.6}", ts)
}

pub struct SlackClient {
    client: Client,
    base_url: String,
}

impl SlackClient {
    pub fn new(token: &str, config: &MonitorConfig) -> Result<Self> {
        let token = token.trim();
        if token.is_empty() {
            return Err(MonitorError::Configuration("API token is required".to_string()));
        }

        let mut auth = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| MonitorError::Configuration("API token contains invalid characters".to_string()))?;
        auth.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        let client = Client::builder()
            .default_headers(headers)
            .connect_timeout(config.connect_timeout())
            .timeout(config.read_timeout())
            .build()
            .map_err(|e| MonitorError::Configuration(format!("Cannot create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn call(&self, method: &str, params: &[(&str, String)]) -> Result<Value> {
        let url = format!("{}/{}", self.base_url, method);
        let start = Instant::now();

        let response = self.client.get(&url).query(params).send().await?;
        let body: Value = response.json().await?;

        debug!(
            method = %method,
            elapsed_ms = start.elapsed().as_millis(),
            "Workspace API call completed"
        );

        check_envelope(method, body)
    }
}

/// Accept an `ok: true` envelope, reject everything else
pub fn check_envelope(method: &str, body: Value) -> Result<Value> {
    if body.get("ok").and_then(Value::as_bool) == Some(true) {
        return Ok(body);
    }
    let error = body
        .get("error")
        .and_then(Value::as_str)
        .unwrap_or("unknown_error");
    Err(MonitorError::rejection(method, error))
}

/// Take one field out of an envelope, defaulting when absent
fn take_field<T: DeserializeOwned + Default>(body: &mut Value, key: &str) -> Result<T> {
    match body.get_mut(key).map(Value::take) {
        Some(Value::Null) | None => Ok(T::default()),
        Some(value) => Ok(serde_json::from_value(value)?),
    }
}

fn with_channel(mut messages: Vec<Message>, channel_id: &str) -> Vec<Message> {
    for message in &mut messages {
        message.channel_id = channel_id.to_string();
    }
    messages
}

#[async_trait]
impl WorkspaceApi for SlackClient {
    async fn auth_test(&self) -> Result<AuthInfo> {
        let body = self.call("auth.test", &[]).await?;
        Ok(serde_json::from_value(body)?)
    }

    async fn member_channels(&self) -> Result<Vec<Channel>> {
        let mut body = self
            .call("users.conversations", &[("types", "public_channel,private_channel".to_string())])
            .await?;
        take_field(&mut body, "channels")
    }

    async fn direct_conversations(&self, limit: u32) -> Result<Vec<Channel>> {
        let mut body = self
            .call("conversations.list", &[("types", "im".to_string()), ("limit", limit.to_string())])
            .await?;
        take_field(&mut body, "channels")
    }

    async fn history(&self, channel_id: &str, oldest: Option<f64>, limit: u32) -> Result<Vec<Message>> {
        let mut params = vec![("channel", channel_id.to_string()), ("limit", limit.to_string())];
        if let Some(oldest) = oldest {
            params.push(("oldest", format_ts(oldest)));
        }
        let mut body = self.call("conversations.history", &params).await?;
        Ok(with_channel(take_field(&mut body, "messages")?, channel_id))
    }

    async fn replies(&self, channel_id: &str, thread_ts: &str) -> Result<Vec<Message>> {
        let mut body = self
            .call(
                "conversations.replies",
                &[("channel", channel_id.to_string()), ("ts", thread_ts.to_string())],
            )
            .await?;
        Ok(with_channel(take_field(&mut body, "messages")?, channel_id))
    }

    async fn user_info(&self, user_id: &str) -> Result<UserInfo> {
        let mut body = self.call("users.info", &[("user", user_id.to_string())]).await?;
        take_field(&mut body, "user")
    }

    async fn bot_info(&self, bot_id: &str) -> Result<BotInfo> {
        let mut body = self.call("bots.info", &[("bot", bot_id.to_string())]).await?;
        take_field(&mut body, "bot")
    }

    async fn list_members(&self) -> Result<Vec<UserInfo>> {
        let mut body = self.call("users.list", &[]).await?;
        take_field(&mut body, "members")
    }

    async fn list_user_groups(&self) -> Result<Vec<UserGroup>> {
        let mut body = self
            .call("usergroups.list", &[("include_users", "false".to_string())])
            .await?;
        take_field(&mut body, "usergroups")
    }

    async fn user_group_members(&self, group_id: &str) -> Result<Vec<String>> {
        let mut body = self
            .call("usergroups.users.list", &[("usergroup", group_id.to_string())])
            .await?;
        take_field(&mut body, "users")
    }
}

/// Produces `SlackClient`s sharing one configuration
pub struct SlackClientFactory {
    config: MonitorConfig,
}

impl SlackClientFactory {
    pub fn new(config: MonitorConfig) -> Self {
        Self { config }
    }
}

impl ApiFactory for SlackClientFactory {
    fn client(&self, token: &str) -> Result<Arc<dyn WorkspaceApi>> {
        Ok(Arc::new(SlackClient::new(token, &self.config)?))
    }
}

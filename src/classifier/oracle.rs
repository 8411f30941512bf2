//! Semantic oracle stage
//!
//! Sends `(text, sender, channel)` to the Anthropic Messages API and expects
//! a single `{"priority": ..., "reason": ...}` object back. Any failure is
//! reported as `ClassifierUnavailable`; the caller falls back to the keyword
//! result.
//!
//! Credentials: `ANTHROPIC_API_KEY`, optional `ANTHROPIC_BASE_URL`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use super::priority::{Classification, Priority};
use crate::error::{MonitorError, Result};

pub const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
pub const ANTHROPIC_VERSION: &str = "2023-06-01";
/// Fastest model, classification is latency bound
pub const DEFAULT_MODEL: &str = "claude-haiku-4-5-20251001";
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_MAX_TOKENS: u32 = 200;

/// Text-in, tier-out external classifier
#[async_trait]
pub trait PriorityOracle: Send + Sync {
    async fn classify(&self, text: &str, sender: &str, channel: &str) -> Result<Classification>;
}

#[derive(Debug, Clone)]
pub struct OracleConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub timeout_ms: u64,
    pub max_tokens: u32,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: ANTHROPIC_API_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

impl OracleConfig {
    /// Read credentials from the environment, `None` when no key is set
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("ANTHROPIC_API_KEY").ok().filter(|k| !k.trim().is_empty())?;
        let base_url = std::env::var("ANTHROPIC_BASE_URL")
            .ok()
            .filter(|u| !u.is_empty())
            .map(|u| messages_url(&u))
            .unwrap_or_else(|| ANTHROPIC_API_URL.to_string());
        debug!(base_url = %base_url, "Using ANTHROPIC_API_KEY from environment");
        Some(Self {
            api_key: api_key.trim().to_string(),
            base_url,
            ..Self::default()
        })
    }
}

/// Normalise a base URL so it ends with `/v1/messages`
pub fn messages_url(base: &str) -> String {
    let base = base.trim_end_matches('/');
    if base.ends_with("/v1/messages") {
        base.to_string()
    } else if base.ends_with("/v1") {
        format!("{}/messages", base)
    } else {
        format!("{}/v1/messages", base)
    }
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<RequestMessage>,
}

#[derive(Serialize)]
struct RequestMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    content_type: String,
    text: Option<String>,
}

#[derive(Deserialize)]
struct OracleVerdict {
    priority: String,
    #[serde(default)]
    reason: String,
}

fn build_prompt(text: &str, sender: &str, channel: &str) -> String {
    format!(
        r#"Classify the priority of this workspace chat message.

Message: "{text}"
Sender: {sender}
Channel: {channel}

Tiers:
- critical: needs action now (bug, outage, customer complaint, urgent request)
- high: needs a quick answer (feedback request, approval request, important question)
- normal: regular message (information sharing, updates)
- low: low priority (small talk, trivia)

Answer with this JSON only, no other text:
{{"priority": "critical|high|normal|low", "reason": "one-line reason"}}"#
    )
}

/// Cut the outermost `{...}` out of a model answer
pub fn extract_json_from_output(output: &str) -> Option<&str> {
    let start = output.find('{')?;
    let end = output.rfind('}')?;
    if end > start {
        Some(&output[start..=end])
    } else {
        None
    }
}

/// Parse a model answer into a classification
pub fn parse_verdict(output: &str) -> Result<Classification> {
    let json = extract_json_from_output(output)
        .ok_or_else(|| MonitorError::ClassifierUnavailable("no JSON object in answer".to_string()))?;
    let verdict: OracleVerdict = serde_json::from_str(json)
        .map_err(|e| MonitorError::ClassifierUnavailable(format!("malformed answer: {}", e)))?;
    let priority = Priority::parse(&verdict.priority).ok_or_else(|| {
        MonitorError::ClassifierUnavailable(format!("unknown tier: {}", verdict.priority))
    })?;
    Ok(Classification::new(priority, verdict.reason.trim()))
}

pub struct AnthropicOracle {
    client: reqwest::Client,
    config: OracleConfig,
}

impl AnthropicOracle {
    pub fn new(config: OracleConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(MonitorError::ClassifierUnavailable("no API key".to_string()));
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| MonitorError::ClassifierUnavailable(format!("Cannot create HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }

    /// Build from the environment, `None` when the oracle is not configured
    pub fn from_env() -> Option<Self> {
        let config = OracleConfig::from_env()?;
        match Self::new(config) {
            Ok(oracle) => Some(oracle),
            Err(e) => {
                warn!(error = %e, "Oracle disabled");
                None
            }
        }
    }

    async fn complete(&self, prompt: String) -> Result<String> {
        let request = MessagesRequest {
            model: &self.config.model,
            max_tokens: self.config.max_tokens,
            messages: vec![RequestMessage {
                role: "user",
                content: prompt,
            }],
        };

        let start = Instant::now();
        let response = self
            .client
            .post(&self.config.base_url)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                MonitorError::ClassifierUnavailable(format!(
                    "request failed after {}ms: {}",
                    start.elapsed().as_millis(),
                    e
                ))
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| MonitorError::ClassifierUnavailable(format!("Failed to read response: {}", e)))?;
        debug!(elapsed_ms = start.elapsed().as_millis(), status = %status, "Oracle request completed");

        if !status.is_success() {
            return Err(MonitorError::ClassifierUnavailable(format!("API error ({})", status)));
        }

        let response: MessagesResponse = serde_json::from_str(&body)
            .map_err(|e| MonitorError::ClassifierUnavailable(format!("Failed to parse response: {}", e)))?;

        Ok(response
            .content
            .into_iter()
            .filter(|c| c.content_type == "text")
            .filter_map(|c| c.text)
            .collect::<Vec<_>>()
            .join(""))
    }
}

#[async_trait]
impl PriorityOracle for AnthropicOracle {
    async fn classify(&self, text: &str, sender: &str, channel: &str) -> Result<Classification> {
        let answer = self.complete(build_prompt(text, sender, channel)).await?;
        parse_verdict(&answer)
    }
}

//! Notification event emitted by the monitoring loop

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::classifier::{Classification, Priority};

/// Why a message became a notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "code")]
pub enum MentionReason {
    #[serde(rename = "direct mention")]
    DirectMention,
    #[serde(rename = "broadcast mention")]
    Broadcast,
    #[serde(rename = "group mention")]
    GroupMention { handle: String },
    #[serde(rename = "watched user mention")]
    WatchedUser,
    #[serde(rename = "direct message")]
    DirectMessage,
}

impl std::fmt::Display for MentionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MentionReason::GroupMention { handle } => write!(f, "{} (@{})", self.code(), handle),
            _ => write!(f, "{}", self.code()),
        }
    }
}

impl MentionReason {
    pub fn code(&self) -> &'static str {
        match self {
            MentionReason::DirectMention => "direct mention",
            MentionReason::Broadcast => "broadcast mention",
            MentionReason::GroupMention { .. } => "group mention",
            MentionReason::WatchedUser => "watched user mention",
            MentionReason::DirectMessage => "direct message",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub channel_name: String,
    pub channel_id: String,
    pub sender_display_name: String,
    /// Message text with mentions resolved to display names
    pub text: String,
    pub timestamp: f64,
    /// Workspace timestamp as sent by the API
    pub ts: String,
    /// Local wall-clock time, `%Y-%m-%d %H:%M:%S`
    pub time: String,
    pub reason: MentionReason,
    pub priority: Priority,
    pub priority_reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permalink: Option<String>,
}

impl NotificationEvent {
    pub fn builder() -> NotificationEventBuilder {
        NotificationEventBuilder::default()
    }

    pub fn reason_code(&self) -> &'static str {
        self.reason.code()
    }
}

/// Format a workspace timestamp as local time
pub fn local_time(timestamp: f64) -> String {
    let secs = timestamp.trunc() as i64;
    let nanos = ((timestamp.fract() * 1e9) as u32).min(999_999_999);
    DateTime::from_timestamp(secs, nanos)
        .map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_default()
}

#[derive(Debug, Default)]
pub struct NotificationEventBuilder {
    channel_id: Option<String>,
    channel_name: Option<String>,
    sender: Option<String>,
    text: String,
    ts: Option<String>,
    reason: Option<MentionReason>,
    classification: Option<Classification>,
    permalink: Option<String>,
}

impl NotificationEventBuilder {
    pub fn channel(mut self, id: impl Into<String>, name: impl Into<String>) -> Self {
        self.channel_id = Some(id.into());
        self.channel_name = Some(name.into());
        self
    }

    pub fn sender(mut self, display_name: impl Into<String>) -> Self {
        self.sender = Some(display_name.into());
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn ts(mut self, ts: impl Into<String>) -> Self {
        self.ts = Some(ts.into());
        self
    }

    pub fn reason(mut self, reason: MentionReason) -> Self {
        self.reason = Some(reason);
        self
    }

    pub fn classification(mut self, classification: Classification) -> Self {
        self.classification = Some(classification);
        self
    }

    pub fn permalink(mut self, permalink: Option<String>) -> Self {
        self.permalink = permalink;
        self
    }

    pub fn build(self) -> Result<NotificationEvent, &'static str> {
        let channel_id = self.channel_id.ok_or("channel is required")?;
        let ts = self.ts.ok_or("ts is required")?;
        let reason = self.reason.ok_or("reason is required")?;
        let timestamp: f64 = ts.parse().map_err(|_| "ts is not a number")?;
        let classification = self
            .classification
            .unwrap_or_else(|| Classification::new(Priority::Normal, crate::classifier::DEFAULT_REASON));

        Ok(NotificationEvent {
            channel_name: self.channel_name.unwrap_or_else(|| channel_id.clone()),
            channel_id,
            sender_display_name: self.sender.unwrap_or_else(|| crate::identity::UNKNOWN.to_string()),
            text: self.text,
            timestamp,
            time: local_time(timestamp),
            ts,
            reason,
            priority: classification.priority,
            priority_reason: classification.reason,
            permalink: self.permalink,
        })
    }
}

/// The three samples queued by the test-notification path
pub fn sample_events(now: f64) -> Vec<NotificationEvent> {
    let ts = format!("{:.6}", now);
    let sample = |channel_id: &str, channel: &str, sender: &str, text: &str, reason: MentionReason| {
        NotificationEvent {
            channel_name: channel.to_string(),
            channel_id: channel_id.to_string(),
            sender_display_name: sender.to_string(),
            text: text.to_string(),
            timestamp: now,
            ts: ts.clone(),
            time: local_time(now),
            reason,
            priority: Priority::Normal,
            priority_reason: "test notification".to_string(),
            permalink: None,
        }
    };

    vec![
        sample(
            "C123456",
            "test-channel",
            "Test User",
            "@you Test mention! Checking that live notifications arrive.",
            MentionReason::DirectMention,
        ),
        sample(
            "C789012",
            "general",
            "Chulsoo Kim",
            "@channel Announcement for everyone.",
            MentionReason::Broadcast,
        ),
        sample(
            "D345678",
            "DM from Younghee Lee",
            "Younghee Lee",
            "Hello! This is a DM test message.",
            MentionReason::DirectMessage,
        ),
    ]
}

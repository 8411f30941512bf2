//! Starred messages: a per-account bookmark list

use serde::{Deserialize, Serialize};

use crate::error::{MonitorError, Result};
use crate::identity::EnrichedMessage;

/// A bookmarked message, copied at the time it was starred
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StarredMessage {
    /// `{channel_id}_{ts}`
    pub message_id: String,
    pub channel_id: String,
    #[serde(default)]
    pub channel_name: String,
    pub ts: String,
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permalink: Option<String>,
    /// Unix seconds
    #[serde(default)]
    pub starred_at: f64,
}

impl StarredMessage {
    pub fn from_enriched(
        message: &EnrichedMessage,
        channel_name: &str,
        permalink: Option<String>,
        starred_at: f64,
    ) -> Self {
        Self {
            message_id: message.message.id(),
            channel_id: message.message.channel_id.clone(),
            channel_name: channel_name.to_string(),
            ts: message.message.ts.clone(),
            user_name: message.display_name.clone(),
            text: message.display_text.clone(),
            permalink,
            starred_at,
        }
    }
}

/// Starred messages in the order they were starred
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StarredList(pub Vec<StarredMessage>);

impl StarredList {
    pub fn contains(&self, message_id: &str) -> bool {
        self.0.iter().any(|m| m.message_id == message_id)
    }

    /// Append unless already starred; returns whether the list changed
    pub fn add(&mut self, message: StarredMessage) -> bool {
        if self.contains(&message.message_id) {
            return false;
        }
        self.0.push(message);
        true
    }

    pub fn remove(&mut self, message_id: &str) -> Result<()> {
        let before = self.0.len();
        self.0.retain(|m| m.message_id != message_id);
        if self.0.len() == before {
            return Err(MonitorError::NotFound(format!("{} is not starred", message_id)));
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StarredMessage> {
        self.0.iter()
    }
}

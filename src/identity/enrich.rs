//! Enriched message views
//!
//! Enrichment never mutates the fetched `Message`; it builds a new view from
//! the message and a snapshot of resolved identities.

use serde::Serialize;
use std::collections::HashMap;

use super::display::{bot_display_name, display_name_of, UNKNOWN};
use super::resolver::IdentityResolver;
use super::tokens::mentioned_user_ids;
use crate::slack::{BotInfo, Message, Sender, UserInfo};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedMessage {
    #[serde(flatten)]
    pub message: Message,
    /// Text with `<@id>` tokens replaced by display names
    pub display_text: String,
    pub display_name: String,
    pub is_bot: bool,
    pub has_thread: bool,
}

/// Identities resolved for a page of messages
#[derive(Debug, Default, Clone)]
pub struct IdentitySnapshot {
    pub users: HashMap<String, UserInfo>,
    pub bots: HashMap<String, BotInfo>,
}

impl IdentitySnapshot {
    /// Sender name and bot flag for a message
    pub fn sender_of(&self, message: &Message) -> (String, bool) {
        match message.sender() {
            Sender::User(user_id) => match self.users.get(user_id) {
                Some(user) => (display_name_of(user), user.is_bot),
                None => (UNKNOWN.to_string(), false),
            },
            Sender::Bot(bot_id) => {
                let bot = self.bots.get(bot_id).cloned().unwrap_or_default();
                (bot_display_name(&bot, message.username.as_deref()), true)
            }
            Sender::Username(name) => (name.to_string(), true),
            Sender::Unknown => (UNKNOWN.to_string(), false),
        }
    }
}

/// Resolve every author and mentioned user of a page in two parallel batches
pub async fn snapshot_for(resolver: &IdentityResolver, messages: &[Message]) -> IdentitySnapshot {
    let mut user_ids = Vec::new();
    let mut bot_ids = Vec::new();
    for message in messages {
        match message.sender() {
            Sender::User(id) => user_ids.push(id.to_string()),
            Sender::Bot(id) => bot_ids.push(id.to_string()),
            _ => {}
        }
        user_ids.extend(mentioned_user_ids(&message.text));
    }

    let (users, bots) = tokio::join!(
        resolver.resolve_users_batch(user_ids),
        resolver.resolve_bots_batch(bot_ids)
    );
    IdentitySnapshot { users, bots }
}

pub async fn enrich_messages(resolver: &IdentityResolver, messages: Vec<Message>) -> Vec<EnrichedMessage> {
    if messages.is_empty() {
        return Vec::new();
    }
    let snapshot = snapshot_for(resolver, &messages).await;

    let mut enriched = Vec::with_capacity(messages.len());
    for message in messages {
        let display_text = resolver.rewrite_mentions(&message.text, &snapshot.users).await;
        let (display_name, is_bot) = snapshot.sender_of(&message);
        let has_thread = message.thread_ts.is_some();
        enriched.push(EnrichedMessage {
            message,
            display_text,
            display_name,
            is_bot,
            has_thread,
        });
    }
    enriched
}

//! "My activity" feed: recent messages that concern the account

use serde::Serialize;
use tracing::{debug, warn};

use super::channel::member_channels;
use super::ScanContext;
use crate::error::Result;
use crate::identity::tokens::{has_broadcast, mentions_user};
use crate::identity::{enrich_messages, EnrichedMessage};
use crate::slack::{Channel, Message};

const CHANNEL_PAGE: u32 = 100;
const DM_CONVERSATIONS: usize = 10;
const DM_PAGE: u32 = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActivityKind {
    Mention,
    ThreadReply,
    /// Reactions on one of the account's own messages, as `:name:`
    Reaction { reactions: Vec<String> },
    Broadcast,
    DirectMessage,
}

impl ActivityKind {
    pub fn label(&self) -> String {
        match self {
            ActivityKind::Mention => "mention".to_string(),
            ActivityKind::ThreadReply => "thread reply".to_string(),
            ActivityKind::Reaction { reactions } => format!("reaction: {}", reactions.join(", ")),
            ActivityKind::Broadcast => "broadcast".to_string(),
            ActivityKind::DirectMessage => "DM".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityItem {
    pub kind: ActivityKind,
    pub channel_name: String,
    pub is_dm: bool,
    #[serde(flatten)]
    pub message: EnrichedMessage,
}

/// Classify one channel message against the rest of its page
pub fn channel_activity(self_id: &str, message: &Message, page: &[Message]) -> Option<ActivityKind> {
    let from_self = message.is_from(self_id);

    if mentions_user(&message.text, self_id) {
        return Some(ActivityKind::Mention);
    }
    if message.is_thread_reply() {
        let parent_ts = message.thread_ts.as_deref()?;
        let parent = page.iter().find(|m| m.ts == parent_ts);
        return match parent {
            Some(parent) if parent.is_from(self_id) && !from_self => Some(ActivityKind::ThreadReply),
            _ => None,
        };
    }
    if from_self && !message.reactions.is_empty() {
        let reactions = message
            .reactions
            .iter()
            .map(|r| format!(":{}:", r.name))
            .collect();
        return Some(ActivityKind::Reaction { reactions });
    }
    if has_broadcast(&message.text) && !from_self {
        return Some(ActivityKind::Broadcast);
    }
    None
}

async fn channel_items(ctx: &ScanContext, channel: &Channel) -> Vec<(Message, ActivityKind, String, bool)> {
    let page = match ctx.pool.run(ctx.api.history(&channel.id, None, CHANNEL_PAGE)).await {
        Ok(page) => page,
        Err(e) => {
            warn!(channel = %channel.id, error = %e, "Activity scan skipped channel");
            return Vec::new();
        }
    };
    page.iter()
        .filter_map(|m| {
            channel_activity(ctx.self_id(), m, &page).map(|kind| (m.clone(), kind, channel.name.clone(), false))
        })
        .collect()
}

async fn direct_items(ctx: &ScanContext) -> Vec<(Message, ActivityKind, String, bool)> {
    let ims = match ctx.pool.run(ctx.api.direct_conversations(100)).await {
        Ok(ims) => ims,
        Err(e) => {
            warn!(error = %e, "Activity scan skipped direct messages");
            return Vec::new();
        }
    };

    let mut items = Vec::new();
    for im in ims.iter().take(DM_CONVERSATIONS) {
        match ctx.pool.run(ctx.api.history(&im.id, None, DM_PAGE)).await {
            Ok(page) => items.extend(
                page.into_iter()
                    .filter(|m| !m.is_from(ctx.self_id()))
                    .map(|m| (m, ActivityKind::DirectMessage, "DM".to_string(), true)),
            ),
            Err(e) => warn!(channel = %im.id, error = %e, "Activity scan skipped DM"),
        }
    }
    items
}

/// Recent activity across member channels and DMs, newest first
pub async fn list_activity(ctx: &ScanContext, limit: usize) -> Result<Vec<ActivityItem>> {
    let channels = member_channels(ctx).await?;

    let mut items = Vec::new();
    for channel in channels.iter() {
        items.extend(channel_items(ctx, channel).await);
    }
    items.extend(direct_items(ctx).await);
    debug!(account = %ctx.account.account_id, found = items.len(), "Activity collected");

    items.sort_by(|a, b| b.0.timestamp().total_cmp(&a.0.timestamp()));
    items.truncate(limit);

    let messages: Vec<Message> = items.iter().map(|(m, ..)| m.clone()).collect();
    let enriched = enrich_messages(&ctx.resolver, messages).await;

    Ok(items
        .into_iter()
        .zip(enriched)
        .map(|((_, kind, channel_name, is_dm), message)| ActivityItem {
            kind,
            channel_name,
            is_dm,
            message,
        })
        .collect())
}

//! Notification eligibility of a single message
//!
//! Precedence, first match wins:
//! 1. direct mention of the account
//! 2. broadcast (`@here`, `@channel` and their wire forms)
//! 3. user-group mention, see [`group_reason`]
//! 4. mention of a watched user
//!
//! Messages authored by the account itself never qualify.

use tracing::debug;

use super::ScanContext;
use crate::identity::tokens::{group_mentions, has_broadcast, has_group_mention, mentions_user};
use crate::notification::MentionReason;
use crate::slack::Message;

pub async fn detect_reason(ctx: &ScanContext, message: &Message) -> Option<MentionReason> {
    let self_id = ctx.self_id();
    if message.is_from(self_id) {
        return None;
    }
    let text = &message.text;

    if mentions_user(text, self_id) {
        return Some(MentionReason::DirectMention);
    }
    if has_broadcast(text) {
        return Some(MentionReason::Broadcast);
    }
    if has_group_mention(text) {
        if let Some(reason) = group_reason(ctx, text).await {
            return Some(reason);
        }
    }

    ctx.policy
        .watched_user_ids
        .iter()
        .any(|id| mentions_user(text, id))
        .then_some(MentionReason::WatchedUser)
}

/// A group mention fires when a watched user is a member, when the watch
/// list is empty, or when the account itself is a member. Groups are tried
/// in order of appearance.
async fn group_reason(ctx: &ScanContext, text: &str) -> Option<MentionReason> {
    let watched = &ctx.policy.watched_user_ids;

    for mention in group_mentions(text) {
        let handle = match mention.inline_handle {
            Some(handle) => handle,
            None => ctx.resolver.resolve_group_handle(&mention.group_id).await,
        };
        let members = ctx.resolver.resolve_group_members(&mention.group_id).await;

        let watched_member = watched.iter().any(|id| members.contains(id));
        let self_member = members.iter().any(|id| id == ctx.self_id());
        if watched_member || watched.is_empty() || self_member {
            return Some(MentionReason::GroupMention { handle });
        }
        debug!(group = %mention.group_id, "Group mention does not concern this account");
    }
    None
}

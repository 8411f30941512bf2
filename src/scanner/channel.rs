//! Per-conversation scans since a watermark

use std::sync::Arc;
use tracing::{debug, warn};

use super::mention::detect_reason;
use super::ScanContext;
use crate::account::permalink;
use crate::cache::scoped_key;
use crate::error::Result;
use crate::identity::snapshot_for;
use crate::notification::{MentionReason, NotificationEvent};
use crate::slack::{Channel, Message};

const CHANNELS_KEY: &str = "channels";
/// IM conversations listed per DM scan
const DM_LIST_LIMIT: u32 = 100;

/// Outcome of scanning one conversation (or all DMs)
#[derive(Debug, Clone, Default)]
pub struct ChannelScan {
    pub channel_id: String,
    pub events: Vec<NotificationEvent>,
    /// Highest timestamp inspected, never below the scan's `since`
    pub local_max: f64,
    pub failed: bool,
}

impl ChannelScan {
    fn failed(channel_id: &str, since: f64) -> Self {
        Self {
            channel_id: channel_id.to_string(),
            events: Vec::new(),
            local_max: since,
            failed: true,
        }
    }
}

/// Channels the account belongs to, cached per account
pub async fn member_channels(ctx: &ScanContext) -> Result<Arc<Vec<Channel>>> {
    let key = scoped_key(&ctx.account.cache_prefix(), CHANNELS_KEY);
    if let Some(channels) = ctx.cache.channels().get(&key) {
        return Ok(channels);
    }
    let channels = Arc::new(ctx.pool.run(ctx.api.member_channels()).await?);
    debug!(account = %ctx.account.account_id, count = channels.len(), "Fetched member channels");
    ctx.cache.channels().put(key, channels.clone());
    Ok(channels)
}

/// Messages newer than `since`, oldest first, and the highest timestamp among them
fn fresh_messages(messages: Vec<Message>, since: f64) -> (Vec<Message>, f64) {
    let mut local_max = since;
    let mut fresh: Vec<Message> = messages
        .into_iter()
        .filter(|m| m.timestamp() > since)
        .inspect(|m| local_max = local_max.max(m.timestamp()))
        .collect();
    fresh.sort_by(|a, b| a.timestamp().total_cmp(&b.timestamp()));
    (fresh, local_max)
}

pub async fn scan_channel(ctx: ScanContext, channel: Channel, since: f64) -> ChannelScan {
    let page = ctx
        .pool
        .run(ctx.api.history(&channel.id, Some(since), ctx.channel_limit))
        .await;
    let messages = match page {
        Ok(messages) => messages,
        Err(e) => {
            warn!(channel = %channel.id, error = %e, "Channel scan failed");
            return ChannelScan::failed(&channel.id, since);
        }
    };

    let (messages, local_max) = fresh_messages(messages, since);
    let mut matched = Vec::new();
    for message in messages {
        if let Some(reason) = detect_reason(&ctx, &message).await {
            matched.push((message, reason));
        }
    }

    let events = build_events(&ctx, &channel.id, Some(&channel.name), matched).await;
    if !events.is_empty() {
        debug!(channel = %channel.id, events = events.len(), "Mentions found");
    }
    ChannelScan {
        channel_id: channel.id,
        events,
        local_max,
        failed: false,
    }
}

/// Scan every IM conversation; any message not authored by the account is an event
pub async fn scan_direct_messages(ctx: ScanContext, since: f64) -> ChannelScan {
    let ims = match ctx.pool.run(ctx.api.direct_conversations(DM_LIST_LIMIT)).await {
        Ok(ims) => ims,
        Err(e) => {
            warn!(error = %e, "Listing direct messages failed");
            return ChannelScan::failed("im", since);
        }
    };

    let fetches = ims.into_iter().map(|im| {
        let api = ctx.api.clone();
        let limit = ctx.dm_limit;
        async move {
            let page = api.history(&im.id, Some(since), limit).await;
            (im.id, page)
        }
    });
    let pages = ctx.pool.submit_all(fetches).await;

    let mut scan = ChannelScan {
        channel_id: "im".to_string(),
        local_max: since,
        ..ChannelScan::default()
    };
    for (dm_id, page) in pages {
        let messages = match page {
            Ok(messages) => messages,
            Err(e) => {
                warn!(channel = %dm_id, error = %e, "Direct message scan failed");
                continue;
            }
        };
        let (messages, local_max) = fresh_messages(messages, since);
        scan.local_max = scan.local_max.max(local_max);

        let matched: Vec<_> = messages
            .into_iter()
            .filter(|m| !m.is_from(ctx.self_id()))
            .map(|m| (m, MentionReason::DirectMessage))
            .collect();
        scan.events.extend(build_events(&ctx, &dm_id, None, matched).await);
    }
    scan
}

/// Turn matched messages into events
///
/// Senders and mentioned users of the whole batch are resolved together.
/// Without a channel name the event is labelled `DM from {sender}`.
async fn build_events(
    ctx: &ScanContext,
    channel_id: &str,
    channel_name: Option<&str>,
    matched: Vec<(Message, MentionReason)>,
) -> Vec<NotificationEvent> {
    if matched.is_empty() {
        return Vec::new();
    }
    let (messages, reasons): (Vec<Message>, Vec<MentionReason>) = matched.into_iter().unzip();
    let snapshot = snapshot_for(&ctx.resolver, &messages).await;

    let mut events = Vec::with_capacity(messages.len());
    for (message, reason) in messages.into_iter().zip(reasons) {
        let (sender, _) = snapshot.sender_of(&message);
        let label = match channel_name {
            Some(name) if !name.is_empty() => name.to_string(),
            Some(_) => channel_id.to_string(),
            None => format!("DM from {}", sender),
        };
        let text = ctx.resolver.rewrite_mentions(&message.text, &snapshot.users).await;
        let classification = ctx
            .classifier
            .classify(
                &message.text,
                &sender,
                &label,
                &ctx.policy.keywords,
                ctx.policy.oracle_enabled,
            )
            .await;

        let built = NotificationEvent::builder()
            .channel(channel_id, label)
            .sender(sender)
            .text(text)
            .permalink(permalink(&ctx.account.workspace_url, channel_id, &message.ts))
            .ts(message.ts)
            .reason(reason)
            .classification(classification)
            .build();
        match built {
            Ok(event) => events.push(event),
            Err(e) => warn!(channel = %channel_id, error = %e, "Dropping malformed message"),
        }
    }
    events
}

//! Output formatting for CLI commands

use serde::Serialize;

use crate::identity::EnrichedMessage;
use crate::notification::NotificationEvent;
use crate::preferences::StarredMessage;
use crate::scanner::ActivityItem;

/// Pretty JSON, `{}` if serialization fails
pub fn format_json<T: Serialize>(data: &T) -> String {
    serde_json::to_string_pretty(data).unwrap_or_else(|_| "{}".to_string())
}

/// One event per line for streaming consumers
pub fn format_event_line(event: &NotificationEvent) -> String {
    serde_json::to_string(event).unwrap_or_else(|_| "{}".to_string())
}

pub fn format_message(message: &EnrichedMessage) -> String {
    let thread = if message.has_thread { " [thread]" } else { "" };
    format!(
        "{}  {}{}: {}",
        message.message.ts, message.display_name, thread, message.display_text
    )
}

pub fn format_activity(item: &ActivityItem) -> String {
    format!(
        "{}  [{}] #{} {}: {}",
        item.message.message.ts,
        item.kind.label(),
        item.channel_name,
        item.message.display_name,
        item.message.display_text
    )
}

pub fn format_starred(item: &StarredMessage) -> String {
    let channel = if item.channel_name.is_empty() {
        &item.channel_id
    } else {
        &item.channel_name
    };
    format!("{}  #{} {}: {}", item.message_id, channel, item.user_name, item.text)
}

//! Remote workspace API surface

pub mod client;
pub mod types;

pub use client::{check_envelope, format_ts, ApiFactory, SlackClient, SlackClientFactory, WorkspaceApi};
pub use types::{AuthInfo, BotInfo, Channel, Message, Reaction, Sender, UserGroup, UserInfo, UserProfile};

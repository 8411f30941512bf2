//! Wire types returned by the workspace API
//!
//! Every field is defaulted: the remote side omits fields freely and a
//! missing field must never fail a whole page of messages.

use serde::{Deserialize, Serialize};

/// Result of the identity handshake (`auth.test`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthInfo {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub team: String,
    /// Workspace URL, e.g. `https://team.slack.com/`
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Nickname chosen by the user
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub real_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserInfo {
    #[serde(default)]
    pub id: String,
    /// Raw handle
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub real_name: String,
    #[serde(default)]
    pub is_bot: bool,
    #[serde(default)]
    pub profile: UserProfile,
}

impl UserInfo {
    /// True for the placeholder produced by a failed lookup
    pub fn is_empty(&self) -> bool {
        self.id.is_empty()
            && self.name.is_empty()
            && self.real_name.is_empty()
            && self.profile.display_name.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BotInfo {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// A conversation the account can read: channel, private channel or IM
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Counterpart user for IM conversations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default)]
    pub is_im: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserGroup {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub handle: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Reaction {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub count: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Workspace-assigned timestamp, `"1700000000.123456"`
    #[serde(default)]
    pub ts: String,
    /// Filled in by the client after fetching, the API omits it in history pages
    #[serde(default)]
    pub channel_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bot_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_ts: Option<String>,
    #[serde(default)]
    pub reply_count: u32,
    #[serde(default)]
    pub reply_users_count: u32,
    #[serde(default)]
    pub reactions: Vec<Reaction>,
}

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender<'a> {
    User(&'a str),
    Bot(&'a str),
    Username(&'a str),
    Unknown,
}

impl Message {
    /// Composite id: `{channel}_{ts}`
    pub fn id(&self) -> String {
        format!("{}_{}", self.channel_id, self.ts)
    }

    /// Timestamp as a float, 0.0 when unparsable or not finite
    pub fn timestamp(&self) -> f64 {
        self.ts
            .parse::<f64>()
            .ok()
            .filter(|t| t.is_finite())
            .unwrap_or(0.0)
    }

    pub fn sender(&self) -> Sender<'_> {
        if let Some(user) = self.user.as_deref().filter(|u| !u.is_empty()) {
            Sender::User(user)
        } else if let Some(bot) = self.bot_id.as_deref().filter(|b| !b.is_empty()) {
            Sender::Bot(bot)
        } else if let Some(name) = self.username.as_deref().filter(|n| !n.is_empty()) {
            Sender::Username(name)
        } else {
            Sender::Unknown
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        match self.sender() {
            Sender::User(id) => Some(id),
            _ => None,
        }
    }

    pub fn is_from(&self, user_id: &str) -> bool {
        self.user_id() == Some(user_id)
    }

    /// A reply inside a thread (not the thread parent itself)
    pub fn is_thread_reply(&self) -> bool {
        self.thread_ts
            .as_deref()
            .is_some_and(|parent| parent != self.ts)
    }
}

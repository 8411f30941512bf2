//! Connected account

use serde::Serialize;

/// Characters of the token used to namespace cache keys
const CACHE_PREFIX_LEN: usize = 20;

/// Identity of one connected workspace account
///
/// Built from a successful `auth.test` and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Account {
    pub account_id: String,
    #[serde(skip)]
    pub api_token: String,
    /// The account's own user id, used for self-mention and self-author checks
    pub bot_user_id: String,
    pub team_name: String,
    /// Workspace URL prefix for permalinks, e.g. `https://team.slack.com/`
    pub workspace_url: String,
}

impl Account {
    pub fn new(api_token: &str, bot_user_id: &str, team_name: &str, workspace_url: &str) -> Self {
        Self {
            account_id: bot_user_id.to_string(),
            api_token: api_token.to_string(),
            bot_user_id: bot_user_id.to_string(),
            team_name: team_name.to_string(),
            workspace_url: workspace_url.to_string(),
        }
    }

    /// Stable, non-secret prefix of the token for cache keys
    pub fn cache_prefix(&self) -> String {
        cache_prefix(&self.api_token)
    }
}

pub fn cache_prefix(token: &str) -> String {
    token.chars().take(CACHE_PREFIX_LEN).collect()
}

/// Deep link to a message: `{url}archives/{channel}/p{ts without the dot}`
pub fn permalink(workspace_url: &str, channel_id: &str, ts: &str) -> Option<String> {
    if workspace_url.is_empty() || channel_id.is_empty() || ts.is_empty() {
        return None;
    }
    let prefix = if workspace_url.ends_with('/') {
        workspace_url.to_string()
    } else {
        format!("{}/", workspace_url)
    };
    Some(format!("{}archives/{}/p{}", prefix, channel_id, ts.replace('.', "")))
}

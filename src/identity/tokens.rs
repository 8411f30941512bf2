//! Mention tokens in raw message text
//!
//! Wire forms:
//! - user: `<@U123>`
//! - user group: `<!subteam^S123>` or `<!subteam^S123|@handle>`
//! - broadcast: `<!here>`, `<!channel>` or the plain `@here` / `@channel`

use regex::Regex;
use std::sync::OnceLock;

fn user_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"<@([A-Z0-9]+)>").unwrap())
}

fn group_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"<!subteam\^([A-Z0-9]+)(?:\|@([^>]+))?>").unwrap())
}

/// A user-group mention, with the handle when the token carries one inline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupMention {
    pub group_id: String,
    pub inline_handle: Option<String>,
}

pub fn user_token(user_id: &str) -> String {
    format!("<@{}>", user_id)
}

/// Mentioned user ids in order of first appearance, without duplicates
pub fn mentioned_user_ids(text: &str) -> Vec<String> {
    let mut ids: Vec<String> = Vec::new();
    for caps in user_pattern().captures_iter(text) {
        let id = &caps[1];
        if !ids.iter().any(|seen| seen == id) {
            ids.push(id.to_string());
        }
    }
    ids
}

pub fn mentions_user(text: &str, user_id: &str) -> bool {
    !user_id.is_empty() && text.contains(&user_token(user_id))
}

pub fn has_broadcast(text: &str) -> bool {
    text.contains("@here") || text.contains("@channel") || text.contains("<!channel") || text.contains("<!here")
}

pub fn has_group_mention(text: &str) -> bool {
    text.contains("<!subteam^")
}

pub fn group_mentions(text: &str) -> Vec<GroupMention> {
    group_pattern()
        .captures_iter(text)
        .map(|caps| GroupMention {
            group_id: caps[1].to_string(),
            inline_handle: caps
                .get(2)
                .map(|m| m.as_str().to_string())
                .filter(|h| !h.is_empty()),
        })
        .collect()
}

/// Replace every `<@id>` with `@{name}` using `name_of`
pub fn replace_user_tokens<F>(text: &str, mut name_of: F) -> String
where
    F: FnMut(&str) -> String,
{
    user_pattern()
        .replace_all(text, |caps: &regex::Captures| format!("@{}", name_of(&caps[1])))
        .into_owned()
}

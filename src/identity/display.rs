//! Display-name rules

use crate::slack::{BotInfo, UserInfo};

pub const UNKNOWN: &str = "Unknown";
pub const BOT_FALLBACK: &str = "Bot";
pub const GROUP_PLACEHOLDER: &str = "group";

/// Name to show for a user
///
/// Precedence is fixed: profile nickname, then real name (both trimmed and
/// non-empty), then the raw handle, then `"Unknown"`.
pub fn display_name_of(user: &UserInfo) -> String {
    let nickname = user.profile.display_name.trim();
    if !nickname.is_empty() {
        return nickname.to_string();
    }
    let real_name = user.real_name.trim();
    if !real_name.is_empty() {
        return real_name.to_string();
    }
    if !user.name.is_empty() {
        return user.name.clone();
    }
    UNKNOWN.to_string()
}

/// Name to show for a bot: bot record, then the message's `username`, then `"Bot"`
pub fn bot_display_name(bot: &BotInfo, username: Option<&str>) -> String {
    if !bot.name.is_empty() {
        return bot.name.clone();
    }
    username
        .filter(|name| !name.is_empty())
        .unwrap_or(BOT_FALLBACK)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slack::UserProfile;

    fn user(nickname: &str, real_name: &str, handle: &str) -> UserInfo {
        UserInfo {
            id: "U1".into(),
            name: handle.into(),
            real_name: real_name.into(),
            is_bot: false,
            profile: UserProfile {
                display_name: nickname.into(),
                real_name: String::new(),
            },
        }
    }

    #[test]
    fn test_nickname_wins() {
        assert_eq!(display_name_of(&user("J", "Jane", "jdoe")), "J");
    }

    #[test]
    fn test_real_name_when_nickname_empty() {
        assert_eq!(display_name_of(&user("", "Jane", "jdoe")), "Jane");
        assert_eq!(display_name_of(&user("   ", "Jane", "jdoe")), "Jane");
    }

    #[test]
    fn test_handle_when_names_empty() {
        assert_eq!(display_name_of(&user("", "", "jdoe")), "jdoe");
        assert_eq!(display_name_of(&user(" ", "  ", "jdoe")), "jdoe");
    }

    #[test]
    fn test_unknown_for_empty_identity() {
        assert_eq!(display_name_of(&UserInfo::default()), "Unknown");
    }

    #[test]
    fn test_names_are_trimmed() {
        assert_eq!(display_name_of(&user("  J  ", "", "")), "J");
    }

    #[test]
    fn test_bot_display_name() {
        let named = BotInfo { id: "B1".into(), name: "deploy".into() };
        assert_eq!(bot_display_name(&named, Some("other")), "deploy");
        assert_eq!(bot_display_name(&BotInfo::default(), Some("ci")), "ci");
        assert_eq!(bot_display_name(&BotInfo::default(), None), "Bot");
    }
}

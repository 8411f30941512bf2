//! Per-account preferences and their mutation rules

use serde::{Deserialize, Serialize};

use crate::classifier::{Priority, PriorityKeywords};
use crate::error::{MonitorError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub notification_sound: bool,
    /// Whether the oracle stage may run for this account
    pub classifier_enabled: bool,
}

impl Settings {
    pub fn with_defaults(oracle_configured: bool) -> Self {
        Self {
            notification_sound: true,
            classifier_enabled: oracle_configured,
        }
    }

    pub fn apply(&mut self, patch: &SettingsPatch) {
        if let Some(sound) = patch.notification_sound {
            self.notification_sound = sound;
        }
        if let Some(enabled) = patch.classifier_enabled {
            self.classifier_enabled = enabled;
        }
    }
}

/// Partial settings: stored files and update requests only carry what changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification_sound: Option<bool>,
    #[serde(default, alias = "claude_enabled", skip_serializing_if = "Option::is_none")]
    pub classifier_enabled: Option<bool>,
}

impl From<Settings> for SettingsPatch {
    fn from(settings: Settings) -> Self {
        Self {
            notification_sound: Some(settings.notification_sound),
            classifier_enabled: Some(settings.classifier_enabled),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    pub watched_usernames: Vec<String>,
    pub priority_keywords: PriorityKeywords,
    pub settings: Settings,
}

impl Preferences {
    pub fn with_defaults(oracle_configured: bool) -> Self {
        Self {
            watched_usernames: Vec::new(),
            priority_keywords: PriorityKeywords::default(),
            settings: Settings::with_defaults(oracle_configured),
        }
    }

    pub fn add_watched_user(&mut self, username: &str) -> Result<()> {
        let username = username.trim().trim_start_matches('@');
        if username.is_empty() {
            return Err(MonitorError::Configuration("username is required".to_string()));
        }
        if self.watched_usernames.iter().any(|u| u == username) {
            return Err(MonitorError::Configuration(format!("{} is already watched", username)));
        }
        self.watched_usernames.push(username.to_string());
        Ok(())
    }

    pub fn remove_watched_user(&mut self, username: &str) -> Result<()> {
        let username = username.trim().trim_start_matches('@');
        let before = self.watched_usernames.len();
        self.watched_usernames.retain(|u| u != username);
        if self.watched_usernames.len() == before {
            return Err(MonitorError::NotFound(format!("{} is not watched", username)));
        }
        Ok(())
    }

    pub fn add_keyword(&mut self, tier: &str, keyword: &str) -> Result<()> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Err(MonitorError::Configuration("keyword is required".to_string()));
        }
        let keywords = keyword_tier(&mut self.priority_keywords, tier)?;
        if keywords.iter().any(|k| k == keyword) {
            return Err(MonitorError::Configuration(format!("{} already exists in {}", keyword, tier)));
        }
        keywords.push(keyword.to_string());
        Ok(())
    }

    pub fn remove_keyword(&mut self, tier: &str, keyword: &str) -> Result<()> {
        let keyword = keyword.trim();
        let keywords = keyword_tier(&mut self.priority_keywords, tier)?;
        match keywords.iter().position(|k| k == keyword) {
            Some(index) => {
                keywords.remove(index);
                Ok(())
            }
            None => Err(MonitorError::NotFound(format!("{} is not in {}", keyword, tier))),
        }
    }
}

fn keyword_tier<'a>(keywords: &'a mut PriorityKeywords, tier: &str) -> Result<&'a mut Vec<String>> {
    Priority::parse(tier)
        .and_then(|priority| keywords.tier_mut(priority))
        .ok_or_else(|| MonitorError::Configuration(format!("unknown priority tier: {}", tier)))
}

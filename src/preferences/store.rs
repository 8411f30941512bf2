//! Preference persistence
//!
//! Layout of the file store, one directory per account:
//! ```text
//! {data_dir}/{account_id}/watched_users.json
//! {data_dir}/{account_id}/priority_keywords.json
//! {data_dir}/{account_id}/settings.json
//! {data_dir}/{account_id}/starred_messages.json
//! ```
//! A missing or unreadable file falls back to its defaults.

use anyhow::Context;
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::model::{Preferences, SettingsPatch};
use super::starred::StarredList;
use crate::classifier::PriorityKeywords;
use crate::error::{MonitorError, Result};

const WATCHED_USERS_FILE: &str = "watched_users.json";
const KEYWORDS_FILE: &str = "priority_keywords.json";
const SETTINGS_FILE: &str = "settings.json";
const STARRED_FILE: &str = "starred_messages.json";

/// Where per-account preferences live
pub trait PreferenceStore: Send + Sync {
    fn load(&self, account_id: &str) -> Result<Preferences>;
    fn save(&self, account_id: &str, preferences: &Preferences) -> Result<()>;

    /// Starred messages live apart from the preferences the loop reloads
    fn load_starred(&self, account_id: &str) -> Result<StarredList>;
    fn save_starred(&self, account_id: &str, starred: &StarredList) -> Result<()>;
}

pub struct JsonPreferenceStore {
    root: PathBuf,
    oracle_configured: bool,
}

impl JsonPreferenceStore {
    pub fn new(root: impl Into<PathBuf>, oracle_configured: bool) -> Self {
        Self {
            root: root.into(),
            oracle_configured,
        }
    }

    pub fn account_dir(&self, account_id: &str) -> PathBuf {
        self.root.join(account_id)
    }

    fn read_or_default<T: DeserializeOwned>(&self, path: &Path, default: impl FnOnce() -> T) -> T {
        if !path.exists() {
            return default();
        }
        match read_json(path) {
            Ok(value) => value,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Unreadable preference file, using defaults");
                default()
            }
        }
    }

    fn save_files(&self, account_id: &str, preferences: &Preferences) -> anyhow::Result<()> {
        let dir = self.account_dir(account_id);
        fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;
        write_json(&dir.join(WATCHED_USERS_FILE), &preferences.watched_usernames)?;
        write_json(&dir.join(KEYWORDS_FILE), &preferences.priority_keywords)?;
        write_json(&dir.join(SETTINGS_FILE), &SettingsPatch::from(preferences.settings))?;
        Ok(())
    }

    fn save_starred_file(&self, account_id: &str, starred: &StarredList) -> anyhow::Result<()> {
        let dir = self.account_dir(account_id);
        fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;
        write_json(&dir.join(STARRED_FILE), starred)
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    use fs2::FileExt;

    let file = File::open(path)?;
    file.lock_shared()?;
    let parsed = serde_json::from_reader(BufReader::new(&file));
    file.unlock()?;
    Ok(parsed?)
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> anyhow::Result<()> {
    use fs2::FileExt;

    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(path)
        .with_context(|| format!("opening {}", path.display()))?;
    file.lock_exclusive()?;
    let content = serde_json::to_string_pretty(value)?;
    file.set_len(0)?;
    file.write_all(content.as_bytes())?;
    file.flush()?;
    file.unlock()?;
    Ok(())
}

impl PreferenceStore for JsonPreferenceStore {
    fn load(&self, account_id: &str) -> Result<Preferences> {
        let dir = self.account_dir(account_id);
        let mut preferences = Preferences::with_defaults(self.oracle_configured);

        preferences.watched_usernames = self.read_or_default(&dir.join(WATCHED_USERS_FILE), Vec::new);
        preferences.priority_keywords =
            self.read_or_default(&dir.join(KEYWORDS_FILE), PriorityKeywords::default);
        let patch: SettingsPatch = self.read_or_default(&dir.join(SETTINGS_FILE), SettingsPatch::default);
        preferences.settings.apply(&patch);

        debug!(account = %account_id, watched = preferences.watched_usernames.len(), "Loaded preferences");
        Ok(preferences)
    }

    fn save(&self, account_id: &str, preferences: &Preferences) -> Result<()> {
        self.save_files(account_id, preferences).map_err(|e| {
            warn!(account = %account_id, error = %e, "Saving preferences failed");
            MonitorError::Storage(e.to_string())
        })
    }

    fn load_starred(&self, account_id: &str) -> Result<StarredList> {
        let starred = self.read_or_default(&self.account_dir(account_id).join(STARRED_FILE), StarredList::default);
        debug!(account = %account_id, starred = starred.len(), "Loaded starred messages");
        Ok(starred)
    }

    fn save_starred(&self, account_id: &str, starred: &StarredList) -> Result<()> {
        self.save_starred_file(account_id, starred).map_err(|e| {
            warn!(account = %account_id, error = %e, "Saving starred messages failed");
            MonitorError::Storage(e.to_string())
        })
    }
}

/// In-process store
pub struct MemoryPreferenceStore {
    entries: DashMap<String, Preferences>,
    starred: DashMap<String, StarredList>,
    oracle_configured: bool,
}

impl MemoryPreferenceStore {
    pub fn new(oracle_configured: bool) -> Self {
        Self {
            entries: DashMap::new(),
            starred: DashMap::new(),
            oracle_configured,
        }
    }
}

impl Default for MemoryPreferenceStore {
    fn default() -> Self {
        Self::new(false)
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn load(&self, account_id: &str) -> Result<Preferences> {
        Ok(self
            .entries
            .get(account_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_else(|| Preferences::with_defaults(self.oracle_configured)))
    }

    fn save(&self, account_id: &str, preferences: &Preferences) -> Result<()> {
        self.entries.insert(account_id.to_string(), preferences.clone());
        Ok(())
    }

    fn load_starred(&self, account_id: &str) -> Result<StarredList> {
        Ok(self
            .starred
            .get(account_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default())
    }

    fn save_starred(&self, account_id: &str, starred: &StarredList) -> Result<()> {
        self.starred.insert(account_id.to_string(), starred.clone());
        Ok(())
    }
}

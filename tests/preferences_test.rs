//! File-backed preference store

use std::fs;

use slack_mention_monitor::classifier::PriorityKeywords;
use slack_mention_monitor::preferences::{JsonPreferenceStore, PreferenceStore, Preferences, StarredList, StarredMessage};
use tempfile::TempDir;

#[test]
fn test_missing_files_load_defaults() {
    let dir = TempDir::new().unwrap();
    let store = JsonPreferenceStore::new(dir.path(), true);

    let preferences = store.load("U1").unwrap();
    assert_eq!(preferences, Preferences::with_defaults(true));
    assert!(preferences.settings.notification_sound);
    assert!(preferences.settings.classifier_enabled);
    assert!(!store.account_dir("U1").exists());
}

#[test]
fn test_save_then_load() {
    let dir = TempDir::new().unwrap();
    let store = JsonPreferenceStore::new(dir.path(), false);

    let mut preferences = store.load("U1").unwrap();
    preferences.add_watched_user("alice").unwrap();
    preferences.add_keyword("normal", "릴리즈").unwrap();
    preferences.settings.notification_sound = false;
    store.save("U1", &preferences).unwrap();

    let account_dir = store.account_dir("U1");
    assert!(account_dir.join("watched_users.json").exists());
    assert!(account_dir.join("priority_keywords.json").exists());
    assert!(account_dir.join("settings.json").exists());

    let reloaded = store.load("U1").unwrap();
    assert_eq!(reloaded, preferences);
    // other accounts are untouched
    assert!(store.load("U2").unwrap().watched_usernames.is_empty());
}

#[test]
fn test_corrupt_file_falls_back_to_default() {
    let dir = TempDir::new().unwrap();
    let store = JsonPreferenceStore::new(dir.path(), false);
    let account_dir = store.account_dir("U1");
    fs::create_dir_all(&account_dir).unwrap();
    fs::write(account_dir.join("watched_users.json"), r#"["alice", "bob"]"#).unwrap();
    fs::write(account_dir.join("priority_keywords.json"), "{ not json").unwrap();

    let preferences = store.load("U1").unwrap();
    assert_eq!(preferences.watched_usernames, vec!["alice", "bob"]);
    assert_eq!(preferences.priority_keywords, PriorityKeywords::default());
}

#[test]
fn test_partial_settings_merge_over_defaults() {
    let dir = TempDir::new().unwrap();
    let store = JsonPreferenceStore::new(dir.path(), true);
    let account_dir = store.account_dir("U1");
    fs::create_dir_all(&account_dir).unwrap();
    fs::write(account_dir.join("settings.json"), r#"{"claude_enabled": false}"#).unwrap();

    let settings = store.load("U1").unwrap().settings;
    assert!(!settings.classifier_enabled);
    assert!(settings.notification_sound);
}

#[test]
fn test_partial_keyword_file() {
    let dir = TempDir::new().unwrap();
    let store = JsonPreferenceStore::new(dir.path(), false);
    let account_dir = store.account_dir("U1");
    fs::create_dir_all(&account_dir).unwrap();
    fs::write(account_dir.join("priority_keywords.json"), r#"{"critical": ["fire"]}"#).unwrap();

    let keywords = store.load("U1").unwrap().priority_keywords;
    assert_eq!(keywords.critical, vec!["fire"]);
    assert!(keywords.high.is_empty());
    assert!(keywords.normal.is_empty());
}

#[test]
fn test_starred_messages_round_trip_separately() {
    let dir = TempDir::new().unwrap();
    let store = JsonPreferenceStore::new(dir.path(), false);
    assert!(store.load_starred("U1").unwrap().is_empty());

    let mut starred = StarredList::default();
    starred.add(StarredMessage {
        message_id: "C1_5.0".into(),
        channel_id: "C1".into(),
        channel_name: "general".into(),
        ts: "5.0".into(),
        user_name: "Alice Kim".into(),
        text: "릴리즈 노트".into(),
        permalink: Some("https://team.slack.com/archives/C1/p50".into()),
        starred_at: 1700000000.0,
    });
    store.save_starred("U1", &starred).unwrap();

    let account_dir = store.account_dir("U1");
    assert!(account_dir.join("starred_messages.json").exists());
    // starring does not materialise the preference files
    assert!(!account_dir.join("settings.json").exists());
    assert_eq!(store.load_starred("U1").unwrap(), starred);
    assert!(store.load_starred("U2").unwrap().is_empty());
}

#[test]
fn test_corrupt_starred_file_loads_empty() {
    let dir = TempDir::new().unwrap();
    let store = JsonPreferenceStore::new(dir.path(), false);
    let account_dir = store.account_dir("U1");
    fs::create_dir_all(&account_dir).unwrap();
    fs::write(account_dir.join("starred_messages.json"), "[{").unwrap();
    assert!(store.load_starred("U1").unwrap().is_empty());
}

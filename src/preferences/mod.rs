//! Per-account preferences: watch list, keyword rules, settings and starred messages

pub mod model;
pub mod starred;
pub mod store;

pub use model::{Preferences, Settings, SettingsPatch};
pub use starred::{StarredList, StarredMessage};
pub use store::{JsonPreferenceStore, MemoryPreferenceStore, PreferenceStore};

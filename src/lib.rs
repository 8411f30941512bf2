//! Slack Mention Monitor - watches a workspace for mentions that concern one account

pub mod account;
pub mod cache;
pub mod classifier;
pub mod cli;
pub mod config;
pub mod error;
pub mod identity;
pub mod infra;
pub mod monitor;
pub mod notification;
pub mod preferences;
pub mod scanner;
pub mod slack;

pub use account::Account;
pub use cache::{CacheService, Namespace, TtlCache};
pub use classifier::{Classification, Priority, PriorityClassifier, PriorityKeywords, PriorityOracle};
pub use config::MonitorConfig;
pub use error::{MonitorError, Result};
pub use identity::{EnrichedMessage, IdentityResolver};
pub use infra::WorkerPool;
pub use monitor::{Monitor, MonitorHub, SessionState, TickOutcome};
pub use notification::{MentionReason, NotificationEvent};
pub use preferences::{JsonPreferenceStore, MemoryPreferenceStore, PreferenceStore, Preferences};
pub use scanner::{ScanContext, ScanPolicy};
pub use slack::{ApiFactory, SlackClient, WorkspaceApi};

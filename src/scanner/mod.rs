//! Mention scanning
//!
//! A scan looks at one conversation's messages since a watermark, decides
//! which of them are notification-worthy and turns those into events. Every
//! inspected message feeds the scan's local maximum timestamp, matched or not.

pub mod activity;
pub mod channel;
pub mod mention;

pub use activity::{list_activity, ActivityItem, ActivityKind};
pub use channel::{member_channels, scan_channel, scan_direct_messages, ChannelScan};
pub use mention::detect_reason;

use std::sync::Arc;

use crate::account::Account;
use crate::cache::CacheService;
use crate::classifier::{PriorityClassifier, PriorityKeywords};
use crate::config::MonitorConfig;
use crate::identity::IdentityResolver;
use crate::infra::WorkerPool;
use crate::slack::WorkspaceApi;

/// What a tick scans for, fixed for the duration of one tick
#[derive(Debug, Clone, Default)]
pub struct ScanPolicy {
    pub watched_user_ids: Vec<String>,
    pub keywords: PriorityKeywords,
    pub oracle_enabled: bool,
}

/// Everything a scan needs, cheap to clone into spawned tasks
#[derive(Clone)]
pub struct ScanContext {
    pub account: Arc<Account>,
    pub api: Arc<dyn WorkspaceApi>,
    pub cache: Arc<CacheService>,
    pub resolver: IdentityResolver,
    pub classifier: PriorityClassifier,
    pub pool: WorkerPool,
    pub policy: Arc<ScanPolicy>,
    pub channel_limit: u32,
    pub dm_limit: u32,
}

impl ScanContext {
    pub fn new(
        account: Arc<Account>,
        api: Arc<dyn WorkspaceApi>,
        cache: Arc<CacheService>,
        classifier: PriorityClassifier,
        pool: WorkerPool,
        config: &MonitorConfig,
    ) -> Self {
        let resolver = IdentityResolver::new(api.clone(), cache.clone(), pool.clone(), account.cache_prefix());
        Self {
            account,
            api,
            cache,
            resolver,
            classifier,
            pool,
            policy: Arc::new(ScanPolicy::default()),
            channel_limit: config.channel_scan_limit,
            dm_limit: config.dm_scan_limit,
        }
    }

    pub fn self_id(&self) -> &str {
        &self.account.bot_user_id
    }

    /// Same context with a different policy
    pub fn with_policy(&self, policy: Arc<ScanPolicy>) -> Self {
        Self {
            policy,
            ..self.clone()
        }
    }
}

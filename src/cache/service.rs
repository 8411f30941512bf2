//! Process-wide cache service
//!
//! One instance is built at startup and shared by every account's resolver
//! and monitoring session. Keys are always prefixed with the account's cache
//! prefix so two workspaces never see each other's entries.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::ttl::TtlCache;
use crate::config::TtlTable;
use crate::slack::{BotInfo, Channel, UserInfo};

/// Logical partitions, each with its own TTL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    UserIdentity,
    BotIdentity,
    ChannelMembership,
    MemberDirectory,
    GroupHandles,
    GroupMembers,
}

impl Namespace {
    pub const ALL: [Namespace; 6] = [
        Namespace::UserIdentity,
        Namespace::BotIdentity,
        Namespace::ChannelMembership,
        Namespace::MemberDirectory,
        Namespace::GroupHandles,
        Namespace::GroupMembers,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Namespace::UserIdentity => "user-identity",
            Namespace::BotIdentity => "bot-identity",
            Namespace::ChannelMembership => "channel-membership",
            Namespace::MemberDirectory => "member-directory",
            Namespace::GroupHandles => "group-handles",
            Namespace::GroupMembers => "group-members",
        }
    }
}

impl std::fmt::Display for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Build a namespaced key: `{account prefix}:{id}`
pub fn scoped_key(prefix: &str, id: &str) -> String {
    format!("{}:{}", prefix, id)
}

pub struct CacheService {
    users: TtlCache<UserInfo>,
    bots: TtlCache<BotInfo>,
    channels: TtlCache<Arc<Vec<Channel>>>,
    directory: TtlCache<Arc<Vec<UserInfo>>>,
    group_handles: TtlCache<Arc<HashMap<String, String>>>,
    group_members: TtlCache<Arc<Vec<String>>>,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl CacheService {
    pub fn new(ttl: &TtlTable) -> Self {
        Self {
            users: TtlCache::new(ttl.ttl(Namespace::UserIdentity)),
            bots: TtlCache::new(ttl.ttl(Namespace::BotIdentity)),
            channels: TtlCache::new(ttl.ttl(Namespace::ChannelMembership)),
            directory: TtlCache::new(ttl.ttl(Namespace::MemberDirectory)),
            group_handles: TtlCache::new(ttl.ttl(Namespace::GroupHandles)),
            group_members: TtlCache::new(ttl.ttl(Namespace::GroupMembers)),
            sweeper: Mutex::new(None),
        }
    }

    /// Build the service and start its periodic sweep task
    ///
    /// Must be called from inside a tokio runtime.
    pub fn start(ttl: &TtlTable, sweep_interval: Duration) -> Arc<Self> {
        let service = Arc::new(Self::new(ttl));
        let handle = tokio::spawn(sweep_loop(Arc::downgrade(&service), sweep_interval));
        if let Ok(mut slot) = service.sweeper.lock() {
            *slot = Some(handle);
        }
        info!(interval_secs = sweep_interval.as_secs(), "Cache sweeper started");
        service
    }

    pub fn users(&self) -> &TtlCache<UserInfo> {
        &self.users
    }

    pub fn bots(&self) -> &TtlCache<BotInfo> {
        &self.bots
    }

    pub fn channels(&self) -> &TtlCache<Arc<Vec<Channel>>> {
        &self.channels
    }

    pub fn directory(&self) -> &TtlCache<Arc<Vec<UserInfo>>> {
        &self.directory
    }

    pub fn group_handles(&self) -> &TtlCache<Arc<HashMap<String, String>>> {
        &self.group_handles
    }

    pub fn group_members(&self) -> &TtlCache<Arc<Vec<String>>> {
        &self.group_members
    }

    pub fn len(&self, namespace: Namespace) -> usize {
        match namespace {
            Namespace::UserIdentity => self.users.len(),
            Namespace::BotIdentity => self.bots.len(),
            Namespace::ChannelMembership => self.channels.len(),
            Namespace::MemberDirectory => self.directory.len(),
            Namespace::GroupHandles => self.group_handles.len(),
            Namespace::GroupMembers => self.group_members.len(),
        }
    }

    /// Remove expired entries in every namespace
    pub fn sweep(&self, now: Instant) -> usize {
        self.users.sweep(now)
            + self.bots.sweep(now)
            + self.channels.sweep(now)
            + self.directory.sweep(now)
            + self.group_handles.sweep(now)
            + self.group_members.sweep(now)
    }

    /// Stop the sweep task
    pub fn shutdown(&self) {
        if let Ok(mut slot) = self.sweeper.lock() {
            if let Some(handle) = slot.take() {
                handle.abort();
                debug!("Cache sweeper stopped");
            }
        }
    }
}

impl Drop for CacheService {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn sweep_loop(service: Weak<CacheService>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    // first tick completes immediately
    ticker.tick().await;
    loop {
        ticker.tick().await;
        let Some(service) = service.upgrade() else {
            break;
        };
        let removed = service.sweep(Instant::now());
        if removed > 0 {
            debug!(removed, "Swept expired cache entries");
        }
    }
}

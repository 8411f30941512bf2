//! Public entry point: accounts, sessions, reads and preference updates
//!
//! The hub owns the process-wide cache service and worker pool and shares
//! them across every connected account.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, warn};

use super::engine::now_ts;
use super::session::{EventStream, Session, SessionState};
use super::tail::{spawn_tail, MessageStream};
use crate::account::{permalink, Account};
use crate::cache::CacheService;
use crate::classifier::{AnthropicOracle, PriorityClassifier, PriorityKeywords, PriorityOracle};
use crate::config::MonitorConfig;
use crate::error::{MonitorError, Result};
use crate::identity::{enrich_messages, EnrichedMessage};
use crate::infra::WorkerPool;
use crate::notification::{sample_events, NotificationEvent};
use crate::preferences::{
    JsonPreferenceStore, PreferenceStore, Preferences, Settings, SettingsPatch, StarredList, StarredMessage,
};
use crate::scanner::{list_activity, member_channels, ActivityItem, ScanContext};
use crate::slack::{ApiFactory, SlackClientFactory};

/// Rejections that mean the token itself is unusable
const AUTH_ERRORS: &[&str] = &[
    "not_authed",
    "invalid_auth",
    "account_inactive",
    "token_revoked",
    "token_expired",
];

/// Default history page for `list_messages`
pub const DEFAULT_MESSAGE_LIMIT: u32 = 50;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectInfo {
    pub success: bool,
    pub bot_id: String,
    pub team_name: String,
    pub workspace_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelSummary {
    pub id: String,
    pub name: String,
}

pub struct MonitorHub {
    config: MonitorConfig,
    factory: Arc<dyn ApiFactory>,
    store: Arc<dyn PreferenceStore>,
    classifier: PriorityClassifier,
    cache: Arc<CacheService>,
    pool: WorkerPool,
    sessions: DashMap<String, Arc<Session>>,
    /// Serialises load-modify-save cycles on preferences
    preference_lock: Mutex<()>,
}

impl MonitorHub {
    /// Must be called inside a tokio runtime: the cache sweeper is spawned here
    pub fn new(
        config: MonitorConfig,
        factory: Arc<dyn ApiFactory>,
        store: Arc<dyn PreferenceStore>,
        oracle: Option<Arc<dyn PriorityOracle>>,
    ) -> Self {
        let cache = CacheService::start(&config.ttl, config.sweep_interval());
        let pool = WorkerPool::new(config.pool_capacity);
        let classifier = PriorityClassifier::new(oracle, &config);
        Self {
            config,
            factory,
            store,
            classifier,
            cache,
            pool,
            sessions: DashMap::new(),
            preference_lock: Mutex::new(()),
        }
    }

    /// Real workspace client, file-backed preferences, oracle from the environment
    pub fn from_config(config: MonitorConfig) -> Self {
        let oracle = AnthropicOracle::from_env().map(|oracle| Arc::new(oracle) as Arc<dyn PriorityOracle>);
        let store = Arc::new(JsonPreferenceStore::new(config.data_dir.clone(), oracle.is_some()));
        let factory = Arc::new(SlackClientFactory::new(config.clone()));
        Self::new(config, factory, store, oracle)
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<CacheService> {
        &self.cache
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    pub fn has_oracle(&self) -> bool {
        self.classifier.has_oracle()
    }

    fn session(&self, account_id: &str) -> Result<Arc<Session>> {
        self.sessions
            .get(account_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| MonitorError::Configuration(format!("account {} is not connected", account_id)))
    }

    /// Handshake with the workspace and open an idle session for the account
    ///
    /// Reconnecting with the same token keeps the running session and its
    /// subscribers. A different token for the account replaces the session.
    pub async fn connect(&self, api_token: &str) -> Result<ConnectInfo> {
        let api = self.factory.client(api_token)?;
        let auth = api.auth_test().await.map_err(|e| match e {
            MonitorError::RemoteRejection { ref error, .. } if AUTH_ERRORS.contains(&error.as_str()) => {
                MonitorError::Configuration(format!("invalid token: {}", error))
            }
            other => other,
        })?;
        if auth.user_id.is_empty() {
            return Err(MonitorError::Configuration("handshake returned no user id".to_string()));
        }

        let account = Arc::new(Account::new(api_token, &auth.user_id, &auth.team, &auth.url));
        let spawn = |account: Arc<Account>| {
            let ctx = ScanContext::new(
                account,
                api.clone(),
                self.cache.clone(),
                self.classifier.clone(),
                self.pool.clone(),
                &self.config,
            );
            Arc::new(Session::spawn(ctx, self.store.clone(), &self.config))
        };
        match self.sessions.entry(account.account_id.clone()) {
            Entry::Occupied(entry) if entry.get().account().api_token == api_token => {
                debug!(account = %account.account_id, state = %entry.get().state(), "Already connected, keeping session");
            }
            Entry::Occupied(mut entry) => {
                entry.insert(spawn(account.clone()));
                info!(account = %account.account_id, "Token changed, replaced previous session");
            }
            Entry::Vacant(entry) => {
                entry.insert(spawn(account.clone()));
            }
        }
        info!(account = %account.account_id, team = %account.team_name, "Connected");

        Ok(ConnectInfo {
            success: true,
            bot_id: account.bot_user_id.clone(),
            team_name: account.team_name.clone(),
            workspace_url: account.workspace_url.clone(),
        })
    }

    pub fn account(&self, account_id: &str) -> Result<Arc<Account>> {
        Ok(self.session(account_id)?.account().clone())
    }

    pub fn start_monitoring(&self, account_id: &str) -> Result<()> {
        self.session(account_id)?.start();
        Ok(())
    }

    pub fn stop_monitoring(&self, account_id: &str) -> Result<()> {
        self.session(account_id)?.stop();
        Ok(())
    }

    pub fn state(&self, account_id: &str) -> Result<SessionState> {
        Ok(self.session(account_id)?.state())
    }

    /// Stream of events for the account; ends when the account disconnects
    pub fn subscribe(&self, account_id: &str) -> Result<EventStream> {
        Ok(self.session(account_id)?.subscribe())
    }

    /// Live feed of new messages in one channel
    ///
    /// Ends when the stream is dropped or the account disconnects.
    pub fn subscribe_channel(&self, account_id: &str, channel_id: &str) -> Result<MessageStream> {
        let session = self.session(account_id)?;
        if channel_id.trim().is_empty() {
            return Err(MonitorError::Configuration("channel id is required".to_string()));
        }
        Ok(spawn_tail(session.context().clone(), channel_id, &self.config, session.closed()))
    }

    /// Drop the account's session, ending its control task
    pub fn disconnect(&self, account_id: &str) -> bool {
        let removed = self.sessions.remove(account_id).is_some();
        if removed {
            info!(account = %account_id, "Disconnected");
        }
        removed
    }

    pub fn shutdown(&self) {
        self.sessions.clear();
        self.cache.shutdown();
    }

    pub async fn list_channels(&self, account_id: &str) -> Result<Vec<ChannelSummary>> {
        let session = self.session(account_id)?;
        let channels = member_channels(session.context()).await?;
        Ok(channels
            .iter()
            .map(|c| ChannelSummary {
                id: c.id.clone(),
                name: c.name.clone(),
            })
            .collect())
    }

    pub async fn list_messages(
        &self,
        account_id: &str,
        channel_id: &str,
        limit: u32,
    ) -> Result<Vec<EnrichedMessage>> {
        let session = self.session(account_id)?;
        let ctx = session.context();
        let messages = ctx.pool.run(ctx.api.history(channel_id, None, limit)).await?;
        Ok(enrich_messages(&ctx.resolver, messages).await)
    }

    /// Replies of a thread, without the parent message
    pub async fn list_thread_replies(
        &self,
        account_id: &str,
        channel_id: &str,
        thread_ts: &str,
    ) -> Result<Vec<EnrichedMessage>> {
        let session = self.session(account_id)?;
        let ctx = session.context();
        let messages = ctx.pool.run(ctx.api.replies(channel_id, thread_ts)).await?;
        let replies = messages.into_iter().skip(1).collect();
        Ok(enrich_messages(&ctx.resolver, replies).await)
    }

    pub async fn list_activity(&self, account_id: &str, limit: usize) -> Result<Vec<ActivityItem>> {
        let session = self.session(account_id)?;
        list_activity(session.context(), limit).await
    }

    /// Queue events for the next tick of the account's session
    pub fn inject(&self, account_id: &str, events: Vec<NotificationEvent>) -> Result<usize> {
        Ok(self.session(account_id)?.inject(events))
    }

    pub fn inject_test_events(&self, account_id: &str) -> Result<usize> {
        self.inject(account_id, sample_events(now_ts()))
    }

    pub fn load_preferences(&self, account_id: &str) -> Result<Preferences> {
        self.store.load(account_id)
    }

    fn update_preferences<F>(&self, account_id: &str, change: F) -> Result<Preferences>
    where
        F: FnOnce(&mut Preferences) -> Result<()>,
    {
        let _guard = self.preference_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut preferences = self.store.load(account_id)?;
        change(&mut preferences)?;
        self.store.save(account_id, &preferences).inspect_err(|e| {
            warn!(account = %account_id, error = %e, "Preference update not saved");
        })?;
        Ok(preferences)
    }

    pub fn get_watched_users(&self, account_id: &str) -> Result<Vec<String>> {
        Ok(self.load_preferences(account_id)?.watched_usernames)
    }

    pub fn add_watched_user(&self, account_id: &str, username: &str) -> Result<Vec<String>> {
        let preferences = self.update_preferences(account_id, |p| p.add_watched_user(username))?;
        Ok(preferences.watched_usernames)
    }

    pub fn remove_watched_user(&self, account_id: &str, username: &str) -> Result<Vec<String>> {
        let preferences = self.update_preferences(account_id, |p| p.remove_watched_user(username))?;
        Ok(preferences.watched_usernames)
    }

    pub fn get_priority_keywords(&self, account_id: &str) -> Result<PriorityKeywords> {
        Ok(self.load_preferences(account_id)?.priority_keywords)
    }

    pub fn add_keyword(&self, account_id: &str, tier: &str, keyword: &str) -> Result<PriorityKeywords> {
        let preferences = self.update_preferences(account_id, |p| p.add_keyword(tier, keyword))?;
        Ok(preferences.priority_keywords)
    }

    pub fn remove_keyword(&self, account_id: &str, tier: &str, keyword: &str) -> Result<PriorityKeywords> {
        let preferences = self.update_preferences(account_id, |p| p.remove_keyword(tier, keyword))?;
        Ok(preferences.priority_keywords)
    }

    pub fn get_settings(&self, account_id: &str) -> Result<Settings> {
        Ok(self.load_preferences(account_id)?.settings)
    }

    pub fn update_settings(&self, account_id: &str, patch: SettingsPatch) -> Result<Settings> {
        let preferences = self.update_preferences(account_id, |p| {
            p.settings.apply(&patch);
            Ok(())
        })?;
        Ok(preferences.settings)
    }

    pub fn starred_messages(&self, account_id: &str) -> Result<StarredList> {
        self.store.load_starred(account_id)
    }

    /// Bookmark a message; starring it again leaves the list unchanged
    pub async fn star_message(&self, account_id: &str, channel_id: &str, ts: &str) -> Result<StarredList> {
        let session = self.session(account_id)?;
        let ctx = session.context();
        let thread = ctx.pool.run(ctx.api.replies(channel_id, ts)).await?;
        let message = thread
            .into_iter()
            .find(|m| m.ts == ts)
            .ok_or_else(|| MonitorError::NotFound(format!("message {} in {}", ts, channel_id)))?;
        let enriched = enrich_messages(&ctx.resolver, vec![message])
            .await
            .pop()
            .ok_or_else(|| MonitorError::NotFound(format!("message {} in {}", ts, channel_id)))?;

        let channel_name = match member_channels(ctx).await {
            Ok(channels) => channels
                .iter()
                .find(|c| c.id == channel_id)
                .map(|c| c.name.clone())
                .unwrap_or_else(|| channel_id.to_string()),
            Err(e) => {
                debug!(account = %account_id, error = %e, "Channel name unavailable for starred message");
                channel_id.to_string()
            }
        };
        let link = permalink(&ctx.account.workspace_url, channel_id, ts);
        let starred = StarredMessage::from_enriched(&enriched, &channel_name, link, now_ts());

        self.update_starred(account_id, |list| {
            if !list.add(starred) {
                debug!(account = %account_id, channel = %channel_id, ts = %ts, "Message already starred");
            }
            Ok(())
        })
    }

    pub fn unstar_message(&self, account_id: &str, message_id: &str) -> Result<StarredList> {
        self.update_starred(account_id, |list| list.remove(message_id))
    }

    fn update_starred<F>(&self, account_id: &str, change: F) -> Result<StarredList>
    where
        F: FnOnce(&mut StarredList) -> Result<()>,
    {
        let _guard = self.preference_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut starred = self.store.load_starred(account_id)?;
        let before = starred.clone();
        change(&mut starred)?;
        if starred != before {
            self.store.save_starred(account_id, &starred)?;
        }
        Ok(starred)
    }
}

impl Drop for MonitorHub {
    fn drop(&mut self) {
        self.cache.shutdown();
    }
}

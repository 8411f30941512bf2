//! One monitoring session's tick
//!
//! A tick reloads preferences when due, drains injected events, scans every
//! member channel plus the DMs since the watermark, advances the watermark
//! and updates pacing. Nothing inside a tick can fail the tick: failures
//! are logged and the affected channel contributes nothing.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::pacing::{AdaptivePacer, Pace};
use crate::config::MonitorConfig;
use crate::notification::NotificationEvent;
use crate::preferences::{PreferenceStore, Preferences};
use crate::scanner::{member_channels, scan_channel, scan_direct_messages, ScanContext, ScanPolicy};

/// Current time as a workspace timestamp
pub fn now_ts() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

/// Externally queued events, emitted ahead of the next tick's scan results
#[derive(Debug, Clone, Default)]
pub struct InjectQueue {
    events: Arc<Mutex<VecDeque<NotificationEvent>>>,
}

impl InjectQueue {
    pub fn push_all(&self, events: impl IntoIterator<Item = NotificationEvent>) -> usize {
        let mut queue = self.events.lock().unwrap_or_else(PoisonError::into_inner);
        let before = queue.len();
        queue.extend(events);
        queue.len() - before
    }

    pub fn drain(&self) -> Vec<NotificationEvent> {
        let mut queue = self.events.lock().unwrap_or_else(PoisonError::into_inner);
        queue.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone)]
pub struct TickOutcome {
    /// Injected events first, then channel results, then DM results
    pub events: Vec<NotificationEvent>,
    pub injected: usize,
    pub scanned_channels: usize,
    pub failed_channels: usize,
    pub watermark: f64,
    pub pace: Pace,
}

pub struct Monitor {
    ctx: ScanContext,
    store: Arc<dyn PreferenceStore>,
    injected: InjectQueue,
    preferences: Option<Preferences>,
    /// Usernames the current watched ids were resolved from
    resolved_usernames: Option<Vec<String>>,
    watched_ids: Vec<String>,
    last_reload: Option<Instant>,
    reload_interval: Duration,
    lookback: f64,
    watermark: f64,
    pacer: AdaptivePacer,
}

impl Monitor {
    pub fn new(
        ctx: ScanContext,
        store: Arc<dyn PreferenceStore>,
        injected: InjectQueue,
        config: &MonitorConfig,
    ) -> Self {
        Self {
            ctx,
            store,
            injected,
            preferences: None,
            resolved_usernames: None,
            watched_ids: Vec::new(),
            last_reload: None,
            reload_interval: config.reload_interval(),
            lookback: config.start_lookback_secs,
            watermark: now_ts() - config.start_lookback_secs,
            pacer: AdaptivePacer::new(config),
        }
    }

    pub fn account_id(&self) -> &str {
        &self.ctx.account.account_id
    }

    /// Reset for a fresh run: watermark back to now minus the look-back window
    pub fn start(&mut self) {
        self.start_at(now_ts());
    }

    pub fn start_at(&mut self, now: f64) {
        self.watermark = now - self.lookback;
        self.pacer.reset();
        self.last_reload = None;
        info!(account = %self.account_id(), watermark = self.watermark, "Monitoring started");
    }

    pub fn watermark(&self) -> f64 {
        self.watermark
    }

    pub fn set_watermark(&mut self, watermark: f64) {
        self.watermark = watermark;
    }

    pub fn pacer(&self) -> &AdaptivePacer {
        &self.pacer
    }

    pub fn watched_ids(&self) -> &[String] {
        &self.watched_ids
    }

    /// Reload preferences if the reload interval has elapsed
    ///
    /// A failed load keeps the previous preferences. The watched ids are
    /// only re-resolved when the username list actually changed, and a
    /// failed directory fetch keeps the previous ids until a later reload
    /// succeeds.
    pub async fn reload_preferences(&mut self, now: Instant) {
        let due = self
            .last_reload
            .map_or(true, |last| now.duration_since(last) >= self.reload_interval);
        if !due {
            return;
        }
        self.last_reload = Some(now);

        match self.store.load(self.account_id()) {
            Ok(preferences) => self.preferences = Some(preferences),
            Err(e) => {
                warn!(account = %self.account_id(), error = %e, "Preference reload failed, keeping previous");
                return;
            }
        }
        let Some(preferences) = &self.preferences else {
            return;
        };

        if self.resolved_usernames.as_ref() != Some(&preferences.watched_usernames) {
            let usernames = preferences.watched_usernames.clone();
            let mut ids = Vec::with_capacity(usernames.len());
            let mut complete = true;
            for username in &usernames {
                match self.ctx.resolver.resolve_username_to_id(username).await {
                    Ok(Some(id)) => ids.push(id),
                    Ok(None) => warn!(account = %self.account_id(), username = %username, "Watched user not found"),
                    Err(e) => {
                        warn!(account = %self.account_id(), username = %username, error = %e, "Watched user lookup failed, keeping previous watch list");
                        complete = false;
                        break;
                    }
                }
            }
            // an incomplete pass leaves the resolved list unset so the next reload retries
            if complete {
                debug!(account = %self.account_id(), watched = ids.len(), "Watched users resolved");
                self.watched_ids = ids;
                self.resolved_usernames = Some(usernames);
            }
        }

        self.ctx = self.ctx.with_policy(Arc::new(ScanPolicy {
            watched_user_ids: self.watched_ids.clone(),
            keywords: preferences.priority_keywords.clone(),
            oracle_enabled: preferences.settings.classifier_enabled,
        }));
    }

    pub async fn tick(&mut self) -> TickOutcome {
        self.reload_preferences(Instant::now()).await;

        let mut events = self.injected.drain();
        let injected = events.len();

        let since = self.watermark;
        let channels = match member_channels(&self.ctx).await {
            Ok(channels) => channels,
            Err(e) => {
                warn!(account = %self.account_id(), error = %e, "Listing member channels failed");
                Arc::new(Vec::new())
            }
        };

        let channel_scans = channels
            .iter()
            .map(|channel| scan_channel(self.ctx.clone(), channel.clone(), since));
        let (channel_results, dm_result) = tokio::join!(
            self.ctx.pool.scatter(channel_scans),
            scan_direct_messages(self.ctx.clone(), since)
        );

        let failed_channels = channel_results.iter().filter(|scan| scan.failed).count();
        let scanned_channels = channel_results.len();
        let mut watermark = self.watermark;
        for scan in channel_results.into_iter().chain(std::iter::once(dm_result)) {
            watermark = watermark.max(scan.local_max);
            events.extend(scan.events);
        }
        self.watermark = watermark;

        let found = events.len() - injected;
        let pace = self.pacer.record(found);
        if found > 0 {
            info!(account = %self.account_id(), found, watermark, "New mentions");
        } else {
            debug!(account = %self.account_id(), pace = %pace, empty_ticks = self.pacer.empty_ticks(), "Quiet tick");
        }

        TickOutcome {
            events,
            injected,
            scanned_channels,
            failed_channels,
            watermark,
            pace,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::sample_events;

    #[test]
    fn test_inject_queue_drains_in_order() {
        let queue = InjectQueue::default();
        assert_eq!(queue.push_all(sample_events(10.0)), 3);
        assert_eq!(queue.len(), 3);
        let drained = queue.drain();
        assert_eq!(drained[0].reason_code(), "direct mention");
        assert_eq!(drained[2].reason_code(), "direct message");
        assert!(queue.is_empty());
    }

    #[test]
    fn test_now_ts_is_epoch_seconds() {
        let now = now_ts();
        assert!(now > 1_600_000_000.0);
        assert!(now < 10_000_000_000.0);
    }
}

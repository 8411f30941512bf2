//! Runtime configuration
//!
//! Loading order:
//! 1. `~/.config/slack-mention-monitor/config.json` (every field optional)
//! 2. Environment overrides `SLACK_API_BASE_URL`, `SMM_DATA_DIR`
//!
//! Oracle credentials are read separately by the classifier from
//! `ANTHROPIC_API_KEY` / `ANTHROPIC_BASE_URL`.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, warn};

use crate::cache::Namespace;

pub const SLACK_API_BASE_URL: &str = "https://slack.com/api";

/// Namespace TTLs in seconds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TtlTable {
    pub user_identity: u64,
    pub bot_identity: u64,
    pub channel_membership: u64,
    pub member_directory: u64,
    pub group_handles: u64,
    pub group_members: u64,
}

impl Default for TtlTable {
    fn default() -> Self {
        Self {
            user_identity: 300,
            bot_identity: 300,
            channel_membership: 300,
            member_directory: 600,
            group_handles: 600,
            group_members: 300,
        }
    }
}

impl TtlTable {
    pub fn ttl(&self, namespace: Namespace) -> Duration {
        let secs = match namespace {
            Namespace::UserIdentity => self.user_identity,
            Namespace::BotIdentity => self.bot_identity,
            Namespace::ChannelMembership => self.channel_membership,
            Namespace::MemberDirectory => self.member_directory,
            Namespace::GroupHandles => self.group_handles,
            Namespace::GroupMembers => self.group_members,
        };
        Duration::from_secs(secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Remote workspace API root
    pub api_base_url: String,
    /// Where per-account preference files live
    pub data_dir: PathBuf,
    /// Connection-establishment timeout (ms)
    pub connect_timeout_ms: u64,
    /// Response timeout (ms)
    pub read_timeout_ms: u64,
    /// Global ceiling on in-flight remote calls
    pub pool_capacity: usize,
    /// Cache sweep period (s)
    pub sweep_interval_secs: u64,
    pub ttl: TtlTable,
    pub pacing_fast_ms: u64,
    pub pacing_normal_ms: u64,
    pub pacing_slow_ms: u64,
    /// Consecutive empty ticks before dropping to normal pacing
    pub normal_after_empty: u32,
    /// Consecutive empty ticks before dropping to slow pacing
    pub slow_after_empty: u32,
    /// Preference reload period (ms)
    pub reload_interval_ms: u64,
    /// Watermark look-back applied on start (s)
    pub start_lookback_secs: f64,
    /// Messages shorter than this never reach the oracle
    pub oracle_min_chars: usize,
    pub oracle_timeout_ms: u64,
    /// History page size for channel scans
    pub channel_scan_limit: u32,
    /// History page size for DM scans
    pub dm_scan_limit: u32,
    /// Poll period of a live channel tail (ms)
    pub channel_stream_interval_ms: u64,
    /// Back-off after a failed tail poll (ms)
    pub channel_stream_retry_ms: u64,
    /// How far back a new tail starts (s)
    pub channel_stream_lookback_secs: f64,
    /// History page size per tail poll
    pub channel_stream_limit: u32,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            api_base_url: SLACK_API_BASE_URL.to_string(),
            data_dir: default_data_dir(),
            connect_timeout_ms: 5_000,
            read_timeout_ms: 10_000,
            pool_capacity: 10,
            sweep_interval_secs: 600,
            ttl: TtlTable::default(),
            pacing_fast_ms: 200,
            pacing_normal_ms: 500,
            pacing_slow_ms: 800,
            normal_after_empty: 3,
            slow_after_empty: 6,
            reload_interval_ms: 5_000,
            start_lookback_secs: 10.0,
            oracle_min_chars: 20,
            oracle_timeout_ms: 5_000,
            channel_scan_limit: 100,
            dm_scan_limit: 50,
            channel_stream_interval_ms: 1_500,
            channel_stream_retry_ms: 5_000,
            channel_stream_lookback_secs: 10.0,
            channel_stream_limit: 5,
        }
    }
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("slack-mention-monitor")
        .join("user_data")
}

impl MonitorConfig {
    pub fn config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".config/slack-mention-monitor/config.json"))
    }

    /// Load from the config file and environment, falling back to defaults
    pub fn auto_load() -> Result<Self> {
        let mut config = match Self::config_path() {
            Some(path) if path.exists() => {
                let content = fs::read_to_string(&path)?;
                match serde_json::from_str::<MonitorConfig>(&content) {
                    Ok(config) => {
                        debug!(path = %path.display(), "Loaded monitor config");
                        config
                    }
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "Invalid config file, using defaults");
                        MonitorConfig::default()
                    }
                }
            }
            _ => MonitorConfig::default(),
        };

        if let Ok(url) = std::env::var("SLACK_API_BASE_URL") {
            if !url.is_empty() {
                config.api_base_url = url;
            }
        }
        if let Ok(dir) = std::env::var("SMM_DATA_DIR") {
            if !dir.is_empty() {
                config.data_dir = PathBuf::from(dir);
            }
        }

        Ok(config)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn reload_interval(&self) -> Duration {
        Duration::from_millis(self.reload_interval_ms)
    }

    pub fn oracle_timeout(&self) -> Duration {
        Duration::from_millis(self.oracle_timeout_ms)
    }

    pub fn channel_stream_interval(&self) -> Duration {
        Duration::from_millis(self.channel_stream_interval_ms)
    }

    pub fn channel_stream_retry(&self) -> Duration {
        Duration::from_millis(self.channel_stream_retry_ms)
    }
}

//! Two-stage priority classifier
//!
//! The keyword stage always runs. The oracle stage only sees messages the
//! keyword stage left at `normal`, longer than the configured minimum, and
//! only when the account has it enabled. Oracle failures fall back to the
//! keyword result.

pub mod keywords;
pub mod oracle;
pub mod priority;

pub use keywords::{PriorityKeywords, DEFAULT_REASON};
pub use oracle::{AnthropicOracle, OracleConfig, PriorityOracle};
pub use priority::{Classification, Priority};

use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::config::MonitorConfig;

#[derive(Clone)]
pub struct PriorityClassifier {
    oracle: Option<Arc<dyn PriorityOracle>>,
    min_chars: usize,
    timeout: Duration,
}

impl PriorityClassifier {
    pub fn new(oracle: Option<Arc<dyn PriorityOracle>>, config: &MonitorConfig) -> Self {
        Self {
            oracle,
            min_chars: config.oracle_min_chars,
            timeout: config.oracle_timeout(),
        }
    }

    /// Keyword stage only
    pub fn keywords_only(config: &MonitorConfig) -> Self {
        Self::new(None, config)
    }

    pub fn has_oracle(&self) -> bool {
        self.oracle.is_some()
    }

    pub async fn classify(
        &self,
        text: &str,
        sender: &str,
        channel: &str,
        keywords: &PriorityKeywords,
        oracle_enabled: bool,
    ) -> Classification {
        let by_keyword = keywords.classify(text);

        let oracle = match &self.oracle {
            Some(oracle) if oracle_enabled => oracle,
            _ => return by_keyword,
        };
        if by_keyword.priority != Priority::Normal || text.chars().count() <= self.min_chars {
            return by_keyword;
        }

        match tokio::time::timeout(self.timeout, oracle.classify(text, sender, channel)).await {
            Ok(Ok(verdict)) => Classification::new(verdict.priority, format!("AI: {}", verdict.reason)),
            Ok(Err(e)) => {
                debug!(error = %e, "Oracle failed, keeping keyword result");
                by_keyword
            }
            Err(_) => {
                debug!(timeout_ms = self.timeout.as_millis(), "Oracle timed out, keeping keyword result");
                by_keyword
            }
        }
    }
}

//! Priority tiers
//!
//! - CRITICAL: needs action now (outage, bug, urgent request)
//! - HIGH: needs a quick answer (review, approval, deadline)
//! - NORMAL: informational
//! - LOW: chatter, only reachable through the oracle stage

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Critical,
    High,
    Normal,
    Low,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Priority {
    pub const KEYWORD_TIERS: [Priority; 3] = [Priority::Critical, Priority::High, Priority::Normal];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Critical => "critical",
            Priority::High => "high",
            Priority::Normal => "normal",
            Priority::Low => "low",
        }
    }

    /// Parse a tier name, case-insensitive
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "critical" => Some(Priority::Critical),
            "high" => Some(Priority::High),
            "normal" => Some(Priority::Normal),
            "low" => Some(Priority::Low),
            _ => None,
        }
    }
}

/// Classifier output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub priority: Priority,
    pub reason: String,
}

impl Classification {
    pub fn new(priority: Priority, reason: impl Into<String>) -> Self {
        Self {
            priority,
            reason: reason.into(),
        }
    }
}

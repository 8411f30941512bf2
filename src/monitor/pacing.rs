//! Adaptive tick pacing
//!
//! Any event-bearing tick snaps back to fast pacing. Consecutive empty ticks
//! step down to normal, then slow.

use std::time::Duration;

use crate::config::MonitorConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pace {
    Fast,
    Normal,
    Slow,
}

impl std::fmt::Display for Pace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Pace::Fast => "fast",
            Pace::Normal => "normal",
            Pace::Slow => "slow",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone)]
pub struct AdaptivePacer {
    empty_ticks: u32,
    pace: Pace,
    normal_after: u32,
    slow_after: u32,
    fast: Duration,
    normal: Duration,
    slow: Duration,
}

impl AdaptivePacer {
    pub fn new(config: &MonitorConfig) -> Self {
        Self {
            empty_ticks: 0,
            pace: Pace::Fast,
            normal_after: config.normal_after_empty,
            slow_after: config.slow_after_empty,
            fast: Duration::from_millis(config.pacing_fast_ms),
            normal: Duration::from_millis(config.pacing_normal_ms),
            slow: Duration::from_millis(config.pacing_slow_ms),
        }
    }

    /// Feed the outcome of one tick, returns the new pace
    pub fn record(&mut self, events: usize) -> Pace {
        if events > 0 {
            self.empty_ticks = 0;
            self.pace = Pace::Fast;
        } else {
            self.empty_ticks = self.empty_ticks.saturating_add(1);
            if self.empty_ticks >= self.slow_after {
                self.pace = Pace::Slow;
            } else if self.empty_ticks >= self.normal_after {
                self.pace = Pace::Normal;
            }
        }
        self.pace
    }

    pub fn pace(&self) -> Pace {
        self.pace
    }

    pub fn empty_ticks(&self) -> u32 {
        self.empty_ticks
    }

    /// Sleep before the next tick
    pub fn interval(&self) -> Duration {
        match self.pace {
            Pace::Fast => self.fast,
            Pace::Normal => self.normal,
            Pace::Slow => self.slow,
        }
    }

    pub fn reset(&mut self) {
        self.empty_ticks = 0;
        self.pace = Pace::Fast;
    }
}

impl Default for AdaptivePacer {
    fn default() -> Self {
        Self::new(&MonitorConfig::default())
    }
}

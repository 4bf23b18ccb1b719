//! Threshold and cooldown decision for alert notices
//!
//! ```text
//! cpu <= limit && memory <= limit      → AlertEvaluation::Normal     (state unchanged)
//! limit exceeded, cooldown running     → AlertEvaluation::Suppressed (state unchanged)
//! limit exceeded, no alert / expired   → AlertEvaluation::Fire       (last alert = now)
//! ```
//!
//! Suppressed alerts are dropped, not queued.

use std::time::Duration;

use tokio::time::Instant;

use crate::{MetricsSnapshot, config::AlertThresholds};

/// Time of the last alert that was actually raised
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CooldownState {
    last_alert: Option<Instant>,
}

impl CooldownState {
    pub fn never_alerted() -> Self {
        Self::default()
    }

    pub fn last_alert(&self) -> Option<Instant> {
        self.last_alert
    }

    /// Whether a new alert would still be blocked at `now`.
    ///
    /// A gap of exactly `cooldown` is no longer blocked.
    pub fn is_cooling_down(&self, now: Instant, cooldown: Duration) -> bool {
        match self.last_alert {
            Some(last) => now.saturating_duration_since(last) < cooldown,
            None => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertEvaluation {
    Normal,
    Fire,
    Suppressed,
}

impl AlertEvaluation {
    pub fn evaluate(
        snapshot: Option<&MetricsSnapshot>,
        thresholds: &AlertThresholds,
        state: CooldownState,
        now: Instant,
    ) -> (AlertEvaluation, CooldownState) {
        let Some(snapshot) = snapshot else {
            return (AlertEvaluation::Normal, state);
        };

        if !exceeds_thresholds(snapshot, thresholds) {
            return (AlertEvaluation::Normal, state);
        }

        if state.is_cooling_down(now, thresholds.cooldown) {
            return (AlertEvaluation::Suppressed, state);
        }

        (
            AlertEvaluation::Fire,
            CooldownState {
                last_alert: Some(now),
            },
        )
    }

    pub fn should_alert(self) -> bool {
        self == AlertEvaluation::Fire
    }
}

/// Strictly greater than: a value equal to its limit is not a breach.
pub fn exceeds_thresholds(snapshot: &MetricsSnapshot, thresholds: &AlertThresholds) -> bool {
    snapshot.cpu_percent > thresholds.cpu_threshold
        || snapshot.memory_percent > thresholds.memory_threshold
}

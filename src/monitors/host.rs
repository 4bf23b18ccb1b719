//! MonitorLoop - samples the host, raises alerts and reports on a fixed interval
//!
//! ## Cycle
//!
//! ```text
//! sample ──failed──────────────────────────────────────┐
//!    │                                                 │
//!    └─ok─→ evaluate policy ─→ (alert) ─→ send ─→ sleep(interval) ─→ repeat
//! ```
//!
//! The sleep always lasts the full interval, so the effective period is the
//! cycle's own duration plus the interval. Failures never end the loop; only
//! the cancellation token does.

use std::time::Duration;

use tokio::time::{Instant, sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, trace};

use crate::{
    MetricsSnapshot,
    alerts::AlertManager,
    config::AlertThresholds,
    error::{MonitorError, MonitorResult},
    reporter::Reporter,
    sampler::MetricsSource,
};

use super::policy::{AlertEvaluation, CooldownState};

const DEFAULT_SAMPLE_TIMEOUT: Duration = Duration::from_secs(30);

/// What happened during a single cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// No snapshot could be taken; policy and reporter were skipped
    SampleFailed,

    /// A snapshot was evaluated and handed to the reporter
    Reported {
        evaluation: AlertEvaluation,
        delivered: bool,
    },
}

/// Owns the cooldown state and drives the sample/evaluate/send cycle
pub struct MonitorLoop<S, R> {
    source: S,
    reporter: R,
    thresholds: AlertThresholds,
    interval: Duration,
    sample_timeout: Duration,
    alert_manager: AlertManager,
    cooldown: CooldownState,
}

impl<S, R> MonitorLoop<S, R>
where
    S: MetricsSource,
    R: Reporter,
{
    pub fn new(source: S, reporter: R, thresholds: AlertThresholds, interval: Duration) -> Self {
        Self {
            source,
            reporter,
            thresholds,
            interval,
            sample_timeout: DEFAULT_SAMPLE_TIMEOUT,
            alert_manager: AlertManager::log_only(),
            cooldown: CooldownState::never_alerted(),
        }
    }

    pub fn with_sample_timeout(mut self, sample_timeout: Duration) -> Self {
        self.sample_timeout = sample_timeout;
        self
    }

    pub fn with_alert_manager(mut self, alert_manager: AlertManager) -> Self {
        self.alert_manager = alert_manager;
        self
    }

    pub fn cooldown(&self) -> CooldownState {
        self.cooldown
    }

    /// Run cycles until `shutdown` is cancelled.
    ///
    /// A cancellation during the sleep wakes the loop immediately. A cycle
    /// that is already running is finished first; no final report is sent.
    #[instrument(skip_all, fields(interval = ?self.interval))]
    pub async fn run(mut self, shutdown: CancellationToken) {
        info!("starting host monitor");

        loop {
            if shutdown.is_cancelled() {
                break;
            }

            let outcome = self.run_cycle().await;
            trace!("cycle finished: {outcome:?}");

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = sleep(self.interval) => {}
            }
        }

        info!("host monitor stopped");
    }

    /// Run exactly one sample → evaluate → send cycle, without the sleep.
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        let snapshot = match self.sample().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!("{e}");
                return CycleOutcome::SampleFailed;
            }
        };

        info!(
            "metrics collected at {}: CPU {:.1}%, memory {:.1}%, disk {:.1}%",
            snapshot.timestamp.to_rfc3339(),
            snapshot.cpu_percent,
            snapshot.memory_percent,
            snapshot.disk_percent
        );

        let evaluation = self.evaluate(&snapshot);

        let delivered = match self.reporter.send(&snapshot).await {
            Ok(()) => true,
            Err(e) => {
                error!("failed to send metrics: {e}");
                false
            }
        };

        CycleOutcome::Reported {
            evaluation,
            delivered,
        }
    }

    async fn sample(&self) -> MonitorResult<MetricsSnapshot> {
        timeout(self.sample_timeout, self.source.sample())
            .await
            .map_err(|_| MonitorError::SamplingTimedOut(self.sample_timeout))?
    }

    fn evaluate(&mut self, snapshot: &MetricsSnapshot) -> AlertEvaluation {
        let (evaluation, cooldown) = AlertEvaluation::evaluate(
            Some(snapshot),
            &self.thresholds,
            self.cooldown,
            Instant::now(),
        );

        match evaluation {
            AlertEvaluation::Normal => {}
            AlertEvaluation::Fire => {
                self.cooldown = cooldown;
                self.alert_manager.notify(snapshot, &self.thresholds);
            }
            AlertEvaluation::Suppressed => {
                debug!("thresholds exceeded but alert is cooling down");
            }
        }

        evaluation
    }
}

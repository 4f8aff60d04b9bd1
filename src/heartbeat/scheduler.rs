//! Fixed-interval heartbeat loop.
//!
//! # Responsibilities
//! - Wait for the registry's first pass, then tick immediately and every
//!   `heartbeat.interval_secs` after
//! - Post a fresh health snapshot on every tick
//! - Exit on cancellation, checked between ticks only

use std::time::Duration;

use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::health::HealthService;
use crate::heartbeat::{ManagementClient, Report, ReportError};
use crate::observability::metrics;

pub struct HeartbeatScheduler {
    health: HealthService,
    client: ManagementClient,
    interval: Duration,
}

impl HeartbeatScheduler {
    pub fn new(health: HealthService, client: ManagementClient, interval: Duration) -> Self {
        Self {
            health,
            client,
            interval,
        }
    }

    pub async fn run(self, cancel: CancellationToken) {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            _ = self.health.registry().wait_ready() => {}
        }

        tracing::info!(
            interval_secs = self.interval.as_secs(),
            app_id = %self.health.identity().app_id(),
            "Heartbeat scheduler starting"
        );

        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::info!("Heartbeat scheduler received shutdown signal, exiting loop");
                    break;
                }
                _ = ticker.tick() => {
                    // Runs to completion even if cancellation arrives meanwhile.
                    let _ = self.beat().await;
                }
            }
        }
    }

    /// Send one heartbeat. Failures are logged and counted.
    pub async fn beat(&self) -> Result<(), ReportError> {
        let snapshot = self.health.snapshot().await;
        let overall = snapshot.service_status.overall;
        let report = Report::from(snapshot);

        let result = self.client.send_heartbeat(&report).await;
        metrics::record_heartbeat(result.is_ok());

        match &result {
            Ok(()) => tracing::debug!(overall = ?overall, "Heartbeat sent"),
            Err(e) => tracing::warn!(error = %e, "Heartbeat failed"),
        }
        result
    }
}

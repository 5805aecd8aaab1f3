//! Dispatch loop: delivers pending records once they fall due.

use std::sync::Arc;
use std::time::Duration;

use insync_core::error::StoreError;
use insync_core::status::NotificationStatus;
use tokio_util::sync::CancellationToken;

use crate::config::EngineConfig;
use crate::deliverer::{Deliverer, TickReport};

// ---------------------------------------------------------------------------
// DispatchLoop
// ---------------------------------------------------------------------------

/// Background service that claims due `Pending` records and delivers them.
pub struct DispatchLoop {
    deliverer: Arc<Deliverer>,
    interval: Duration,
    batch_size: i64,
    concurrency: usize,
}

impl DispatchLoop {
    pub fn new(deliverer: Arc<Deliverer>, config: &EngineConfig) -> Self {
        Self {
            deliverer,
            interval: config.dispatch_interval,
            batch_size: config.batch_size,
            concurrency: config.concurrency,
        }
    }

    /// Run the dispatch loop until `cancel` fires.
    ///
    /// The first tick runs immediately. A failing tick is logged and the
    /// loop carries on with the next one.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        tracing::info!(interval_secs = self.interval.as_secs(), "Dispatch loop started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Dispatch loop cancelled");
                    break;
                }
                _ = interval.tick() => {
                    if let Err(e) = self.tick().await {
                        tracing::error!(error = %e, "Dispatch tick failed");
                    }
                }
            }
        }
    }

    /// One pass: list due records and deliver them.
    pub async fn tick(&self) -> Result<TickReport, StoreError> {
        let now = self.deliverer.clock().utc();
        let due = self.deliverer.store().list_due(now, self.batch_size).await?;
        if due.is_empty() {
            tracing::debug!("No due notifications");
            return Ok(TickReport::default());
        }

        let ids = due.into_iter().map(|r| r.id).collect();
        let report = self
            .deliverer
            .process_batch(ids, NotificationStatus::Pending, self.concurrency)
            .await;

        tracing::info!(
            sent = report.sent,
            failed = report.failed,
            abandoned = report.abandoned,
            skipped = report.skipped,
            errors = report.errors,
            "Dispatch tick complete"
        );
        Ok(report)
    }
}

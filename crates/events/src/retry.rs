//! Retry loop: re-attempts failed records and recovers interrupted claims.

use std::sync::Arc;
use std::time::Duration;

use insync_core::error::StoreError;
use insync_core::status::NotificationStatus;
use tokio_util::sync::CancellationToken;

use crate::config::EngineConfig;
use crate::deliverer::{Deliverer, TickReport};

/// Outcome of one retry pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryReport {
    /// Stale `Sending` claims moved back to `Failed` (or `Abandoned`).
    pub released: u64,
    pub deliveries: TickReport,
}

// ---------------------------------------------------------------------------
// RetryLoop
// ---------------------------------------------------------------------------

/// Background service that claims `Failed` records and delivers them again.
pub struct RetryLoop {
    deliverer: Arc<Deliverer>,
    interval: Duration,
    batch_size: i64,
    concurrency: usize,
    claim_lease: Duration,
}

impl RetryLoop {
    pub fn new(deliverer: Arc<Deliverer>, config: &EngineConfig) -> Self {
        Self {
            deliverer,
            interval: config.retry_interval,
            batch_size: config.batch_size,
            concurrency: config.concurrency,
            claim_lease: config.claim_lease,
        }
    }

    /// Run the retry loop until `cancel` fires.
    ///
    /// The first tick is delayed by one period so start-up does not race
    /// the dispatch loop's first pass.
    pub async fn run(&self, cancel: CancellationToken) {
        let start = tokio::time::Instant::now() + self.interval;
        let mut interval = tokio::time::interval_at(start, self.interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        tracing::info!(interval_secs = self.interval.as_secs(), "Retry loop started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Retry loop cancelled");
                    break;
                }
                _ = interval.tick() => {
                    if let Err(e) = self.tick().await {
                        tracing::error!(error = %e, "Retry tick failed");
                    }
                }
            }
        }
    }

    /// One pass: release stale claims, then redeliver failed records.
    pub async fn tick(&self) -> Result<RetryReport, StoreError> {
        let now = self.deliverer.clock().utc();
        let store = self.deliverer.store();

        let cutoff = chrono::Duration::from_std(self.claim_lease)
            .ok()
            .and_then(|lease| now.checked_sub_signed(lease));
        let released = match cutoff {
            Some(cutoff) => {
                store
                    .release_stale_claims(cutoff, self.deliverer.max_attempts(), now)
                    .await?
            }
            None => 0,
        };
        if released > 0 {
            tracing::warn!(released, "Released interrupted delivery claims");
        }

        let failed = store
            .list_by_status(NotificationStatus::Failed, self.batch_size)
            .await?;
        if failed.is_empty() {
            tracing::debug!("No failed notifications to retry");
            return Ok(RetryReport {
                released,
                deliveries: TickReport::default(),
            });
        }

        let ids = failed.into_iter().map(|r| r.id).collect();
        let deliveries = self
            .deliverer
            .process_batch(ids, NotificationStatus::Failed, self.concurrency)
            .await;

        tracing::info!(
            released,
            sent = deliveries.sent,
            failed = deliveries.failed,
            abandoned = deliveries.abandoned,
            skipped = deliveries.skipped,
            "Retry tick complete"
        );
        Ok(RetryReport {
            released,
            deliveries,
        })
    }
}

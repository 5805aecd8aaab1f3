//! Single-record delivery executor shared by both loops and the coordinator.
//!
//! A delivery attempt is: claim (conditional move to `Sending`), resolve
//! the recipient, call the channel transport under a timeout, then record
//! the outcome. Only the claim winner ever calls a transport, which is what
//! keeps concurrent loops from double-sending.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use insync_core::clock::Clock;
use insync_core::error::StoreError;
use insync_core::notification::{Channel, NotificationRecord};
use insync_core::phone;
use insync_core::status::NotificationStatus;
use insync_core::store::{Directory, FailOutcome, NotificationStore};
use insync_core::types::DbId;

use crate::config::EngineConfig;
use crate::delivery::{DeliveryError, Transports};

/// Result of processing one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Sent,
    /// Failed and left for the retry loop.
    Failed,
    /// Failed and hit the attempt cap.
    Abandoned,
    /// Someone else claimed, sent or cancelled the record first.
    Skipped,
}

/// Tally of one batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub sent: usize,
    pub failed: usize,
    pub abandoned: usize,
    pub skipped: usize,
    /// Store errors; the record stays where it was.
    pub errors: usize,
}

impl TickReport {
    fn record(&mut self, outcome: Result<DeliveryOutcome, StoreError>) {
        match outcome {
            Ok(DeliveryOutcome::Sent) => self.sent += 1,
            Ok(DeliveryOutcome::Failed) => self.failed += 1,
            Ok(DeliveryOutcome::Abandoned) => self.abandoned += 1,
            Ok(DeliveryOutcome::Skipped) => self.skipped += 1,
            Err(_) => self.errors += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.sent + self.failed + self.abandoned + self.skipped + self.errors
    }
}

pub struct Deliverer {
    store: Arc<dyn NotificationStore>,
    directory: Arc<dyn Directory>,
    transports: Transports,
    clock: Arc<dyn Clock>,
    send_timeout: Duration,
    max_attempts: i32,
    country_code: String,
}

impl Deliverer {
    pub fn new(
        store: Arc<dyn NotificationStore>,
        directory: Arc<dyn Directory>,
        transports: Transports,
        clock: Arc<dyn Clock>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            store,
            directory,
            transports,
            clock,
            send_timeout: config.send_timeout,
            max_attempts: config.max_attempts,
            country_code: config.default_country_code.clone(),
        }
    }

    pub fn store(&self) -> &Arc<dyn NotificationStore> {
        &self.store
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn max_attempts(&self) -> i32 {
        self.max_attempts
    }

    /// Claim record `id` out of `from` and run one delivery attempt.
    pub async fn process(
        &self,
        id: DbId,
        from: NotificationStatus,
    ) -> Result<DeliveryOutcome, StoreError> {
        let Some(record) = self.store.claim(id, from, self.clock.utc()).await? else {
            tracing::debug!(notification_id = id, from = %from, "Record no longer claimable, skipping");
            return Ok(DeliveryOutcome::Skipped);
        };

        match self.attempt(&record).await {
            Ok(()) => {
                if self.store.complete(record.id, self.clock.utc()).await? {
                    tracing::info!(
                        notification_id = record.id,
                        meeting_id = record.meeting_id,
                        user_id = record.user_id,
                        kind = %record.kind,
                        channel = %record.channel,
                        "Notification sent"
                    );
                    Ok(DeliveryOutcome::Sent)
                } else {
                    tracing::warn!(
                        notification_id = record.id,
                        meeting_id = record.meeting_id,
                        "Record cancelled or released during delivery"
                    );
                    Ok(DeliveryOutcome::Skipped)
                }
            }
            Err(e) => {
                let message = e.to_string();
                let outcome = self
                    .store
                    .fail(record.id, &message, self.max_attempts, self.clock.utc())
                    .await?;
                tracing::warn!(
                    notification_id = record.id,
                    meeting_id = record.meeting_id,
                    user_id = record.user_id,
                    channel = %record.channel,
                    attempts = record.attempts,
                    error = %e,
                    "Notification delivery failed"
                );
                Ok(match outcome {
                    FailOutcome::Retryable => DeliveryOutcome::Failed,
                    FailOutcome::Abandoned => {
                        tracing::error!(
                            notification_id = record.id,
                            attempts = record.attempts,
                            "Notification abandoned after reaching attempt cap"
                        );
                        DeliveryOutcome::Abandoned
                    }
                    FailOutcome::NotClaimed => DeliveryOutcome::Skipped,
                })
            }
        }
    }

    /// Process `ids` with at most `concurrency` deliveries in flight.
    pub async fn process_batch(
        &self,
        ids: Vec<DbId>,
        from: NotificationStatus,
        concurrency: usize,
    ) -> TickReport {
        futures::stream::iter(ids)
            .map(|id| async move {
                let outcome = self.process(id, from).await;
                if let Err(e) = &outcome {
                    tracing::error!(notification_id = id, error = %e, "Store error during delivery");
                }
                outcome
            })
            .buffer_unordered(concurrency.max(1))
            .fold(TickReport::default(), |mut report, outcome| async move {
                report.record(outcome);
                report
            })
            .await
    }

    async fn attempt(&self, record: &NotificationRecord) -> Result<(), DeliveryError> {
        if !self.directory.meeting_exists(record.meeting_id).await? {
            return Err(DeliveryError::MeetingNotFound(record.meeting_id));
        }
        let recipient = self
            .directory
            .find_recipient(record.user_id)
            .await?
            .ok_or(DeliveryError::RecipientNotFound(record.user_id))?;

        let send = async {
            match record.channel {
                Channel::Email => {
                    self.transports
                        .email
                        .send(&recipient.email, &record.title, &record.body)
                        .await
                }
                Channel::Sms => {
                    let raw = recipient
                        .phone
                        .as_deref()
                        .filter(|p| !p.trim().is_empty())
                        .ok_or(DeliveryError::MissingPhone(record.user_id))?;
                    if !phone::is_valid_phone(raw) {
                        return Err(DeliveryError::InvalidPhone(raw.to_string()));
                    }
                    let to = phone::to_e164(raw, &self.country_code)
                        .filter(|n| phone::is_e164(n))
                        .ok_or_else(|| DeliveryError::InvalidPhone(raw.to_string()))?;
                    self.transports.sms.send(&to, &record.body).await
                }
                Channel::Push | Channel::InApp => {
                    self.transports
                        .push
                        .send(record.user_id, &record.title, &record.body)
                        .await
                }
            }
        };

        tokio::time::timeout(self.send_timeout, send)
            .await
            .map_err(|_| DeliveryError::Timeout(self.send_timeout))?
    }
}

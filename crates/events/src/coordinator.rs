//! Lifecycle coordinator.
//!
//! Called by the meeting service after each meeting mutation. It never
//! fails the caller: planning problems and store errors are logged and
//! reflected in the returned [`CoordinatorReport`], and delivery outcomes
//! are only visible through record status.

use std::sync::Arc;

use insync_core::clock::Clock;
use insync_core::notification::{Channel, NewNotification, NotificationKind};
use insync_core::planner;
use insync_core::status::NotificationStatus;
use insync_core::store::NotificationStore;
use insync_core::types::{DbId, MeetingSnapshot, Recipient, Timestamp};

use crate::config::EngineConfig;
use crate::deliverer::{Deliverer, TickReport};
use crate::preferences::PreferenceService;

/// What a lifecycle call did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CoordinatorReport {
    /// New records persisted, immediate notices included.
    pub scheduled: usize,
    /// Existing records moved to `Cancelled`.
    pub cancelled: u64,
    /// Immediate notices delivered.
    pub sent: usize,
    /// Immediate notices that failed (left for the retry loop or abandoned),
    /// plus store errors.
    pub failed: usize,
    /// Records not created or delivered because an equivalent one already
    /// exists or was claimed elsewhere.
    pub skipped: usize,
}

impl CoordinatorReport {
    fn absorb(&mut self, deliveries: TickReport) {
        self.sent += deliveries.sent;
        self.failed += deliveries.failed + deliveries.abandoned + deliveries.errors;
        self.skipped += deliveries.skipped;
    }
}

pub struct LifecycleCoordinator {
    store: Arc<dyn NotificationStore>,
    preferences: PreferenceService,
    deliverer: Arc<Deliverer>,
    clock: Arc<dyn Clock>,
    concurrency: usize,
}

impl LifecycleCoordinator {
    pub fn new(
        store: Arc<dyn NotificationStore>,
        preferences: PreferenceService,
        deliverer: Arc<Deliverer>,
        clock: Arc<dyn Clock>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            store,
            preferences,
            deliverer,
            clock,
            concurrency: config.concurrency,
        }
    }

    // -----------------------------------------------------------------------
    // Lifecycle events
    // -----------------------------------------------------------------------

    /// Plan reminders and start/end notices for the host and any
    /// participants the meeting already has.
    pub async fn on_meeting_created(&self, meeting: &MeetingSnapshot) -> CoordinatorReport {
        let mut report = CoordinatorReport::default();
        self.schedule(meeting, &meeting.recipients(), &mut report).await;
        tracing::info!(meeting_id = meeting.id, scheduled = report.scheduled, "Meeting created");
        report
    }

    /// Plan the remaining timeline for one newly joined participant.
    pub async fn on_participant_joined(
        &self,
        meeting: &MeetingSnapshot,
        participant: &Recipient,
    ) -> CoordinatorReport {
        let mut report = CoordinatorReport::default();
        self.schedule(meeting, std::slice::from_ref(participant), &mut report)
            .await;
        tracing::info!(
            meeting_id = meeting.id,
            user_id = participant.user_id,
            scheduled = report.scheduled,
            skipped = report.skipped,
            "Participant joined"
        );
        report
    }

    /// Cancel outstanding records, re-plan against the new times and send
    /// `Rescheduled` notices right away.
    pub async fn on_meeting_rescheduled(
        &self,
        meeting: &MeetingSnapshot,
        new_start: Timestamp,
        new_end: Option<Timestamp>,
    ) -> CoordinatorReport {
        let mut report = CoordinatorReport::default();
        self.cancel_outstanding(meeting.id, &mut report).await;

        let mut updated = meeting.clone();
        updated.start = Some(new_start);
        updated.end = new_end;

        self.schedule(&updated, &updated.recipients(), &mut report)
            .await;
        self.notify_now(&updated, NotificationKind::Rescheduled, &mut report)
            .await;

        tracing::info!(
            meeting_id = meeting.id,
            cancelled = report.cancelled,
            scheduled = report.scheduled,
            sent = report.sent,
            failed = report.failed,
            "Meeting rescheduled"
        );
        report
    }

    /// Cancel outstanding records and send `Cancelled` notices right away.
    pub async fn on_meeting_cancelled(&self, meeting: &MeetingSnapshot) -> CoordinatorReport {
        let mut report = CoordinatorReport::default();
        self.cancel_outstanding(meeting.id, &mut report).await;
        self.notify_now(meeting, NotificationKind::Cancelled, &mut report)
            .await;

        tracing::info!(
            meeting_id = meeting.id,
            cancelled = report.cancelled,
            sent = report.sent,
            failed = report.failed,
            "Meeting cancelled"
        );
        report
    }

    /// Cancel outstanding records without notifying anyone.
    pub async fn on_meeting_deleted(&self, meeting_id: DbId) -> CoordinatorReport {
        let mut report = CoordinatorReport::default();
        self.cancel_outstanding(meeting_id, &mut report).await;
        tracing::info!(meeting_id, cancelled = report.cancelled, "Meeting deleted");
        report
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    async fn schedule(
        &self,
        meeting: &MeetingSnapshot,
        recipients: &[Recipient],
        report: &mut CoordinatorReport,
    ) {
        let user_ids: Vec<DbId> = recipients.iter().map(|r| r.user_id).collect();
        let matrices = self.preferences.resolve_many(&user_ids).await;
        let is_enabled = |user_id: DbId, kind: NotificationKind, channel: Channel| {
            matrices
                .get(&user_id)
                .is_some_and(|m| m.is_enabled(kind, channel))
        };

        let planned = match planner::plan_scheduled(meeting, recipients, self.clock.utc(), is_enabled)
        {
            Ok(planned) => planned,
            Err(e) => {
                tracing::info!(meeting_id = meeting.id, error = %e, "Nothing to schedule");
                return;
            }
        };

        self.persist(&planned, report).await;
    }

    /// Persist immediate notices for every recipient, then deliver them in
    /// the same call.
    async fn notify_now(
        &self,
        meeting: &MeetingSnapshot,
        kind: NotificationKind,
        report: &mut CoordinatorReport,
    ) {
        debug_assert!(kind.is_immediate(), "{kind} is planned against the timeline");
        let user_ids: Vec<DbId> = meeting.recipients().iter().map(|r| r.user_id).collect();
        let matrices = self.preferences.resolve_many(&user_ids).await;
        let is_enabled = |user_id: DbId, kind: NotificationKind, channel: Channel| {
            matrices
                .get(&user_id)
                .is_some_and(|m| m.is_enabled(kind, channel))
        };

        let planned = planner::plan_immediate(meeting, kind, self.clock.utc(), is_enabled);
        let ids = self.persist(&planned, report).await;
        if ids.is_empty() {
            return;
        }

        let deliveries = self
            .deliverer
            .process_batch(ids, NotificationStatus::Pending, self.concurrency)
            .await;
        report.absorb(deliveries);
    }

    /// Insert planned records, returning the ids that were actually created.
    async fn persist(
        &self,
        planned: &[NewNotification],
        report: &mut CoordinatorReport,
    ) -> Vec<DbId> {
        let now = self.clock.utc();
        let mut ids = Vec::with_capacity(planned.len());
        for new in planned {
            match self.store.insert(new, now).await {
                Ok(Some(record)) => {
                    report.scheduled += 1;
                    ids.push(record.id);
                }
                Ok(None) => {
                    tracing::debug!(
                        meeting_id = new.meeting_id,
                        user_id = new.user_id,
                        kind = %new.kind,
                        channel = %new.channel,
                        "Active notification already exists, skipping"
                    );
                    report.skipped += 1;
                }
                Err(e) => {
                    tracing::error!(
                        meeting_id = new.meeting_id,
                        user_id = new.user_id,
                        kind = %new.kind,
                        channel = %new.channel,
                        error = %e,
                        "Failed to persist notification"
                    );
                    report.failed += 1;
                }
            }
        }
        ids
    }

    async fn cancel_outstanding(&self, meeting_id: DbId, report: &mut CoordinatorReport) {
        match self.store.cancel_for_meeting(meeting_id, self.clock.utc()).await {
            Ok(cancelled) => report.cancelled += cancelled,
            Err(e) => {
                tracing::error!(meeting_id, error = %e, "Failed to cancel notifications");
                report.failed += 1;
            }
        }
    }
}

//! In-memory store implementations.
//!
//! Same conditional-update semantics as the Postgres adapters, guarded by a
//! single mutex per store. Used by the engine's tests and for running the
//! worker without a database.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use insync_core::error::StoreError;
use insync_core::notification::{NewNotification, NotificationKind, NotificationRecord};
use insync_core::preferences::PreferenceMatrix;
use insync_core::status::NotificationStatus;
use insync_core::store::{Directory, FailOutcome, NotificationStore, PreferenceStore};
use insync_core::types::{DbId, MeetingSnapshot, Recipient, Timestamp};

use crate::repositories::notification_repo::LEASE_EXPIRED_ERROR;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

fn abandons(attempts: i32, max_attempts: i32) -> bool {
    max_attempts > 0 && attempts >= max_attempts
}

/// Move `record` to `to`, asserting the edge exists in the status machine.
fn transition(record: &mut NotificationRecord, to: NotificationStatus, now: Timestamp) {
    debug_assert_eq!(record.status.validate_transition(to), Ok(()));
    record.status = to;
    record.updated_at = now;
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Table {
    next_id: DbId,
    rows: Vec<NotificationRecord>,
}

#[derive(Default)]
pub struct MemoryNotificationStore {
    table: Mutex<Table>,
}

impl MemoryNotificationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every record, in insertion order.
    pub fn all(&self) -> Vec<NotificationRecord> {
        lock(&self.table).rows.clone()
    }

    fn sorted(mut rows: Vec<NotificationRecord>) -> Vec<NotificationRecord> {
        rows.sort_by_key(|r| (r.scheduled_at, r.id));
        rows
    }
}

#[async_trait]
impl NotificationStore for MemoryNotificationStore {
    async fn insert(
        &self,
        new: &NewNotification,
        now: Timestamp,
    ) -> Result<Option<NotificationRecord>, StoreError> {
        let mut table = lock(&self.table);
        let duplicate = table.rows.iter().any(|r| {
            r.meeting_id == new.meeting_id
                && r.user_id == new.user_id
                && r.kind == new.kind
                && r.channel == new.channel
                && NotificationStatus::ACTIVE.contains(&r.status)
        });
        if duplicate {
            return Ok(None);
        }

        table.next_id += 1;
        let record = NotificationRecord {
            id: table.next_id,
            meeting_id: new.meeting_id,
            user_id: new.user_id,
            kind: new.kind,
            channel: new.channel,
            status: NotificationStatus::Pending,
            scheduled_at: new.scheduled_at,
            sent_at: None,
            title: new.title.clone(),
            body: new.body.clone(),
            last_error: None,
            attempts: 0,
            claimed_at: None,
            created_at: now,
            updated_at: now,
        };
        table.rows.push(record.clone());
        Ok(Some(record))
    }

    async fn get(&self, id: DbId) -> Result<Option<NotificationRecord>, StoreError> {
        Ok(lock(&self.table).rows.iter().find(|r| r.id == id).cloned())
    }

    async fn list_for_meeting(
        &self,
        meeting_id: DbId,
    ) -> Result<Vec<NotificationRecord>, StoreError> {
        let rows = lock(&self.table)
            .rows
            .iter()
            .filter(|r| r.meeting_id == meeting_id)
            .cloned()
            .collect();
        Ok(Self::sorted(rows))
    }

    async fn list_for_meeting_and_kind(
        &self,
        meeting_id: DbId,
        kind: NotificationKind,
    ) -> Result<Vec<NotificationRecord>, StoreError> {
        let rows = lock(&self.table)
            .rows
            .iter()
            .filter(|r| r.meeting_id == meeting_id && r.kind == kind)
            .cloned()
            .collect();
        Ok(Self::sorted(rows))
    }

    async fn list_for_user(&self, user_id: DbId) -> Result<Vec<NotificationRecord>, StoreError> {
        let mut rows = Self::sorted(
            lock(&self.table)
                .rows
                .iter()
                .filter(|r| r.user_id == user_id)
                .cloned()
                .collect(),
        );
        rows.reverse();
        Ok(rows)
    }

    async fn list_by_status(
        &self,
        status: NotificationStatus,
        limit: i64,
    ) -> Result<Vec<NotificationRecord>, StoreError> {
        let rows = lock(&self.table)
            .rows
            .iter()
            .filter(|r| r.status == status)
            .cloned()
            .collect();
        let mut rows = Self::sorted(rows);
        rows.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(rows)
    }

    async fn list_due(
        &self,
        now: Timestamp,
        limit: i64,
    ) -> Result<Vec<NotificationRecord>, StoreError> {
        let rows = lock(&self.table)
            .rows
            .iter()
            .filter(|r| r.status == NotificationStatus::Pending && r.scheduled_at <= now)
            .cloned()
            .collect();
        let mut rows = Self::sorted(rows);
        rows.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(rows)
    }

    async fn claim(
        &self,
        id: DbId,
        from: NotificationStatus,
        now: Timestamp,
    ) -> Result<Option<NotificationRecord>, StoreError> {
        let mut table = lock(&self.table);
        let Some(record) = table.rows.iter_mut().find(|r| r.id == id && r.status == from) else {
            return Ok(None);
        };
        transition(record, NotificationStatus::Sending, now);
        record.attempts += 1;
        record.claimed_at = Some(now);
        Ok(Some(record.clone()))
    }

    async fn complete(&self, id: DbId, sent_at: Timestamp) -> Result<bool, StoreError> {
        let mut table = lock(&self.table);
        let Some(record) = table
            .rows
            .iter_mut()
            .find(|r| r.id == id && r.status == NotificationStatus::Sending)
        else {
            return Ok(false);
        };
        transition(record, NotificationStatus::Sent, sent_at);
        record.sent_at = Some(sent_at);
        record.claimed_at = None;
        record.last_error = None;
        Ok(true)
    }

    async fn fail(
        &self,
        id: DbId,
        error: &str,
        max_attempts: i32,
        now: Timestamp,
    ) -> Result<FailOutcome, StoreError> {
        let mut table = lock(&self.table);
        let Some(record) = table
            .rows
            .iter_mut()
            .find(|r| r.id == id && r.status == NotificationStatus::Sending)
        else {
            return Ok(FailOutcome::NotClaimed);
        };
        let outcome = if abandons(record.attempts, max_attempts) {
            transition(record, NotificationStatus::Abandoned, now);
            FailOutcome::Abandoned
        } else {
            transition(record, NotificationStatus::Failed, now);
            FailOutcome::Retryable
        };
        record.last_error = Some(error.to_string());
        record.claimed_at = None;
        Ok(outcome)
    }

    async fn cancel_for_meeting(
        &self,
        meeting_id: DbId,
        now: Timestamp,
    ) -> Result<u64, StoreError> {
        let mut table = lock(&self.table);
        let mut cancelled = 0;
        for record in table.rows.iter_mut().filter(|r| {
            r.meeting_id == meeting_id && NotificationStatus::CANCELLABLE.contains(&r.status)
        }) {
            transition(record, NotificationStatus::Cancelled, now);
            record.claimed_at = None;
            cancelled += 1;
        }
        Ok(cancelled)
    }

    async fn release_stale_claims(
        &self,
        claimed_before: Timestamp,
        max_attempts: i32,
        now: Timestamp,
    ) -> Result<u64, StoreError> {
        let mut table = lock(&self.table);
        let mut released = 0;
        for record in table.rows.iter_mut().filter(|r| {
            r.status == NotificationStatus::Sending
                && r.claimed_at.is_some_and(|at| at < claimed_before)
        }) {
            let to = if abandons(record.attempts, max_attempts) {
                NotificationStatus::Abandoned
            } else {
                NotificationStatus::Failed
            };
            transition(record, to, now);
            record.last_error = Some(LEASE_EXPIRED_ERROR.to_string());
            record.claimed_at = None;
            released += 1;
        }
        Ok(released)
    }
}

// ---------------------------------------------------------------------------
// Preferences
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryPreferenceStore {
    matrices: Mutex<HashMap<DbId, PreferenceMatrix>>,
}

impl MemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PreferenceStore for MemoryPreferenceStore {
    async fn get(&self, user_id: DbId) -> Result<Option<PreferenceMatrix>, StoreError> {
        Ok(lock(&self.matrices).get(&user_id).cloned())
    }

    async fn get_or_insert(
        &self,
        user_id: DbId,
        defaults: &PreferenceMatrix,
    ) -> Result<PreferenceMatrix, StoreError> {
        Ok(lock(&self.matrices)
            .entry(user_id)
            .or_insert_with(|| defaults.clone())
            .clone())
    }

    async fn put(&self, user_id: DbId, matrix: &PreferenceMatrix) -> Result<(), StoreError> {
        lock(&self.matrices).insert(user_id, matrix.clone());
        Ok(())
    }

    async fn delete(&self, user_id: DbId) -> Result<bool, StoreError> {
        Ok(lock(&self.matrices).remove(&user_id).is_some())
    }
}

// ---------------------------------------------------------------------------
// Directory
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryDirectory {
    users: Mutex<HashMap<DbId, Recipient>>,
    meetings: Mutex<HashMap<DbId, MeetingSnapshot>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, recipient: Recipient) {
        lock(&self.users).insert(recipient.user_id, recipient);
    }

    pub fn remove_user(&self, user_id: DbId) {
        lock(&self.users).remove(&user_id);
    }

    /// Register a meeting along with its host and participants.
    pub fn add_meeting(&self, meeting: MeetingSnapshot) {
        for recipient in meeting.recipients() {
            self.add_user(recipient);
        }
        lock(&self.meetings).insert(meeting.id, meeting);
    }

    pub fn remove_meeting(&self, meeting_id: DbId) {
        lock(&self.meetings).remove(&meeting_id);
    }
}

#[async_trait]
impl Directory for MemoryDirectory {
    async fn find_recipient(&self, user_id: DbId) -> Result<Option<Recipient>, StoreError> {
        Ok(lock(&self.users).get(&user_id).cloned())
    }

    async fn find_meeting(&self, meeting_id: DbId) -> Result<Option<MeetingSnapshot>, StoreError> {
        Ok(lock(&self.meetings).get(&meeting_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::{Duration, TimeZone, Utc};
    use insync_core::notification::Channel;

    use super::*;

    fn now() -> Timestamp {
        Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap()
    }

    fn new_notification(user_id: DbId) -> NewNotification {
        NewNotification {
            meeting_id: 1,
            user_id,
            kind: NotificationKind::ReminderT5,
            channel: Channel::Email,
            scheduled_at: now(),
            title: "t".to_string(),
            body: "b".to_string(),
        }
    }

    #[tokio::test]
    async fn duplicate_active_tuple_is_skipped() {
        let store = MemoryNotificationStore::new();
        assert!(store.insert(&new_notification(1), now()).await.unwrap().is_some());
        assert!(store.insert(&new_notification(1), now()).await.unwrap().is_none());
        assert!(store.insert(&new_notification(2), now()).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn cancelled_tuple_can_be_planned_again() {
        let store = MemoryNotificationStore::new();
        store.insert(&new_notification(1), now()).await.unwrap();
        assert_eq!(store.cancel_for_meeting(1, now()).await.unwrap(), 1);
        assert!(store.insert(&new_notification(1), now()).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn cancel_revokes_an_in_flight_claim() {
        let store = MemoryNotificationStore::new();
        let id = store.insert(&new_notification(1), now()).await.unwrap().unwrap().id;
        store.claim(id, NotificationStatus::Pending, now()).await.unwrap();

        assert_eq!(store.cancel_for_meeting(1, now()).await.unwrap(), 1);
        assert_matches!(store.fail(id, "boom", 5, now()).await, Ok(FailOutcome::NotClaimed));
        assert!(!store.complete(id, now()).await.unwrap());
        let later = now() + Duration::hours(1);
        assert_eq!(store.release_stale_claims(later, 5, later).await.unwrap(), 0);

        let record = store.get(id).await.unwrap().unwrap();
        assert_eq!(record.status, NotificationStatus::Cancelled);
        assert_eq!(record.claimed_at, None);
        assert!(store.insert(&new_notification(1), now()).await.unwrap().is_some());
    }

    #[tokio::test]
    #[should_panic(expected = "Invalid transition: Sent (3) -> Sending (2)")]
    async fn transition_outside_status_machine_panics() {
        let store = MemoryNotificationStore::new();
        let mut record = store.insert(&new_notification(1), now()).await.unwrap().unwrap();
        record.status = NotificationStatus::Sent;
        transition(&mut record, NotificationStatus::Sending, now());
    }

    #[tokio::test]
    async fn claim_is_exclusive() {
        let store = MemoryNotificationStore::new();
        let id = store.insert(&new_notification(1), now()).await.unwrap().unwrap().id;

        let first = store.claim(id, NotificationStatus::Pending, now()).await.unwrap();
        let second = store.claim(id, NotificationStatus::Pending, now()).await.unwrap();
        assert_eq!(first.unwrap().attempts, 1);
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn fail_abandons_at_cap() {
        let store = MemoryNotificationStore::new();
        let id = store.insert(&new_notification(1), now()).await.unwrap().unwrap().id;

        store.claim(id, NotificationStatus::Pending, now()).await.unwrap();
        assert_matches!(store.fail(id, "boom", 2, now()).await, Ok(FailOutcome::Retryable));
        store.claim(id, NotificationStatus::Failed, now()).await.unwrap();
        assert_matches!(store.fail(id, "boom", 2, now()).await, Ok(FailOutcome::Abandoned));
        assert_matches!(store.fail(id, "boom", 2, now()).await, Ok(FailOutcome::NotClaimed));

        let record = store.get(id).await.unwrap().unwrap();
        assert_eq!(record.status, NotificationStatus::Abandoned);
        assert_eq!(record.last_error.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn sent_records_survive_cancellation() {
        let store = MemoryNotificationStore::new();
        let id = store.insert(&new_notification(1), now()).await.unwrap().unwrap().id;
        store.claim(id, NotificationStatus::Pending, now()).await.unwrap();
        assert!(store.complete(id, now()).await.unwrap());

        assert_eq!(store.cancel_for_meeting(1, now()).await.unwrap(), 0);
        let record = store.get(id).await.unwrap().unwrap();
        assert_eq!(record.status, NotificationStatus::Sent);
        assert_eq!(record.sent_at, Some(now()));
    }

    #[tokio::test]
    async fn stale_claims_are_released_as_failed() {
        let store = MemoryNotificationStore::new();
        let id = store.insert(&new_notification(1), now()).await.unwrap().unwrap().id;
        store.claim(id, NotificationStatus::Pending, now()).await.unwrap();

        let later = now() + Duration::minutes(20);
        let released = store
            .release_stale_claims(later - Duration::minutes(10), 10, later)
            .await
            .unwrap();
        assert_eq!(released, 1);
        let record = store.get(id).await.unwrap().unwrap();
        assert_eq!(record.status, NotificationStatus::Failed);
        assert_eq!(record.claimed_at, None);
    }

    #[tokio::test]
    async fn due_list_excludes_future_records() {
        let store = MemoryNotificationStore::new();
        let mut future = new_notification(2);
        future.scheduled_at = now() + Duration::minutes(1);
        store.insert(&new_notification(1), now()).await.unwrap();
        store.insert(&future, now()).await.unwrap();

        let due = store.list_due(now(), 10).await.unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].user_id, 1);
    }

    #[tokio::test]
    async fn preferences_get_or_insert_keeps_existing() {
        let store = MemoryPreferenceStore::new();
        let custom = PreferenceMatrix::none();
        store.put(5, &custom).await.unwrap();

        let stored = store.get_or_insert(5, &PreferenceMatrix::default()).await.unwrap();
        assert_eq!(stored, custom);
        assert!(store.delete(5).await.unwrap());
        assert!(!store.delete(5).await.unwrap());
    }
}

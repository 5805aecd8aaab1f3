//! Storage and directory seams.
//!
//! The engine only touches shared state through these traits. Every status
//! change is a conditional update so that the dispatch loop, the retry loop
//! and lifecycle calls can run concurrently without double-sending.

use async_trait::async_trait;

use crate::error::StoreError;
use crate::notification::{NewNotification, NotificationKind, NotificationRecord};
use crate::preferences::PreferenceMatrix;
use crate::status::NotificationStatus;
use crate::types::{DbId, MeetingSnapshot, Recipient, Timestamp};

/// Outcome of [`NotificationStore::fail`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailOutcome {
    /// Marked `Failed`; the retry loop will pick it up.
    Retryable,
    /// Attempt cap reached; marked `Abandoned`.
    Abandoned,
    /// The record was not in `Sending`, nothing changed.
    NotClaimed,
}

/// Durable table of notification intents.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Insert a new `Pending` record.
    ///
    /// Returns `None` when an active record (pending, sending or failed)
    /// already exists for the same meeting, user, kind and channel.
    async fn insert(
        &self,
        new: &NewNotification,
        now: Timestamp,
    ) -> Result<Option<NotificationRecord>, StoreError>;

    async fn get(&self, id: DbId) -> Result<Option<NotificationRecord>, StoreError>;

    async fn list_for_meeting(&self, meeting_id: DbId)
        -> Result<Vec<NotificationRecord>, StoreError>;

    async fn list_for_meeting_and_kind(
        &self,
        meeting_id: DbId,
        kind: NotificationKind,
    ) -> Result<Vec<NotificationRecord>, StoreError>;

    async fn list_for_user(&self, user_id: DbId) -> Result<Vec<NotificationRecord>, StoreError>;

    /// Records in `status`, oldest schedule first.
    async fn list_by_status(
        &self,
        status: NotificationStatus,
        limit: i64,
    ) -> Result<Vec<NotificationRecord>, StoreError>;

    /// `Pending` records whose `scheduled_at <= now`, oldest first.
    async fn list_due(
        &self,
        now: Timestamp,
        limit: i64,
    ) -> Result<Vec<NotificationRecord>, StoreError>;

    /// Atomically move a record from `from` to `Sending`, bumping its
    /// attempt counter.
    ///
    /// Returns `None` if the record is no longer in `from` (already claimed,
    /// sent or cancelled by someone else).
    async fn claim(
        &self,
        id: DbId,
        from: NotificationStatus,
        now: Timestamp,
    ) -> Result<Option<NotificationRecord>, StoreError>;

    /// `Sending -> Sent`. Returns `false` if the record was not claimed.
    async fn complete(&self, id: DbId, sent_at: Timestamp) -> Result<bool, StoreError>;

    /// `Sending -> Failed`, or `Sending -> Abandoned` once `attempts`
    /// reaches `max_attempts` (`0` disables the cap).
    async fn fail(
        &self,
        id: DbId,
        error: &str,
        max_attempts: i32,
        now: Timestamp,
    ) -> Result<FailOutcome, StoreError>;

    /// Cancel every pending, sending or failed record of a meeting. Returns
    /// the count.
    async fn cancel_for_meeting(&self, meeting_id: DbId, now: Timestamp)
        -> Result<u64, StoreError>;

    /// Fail records stuck in `Sending` since before `claimed_before`.
    async fn release_stale_claims(
        &self,
        claimed_before: Timestamp,
        max_attempts: i32,
        now: Timestamp,
    ) -> Result<u64, StoreError>;
}

/// Per-user preference matrices.
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    async fn get(&self, user_id: DbId) -> Result<Option<PreferenceMatrix>, StoreError>;

    /// Store `defaults` unless the user already has a matrix; return
    /// whichever matrix is stored afterwards.
    async fn get_or_insert(
        &self,
        user_id: DbId,
        defaults: &PreferenceMatrix,
    ) -> Result<PreferenceMatrix, StoreError>;

    /// Overwrite every flag of the user's matrix.
    async fn put(&self, user_id: DbId, matrix: &PreferenceMatrix) -> Result<(), StoreError>;

    /// Drop the stored matrix. Returns `true` if one existed.
    async fn delete(&self, user_id: DbId) -> Result<bool, StoreError>;
}

/// Read access to meetings and users owned by the surrounding application.
#[async_trait]
pub trait Directory: Send + Sync {
    async fn find_recipient(&self, user_id: DbId) -> Result<Option<Recipient>, StoreError>;

    async fn find_meeting(&self, meeting_id: DbId) -> Result<Option<MeetingSnapshot>, StoreError>;

    async fn meeting_exists(&self, meeting_id: DbId) -> Result<bool, StoreError> {
        Ok(self.find_meeting(meeting_id).await?.is_some())
    }
}

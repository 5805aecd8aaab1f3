//! Postgres-backed implementations of the `insync-core` store traits.
//!
//! Each adapter owns a pool and delegates to the matching repository,
//! converting rows into domain records on the way out.

use async_trait::async_trait;
use insync_core::error::StoreError;
use insync_core::notification::{NewNotification, NotificationKind, NotificationRecord};
use insync_core::preferences::PreferenceMatrix;
use insync_core::status::NotificationStatus;
use insync_core::store::{Directory, FailOutcome, NotificationStore, PreferenceStore};
use insync_core::types::{DbId, MeetingSnapshot, Recipient, Timestamp};

use crate::models::notification::into_records;
use crate::models::preference::into_matrix;
use crate::repositories::{DirectoryRepo, NotificationPreferenceRepo, NotificationRepo};
use crate::DbPool;

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct PgNotificationStore {
    pool: DbPool,
}

impl PgNotificationStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationStore for PgNotificationStore {
    async fn insert(
        &self,
        new: &NewNotification,
        now: Timestamp,
    ) -> Result<Option<NotificationRecord>, StoreError> {
        NotificationRepo::insert(&self.pool, new, now)
            .await
            .map_err(StoreError::backend)?
            .map(NotificationRecord::try_from)
            .transpose()
    }

    async fn get(&self, id: DbId) -> Result<Option<NotificationRecord>, StoreError> {
        NotificationRepo::find_by_id(&self.pool, id)
            .await
            .map_err(StoreError::backend)?
            .map(NotificationRecord::try_from)
            .transpose()
    }

    async fn list_for_meeting(
        &self,
        meeting_id: DbId,
    ) -> Result<Vec<NotificationRecord>, StoreError> {
        let rows = NotificationRepo::list_for_meeting(&self.pool, meeting_id)
            .await
            .map_err(StoreError::backend)?;
        into_records(rows)
    }

    async fn list_for_meeting_and_kind(
        &self,
        meeting_id: DbId,
        kind: NotificationKind,
    ) -> Result<Vec<NotificationRecord>, StoreError> {
        let rows = NotificationRepo::list_for_meeting_and_kind(&self.pool, meeting_id, kind)
            .await
            .map_err(StoreError::backend)?;
        into_records(rows)
    }

    async fn list_for_user(&self, user_id: DbId) -> Result<Vec<NotificationRecord>, StoreError> {
        let rows = NotificationRepo::list_for_user(&self.pool, user_id)
            .await
            .map_err(StoreError::backend)?;
        into_records(rows)
    }

    async fn list_by_status(
        &self,
        status: NotificationStatus,
        limit: i64,
    ) -> Result<Vec<NotificationRecord>, StoreError> {
        let rows = NotificationRepo::list_by_status(&self.pool, status, limit)
            .await
            .map_err(StoreError::backend)?;
        into_records(rows)
    }

    async fn list_due(
        &self,
        now: Timestamp,
        limit: i64,
    ) -> Result<Vec<NotificationRecord>, StoreError> {
        let rows = NotificationRepo::list_due(&self.pool, now, limit)
            .await
            .map_err(StoreError::backend)?;
        into_records(rows)
    }

    async fn claim(
        &self,
        id: DbId,
        from: NotificationStatus,
        now: Timestamp,
    ) -> Result<Option<NotificationRecord>, StoreError> {
        NotificationRepo::claim(&self.pool, id, from, now)
            .await
            .map_err(StoreError::backend)?
            .map(NotificationRecord::try_from)
            .transpose()
    }

    async fn complete(&self, id: DbId, sent_at: Timestamp) -> Result<bool, StoreError> {
        NotificationRepo::complete(&self.pool, id, sent_at)
            .await
            .map_err(StoreError::backend)
    }

    async fn fail(
        &self,
        id: DbId,
        error: &str,
        max_attempts: i32,
        now: Timestamp,
    ) -> Result<FailOutcome, StoreError> {
        let status = NotificationRepo::fail(&self.pool, id, error, max_attempts, now)
            .await
            .map_err(StoreError::backend)?;
        Ok(match status.and_then(NotificationStatus::from_id) {
            None => FailOutcome::NotClaimed,
            Some(NotificationStatus::Abandoned) => FailOutcome::Abandoned,
            Some(_) => FailOutcome::Retryable,
        })
    }

    async fn cancel_for_meeting(
        &self,
        meeting_id: DbId,
        now: Timestamp,
    ) -> Result<u64, StoreError> {
        NotificationRepo::cancel_for_meeting(&self.pool, meeting_id, now)
            .await
            .map_err(StoreError::backend)
    }

    async fn release_stale_claims(
        &self,
        claimed_before: Timestamp,
        max_attempts: i32,
        now: Timestamp,
    ) -> Result<u64, StoreError> {
        NotificationRepo::release_stale_claims(&self.pool, claimed_before, max_attempts, now)
            .await
            .map_err(StoreError::backend)
    }
}

// ---------------------------------------------------------------------------
// Preferences
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct PgPreferenceStore {
    pool: DbPool,
}

impl PgPreferenceStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PreferenceStore for PgPreferenceStore {
    async fn get(&self, user_id: DbId) -> Result<Option<PreferenceMatrix>, StoreError> {
        let rows = NotificationPreferenceRepo::list_for_user(&self.pool, user_id)
            .await
            .map_err(StoreError::backend)?;
        into_matrix(rows)
    }

    async fn get_or_insert(
        &self,
        user_id: DbId,
        defaults: &PreferenceMatrix,
    ) -> Result<PreferenceMatrix, StoreError> {
        NotificationPreferenceRepo::write_matrix(&self.pool, user_id, defaults, false)
            .await
            .map_err(StoreError::backend)?;
        Ok(self.get(user_id).await?.unwrap_or_else(|| defaults.clone()))
    }

    async fn put(&self, user_id: DbId, matrix: &PreferenceMatrix) -> Result<(), StoreError> {
        NotificationPreferenceRepo::write_matrix(&self.pool, user_id, matrix, true)
            .await
            .map_err(StoreError::backend)
    }

    async fn delete(&self, user_id: DbId) -> Result<bool, StoreError> {
        NotificationPreferenceRepo::delete_for_user(&self.pool, user_id)
            .await
            .map_err(StoreError::backend)
    }
}

// ---------------------------------------------------------------------------
// Directory
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct PgDirectory {
    pool: DbPool,
}

impl PgDirectory {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Directory for PgDirectory {
    async fn find_recipient(&self, user_id: DbId) -> Result<Option<Recipient>, StoreError> {
        let user = DirectoryRepo::find_user(&self.pool, user_id)
            .await
            .map_err(StoreError::backend)?;
        Ok(user.map(Recipient::from))
    }

    async fn find_meeting(&self, meeting_id: DbId) -> Result<Option<MeetingSnapshot>, StoreError> {
        let Some(meeting) = DirectoryRepo::find_meeting(&self.pool, meeting_id)
            .await
            .map_err(StoreError::backend)?
        else {
            return Ok(None);
        };

        let host = self.find_recipient(meeting.host_id).await?.ok_or_else(|| {
            StoreError::Corrupt(format!(
                "meeting {} references missing host {}",
                meeting.id, meeting.host_id
            ))
        })?;
        let participants = DirectoryRepo::list_participants(&self.pool, meeting_id)
            .await
            .map_err(StoreError::backend)?
            .into_iter()
            .map(Recipient::from)
            .collect();

        Ok(Some(MeetingSnapshot {
            id: meeting.id,
            title: meeting.title,
            join_code: meeting.meeting_id,
            start: meeting.start_time,
            end: meeting.end_time,
            host,
            participants,
        }))
    }

    async fn meeting_exists(&self, meeting_id: DbId) -> Result<bool, StoreError> {
        DirectoryRepo::meeting_exists(&self.pool, meeting_id)
            .await
            .map_err(StoreError::backend)
    }
}

//! Repository for the `notifications` table.
//!
//! Every status change is a conditional `UPDATE ... WHERE status_id = ...`
//! so concurrent loops never both move the same row. Callers pass `now`
//! explicitly instead of relying on `NOW()`, which keeps timestamps
//! consistent with the engine's clock.

use insync_core::notification::{NewNotification, NotificationKind};
use insync_core::status::{NotificationStatus, StatusId};
use insync_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::notification::NotificationRow;

/// Column list for `notifications` queries.
const COLUMNS: &str = "\
    id, meeting_id, user_id, kind, channel, status_id, scheduled_at, sent_at, \
    title, body, last_error, attempts, claimed_at, created_at, updated_at";

/// Error recorded when a stale `Sending` claim is released.
pub const LEASE_EXPIRED_ERROR: &str = "delivery interrupted: claim lease expired";

/// Provides CRUD and state transitions for notification records.
pub struct NotificationRepo;

impl NotificationRepo {
    /// Insert a `Pending` record.
    ///
    /// Returns `None` when the active-tuple unique index already holds a
    /// row for the same meeting, user, kind and channel. The conflict
    /// predicate must repeat the index predicate literally.
    pub async fn insert(
        pool: &PgPool,
        new: &NewNotification,
        now: Timestamp,
    ) -> Result<Option<NotificationRow>, sqlx::Error> {
        let query = format!(
            "INSERT INTO notifications \
                (meeting_id, user_id, kind, channel, status_id, scheduled_at, \
                 title, body, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9) \
             ON CONFLICT (meeting_id, user_id, kind, channel) \
                WHERE status_id IN (1, 2, 4) DO NOTHING \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, NotificationRow>(&query)
            .bind(new.meeting_id)
            .bind(new.user_id)
            .bind(new.kind.as_str())
            .bind(new.channel.as_str())
            .bind(NotificationStatus::Pending.id())
            .bind(new.scheduled_at)
            .bind(&new.title)
            .bind(&new.body)
            .bind(now)
            .fetch_optional(pool)
            .await
    }

    /// Find a record by ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<NotificationRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM notifications WHERE id = $1");
        sqlx::query_as::<_, NotificationRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// All records of a meeting, in schedule order.
    pub async fn list_for_meeting(
        pool: &PgPool,
        meeting_id: DbId,
    ) -> Result<Vec<NotificationRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM notifications \
             WHERE meeting_id = $1 \
             ORDER BY scheduled_at, id"
        );
        sqlx::query_as::<_, NotificationRow>(&query)
            .bind(meeting_id)
            .fetch_all(pool)
            .await
    }

    /// Records of a meeting for one notification kind.
    pub async fn list_for_meeting_and_kind(
        pool: &PgPool,
        meeting_id: DbId,
        kind: NotificationKind,
    ) -> Result<Vec<NotificationRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM notifications \
             WHERE meeting_id = $1 AND kind = $2 \
             ORDER BY scheduled_at, id"
        );
        sqlx::query_as::<_, NotificationRow>(&query)
            .bind(meeting_id)
            .bind(kind.as_str())
            .fetch_all(pool)
            .await
    }

    /// All records addressed to a user, newest schedule first.
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Vec<NotificationRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM notifications \
             WHERE user_id = $1 \
             ORDER BY scheduled_at DESC, id DESC"
        );
        sqlx::query_as::<_, NotificationRow>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Records in a given status, oldest schedule first.
    pub async fn list_by_status(
        pool: &PgPool,
        status: NotificationStatus,
        limit: i64,
    ) -> Result<Vec<NotificationRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM notifications \
             WHERE status_id = $1 \
             ORDER BY scheduled_at, id \
             LIMIT $2"
        );
        sqlx::query_as::<_, NotificationRow>(&query)
            .bind(status.id())
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Pending records due at or before `now`.
    pub async fn list_due(
        pool: &PgPool,
        now: Timestamp,
        limit: i64,
    ) -> Result<Vec<NotificationRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM notifications \
             WHERE status_id = $1 AND scheduled_at <= $2 \
             ORDER BY scheduled_at, id \
             LIMIT $3"
        );
        sqlx::query_as::<_, NotificationRow>(&query)
            .bind(NotificationStatus::Pending.id())
            .bind(now)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Move a record from `from` to `Sending` and bump its attempt count.
    ///
    /// Returns `None` when the row is no longer in `from`.
    pub async fn claim(
        pool: &PgPool,
        id: DbId,
        from: NotificationStatus,
        now: Timestamp,
    ) -> Result<Option<NotificationRow>, sqlx::Error> {
        let query = format!(
            "UPDATE notifications \
             SET status_id = $3, attempts = attempts + 1, claimed_at = $4, updated_at = $4 \
             WHERE id = $1 AND status_id = $2 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, NotificationRow>(&query)
            .bind(id)
            .bind(from.id())
            .bind(NotificationStatus::Sending.id())
            .bind(now)
            .fetch_optional(pool)
            .await
    }

    /// `Sending -> Sent`. Returns `true` if the row was claimed.
    pub async fn complete(pool: &PgPool, id: DbId, sent_at: Timestamp) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE notifications \
             SET status_id = $3, sent_at = $4, claimed_at = NULL, last_error = NULL, \
                 updated_at = $4 \
             WHERE id = $1 AND status_id = $2",
        )
        .bind(id)
        .bind(NotificationStatus::Sending.id())
        .bind(NotificationStatus::Sent.id())
        .bind(sent_at)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// `Sending -> Failed`, or `Sending -> Abandoned` once `attempts`
    /// reaches `max_attempts` (`0` disables the cap).
    ///
    /// Returns the new status ID, or `None` if the row was not claimed.
    pub async fn fail(
        pool: &PgPool,
        id: DbId,
        error: &str,
        max_attempts: i32,
        now: Timestamp,
    ) -> Result<Option<StatusId>, sqlx::Error> {
        sqlx::query_scalar(
            "UPDATE notifications \
             SET status_id = CASE WHEN $4 > 0 AND attempts >= $4 THEN $6 ELSE $5 END, \
                 last_error = $3, claimed_at = NULL, updated_at = $7 \
             WHERE id = $1 AND status_id = $2 \
             RETURNING status_id",
        )
        .bind(id)
        .bind(NotificationStatus::Sending.id())
        .bind(error)
        .bind(max_attempts)
        .bind(NotificationStatus::Failed.id())
        .bind(NotificationStatus::Abandoned.id())
        .bind(now)
        .fetch_optional(pool)
        .await
    }

    /// Cancel every pending, sending or failed record of a meeting.
    ///
    /// Returns the number of rows cancelled.
    pub async fn cancel_for_meeting(
        pool: &PgPool,
        meeting_id: DbId,
        now: Timestamp,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE notifications \
             SET status_id = $2, claimed_at = NULL, updated_at = $6 \
             WHERE meeting_id = $1 AND status_id IN ($3, $4, $5)",
        )
        .bind(meeting_id)
        .bind(NotificationStatus::Cancelled.id())
        .bind(NotificationStatus::Pending.id())
        .bind(NotificationStatus::Sending.id())
        .bind(NotificationStatus::Failed.id())
        .bind(now)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Fail (or abandon) rows stuck in `Sending` since before `claimed_before`.
    pub async fn release_stale_claims(
        pool: &PgPool,
        claimed_before: Timestamp,
        max_attempts: i32,
        now: Timestamp,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE notifications \
             SET status_id = CASE WHEN $3 > 0 AND attempts >= $3 THEN $5 ELSE $4 END, \
                 last_error = $6, claimed_at = NULL, updated_at = $7 \
             WHERE status_id = $1 AND claimed_at < $2",
        )
        .bind(NotificationStatus::Sending.id())
        .bind(claimed_before)
        .bind(max_attempts)
        .bind(NotificationStatus::Failed.id())
        .bind(NotificationStatus::Abandoned.id())
        .bind(LEASE_EXPIRED_ERROR)
        .bind(now)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}

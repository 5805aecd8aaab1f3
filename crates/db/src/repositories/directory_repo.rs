//! Read-only lookups against the host application's user and meeting tables.

use insync_core::types::DbId;
use sqlx::PgPool;

use crate::models::directory::{MeetingRow, UserRow};

/// Column list for `users` queries.
const USER_COLUMNS: &str = "id, email, phone";

/// Column list for `meetings` queries.
const MEETING_COLUMNS: &str = "id, title, meeting_id, start_time, end_time, host_id";

pub struct DirectoryRepo;

impl DirectoryRepo {
    pub async fn find_user(pool: &PgPool, id: DbId) -> Result<Option<UserRow>, sqlx::Error> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, UserRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_meeting(pool: &PgPool, id: DbId) -> Result<Option<MeetingRow>, sqlx::Error> {
        let query = format!("SELECT {MEETING_COLUMNS} FROM meetings WHERE id = $1");
        sqlx::query_as::<_, MeetingRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn meeting_exists(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM meetings WHERE id = $1)")
            .bind(id)
            .fetch_one(pool)
            .await
    }

    /// Participants of a meeting, excluding the host, in join order.
    pub async fn list_participants(
        pool: &PgPool,
        meeting_id: DbId,
    ) -> Result<Vec<UserRow>, sqlx::Error> {
        sqlx::query_as::<_, UserRow>(
            "SELECT u.id, u.email, u.phone \
             FROM meeting_participants mp \
             JOIN users u ON u.id = mp.user_id \
             JOIN meetings m ON m.id = mp.meeting_id \
             WHERE mp.meeting_id = $1 AND mp.user_id <> m.host_id \
             ORDER BY mp.id",
        )
        .bind(meeting_id)
        .fetch_all(pool)
        .await
    }
}

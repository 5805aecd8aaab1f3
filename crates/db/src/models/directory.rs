//! Read-only rows from the host application's `users` and `meetings` tables.

use insync_core::types::{DbId, Recipient, Timestamp};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: DbId,
    pub email: String,
    pub phone: Option<String>,
}

impl From<UserRow> for Recipient {
    fn from(row: UserRow) -> Self {
        Recipient {
            user_id: row.id,
            email: row.email,
            phone: row.phone,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct MeetingRow {
    pub id: DbId,
    pub title: String,
    /// Public join code; the column is called `meeting_id` upstream.
    pub meeting_id: String,
    pub start_time: Option<Timestamp>,
    pub end_time: Option<Timestamp>,
    pub host_id: DbId,
}

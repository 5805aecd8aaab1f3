//! Row model for the `notifications` table.

use insync_core::error::StoreError;
use insync_core::notification::{Channel, NotificationKind, NotificationRecord};
use insync_core::status::{NotificationStatus, StatusId};
use insync_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A raw row from the `notifications` table.
///
/// `kind` and `channel` are stored as their wire names and `status_id`
/// references `notification_statuses`; conversion into a
/// [`NotificationRecord`] validates all three.
#[derive(Debug, Clone, FromRow)]
pub struct NotificationRow {
    pub id: DbId,
    pub meeting_id: DbId,
    pub user_id: DbId,
    pub kind: String,
    pub channel: String,
    pub status_id: StatusId,
    pub scheduled_at: Timestamp,
    pub sent_at: Option<Timestamp>,
    pub title: String,
    pub body: String,
    pub last_error: Option<String>,
    pub attempts: i32,
    pub claimed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TryFrom<NotificationRow> for NotificationRecord {
    type Error = StoreError;

    fn try_from(row: NotificationRow) -> Result<Self, Self::Error> {
        let kind: NotificationKind = row.kind.parse()?;
        let channel: Channel = row.channel.parse()?;
        let status = NotificationStatus::from_id(row.status_id).ok_or_else(|| {
            StoreError::Corrupt(format!(
                "notification {} has unknown status_id {}",
                row.id, row.status_id
            ))
        })?;

        Ok(NotificationRecord {
            id: row.id,
            meeting_id: row.meeting_id,
            user_id: row.user_id,
            kind,
            channel,
            status,
            scheduled_at: row.scheduled_at,
            sent_at: row.sent_at,
            title: row.title,
            body: row.body,
            last_error: row.last_error,
            attempts: row.attempts,
            claimed_at: row.claimed_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Convert a batch of rows, failing on the first corrupt one.
pub fn into_records(rows: Vec<NotificationRow>) -> Result<Vec<NotificationRecord>, StoreError> {
    rows.into_iter().map(NotificationRecord::try_from).collect()
}

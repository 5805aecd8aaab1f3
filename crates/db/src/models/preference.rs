//! Row model for the `notification_preferences` table.

use insync_core::error::StoreError;
use insync_core::preferences::{PreferenceEntry, PreferenceMatrix};
use insync_core::types::DbId;
use sqlx::FromRow;

/// One stored (user, kind, channel) flag.
#[derive(Debug, Clone, FromRow)]
pub struct PreferenceRow {
    pub user_id: DbId,
    pub kind: String,
    pub channel: String,
    pub is_enabled: bool,
}

impl TryFrom<PreferenceRow> for PreferenceEntry {
    type Error = StoreError;

    fn try_from(row: PreferenceRow) -> Result<Self, Self::Error> {
        Ok(PreferenceEntry {
            kind: row.kind.parse()?,
            channel: row.channel.parse()?,
            enabled: row.is_enabled,
        })
    }
}

/// Fold a user's rows into a matrix. Returns `None` for an empty set.
pub fn into_matrix(rows: Vec<PreferenceRow>) -> Result<Option<PreferenceMatrix>, StoreError> {
    if rows.is_empty() {
        return Ok(None);
    }
    let entries = rows
        .into_iter()
        .map(PreferenceEntry::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Some(PreferenceMatrix::from_entries(entries)))
}

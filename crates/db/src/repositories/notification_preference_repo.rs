//! Repository for the `notification_preferences` table.
//!
//! A user's matrix is stored as one row per (kind, channel) cell. A user
//! with no rows has never saved preferences.

use insync_core::preferences::PreferenceMatrix;
use insync_core::types::DbId;
use sqlx::PgPool;

use crate::models::preference::PreferenceRow;

/// Column list for `notification_preferences` queries.
const COLUMNS: &str = "user_id, kind, channel, is_enabled";

/// Provides CRUD operations for per-user preference matrices.
pub struct NotificationPreferenceRepo;

impl NotificationPreferenceRepo {
    /// List all stored cells for a user.
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Vec<PreferenceRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM notification_preferences \
             WHERE user_id = $1 \
             ORDER BY kind, channel"
        );
        sqlx::query_as::<_, PreferenceRow>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Write every cell of `matrix` for a user.
    ///
    /// With `overwrite = false` existing cells are left untouched
    /// (`ON CONFLICT DO NOTHING`), which is how lazy defaults are seeded
    /// without clobbering a concurrent update.
    pub async fn write_matrix(
        pool: &PgPool,
        user_id: DbId,
        matrix: &PreferenceMatrix,
        overwrite: bool,
    ) -> Result<(), sqlx::Error> {
        let on_conflict = if overwrite {
            "DO UPDATE SET is_enabled = EXCLUDED.is_enabled, updated_at = NOW()"
        } else {
            "DO NOTHING"
        };
        let query = format!(
            "INSERT INTO notification_preferences (user_id, kind, channel, is_enabled) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (user_id, kind, channel) {on_conflict}"
        );

        let mut tx = pool.begin().await?;
        for entry in matrix.entries() {
            sqlx::query(&query)
                .bind(user_id)
                .bind(entry.kind.as_str())
                .bind(entry.channel.as_str())
                .bind(entry.enabled)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await
    }

    /// Delete every stored cell for a user. Returns `true` if any existed.
    pub async fn delete_for_user(pool: &PgPool, user_id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM notification_preferences WHERE user_id = $1")
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

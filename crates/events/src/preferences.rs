//! Preference resolution with lazily materialised defaults.

use std::collections::HashMap;
use std::sync::Arc;

use insync_core::error::StoreError;
use insync_core::notification::{Channel, NotificationKind};
use insync_core::preferences::PreferenceMatrix;
use insync_core::store::PreferenceStore;
use insync_core::types::DbId;

/// Get, update and reset per-user preference matrices.
#[derive(Clone)]
pub struct PreferenceService {
    store: Arc<dyn PreferenceStore>,
}

impl PreferenceService {
    pub fn new(store: Arc<dyn PreferenceStore>) -> Self {
        Self { store }
    }

    /// The user's matrix, persisting the defaults on first access.
    pub async fn get(&self, user_id: DbId) -> Result<PreferenceMatrix, StoreError> {
        self.store
            .get_or_insert(user_id, &PreferenceMatrix::default())
            .await
    }

    /// Replace every flag of the user's matrix with `matrix`.
    pub async fn update(
        &self,
        user_id: DbId,
        matrix: &PreferenceMatrix,
    ) -> Result<PreferenceMatrix, StoreError> {
        let mut current = self.get(user_id).await?;
        current.replace_with(matrix);
        self.store.put(user_id, &current).await?;
        tracing::info!(user_id, "Notification preferences updated");
        Ok(current)
    }

    /// Discard the stored matrix and recreate the defaults.
    pub async fn reset(&self, user_id: DbId) -> Result<PreferenceMatrix, StoreError> {
        self.store.delete(user_id).await?;
        let matrix = self.get(user_id).await?;
        tracing::info!(user_id, "Notification preferences reset to defaults");
        Ok(matrix)
    }

    pub async fn is_enabled(
        &self,
        user_id: DbId,
        kind: NotificationKind,
        channel: Channel,
    ) -> Result<bool, StoreError> {
        Ok(self.get(user_id).await?.is_enabled(kind, channel))
    }

    /// Matrices for several users at once.
    ///
    /// A user whose lookup fails falls back to the defaults so one broken
    /// row never blocks planning for everyone else.
    pub async fn resolve_many(&self, user_ids: &[DbId]) -> HashMap<DbId, PreferenceMatrix> {
        let mut out = HashMap::with_capacity(user_ids.len());
        for &user_id in user_ids {
            if out.contains_key(&user_id) {
                continue;
            }
            let matrix = match self.get(user_id).await {
                Ok(matrix) => matrix,
                Err(e) => {
                    tracing::warn!(user_id, error = %e, "Preference lookup failed, using defaults");
                    PreferenceMatrix::default()
                }
            };
            out.insert(user_id, matrix);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use insync_db::memory::MemoryPreferenceStore;

    use super::*;

    fn service() -> PreferenceService {
        PreferenceService::new(Arc::new(MemoryPreferenceStore::new()))
    }

    #[tokio::test]
    async fn first_get_returns_defaults() {
        let prefs = service();
        let matrix = prefs.get(1).await.unwrap();
        assert_eq!(matrix, PreferenceMatrix::default());
        assert!(!matrix.is_enabled(NotificationKind::Ended, Channel::Email));
        assert!(matrix.is_enabled(NotificationKind::ReminderT5, Channel::Sms));
    }

    #[tokio::test]
    async fn update_replaces_every_flag() {
        let prefs = service();
        let wanted = PreferenceMatrix::none().with(NotificationKind::Started, Channel::Sms, true);
        let stored = prefs.update(1, &wanted).await.unwrap();
        assert_eq!(stored, wanted);
        assert!(!prefs
            .is_enabled(1, NotificationKind::ReminderT15, Channel::Email)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn reset_restores_defaults() {
        let prefs = service();
        prefs.update(1, &PreferenceMatrix::none()).await.unwrap();
        assert_eq!(prefs.reset(1).await.unwrap(), PreferenceMatrix::default());
    }

    #[tokio::test]
    async fn in_app_follows_push_flag() {
        let prefs = service();
        let wanted = PreferenceMatrix::default().with(NotificationKind::Ended, Channel::Push, false);
        prefs.update(2, &wanted).await.unwrap();
        assert!(!prefs
            .is_enabled(2, NotificationKind::Ended, Channel::InApp)
            .await
            .unwrap());
    }
}

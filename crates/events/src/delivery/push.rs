//! Push and in-app delivery.
//!
//! No push provider is wired in; [`PushDelivery`] records the message in the
//! log and reports success.

use async_trait::async_trait;
use insync_core::types::DbId;

use super::{DeliveryError, PushTransport};

#[derive(Debug, Default, Clone, Copy)]
pub struct PushDelivery;

impl PushDelivery {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PushTransport for PushDelivery {
    async fn send(&self, user_id: DbId, title: &str, body: &str) -> Result<(), DeliveryError> {
        tracing::info!(user_id, title, body_len = body.len(), "Push notification sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn push_always_succeeds() {
        assert!(PushDelivery::new().send(1, "t", "b").await.is_ok());
    }
}

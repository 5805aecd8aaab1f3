//! Delivery channels for notification records.
//!
//! Each channel sits behind a small async trait so the engine can run
//! against the real SMTP/HTTP transports in production and recording
//! doubles in tests. Transports are opaque success/failure to the engine.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use insync_core::error::StoreError;
use insync_core::types::DbId;

pub mod email;
pub mod push;
pub mod sms;

use email::EmailError;
use sms::SmsError;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Why a single delivery attempt failed. Rendered into `last_error`.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error(transparent)]
    Email(#[from] EmailError),

    #[error(transparent)]
    Sms(#[from] SmsError),

    #[error("Push delivery failed: {0}")]
    Push(String),

    #[error("Transport call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Recipient {0} not found")]
    RecipientNotFound(DbId),

    #[error("Meeting {0} not found")]
    MeetingNotFound(DbId),

    #[error("Recipient {0} has no phone number")]
    MissingPhone(DbId),

    #[error("Invalid phone number: {0}")]
    InvalidPhone(String),

    #[error("Directory lookup failed: {0}")]
    Directory(#[from] StoreError),
}

// ---------------------------------------------------------------------------
// Transport seams
// ---------------------------------------------------------------------------

#[async_trait]
pub trait EmailTransport: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), DeliveryError>;
}

#[async_trait]
pub trait SmsTransport: Send + Sync {
    /// `to` is already normalised to E.164.
    async fn send(&self, to: &str, body: &str) -> Result<(), DeliveryError>;
}

#[async_trait]
pub trait PushTransport: Send + Sync {
    async fn send(&self, user_id: DbId, title: &str, body: &str) -> Result<(), DeliveryError>;
}

/// One transport per channel. `InApp` records go through `push`.
#[derive(Clone)]
pub struct Transports {
    pub email: Arc<dyn EmailTransport>,
    pub sms: Arc<dyn SmsTransport>,
    pub push: Arc<dyn PushTransport>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_render_for_last_error() {
        assert_eq!(
            DeliveryError::RecipientNotFound(12).to_string(),
            "Recipient 12 not found"
        );
        assert_eq!(
            DeliveryError::Timeout(Duration::from_secs(15)).to_string(),
            "Transport call timed out after 15s"
        );
        assert_eq!(
            DeliveryError::from(EmailError::NotConfigured).to_string(),
            "Email transport is not configured"
        );
    }
}

//! SMS delivery through a generic HTTP provider.
//!
//! [`SmsDelivery`] posts `{"to", "from", "body"}` as JSON to the provider
//! URL with bearer authentication. Numbers arrive already normalised to
//! E.164. Without provider configuration every send fails with
//! [`SmsError::NotConfigured`].

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use super::{DeliveryError, SmsTransport};

/// HTTP request timeout for a single provider call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SmsError {
    /// The underlying HTTP request failed (network, DNS, timeout, etc.).
    #[error("SMS request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The provider returned a non-2xx status code.
    #[error("SMS provider returned HTTP {0}")]
    HttpStatus(u16),

    #[error("SMS transport is not configured")]
    NotConfigured,
}

// ---------------------------------------------------------------------------
// SmsConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SmsConfig {
    pub api_url: String,
    pub api_key: String,
    /// Sender number registered with the provider.
    pub from_number: String,
}

impl SmsConfig {
    /// Load configuration from environment variables.
    ///
    /// Returns `None` unless all three are set.
    ///
    /// | Variable          | Required |
    /// |-------------------|----------|
    /// | `SMS_API_URL`     | yes      |
    /// | `SMS_API_KEY`     | yes      |
    /// | `SMS_FROM_NUMBER` | yes      |
    pub fn from_env() -> Option<Self> {
        Some(Self {
            api_url: std::env::var("SMS_API_URL").ok()?,
            api_key: std::env::var("SMS_API_KEY").ok()?,
            from_number: std::env::var("SMS_FROM_NUMBER").ok()?,
        })
    }
}

// ---------------------------------------------------------------------------
// SmsDelivery
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct SmsRequest<'a> {
    to: &'a str,
    from: &'a str,
    body: &'a str,
}

pub struct SmsDelivery {
    client: reqwest::Client,
    config: Option<SmsConfig>,
}

impl SmsDelivery {
    pub fn new(config: Option<SmsConfig>) -> Result<Self, SmsError> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { client, config })
    }

    pub fn is_configured(&self) -> bool {
        self.config.is_some()
    }

    async fn deliver(&self, to: &str, body: &str) -> Result<(), SmsError> {
        let config = self.config.as_ref().ok_or(SmsError::NotConfigured)?;

        let response = self
            .client
            .post(&config.api_url)
            .bearer_auth(&config.api_key)
            .json(&SmsRequest {
                to,
                from: &config.from_number,
                body,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SmsError::HttpStatus(response.status().as_u16()));
        }

        tracing::info!(to, "Notification SMS sent");
        Ok(())
    }
}

#[async_trait]
impl SmsTransport for SmsDelivery {
    async fn send(&self, to: &str, body: &str) -> Result<(), DeliveryError> {
        Ok(self.deliver(to, body).await?)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[tokio::test]
    async fn unconfigured_send_fails() {
        let delivery = SmsDelivery::new(None).unwrap();
        assert!(!delivery.is_configured());
        assert_matches!(
            delivery.send("+15550100199", "hi").await,
            Err(DeliveryError::Sms(SmsError::NotConfigured))
        );
    }

    #[test]
    fn request_body_shape() {
        let json = serde_json::to_value(SmsRequest {
            to: "+15550100199",
            from: "+15550000000",
            body: "Meeting starts soon",
        })
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "to": "+15550100199",
                "from": "+15550000000",
                "body": "Meeting starts soon",
            })
        );
    }

    #[test]
    fn sms_error_display_http_status() {
        assert_eq!(SmsError::HttpStatus(502).to_string(), "SMS provider returned HTTP 502");
    }
}

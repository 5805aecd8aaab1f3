//! InSync notification delivery engine.
//!
//! - [`delivery`]: channel transports (SMTP email, HTTP SMS, push).
//! - [`Deliverer`]: claims one record and runs a single delivery attempt.
//! - [`DispatchLoop`] / [`RetryLoop`]: timer-driven background services
//!   that deliver due and failed records.
//! - [`LifecycleCoordinator`]: plans and cancels records in response to
//!   meeting mutations.
//! - [`PreferenceService`]: per-user channel preferences with lazy defaults.

pub mod config;
pub mod coordinator;
pub mod deliverer;
pub mod delivery;
pub mod dispatch;
pub mod preferences;
pub mod retry;

pub use config::{ConfigError, EngineConfig};
pub use coordinator::{CoordinatorReport, LifecycleCoordinator};
pub use deliverer::{Deliverer, DeliveryOutcome, TickReport};
pub use delivery::email::{EmailConfig, EmailDelivery};
pub use delivery::push::PushDelivery;
pub use delivery::sms::{SmsConfig, SmsDelivery};
pub use delivery::{DeliveryError, Transports};
pub use dispatch::DispatchLoop;
pub use preferences::PreferenceService;
pub use retry::{RetryLoop, RetryReport};

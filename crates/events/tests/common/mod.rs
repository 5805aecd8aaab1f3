//! Shared fixtures for engine tests: in-memory stores, a manual clock and
//! recording transports.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use insync_core::clock::ManualClock;
use insync_core::notification::{Channel, NotificationKind, NotificationRecord};
use insync_core::preferences::PreferenceMatrix;
use insync_core::status::NotificationStatus;
use insync_core::types::{DbId, MeetingSnapshot, Recipient, Timestamp};
use insync_db::memory::{MemoryDirectory, MemoryNotificationStore, MemoryPreferenceStore};
use insync_events::delivery::{EmailTransport, PushTransport, SmsTransport};
use insync_events::{
    Deliverer, DeliveryError, DispatchLoop, EngineConfig, LifecycleCoordinator,
    PreferenceService, RetryLoop, Transports,
};

pub const MEETING_ID: DbId = 10;
pub const HOST_ID: DbId = 1;
pub const GUEST_ID: DbId = 2;
pub const GUEST_PHONE: &str = "(555) 010-0199";
pub const GUEST_E164: &str = "+15550100199";

pub fn t0() -> Timestamp {
    Utc.with_ymd_and_hms(2026, 5, 11, 14, 0, 0).unwrap()
}

pub fn minutes(n: i64) -> chrono::Duration {
    chrono::Duration::minutes(n)
}

pub fn host() -> Recipient {
    Recipient {
        user_id: HOST_ID,
        email: "host@example.com".to_string(),
        phone: None,
    }
}

pub fn guest() -> Recipient {
    Recipient {
        user_id: GUEST_ID,
        email: "guest@example.com".to_string(),
        phone: Some(GUEST_PHONE.to_string()),
    }
}

pub fn meeting(
    start: Option<Timestamp>,
    end: Option<Timestamp>,
    participants: Vec<Recipient>,
) -> MeetingSnapshot {
    MeetingSnapshot {
        id: MEETING_ID,
        title: "Roadmap Review".to_string(),
        join_code: "rdm-4471".to_string(),
        start,
        end,
        host: host(),
        participants,
    }
}

/// A matrix enabling `channels` for every kind and nothing else.
pub fn only(channels: &[Channel]) -> PreferenceMatrix {
    let mut matrix = PreferenceMatrix::none();
    for kind in NotificationKind::ALL {
        for &channel in channels {
            matrix.set(kind, channel, true);
        }
    }
    matrix
}

// ---------------------------------------------------------------------------
// Recording transport
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivered {
    pub to: String,
    pub title: String,
    pub body: String,
}

/// Records every send; can be switched to fail or to stall.
#[derive(Default)]
pub struct RecordingTransport {
    delivered: Mutex<Vec<Delivered>>,
    failing: AtomicBool,
    delay: Mutex<Option<Duration>>,
}

impl RecordingTransport {
    pub fn delivered(&self) -> Vec<Delivered> {
        self.delivered.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.delivered.lock().unwrap().len()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock().unwrap() = delay;
    }

    async fn record(&self, to: String, title: &str, body: &str) -> Result<(), DeliveryError> {
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(DeliveryError::Push("provider unavailable".to_string()));
        }
        self.delivered.lock().unwrap().push(Delivered {
            to,
            title: title.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}

#[async_trait]
impl EmailTransport for RecordingTransport {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), DeliveryError> {
        self.record(to.to_string(), subject, body).await
    }
}

#[async_trait]
impl SmsTransport for RecordingTransport {
    async fn send(&self, to: &str, body: &str) -> Result<(), DeliveryError> {
        self.record(to.to_string(), "", body).await
    }
}

#[async_trait]
impl PushTransport for RecordingTransport {
    async fn send(&self, user_id: DbId, title: &str, body: &str) -> Result<(), DeliveryError> {
        self.record(user_id.to_string(), title, body).await
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct Harness {
    pub clock: Arc<ManualClock>,
    pub store: Arc<MemoryNotificationStore>,
    pub directory: Arc<MemoryDirectory>,
    pub email: Arc<RecordingTransport>,
    pub sms: Arc<RecordingTransport>,
    pub push: Arc<RecordingTransport>,
    pub preferences: PreferenceService,
    pub deliverer: Arc<Deliverer>,
    pub coordinator: LifecycleCoordinator,
    pub dispatch: DispatchLoop,
    pub retry: RetryLoop,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        let clock = Arc::new(ManualClock::new(t0()));
        let store = Arc::new(MemoryNotificationStore::new());
        let directory = Arc::new(MemoryDirectory::new());
        let email = Arc::new(RecordingTransport::default());
        let sms = Arc::new(RecordingTransport::default());
        let push = Arc::new(RecordingTransport::default());
        let preferences = PreferenceService::new(Arc::new(MemoryPreferenceStore::new()));

        let transports = Transports {
            email: email.clone(),
            sms: sms.clone(),
            push: push.clone(),
        };
        let deliverer = Arc::new(Deliverer::new(
            store.clone(),
            directory.clone(),
            transports,
            clock.clone(),
            &config,
        ));
        let coordinator = LifecycleCoordinator::new(
            store.clone(),
            preferences.clone(),
            deliverer.clone(),
            clock.clone(),
            &config,
        );
        let dispatch = DispatchLoop::new(deliverer.clone(), &config);
        let retry = RetryLoop::new(deliverer.clone(), &config);

        Self {
            clock,
            store,
            directory,
            email,
            sms,
            push,
            preferences,
            deliverer,
            coordinator,
            dispatch,
            retry,
        }
    }

    /// Register the meeting and its people with the directory.
    pub fn register(&self, meeting: &MeetingSnapshot) {
        self.directory.add_meeting(meeting.clone());
    }

    pub async fn set_prefs(&self, user_id: DbId, matrix: PreferenceMatrix) {
        self.preferences.update(user_id, &matrix).await.unwrap();
    }

    pub fn advance(&self, by: chrono::Duration) {
        self.clock.advance(by);
    }

    pub fn records(&self) -> Vec<NotificationRecord> {
        self.store.all()
    }

    pub fn with_status(&self, status: NotificationStatus) -> Vec<NotificationRecord> {
        self.records()
            .into_iter()
            .filter(|r| r.status == status)
            .collect()
    }
}

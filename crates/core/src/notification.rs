//! Notification kinds, delivery channels and the notification record.
//!
//! Kind and channel names must match the values stored in the
//! `notifications.kind`, `notifications.channel` and
//! `notification_preferences` columns.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::status::NotificationStatus;
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// NotificationKind
// ---------------------------------------------------------------------------

/// The reason a user is being notified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    ReminderT15,
    ReminderT5,
    Started,
    EndingSoon,
    Ended,
    Cancelled,
    Rescheduled,
}

impl NotificationKind {
    pub const ALL: [NotificationKind; 7] = [
        NotificationKind::ReminderT15,
        NotificationKind::ReminderT5,
        NotificationKind::Started,
        NotificationKind::EndingSoon,
        NotificationKind::Ended,
        NotificationKind::Cancelled,
        NotificationKind::Rescheduled,
    ];

    pub const COUNT: usize = Self::ALL.len();

    /// Dense index used by the preference matrix.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NotificationKind::ReminderT15 => "reminder_t15",
            NotificationKind::ReminderT5 => "reminder_t5",
            NotificationKind::Started => "started",
            NotificationKind::EndingSoon => "ending_soon",
            NotificationKind::Ended => "ended",
            NotificationKind::Cancelled => "cancelled",
            NotificationKind::Rescheduled => "rescheduled",
        }
    }

    /// Kinds sent the moment their lifecycle event happens instead of
    /// being planned against the meeting timeline.
    pub fn is_immediate(self) -> bool {
        matches!(
            self,
            NotificationKind::Cancelled | NotificationKind::Rescheduled
        )
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| CoreError::Validation(format!("Unknown notification kind '{s}'")))
    }
}

// ---------------------------------------------------------------------------
// Channel
// ---------------------------------------------------------------------------

/// Email notification delivered via SMTP.
pub const CHANNEL_EMAIL: &str = "email";

/// SMS notification delivered through the configured provider.
pub const CHANNEL_SMS: &str = "sms";

/// Push notification delivered to the user's devices.
pub const CHANNEL_PUSH: &str = "push";

/// In-app notification; shares the push preference and transport.
pub const CHANNEL_IN_APP: &str = "in_app";

/// Delivery medium of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Email,
    Sms,
    Push,
    InApp,
}

impl Channel {
    pub const ALL: [Channel; 4] = [Channel::Email, Channel::Sms, Channel::Push, Channel::InApp];

    /// Channels the planner expands every notification into.
    pub const PLANNED: [Channel; 3] = [Channel::Email, Channel::Sms, Channel::Push];

    pub fn as_str(self) -> &'static str {
        match self {
            Channel::Email => CHANNEL_EMAIL,
            Channel::Sms => CHANNEL_SMS,
            Channel::Push => CHANNEL_PUSH,
            Channel::InApp => CHANNEL_IN_APP,
        }
    }

    /// The channel whose preference flag governs this channel.
    ///
    /// In-app delivery is folded into push.
    pub fn preference_channel(self) -> Channel {
        match self {
            Channel::InApp => Channel::Push,
            other => other,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| CoreError::Validation(format!("Unknown notification channel '{s}'")))
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// A persisted notification intent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationRecord {
    pub id: DbId,
    pub meeting_id: DbId,
    pub user_id: DbId,
    pub kind: NotificationKind,
    pub channel: Channel,
    pub status: NotificationStatus,
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

/// A notification ready to be inserted as `Pending`.
///
/// Produced by the planner; the store assigns the id and bookkeeping
/// columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewNotification {
    pub meeting_id: DbId,
    pub user_id: DbId,
    pub kind: NotificationKind,
    pub channel: Channel,
    pub scheduled_at: Timestamp,
    pub title: String,
    pub body: String,
}

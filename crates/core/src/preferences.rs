//! Per-user notification preference matrix.
//!
//! A dense `kind x channel` table of booleans. Only the channels in
//! [`PreferenceMatrix::CHANNELS`] carry their own flag; in-app delivery reads
//! the push flag (see [`Channel::preference_channel`]).

use serde::{Deserialize, Serialize};

use crate::notification::{Channel, NotificationKind};

const CHANNEL_COUNT: usize = 3;

/// Defaults applied when a user has no stored matrix, in
/// `[email, sms, push]` order per kind.
const DEFAULTS: [(NotificationKind, [bool; CHANNEL_COUNT]); NotificationKind::COUNT] = [
    (NotificationKind::ReminderT15, [true, false, true]),
    (NotificationKind::ReminderT5, [true, true, true]),
    (NotificationKind::Started, [true, false, true]),
    (NotificationKind::EndingSoon, [true, false, true]),
    (NotificationKind::Ended, [false, false, true]),
    (NotificationKind::Cancelled, [true, true, true]),
    (NotificationKind::Rescheduled, [true, true, true]),
];

/// One (kind, channel, enabled) cell of a matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferenceEntry {
    pub kind: NotificationKind,
    pub channel: Channel,
    pub enabled: bool,
}

/// Which (kind, channel) combinations a user wants to receive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferenceMatrix {
    flags: [[bool; CHANNEL_COUNT]; NotificationKind::COUNT],
}

impl PreferenceMatrix {
    /// Channels with their own preference column.
    pub const CHANNELS: [Channel; CHANNEL_COUNT] = [Channel::Email, Channel::Sms, Channel::Push];

    /// A matrix with every combination disabled.
    pub fn none() -> Self {
        Self {
            flags: [[false; CHANNEL_COUNT]; NotificationKind::COUNT],
        }
    }

    fn channel_index(channel: Channel) -> usize {
        match channel.preference_channel() {
            Channel::Email => 0,
            Channel::Sms => 1,
            // InApp is mapped onto Push by `preference_channel`.
            Channel::Push | Channel::InApp => 2,
        }
    }

    pub fn is_enabled(&self, kind: NotificationKind, channel: Channel) -> bool {
        self.flags[kind.index()][Self::channel_index(channel)]
    }

    pub fn set(&mut self, kind: NotificationKind, channel: Channel, enabled: bool) {
        self.flags[kind.index()][Self::channel_index(channel)] = enabled;
    }

    /// Builder-style [`set`](Self::set).
    pub fn with(mut self, kind: NotificationKind, channel: Channel, enabled: bool) -> Self {
        self.set(kind, channel, enabled);
        self
    }

    /// Every cell of the matrix, kind-major.
    pub fn entries(&self) -> Vec<PreferenceEntry> {
        NotificationKind::ALL
            .into_iter()
            .flat_map(|kind| {
                Self::CHANNELS.into_iter().map(move |channel| (kind, channel))
            })
            .map(|(kind, channel)| PreferenceEntry {
                kind,
                channel,
                enabled: self.is_enabled(kind, channel),
            })
            .collect()
    }

    /// Rebuild a matrix from stored cells.
    ///
    /// Cells missing from `entries` keep their default value.
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = PreferenceEntry>,
    {
        let mut matrix = Self::default();
        for entry in entries {
            matrix.set(entry.kind, entry.channel, entry.enabled);
        }
        matrix
    }

    /// Overwrite every flag with the flags of `other`.
    ///
    /// Updates are full replacements: the caller always sends back the
    /// complete matrix.
    pub fn replace_with(&mut self, other: &PreferenceMatrix) {
        self.flags = other.flags;
    }
}

impl Default for PreferenceMatrix {
    fn default() -> Self {
        let mut matrix = Self::none();
        for (kind, row) in DEFAULTS {
            matrix.flags[kind.index()] = row;
        }
        matrix
    }
}

//! Status helper enums mapping to SMALLINT lookup tables.
//!
//! Each enum variant's discriminant matches the seed data order (1-based)
//! in the corresponding `*_statuses` database table.

use serde::{Deserialize, Serialize};

/// Status ID type matching SMALLINT/SMALLSERIAL in the database.
pub type StatusId = i16;

macro_rules! define_status_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $val:expr ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[repr(i16)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $( $(#[$vmeta])* $variant = $val ),+
        }

        impl $name {
            /// Every variant in seed-data order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Return the database status ID.
            pub fn id(self) -> StatusId {
                self as StatusId
            }

            /// Look up a variant by its database status ID.
            pub fn from_id(id: StatusId) -> Option<Self> {
                Self::ALL.iter().copied().find(|s| s.id() == id)
            }

            /// Variant name, for logs and error messages.
            pub fn name(self) -> &'static str {
                match self {
                    $( $name::$variant => stringify!($variant) ),+
                }
            }
        }

        impl From<$name> for StatusId {
            fn from(value: $name) -> Self {
                value as StatusId
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.name())
            }
        }
    };
}

define_status_enum! {
    /// Lifecycle of a notification record.
    ///
    /// `Sending` is the in-flight claim marker: a record holds it for the
    /// duration of exactly one delivery attempt.
    NotificationStatus {
        Pending = 1,
        Sending = 2,
        Sent = 3,
        Failed = 4,
        Cancelled = 5,
        Abandoned = 6,
    }
}

impl NotificationStatus {
    /// Statuses a record may be claimed from.
    pub const CLAIMABLE: [NotificationStatus; 2] =
        [NotificationStatus::Pending, NotificationStatus::Failed];

    /// Statuses that are cancelled when their meeting is rescheduled,
    /// cancelled or deleted.
    ///
    /// A cancelled `Sending` record has no claim left for the in-flight
    /// attempt to complete or fail.
    pub const CANCELLABLE: [NotificationStatus; 3] = [
        NotificationStatus::Pending,
        NotificationStatus::Sending,
        NotificationStatus::Failed,
    ];

    /// Statuses covered by the one-active-record-per-tuple invariant.
    pub const ACTIVE: [NotificationStatus; 3] = [
        NotificationStatus::Pending,
        NotificationStatus::Sending,
        NotificationStatus::Failed,
    ];

    /// Returns the set of statuses reachable from `self`.
    ///
    /// Terminal states (Sent, Cancelled, Abandoned) return an empty slice.
    pub fn valid_transitions(self) -> &'static [NotificationStatus] {
        use NotificationStatus::*;
        match self {
            Pending => &[Sending, Cancelled],
            Sending => &[Sent, Failed, Abandoned, Cancelled],
            Failed => &[Sending, Cancelled],
            Sent | Cancelled | Abandoned => &[],
        }
    }

    pub fn is_terminal(self) -> bool {
        self.valid_transitions().is_empty()
    }

    /// Check whether a transition from `self` to `to` is valid.
    pub fn can_transition(self, to: NotificationStatus) -> bool {
        self.valid_transitions().contains(&to)
    }

    /// Validate a state transition, returning an error message for invalid ones.
    pub fn validate_transition(self, to: NotificationStatus) -> Result<(), String> {
        if self.can_transition(to) {
            Ok(())
        } else {
            Err(format!(
                "Invalid transition: {self} ({}) -> {to} ({})",
                self.id(),
                to.id()
            ))
        }
    }
}

use serde::{Deserialize, Serialize};

/// All database primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Contact details of a user who can receive notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub user_id: DbId,
    pub email: String,
    pub phone: Option<String>,
}

impl Recipient {
    /// Whether the recipient has a usable (non-blank) phone number.
    pub fn has_phone(&self) -> bool {
        self.phone.as_deref().is_some_and(|p| !p.trim().is_empty())
    }
}

/// The slice of a meeting the notification engine needs.
///
/// Built by the meeting service from its own records and handed to the
/// lifecycle coordinator; the engine never loads or stores meetings itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeetingSnapshot {
    pub id: DbId,
    pub title: String,
    /// Public join identifier shown to participants.
    pub join_code: String,
    pub start: Option<Timestamp>,
    pub end: Option<Timestamp>,
    pub host: Recipient,
    pub participants: Vec<Recipient>,
}

impl MeetingSnapshot {
    /// Host first, then participants, without duplicate user ids.
    pub fn recipients(&self) -> Vec<Recipient> {
        let mut out = Vec::with_capacity(self.participants.len() + 1);
        out.push(self.host.clone());
        for p in &self.participants {
            if !out.iter().any(|r: &Recipient| r.user_id == p.user_id) {
                out.push(p.clone());
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recipient(user_id: DbId, phone: Option<&str>) -> Recipient {
        Recipient {
            user_id,
            email: format!("user{user_id}@example.com"),
            phone: phone.map(str::to_string),
        }
    }

    #[test]
    fn blank_phone_is_not_usable() {
        assert!(!recipient(1, None).has_phone());
        assert!(!recipient(1, Some("   ")).has_phone());
        assert!(recipient(1, Some("555-0100")).has_phone());
    }

    #[test]
    fn recipients_puts_host_first_and_dedupes() {
        let meeting = MeetingSnapshot {
            id: 7,
            title: "Standup".to_string(),
            join_code: "abc-123".to_string(),
            start: None,
            end: None,
            host: recipient(1, None),
            participants: vec![recipient(2, None), recipient(1, None), recipient(3, None)],
        };
        let ids: Vec<DbId> = meeting.recipients().iter().map(|r| r.user_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }
}

//! Plain-text subject and body templates for each notification kind.
//!
//! Text depends only on the meeting (title, start, join code) so planning
//! the same meeting twice renders identical messages.

use crate::notification::NotificationKind;
use crate::types::{MeetingSnapshot, Timestamp};

/// Time-of-day format, e.g. `3:05 PM UTC`.
const TIME_FORMAT: &str = "%-I:%M %p UTC";

/// Full date-time format, e.g. `Mar 4, 2026 at 3:05 PM UTC`.
const DATE_TIME_FORMAT: &str = "%b %-d, %Y at %-I:%M %p UTC";

/// Shown in place of a start time for meetings that have none.
const UNSCHEDULED: &str = "an unscheduled time";

/// A rendered notification message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    pub title: String,
    pub body: String,
}

fn format_time(start: Option<Timestamp>) -> String {
    start.map_or_else(|| UNSCHEDULED.to_string(), |s| s.format(TIME_FORMAT).to_string())
}

fn format_date_time(start: Option<Timestamp>) -> String {
    start.map_or_else(
        || UNSCHEDULED.to_string(),
        |s| s.format(DATE_TIME_FORMAT).to_string(),
    )
}

/// Email subject / push title for `kind`.
pub fn subject(meeting: &MeetingSnapshot, kind: NotificationKind) -> String {
    let title = &meeting.title;
    match kind {
        NotificationKind::ReminderT15 => format!("Meeting Reminder: {title} starts in 15 minutes"),
        NotificationKind::ReminderT5 => format!("Meeting Reminder: {title} starts in 5 minutes"),
        NotificationKind::Started => format!("Meeting Started: {title}"),
        NotificationKind::EndingSoon => format!("Meeting Ending Soon: {title}"),
        NotificationKind::Ended => format!("Meeting Ended: {title}"),
        NotificationKind::Cancelled => format!("Meeting Cancelled: {title}"),
        NotificationKind::Rescheduled => format!("Meeting Rescheduled: {title}"),
    }
}

/// Message body for `kind`; also the full SMS text.
pub fn body(meeting: &MeetingSnapshot, kind: NotificationKind) -> String {
    let title = &meeting.title;
    let code = &meeting.join_code;
    match kind {
        NotificationKind::ReminderT15 => format!(
            "Reminder: '{title}' starts in 15 minutes at {}. Meeting ID: {code}",
            format_time(meeting.start)
        ),
        NotificationKind::ReminderT5 => format!(
            "Reminder: '{title}' starts in 5 minutes at {}. Meeting ID: {code}",
            format_time(meeting.start)
        ),
        NotificationKind::Started => {
            format!("'{title}' has started! Join now with Meeting ID: {code}")
        }
        NotificationKind::EndingSoon => {
            format!("'{title}' will end in 5 minutes. Please wrap up your discussion.")
        }
        NotificationKind::Ended => format!("'{title}' has ended. Thank you for participating!"),
        NotificationKind::Cancelled => format!(
            "'{title}' scheduled for {} has been cancelled.",
            format_date_time(meeting.start)
        ),
        NotificationKind::Rescheduled => format!(
            "'{title}' has been rescheduled to {}. Meeting ID: {code}",
            format_date_time(meeting.start)
        ),
    }
}

pub fn render(meeting: &MeetingSnapshot, kind: NotificationKind) -> RenderedMessage {
    RenderedMessage {
        title: subject(meeting, kind),
        body: body(meeting, kind),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::types::Recipient;

    fn meeting(start: Option<Timestamp>) -> MeetingSnapshot {
        MeetingSnapshot {
            id: 1,
            title: "Design Review".to_string(),
            join_code: "xyz-789".to_string(),
            start,
            end: None,
            host: Recipient {
                user_id: 1,
                email: "host@example.com".to_string(),
                phone: None,
            },
            participants: vec![],
        }
    }

    #[test]
    fn reminder_mentions_time_and_code() {
        let start = Utc.with_ymd_and_hms(2026, 3, 4, 15, 5, 0).unwrap();
        let msg = render(&meeting(Some(start)), NotificationKind::ReminderT15);
        assert_eq!(
            msg.title,
            "Meeting Reminder: Design Review starts in 15 minutes"
        );
        assert_eq!(
            msg.body,
            "Reminder: 'Design Review' starts in 15 minutes at 3:05 PM UTC. Meeting ID: xyz-789"
        );
    }

    #[test]
    fn reschedule_uses_full_date() {
        let start = Utc.with_ymd_and_hms(2026, 3, 4, 9, 30, 0).unwrap();
        let msg = render(&meeting(Some(start)), NotificationKind::Rescheduled);
        assert_eq!(
            msg.body,
            "'Design Review' has been rescheduled to Mar 4, 2026 at 9:30 AM UTC. Meeting ID: xyz-789"
        );
    }

    #[test]
    fn cancellation_without_start_still_renders() {
        let msg = render(&meeting(None), NotificationKind::Cancelled);
        assert_eq!(
            msg.body,
            "'Design Review' scheduled for an unscheduled time has been cancelled."
        );
    }

    #[test]
    fn every_kind_has_distinct_subject() {
        let m = meeting(None);
        let mut subjects: Vec<String> = NotificationKind::ALL
            .into_iter()
            .map(|k| subject(&m, k))
            .collect();
        subjects.sort();
        subjects.dedup();
        assert_eq!(subjects.len(), NotificationKind::COUNT);
    }
}

//! Scheduling planner.
//!
//! Pure functions that turn a meeting timeline and a set of recipients into
//! per-channel [`NewNotification`]s. Persistence is the caller's job; the
//! same inputs always produce the same output, which is what makes
//! reschedule-by-replace safe.

use chrono::Duration;

use crate::error::CoreError;
use crate::notification::{Channel, NewNotification, NotificationKind};
use crate::templates;
use crate::types::{DbId, MeetingSnapshot, Recipient, Timestamp};

/// Lead time of the first reminder.
pub fn reminder_t15_lead() -> Duration {
    Duration::minutes(15)
}

/// Lead time of the second reminder.
pub fn reminder_t5_lead() -> Duration {
    Duration::minutes(5)
}

/// How long before the end the "ending soon" notice fires.
pub fn ending_soon_lead() -> Duration {
    Duration::minutes(5)
}

/// Candidate (kind, due time) pairs for a meeting timeline, keeping only
/// those strictly after `now`.
pub fn due_times(
    start: Timestamp,
    end: Option<Timestamp>,
    now: Timestamp,
) -> Vec<(NotificationKind, Timestamp)> {
    let mut candidates = vec![
        (NotificationKind::ReminderT15, start - reminder_t15_lead()),
        (NotificationKind::ReminderT5, start - reminder_t5_lead()),
        (NotificationKind::Started, start),
    ];

    if let Some(end) = end {
        let ending_soon = end - ending_soon_lead();
        if ending_soon > start {
            candidates.push((NotificationKind::EndingSoon, ending_soon));
        }
        candidates.push((NotificationKind::Ended, end));
    }

    candidates.retain(|(_, due)| *due > now);
    candidates
}

/// Expand one (kind, due) pair for one recipient over the planned channels.
fn expand<F>(
    meeting: &MeetingSnapshot,
    recipient: &Recipient,
    kind: NotificationKind,
    due: Timestamp,
    is_enabled: &F,
    out: &mut Vec<NewNotification>,
) where
    F: Fn(DbId, NotificationKind, Channel) -> bool,
{
    let message = templates::render(meeting, kind);
    for channel in Channel::PLANNED {
        if !is_enabled(recipient.user_id, kind, channel) {
            continue;
        }
        if channel == Channel::Sms && !recipient.has_phone() {
            continue;
        }
        out.push(NewNotification {
            meeting_id: meeting.id,
            user_id: recipient.user_id,
            kind,
            channel,
            scheduled_at: due,
            title: message.title.clone(),
            body: message.body.clone(),
        });
    }
}

/// Plan timeline notifications (reminders, start, end) for `recipients`.
///
/// `is_enabled` answers the preference question for a
/// `(user, kind, channel)` triple. Fails with [`CoreError::Validation`] when
/// the meeting has no start time.
pub fn plan_scheduled<F>(
    meeting: &MeetingSnapshot,
    recipients: &[Recipient],
    now: Timestamp,
    is_enabled: F,
) -> Result<Vec<NewNotification>, CoreError>
where
    F: Fn(DbId, NotificationKind, Channel) -> bool,
{
    let start = meeting.start.ok_or_else(|| {
        CoreError::Validation(format!("Meeting {} has no start time", meeting.id))
    })?;

    let due = due_times(start, meeting.end, now);
    let mut out = Vec::new();
    for recipient in recipients {
        for (kind, at) in &due {
            expand(meeting, recipient, *kind, *at, &is_enabled, &mut out);
        }
    }
    Ok(out)
}

/// Plan a notification that fires right away (cancellation, reschedule)
/// for the host and every participant.
pub fn plan_immediate<F>(
    meeting: &MeetingSnapshot,
    kind: NotificationKind,
    now: Timestamp,
    is_enabled: F,
) -> Vec<NewNotification>
where
    F: Fn(DbId, NotificationKind, Channel) -> bool,
{
    let mut out = Vec::new();
    for recipient in meeting.recipients() {
        expand(meeting, &recipient, kind, now, &is_enabled, &mut out);
    }
    out
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::preferences::PreferenceMatrix;

    fn now() -> Timestamp {
        Utc.with_ymd_and_hms(2026, 5, 11, 14, 0, 0).unwrap()
    }

    fn recipient(user_id: DbId, phone: Option<&str>) -> Recipient {
        Recipient {
            user_id,
            email: format!("u{user_id}@example.com"),
            phone: phone.map(str::to_string),
        }
    }

    fn meeting(start: Option<Timestamp>, end: Option<Timestamp>) -> MeetingSnapshot {
        MeetingSnapshot {
            id: 10,
            title: "Planning".to_string(),
            join_code: "pln-001".to_string(),
            start,
            end,
            host: recipient(1, None),
            participants: vec![],
        }
    }

    fn defaults(_: DbId, kind: NotificationKind, channel: Channel) -> bool {
        PreferenceMatrix::default().is_enabled(kind, channel)
    }

    fn email_only(_: DbId, _: NotificationKind, channel: Channel) -> bool {
        channel == Channel::Email
    }

    #[test]
    fn reminders_land_fifteen_and_five_minutes_before_start() {
        let start = now() + Duration::hours(1);
        let due = due_times(start, None, now());
        assert_eq!(
            due,
            vec![
                (NotificationKind::ReminderT15, start - Duration::minutes(15)),
                (NotificationKind::ReminderT5, start - Duration::minutes(5)),
                (NotificationKind::Started, start),
            ]
        );
    }

    #[test]
    fn start_within_five_minutes_skips_both_reminders() {
        let start = now() + Duration::minutes(4);
        let kinds: Vec<_> = due_times(start, None, now()).into_iter().map(|(k, _)| k).collect();
        assert_eq!(kinds, vec![NotificationKind::Started]);
    }

    #[test]
    fn reminder_exactly_at_now_is_discarded() {
        let start = now() + Duration::minutes(5);
        let kinds: Vec<_> = due_times(start, None, now()).into_iter().map(|(k, _)| k).collect();
        assert!(!kinds.contains(&NotificationKind::ReminderT5));
        assert!(kinds.contains(&NotificationKind::Started));
    }

    #[test]
    fn short_meeting_has_no_ending_soon() {
        let start = now() + Duration::hours(1);
        let end = start + Duration::minutes(5);
        let kinds: Vec<_> = due_times(start, Some(end), now()).into_iter().map(|(k, _)| k).collect();
        assert!(!kinds.contains(&NotificationKind::EndingSoon));
        assert!(kinds.contains(&NotificationKind::Ended));
    }

    #[test]
    fn past_meeting_plans_nothing() {
        let start = now() - Duration::hours(2);
        let end = start + Duration::hours(1);
        assert!(due_times(start, Some(end), now()).is_empty());
    }

    #[test]
    fn missing_start_is_a_validation_error() {
        let result = plan_scheduled(&meeting(None, None), &[recipient(1, None)], now(), defaults);
        assert!(matches!(result, Err(CoreError::Validation(_))));
    }

    #[test]
    fn sms_never_planned_without_phone() {
        let start = now() + Duration::hours(1);
        let m = meeting(Some(start), Some(start + Duration::hours(1)));
        let everything = |_: DbId, _: NotificationKind, _: Channel| true;
        let planned = plan_scheduled(
            &m,
            &[recipient(1, None), recipient(2, Some("  "))],
            now(),
            everything,
        )
        .unwrap();
        assert!(!planned.is_empty());
        assert!(planned.iter().all(|n| n.channel != Channel::Sms));
    }

    #[test]
    fn host_and_participant_scenario_yields_fifteen_records() {
        let start = now() + Duration::minutes(20);
        let end = now() + Duration::minutes(50);
        let m = meeting(Some(start), Some(end));
        let host = recipient(1, None);
        let participant = recipient(2, Some("+1 555 010 0199"));
        let prefs = |user: DbId, _: NotificationKind, channel: Channel| match user {
            1 => channel == Channel::Email,
            _ => matches!(channel, Channel::Email | Channel::Sms),
        };

        let planned = plan_scheduled(&m, &[host, participant], now(), prefs).unwrap();
        assert_eq!(planned.len(), 15);

        let host_records: Vec<_> = planned.iter().filter(|n| n.user_id == 1).collect();
        let offsets: Vec<i64> = host_records
            .iter()
            .map(|n| (n.scheduled_at - now()).num_minutes())
            .collect();
        assert_eq!(offsets, vec![5, 15, 20, 45, 50]);
        assert!(host_records.iter().all(|n| n.channel == Channel::Email));

        let participant_sms = planned
            .iter()
            .filter(|n| n.user_id == 2 && n.channel == Channel::Sms)
            .count();
        assert_eq!(participant_sms, 5);
    }

    #[test]
    fn planning_is_deterministic() {
        let start = now() + Duration::hours(3);
        let m = meeting(Some(start), Some(start + Duration::minutes(45)));
        let r = [recipient(1, Some("5550100199"))];
        let a = plan_scheduled(&m, &r, now(), defaults).unwrap();
        let b = plan_scheduled(&m, &r, now(), defaults).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn immediate_targets_host_and_participants_at_now() {
        let mut m = meeting(Some(now() + Duration::hours(1)), None);
        m.participants = vec![recipient(2, None), recipient(3, None)];
        let planned = plan_immediate(&m, NotificationKind::Cancelled, now(), email_only);
        let users: Vec<DbId> = planned.iter().map(|n| n.user_id).collect();
        assert_eq!(users, vec![1, 2, 3]);
        assert!(planned.iter().all(|n| n.scheduled_at == now()));
        assert!(planned.iter().all(|n| n.kind == NotificationKind::Cancelled));
    }
}

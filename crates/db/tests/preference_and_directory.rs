//! Integration tests for the Postgres preference store and directory.

use insync_core::notification::{Channel, NotificationKind};
use insync_core::preferences::PreferenceMatrix;
use insync_core::store::{Directory, PreferenceStore};
use insync_db::store::{PgDirectory, PgPreferenceStore};
use sqlx::PgPool;

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn defaults_are_seeded_once(pool: PgPool) {
    let store = PgPreferenceStore::new(pool);
    assert!(store.get(1).await.unwrap().is_none());

    let defaults = PreferenceMatrix::default();
    assert_eq!(store.get_or_insert(1, &defaults).await.unwrap(), defaults);

    let custom = PreferenceMatrix::none().with(NotificationKind::Ended, Channel::Sms, true);
    store.put(1, &custom).await.unwrap();
    assert_eq!(store.get_or_insert(1, &defaults).await.unwrap(), custom);

    assert!(store.delete(1).await.unwrap());
    assert!(store.get(1).await.unwrap().is_none());
}

#[sqlx::test(migrations = "../../db/migrations", fixtures("directory"))]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn meeting_snapshot_excludes_host_from_participants(pool: PgPool) {
    let directory = PgDirectory::new(pool);

    let meeting = directory.find_meeting(10).await.unwrap().unwrap();
    assert_eq!(meeting.join_code, "wk-0010");
    assert_eq!(meeting.host.email, "host@example.com");
    let participants: Vec<i64> = meeting.participants.iter().map(|p| p.user_id).collect();
    assert_eq!(participants, vec![2]);

    let guest = directory.find_recipient(2).await.unwrap().unwrap();
    assert_eq!(guest.phone.as_deref(), Some("+15550100199"));
    assert!(directory.find_meeting(99).await.unwrap().is_none());
    assert!(directory.meeting_exists(10).await.unwrap());
    assert!(!directory.meeting_exists(99).await.unwrap());
}

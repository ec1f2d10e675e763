//! 分桌全流程集成测试
//!
//! 使用内存数据库跑完 入座 -> 补位 -> 洗牌 -> 移动 -> 离场 的完整生命周期。

use gather_server::db::DbService;
use gather_server::db::models::{GeoPoint, ParticipantCreate, SettingsUpdate};
use gather_server::db::repository::{ParticipantRepository, SettingsRepository, TableRepository};
use gather_server::seating::{MembershipIndex, SeatingError, SeatingService};

async fn setup() -> (DbService, SeatingService) {
    let db = DbService::memory().await.expect("memory db");
    let service = SeatingService::new(db.db.clone());
    (db, service)
}

async fn seed_participants(db: &DbService, count: usize) {
    let repo = ParticipantRepository::new(db.db.clone());
    for i in 0..count {
        repo.upsert(
            &format!("u{i}"),
            ParticipantCreate {
                name: format!("User {i}"),
                full_name: None,
                photo_ref: None,
                is_ephemeral: false,
                created_at: 1_000 + i as i64,
            },
        )
        .await
        .expect("seed participant");
    }
}

#[tokio::test]
async fn assign_seats_everyone_within_capacity() {
    let (db, service) = setup().await;
    seed_participants(&db, 7).await;

    let tables = service.assign_all().await.expect("assign");

    // Default cap is 5: seven people need two tables
    assert_eq!(tables.len(), 2);
    let seated: usize = tables.iter().map(|t| t.members.len()).sum();
    assert_eq!(seated, 7);
    assert!(tables.iter().all(|t| t.members.len() <= 5));

    // Committed state matches the returned layout
    let stored = TableRepository::new(db.db.clone())
        .find_all()
        .await
        .expect("find_all");
    assert_eq!(stored.len(), 2);
    let index = MembershipIndex::from_tables(&stored);
    assert_eq!(index.seated_count(), 7);
}

#[tokio::test]
async fn assign_is_incremental_for_late_arrivals() {
    let (db, service) = setup().await;
    seed_participants(&db, 4).await;

    let first = service.assign_all().await.expect("first assign");
    assert_eq!(first.len(), 1);

    // A late arrival joins; earlier seats stay untouched
    seed_participants(&db, 5).await; // re-upserts u0..u3, adds u4
    let second = service.assign_all().await.expect("second assign");

    assert_eq!(second.len(), 1);
    assert_eq!(second[0].members.len(), 5);

    let early: Vec<_> = first[0].members.iter().map(|m| &m.user_id).collect();
    for id in early {
        assert!(second[0].contains(id));
    }
}

#[tokio::test]
async fn shuffle_preserves_members_and_capacity() {
    let (db, service) = setup().await;
    seed_participants(&db, 9).await;
    service.assign_all().await.expect("assign");

    let shuffled = service.shuffle_all().await.expect("shuffle");

    let mut ids: Vec<_> = shuffled
        .iter()
        .flat_map(|t| t.members.iter().map(|m| m.user_id.clone()))
        .collect();
    ids.sort();
    let expected: Vec<_> = (0..9).map(|i| format!("u{i}")).collect();
    assert_eq!(ids, expected);
    assert!(shuffled.iter().all(|t| t.members.len() <= 5));
}

#[tokio::test]
async fn move_member_writes_both_tables() {
    let (db, service) = setup().await;
    seed_participants(&db, 7).await;
    let tables = service.assign_all().await.expect("assign");

    // Pick a user from the fuller table and move them to the other
    let (from, to) = if tables[0].members.len() >= tables[1].members.len() {
        (&tables[0], &tables[1])
    } else {
        (&tables[1], &tables[0])
    };
    let user_id = from.members[0].user_id.clone();
    let from_key = from.key().expect("from key");
    let to_key = to.key().expect("to key");

    service
        .move_member(&user_id, &from_key, &to_key)
        .await
        .expect("move");

    let stored = TableRepository::new(db.db.clone())
        .find_all()
        .await
        .expect("find_all");
    let index = MembershipIndex::from_tables(&stored);
    assert_eq!(index.table_of(&user_id), Some(to_key.as_str()));
    assert_eq!(index.seated_count(), 7);
}

#[tokio::test]
async fn move_into_full_table_is_rejected() {
    let (db, service) = setup().await;
    seed_participants(&db, 7).await;
    let tables = service.assign_all().await.expect("assign");

    // 5 + 2 layout: moving into the full table must fail
    let (full, small) = if tables[0].members.len() == 5 {
        (&tables[0], &tables[1])
    } else {
        (&tables[1], &tables[0])
    };
    let user_id = small.members[0].user_id.clone();

    let err = service
        .move_member(
            &user_id,
            &small.key().expect("key"),
            &full.key().expect("key"),
        )
        .await
        .expect_err("must reject");
    assert!(matches!(err, SeatingError::Move(_)));

    // Layout unchanged
    let stored = TableRepository::new(db.db.clone())
        .find_all()
        .await
        .expect("find_all");
    let index = MembershipIndex::from_tables(&stored);
    assert_eq!(index.table_of(&user_id), small.key().as_deref());
}

#[tokio::test]
async fn leave_removes_member_and_deletes_empty_table() {
    let (db, service) = setup().await;
    seed_participants(&db, 6).await;
    let tables = service.assign_all().await.expect("assign");
    assert_eq!(tables.len(), 2);

    // The second table holds exactly one person; their departure deletes it
    let lonely = tables
        .iter()
        .find(|t| t.members.len() == 1)
        .expect("one-person table");
    let user_id = lonely.members[0].user_id.clone();

    service.leave(&user_id).await;

    let stored = TableRepository::new(db.db.clone())
        .find_all()
        .await
        .expect("find_all");
    assert_eq!(stored.len(), 1);
    assert!(!stored[0].contains(&user_id));
}

#[tokio::test]
async fn assign_reseats_returning_users_after_their_table_was_deleted() {
    let (db, service) = setup().await;
    seed_participants(&db, 4).await;

    let settings_repo = SettingsRepository::new(db.db.clone());
    settings_repo
        .update_merge(SettingsUpdate {
            max_people_per_table: Some(2),
            consider_location: None,
        })
        .await
        .expect("set capacity");

    // t1 = [u0, u1], t2 = [u2, u3]
    let tables = service.assign_all().await.expect("assign");
    assert_eq!(tables.len(), 2);
    let t1_members: Vec<String> = tables[0].members.iter().map(|m| m.user_id.clone()).collect();

    // Both t1 occupants depart; the second departure deletes t1
    service.leave(&t1_members[0]).await;
    service.leave(&t1_members[1]).await;
    let remaining = TableRepository::new(db.db.clone())
        .find_all()
        .await
        .expect("find_all");
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].key().as_deref(), Some("t2"));

    // Returning users get a fresh table; the new key must not collide with t2
    let reseated = service.assign_all().await.expect("assign after departures");
    assert_eq!(reseated.len(), 2);
    let index = MembershipIndex::from_tables(&reseated);
    assert_eq!(index.seated_count(), 4);
    assert_eq!(index.table_of(&t1_members[0]), Some("t3"));
    assert_eq!(index.table_of(&t1_members[1]), Some("t3"));
}

#[tokio::test]
async fn leave_for_unseated_user_is_a_no_op() {
    let (db, service) = setup().await;
    seed_participants(&db, 3).await;
    service.assign_all().await.expect("assign");

    service.leave("ghost").await;

    let stored = TableRepository::new(db.db.clone())
        .find_all()
        .await
        .expect("find_all");
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].members.len(), 3);
}

#[tokio::test]
async fn settings_merge_changes_capacity_for_later_assignments() {
    let (db, service) = setup().await;
    seed_participants(&db, 6).await;

    let settings_repo = SettingsRepository::new(db.db.clone());
    let updated = settings_repo
        .update_merge(SettingsUpdate {
            max_people_per_table: Some(3),
            consider_location: None,
        })
        .await
        .expect("update settings");
    assert_eq!(updated.max_people_per_table, 3);
    // Untouched field keeps its default
    assert!(!updated.consider_location);

    let tables = service.assign_all().await.expect("assign");
    assert_eq!(tables.len(), 2);
    assert!(tables.iter().all(|t| t.members.len() <= 3));
}

#[tokio::test]
async fn location_grouping_buckets_participants() {
    let (db, service) = setup().await;
    seed_participants(&db, 4).await;

    let participants = ParticipantRepository::new(db.db.clone());
    let settings_repo = SettingsRepository::new(db.db.clone());
    settings_repo
        .update_merge(SettingsUpdate {
            max_people_per_table: None,
            consider_location: Some(true),
        })
        .await
        .expect("enable location grouping");

    // u0/u1 share a bucket, u2 sits elsewhere, u3 has no location
    for (key, lat, lon) in [("u0", 40.0011, -3.0022), ("u1", 40.0049, -3.0018)] {
        participants
            .set_location(
                key,
                Some(GeoPoint {
                    latitude: lat,
                    longitude: lon,
                    accuracy: 10.0,
                }),
            )
            .await
            .expect("set location");
    }
    participants
        .set_location(
            "u2",
            Some(GeoPoint {
                latitude: 51.5000,
                longitude: -0.1200,
                accuracy: 10.0,
            }),
        )
        .await
        .expect("set location");

    let tables = service.assign_all().await.expect("assign");

    // Three buckets (40.00,-3.00), (51.50,-0.12), unknown -> three tables
    assert_eq!(tables.len(), 3);
    let index = MembershipIndex::from_tables(&tables);
    assert_eq!(index.table_of("u0"), index.table_of("u1"));
    assert_ne!(index.table_of("u0"), index.table_of("u2"));
    assert_ne!(index.table_of("u2"), index.table_of("u3"));
}

#[tokio::test]
async fn reassign_discards_previous_layout() {
    let (db, service) = setup().await;
    seed_participants(&db, 5).await;
    service.assign_all().await.expect("assign");

    let settings_repo = SettingsRepository::new(db.db.clone());
    settings_repo
        .update_merge(SettingsUpdate {
            max_people_per_table: Some(2),
            consider_location: None,
        })
        .await
        .expect("shrink capacity");

    let tables = service.reassign_all().await.expect("reassign");

    // Five people at cap 2 need three tables, all rebuilt from scratch
    assert_eq!(tables.len(), 3);
    assert!(tables.iter().all(|t| t.members.len() <= 2));
    let index = MembershipIndex::from_tables(&tables);
    assert_eq!(index.seated_count(), 5);
}

#[tokio::test]
async fn clear_removes_every_table() {
    let (db, service) = setup().await;
    seed_participants(&db, 4).await;
    service.assign_all().await.expect("assign");

    service.clear_all().await.expect("clear");

    let stored = TableRepository::new(db.db.clone())
        .find_all()
        .await
        .expect("find_all");
    assert!(stored.is_empty());
}

#[tokio::test]
async fn rocksdb_store_round_trips_participants() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = DbService::new(dir.path()).await.expect("rocksdb");

    let repo = ParticipantRepository::new(db.db.clone());
    repo.upsert(
        "disk-user",
        ParticipantCreate {
            name: "Disk User".into(),
            full_name: None,
            photo_ref: None,
            is_ephemeral: false,
            created_at: 42,
        },
    )
    .await
    .expect("upsert");

    let found = repo.find_by_id("disk-user").await.expect("find");
    assert_eq!(found.expect("present").name, "Disk User");
}

#[tokio::test]
async fn stats_reflect_current_headcount() {
    let (db, service) = setup().await;
    seed_participants(&db, 7).await;

    let stats = service.stats().await.expect("stats");
    assert_eq!(stats.total_tables, 2);
    assert_eq!(stats.average_per_table, 3);
    assert_eq!(stats.tables_with_extra_person, 1);
    assert_eq!(stats.tables_with_normal_count, 1);
}

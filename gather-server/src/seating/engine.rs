//! Distribution Engine
//!
//! Pure assignment algorithms over in-memory snapshots: round-robin fill,
//! location grouping, shuffle, single-member move, and distribution stats.
//! None of these touch the store; the mutation protocol
//! ([`super::service::SeatingService`]) turns their results into writes.

use rand::Rng;
use rand::seq::SliceRandom;
use serde::Serialize;
use std::collections::HashSet;
use thiserror::Error;

use super::location;
use crate::db::models::{MemberSnapshot, Participant, SeatingSettings, SeatingTable};

/// Move validation failure, returned as a value; 调用方决定提示文案
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoveError {
    #[error("Table not found: {0}")]
    TableNotFound(String),

    #[error("Table {0} is already at capacity")]
    DestinationFull(String),

    #[error("User {user_id} is not seated at table {table_id}")]
    UserNotInSource { user_id: String, table_id: String },
}

/// Optimal distribution for a head count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DistributionStats {
    pub total_tables: u32,
    pub average_per_table: u32,
    pub tables_with_extra_person: u32,
    pub tables_with_normal_count: u32,
}

/// Assign every not-yet-seated participant to a table.
///
/// 已入座的用户保持原位；未入座的按轮转填充 (见 [`fill`])。
/// 开启位置分组时，每个位置桶只填充新桌，现有桌不跨桶复用:
/// 每个位置簇保持物理独立是刻意的策略。
///
/// 记录缺失 ID 的参与者被静默跳过，批量操作不因个别脏数据中止。
/// 本函数不返回错误。
pub fn assign(
    participants: &[Participant],
    settings: &SeatingSettings,
    existing: &[SeatingTable],
) -> Vec<SeatingTable> {
    let seated: HashSet<&str> = existing
        .iter()
        .flat_map(|t| t.members.iter().map(|m| m.user_id.as_str()))
        .collect();

    let unassigned: Vec<&Participant> = participants
        .iter()
        .filter(|p| match p.key() {
            Some(key) => !seated.contains(key.as_str()),
            None => false,
        })
        .collect();

    let mut result: Vec<SeatingTable> = existing.to_vec();

    if settings.consider_location {
        for (_bucket, group) in location::partition(&unassigned) {
            let start = result.len();
            fill(&mut result, start, &group, settings.max_people_per_table);
        }
    } else {
        fill(&mut result, 0, &unassigned, settings.max_people_per_table);
    }

    result
}

/// Round-robin fill: each participant goes to the least-occupied non-full
/// table among `result[eligible_from..]`, first-created winning ties; a new
/// table is appended when none qualifies.
///
/// 新桌序号 = 工作列表中最大序号 + 1。不能用列表长度：低序号的桌子
/// 被离场钩子删掉后，长度会撞上还活着的 key (如 t2)，整批事务回滚。
///
/// O(users × tables)，目标规模 (2-25 人、个位数桌) 下可接受。
fn fill(
    result: &mut Vec<SeatingTable>,
    eligible_from: usize,
    participants: &[&Participant],
    max_people_per_table: u32,
) {
    for participant in participants {
        let Some(snapshot) = MemberSnapshot::from_participant(participant) else {
            continue;
        };

        // min_by_key keeps the first of equally-minimum tables
        let target = result[eligible_from..]
            .iter()
            .enumerate()
            .filter(|(_, t)| !t.is_full(max_people_per_table))
            .min_by_key(|(_, t)| t.members.len())
            .map(|(i, _)| eligible_from + i);

        match target {
            Some(i) => result[i].members.push(snapshot),
            None => {
                let next = result.iter().map(|t| t.ordinal).max().unwrap_or(0) as usize + 1;
                let mut table = SeatingTable::with_ordinal(next);
                table.members.push(snapshot);
                result.push(table);
            }
        }
    }
}

/// Uniform reshuffle: flatten, Fisher-Yates permute, re-chunk into fresh
/// tables of the cap size (last one may be under-full).
///
/// 旧桌身份完全丢弃，变更协议必须以全量 delete-then-recreate 落盘。
pub fn shuffle<R: Rng + ?Sized>(
    tables: &[SeatingTable],
    max_people_per_table: u32,
    rng: &mut R,
) -> Vec<SeatingTable> {
    let mut members: Vec<MemberSnapshot> = tables
        .iter()
        .flat_map(|t| t.members.iter().cloned())
        .collect();

    // rand's SliceRandom::shuffle is Fisher-Yates
    members.shuffle(rng);

    // chunks(0) panics
    let chunk = max_people_per_table.max(1) as usize;

    members
        .chunks(chunk)
        .enumerate()
        .map(|(i, seat_group)| {
            let mut table = SeatingTable::with_ordinal(i + 1);
            table.members = seat_group.to_vec();
            table
        })
        .collect()
}

/// Move one member between tables.
///
/// 在深拷贝上操作：失败时调用方拿到的快照保持原样。
/// 校验顺序 (先匹配者生效): 目标/来源桌不存在 → TableNotFound；
/// 目标桌已满 → DestinationFull；用户不在来源桌 → UserNotInSource。
/// 搬空的来源桌不在这里删除，那是离场钩子的职责。
pub fn move_member(
    tables: &[SeatingTable],
    user_id: &str,
    from_table_id: &str,
    to_table_id: &str,
    max_people_per_table: u32,
) -> Result<Vec<SeatingTable>, MoveError> {
    let mut result = tables.to_vec();

    let to_idx = result
        .iter()
        .position(|t| t.key().as_deref() == Some(to_table_id))
        .ok_or_else(|| MoveError::TableNotFound(to_table_id.to_string()))?;
    let from_idx = result
        .iter()
        .position(|t| t.key().as_deref() == Some(from_table_id))
        .ok_or_else(|| MoveError::TableNotFound(from_table_id.to_string()))?;

    if result[to_idx].is_full(max_people_per_table) {
        return Err(MoveError::DestinationFull(to_table_id.to_string()));
    }

    let member_pos = result[from_idx]
        .members
        .iter()
        .position(|m| m.user_id == user_id)
        .ok_or_else(|| MoveError::UserNotInSource {
            user_id: user_id.to_string(),
            table_id: from_table_id.to_string(),
        })?;

    let member = result[from_idx].members.remove(member_pos);
    result[to_idx].members.push(member);

    Ok(result)
}

/// Optimal distribution for `total_users` people at `max_people_per_table`.
///
/// total_users = 0 时 min_tables = 0，除法必须显式绕开。
pub fn distribution_stats(total_users: u32, max_people_per_table: u32) -> DistributionStats {
    if total_users == 0 || max_people_per_table == 0 {
        return DistributionStats {
            total_tables: 0,
            average_per_table: 0,
            tables_with_extra_person: 0,
            tables_with_normal_count: 0,
        };
    }

    let min_tables = total_users.div_ceil(max_people_per_table);
    let average_per_table = total_users / min_tables;
    let extra = total_users % min_tables;

    DistributionStats {
        total_tables: min_tables,
        average_per_table,
        tables_with_extra_person: extra,
        tables_with_normal_count: min_tables - extra,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::GeoPoint;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashMap;

    fn participant(id: &str) -> Participant {
        Participant {
            id: Some(surrealdb::RecordId::from_table_key("participant", id)),
            name: id.to_string(),
            full_name: None,
            photo_ref: None,
            gender: None,
            preferences: HashMap::new(),
            location: None,
            is_ephemeral: false,
            created_at: 0,
        }
    }

    fn participant_at(id: &str, lat: f64, lon: f64) -> Participant {
        let mut p = participant(id);
        p.location = Some(GeoPoint {
            latitude: lat,
            longitude: lon,
            accuracy: 10.0,
        });
        p
    }

    fn table_with(n: usize, member_ids: &[&str]) -> SeatingTable {
        let mut t = SeatingTable::with_ordinal(n);
        t.members = member_ids
            .iter()
            .map(|id| MemberSnapshot::from_participant(&participant(id)).unwrap())
            .collect();
        t
    }

    fn settings(cap: u32, consider_location: bool) -> SeatingSettings {
        SeatingSettings {
            max_people_per_table: cap,
            consider_location,
        }
    }

    fn all_member_ids(tables: &[SeatingTable]) -> Vec<String> {
        let mut ids: Vec<String> = tables
            .iter()
            .flat_map(|t| t.members.iter().map(|m| m.user_id.clone()))
            .collect();
        ids.sort();
        ids
    }

    // ===== assign =====

    #[test]
    fn assign_three_users_cap_two_makes_two_tables() {
        let users = vec![participant("a"), participant("b"), participant("c")];
        let tables = assign(&users, &settings(2, false), &[]);

        assert_eq!(tables.len(), 2);
        let mut sizes: Vec<usize> = tables.iter().map(|t| t.members.len()).collect();
        sizes.sort();
        assert_eq!(sizes, vec![1, 2]);
    }

    #[test]
    fn assign_respects_capacity() {
        let users: Vec<Participant> = (0..23).map(|i| participant(&format!("u{i}"))).collect();
        let cfg = settings(5, false);
        let tables = assign(&users, &cfg, &[]);

        for t in &tables {
            assert!(t.members.len() <= 5, "table {} over capacity", t.name);
        }
        assert_eq!(all_member_ids(&tables).len(), 23);
    }

    #[test]
    fn assign_never_double_seats() {
        let users: Vec<Participant> = (0..12).map(|i| participant(&format!("u{i}"))).collect();
        let tables = assign(&users, &settings(4, false), &[]);

        let ids = all_member_ids(&tables);
        let unique: HashSet<&String> = ids.iter().collect();
        assert_eq!(ids.len(), unique.len());
    }

    #[test]
    fn assign_is_idempotent_on_its_own_output() {
        let users: Vec<Participant> = (0..7).map(|i| participant(&format!("u{i}"))).collect();
        let cfg = settings(3, false);

        let first = assign(&users, &cfg, &[]);
        let second = assign(&users, &cfg, &first);

        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.key(), b.key());
            assert_eq!(a.members, b.members);
        }
    }

    #[test]
    fn assign_fills_least_occupied_existing_table_first() {
        let existing = vec![table_with(1, &["a", "b"]), table_with(2, &["c"])];
        let users = vec![
            participant("a"),
            participant("b"),
            participant("c"),
            participant("d"),
        ];

        let tables = assign(&users, &settings(3, false), &existing);

        assert_eq!(tables.len(), 2);
        // d lands on table 2, the emptier one
        assert!(tables[1].contains("d"));
        assert_eq!(tables[0].members.len(), 2);
    }

    #[test]
    fn assign_breaks_ties_by_creation_order() {
        let existing = vec![table_with(1, &["a"]), table_with(2, &["b"])];
        let users = vec![participant("a"), participant("b"), participant("c")];

        let tables = assign(&users, &settings(3, false), &existing);
        assert!(tables[0].contains("c"));
    }

    #[test]
    fn assign_skips_records_without_id() {
        let mut broken = participant("x");
        broken.id = None;
        let users = vec![participant("a"), broken, participant("b")];

        let tables = assign(&users, &settings(5, false), &[]);
        assert_eq!(all_member_ids(&tables), vec!["a", "b"]);
    }

    #[test]
    fn assign_new_table_ids_continue_from_working_list() {
        let existing = vec![table_with(1, &["a", "b"])];
        let users = vec![
            participant("a"),
            participant("b"),
            participant("c"),
            participant("d"),
            participant("e"),
        ];

        let tables = assign(&users, &settings(2, false), &existing);

        let keys: Vec<String> = tables.iter().filter_map(|t| t.key()).collect();
        assert_eq!(keys, vec!["t1", "t2", "t3"]);
        assert_eq!(tables[1].name, "Table 2");
    }

    #[test]
    fn assign_after_low_table_deleted_never_reuses_live_key() {
        // t1 已被离场钩子删除，快照里只剩 t2；新桌必须拿 t3 而不是 t2
        let existing = vec![table_with(2, &["a", "b"])];
        let users = vec![participant("a"), participant("b"), participant("c")];

        let tables = assign(&users, &settings(2, false), &existing);

        let keys: Vec<String> = tables.iter().filter_map(|t| t.key()).collect();
        assert_eq!(keys, vec!["t2", "t3"]);
        assert!(tables[1].contains("c"));
    }

    #[test]
    fn assign_with_location_fills_fresh_tables_per_bucket() {
        // one existing table with free seats; location grouping must not reuse it
        let existing = vec![table_with(1, &["a"])];
        let users = vec![
            participant("a"),
            participant_at("b", 40.0, -3.0),
            participant_at("c", 40.0011, -3.0012),
            participant_at("d", 50.0, 8.0),
            participant("e"), // no location -> unknown bucket
        ];

        let tables = assign(&users, &settings(5, true), &existing);

        // t1 untouched, then one fresh table per bucket (sorted key order):
        // "40.00,-3.00", "50.00,8.00", "unknown"
        assert_eq!(tables.len(), 4);
        assert_eq!(tables[0].members.len(), 1);
        assert!(tables[1].contains("b") && tables[1].contains("c"));
        assert!(tables[2].contains("d"));
        assert!(tables[3].contains("e"));
    }

    #[test]
    fn assign_location_buckets_respect_capacity() {
        let users: Vec<Participant> = (0..7)
            .map(|i| participant_at(&format!("u{i}"), 40.0, -3.0))
            .collect();

        let tables = assign(&users, &settings(3, true), &[]);

        assert_eq!(tables.len(), 3);
        for t in &tables {
            assert!(t.members.len() <= 3);
        }
    }

    // ===== shuffle =====

    #[test]
    fn shuffle_six_members_cap_five_rechunks_five_one() {
        let tables = vec![table_with(1, &["u1", "u2", "u3", "u4", "u5", "u6"])];
        let mut rng = StdRng::seed_from_u64(7);

        let shuffled = shuffle(&tables, 5, &mut rng);

        assert_eq!(shuffled.len(), 2);
        assert_eq!(shuffled[0].members.len(), 5);
        assert_eq!(shuffled[1].members.len(), 1);
        assert_eq!(shuffled[0].key().as_deref(), Some("t1"));
        assert_eq!(shuffled[1].key().as_deref(), Some("t2"));
    }

    #[test]
    fn shuffle_preserves_membership_multiset() {
        let tables = vec![
            table_with(1, &["a", "b", "c"]),
            table_with(2, &["d", "e"]),
            table_with(3, &["f"]),
        ];
        let mut rng = StdRng::seed_from_u64(42);

        let shuffled = shuffle(&tables, 4, &mut rng);

        assert_eq!(all_member_ids(&tables), all_member_ids(&shuffled));
    }

    #[test]
    fn shuffle_of_empty_input_is_empty() {
        let mut rng = StdRng::seed_from_u64(0);
        assert!(shuffle(&[], 5, &mut rng).is_empty());
    }

    // ===== move_member =====

    #[test]
    fn move_into_empty_table_succeeds() {
        let tables = vec![table_with(1, &["u1"]), table_with(2, &[])];

        let moved = move_member(&tables, "u1", "t1", "t2", 5).unwrap();

        assert!(moved[0].members.is_empty());
        assert_eq!(moved[1].members.len(), 1);
        assert!(moved[1].contains("u1"));
        // emptied source is kept; cleanup is the session-exit hook's job
        assert_eq!(moved.len(), 2);
    }

    #[test]
    fn move_unknown_destination_fails_first() {
        let tables = vec![table_with(1, &["u1"])];
        let err = move_member(&tables, "u1", "t1", "t9", 5).unwrap_err();
        assert_eq!(err, MoveError::TableNotFound("t9".to_string()));
    }

    #[test]
    fn move_to_full_destination_fails() {
        let tables = vec![table_with(1, &["u1"]), table_with(2, &["a", "b"])];
        let err = move_member(&tables, "u1", "t1", "t2", 2).unwrap_err();
        assert_eq!(err, MoveError::DestinationFull("t2".to_string()));
    }

    #[test]
    fn move_user_missing_from_source_fails() {
        let tables = vec![table_with(1, &["a"]), table_with(2, &[])];
        let err = move_member(&tables, "ghost", "t1", "t2", 5).unwrap_err();
        assert_eq!(
            err,
            MoveError::UserNotInSource {
                user_id: "ghost".to_string(),
                table_id: "t1".to_string(),
            }
        );
    }

    #[test]
    fn failed_move_leaves_input_untouched() {
        let tables = vec![table_with(1, &["a"]), table_with(2, &["b", "c"])];
        let before = all_member_ids(&tables);

        let _ = move_member(&tables, "a", "t1", "t2", 2).unwrap_err();

        assert_eq!(all_member_ids(&tables), before);
        assert_eq!(tables[0].members.len(), 1);
        assert_eq!(tables[1].members.len(), 2);
    }

    // ===== distribution_stats =====

    #[test]
    fn stats_seven_users_cap_five() {
        let stats = distribution_stats(7, 5);
        assert_eq!(
            stats,
            DistributionStats {
                total_tables: 2,
                average_per_table: 3,
                tables_with_extra_person: 1,
                tables_with_normal_count: 1,
            }
        );
    }

    #[test]
    fn stats_zero_users_is_degenerate() {
        let stats = distribution_stats(0, 5);
        assert_eq!(stats.total_tables, 0);
        assert_eq!(stats.average_per_table, 0);
    }

    #[test]
    fn stats_consistency_equation_holds() {
        for total in 1..=60u32 {
            for cap in 2..=8u32 {
                let s = distribution_stats(total, cap);
                let reconstructed = s.tables_with_normal_count * s.average_per_table
                    + s.tables_with_extra_person * (s.average_per_table + 1);
                assert_eq!(reconstructed, total, "total={total} cap={cap}");
                assert!(s.average_per_table + 1 <= cap || s.tables_with_extra_person == 0);
            }
        }
    }
}

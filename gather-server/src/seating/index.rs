//! Membership Index
//!
//! Derived view: user id → table key. 每次桌子快照变化整体重建，
//! 不做增量修补 (桌子数量很小)；它永远不是事实来源。

use crate::db::models::SeatingTable;
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct MembershipIndex {
    by_user: HashMap<String, String>,
}

impl MembershipIndex {
    /// Full rebuild from a table snapshot; the first table containing
    /// a user id wins
    pub fn from_tables(tables: &[SeatingTable]) -> Self {
        let mut by_user = HashMap::new();
        for table in tables {
            let Some(table_key) = table.key() else {
                continue;
            };
            for member in &table.members {
                by_user
                    .entry(member.user_id.clone())
                    .or_insert_with(|| table_key.clone());
            }
        }
        Self { by_user }
    }

    /// Table key the user is seated at, if any
    pub fn table_of(&self, user_id: &str) -> Option<&str> {
        self.by_user.get(user_id).map(String::as_str)
    }

    pub fn is_seated(&self, user_id: &str) -> bool {
        self.by_user.contains_key(user_id)
    }

    pub fn seated_count(&self) -> usize {
        self.by_user.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{MemberSnapshot, SeatingTable};

    fn table_with(n: usize, member_ids: &[&str]) -> SeatingTable {
        let mut t = SeatingTable::with_ordinal(n);
        t.members = member_ids
            .iter()
            .map(|id| MemberSnapshot {
                user_id: id.to_string(),
                name: id.to_string(),
                full_name: None,
                photo_ref: None,
                gender: None,
                preferences: Default::default(),
            })
            .collect();
        t
    }

    #[test]
    fn maps_users_to_their_tables() {
        let tables = vec![table_with(1, &["a", "b"]), table_with(2, &["c"])];
        let index = MembershipIndex::from_tables(&tables);

        assert_eq!(index.table_of("a"), Some("t1"));
        assert_eq!(index.table_of("c"), Some("t2"));
        assert_eq!(index.table_of("ghost"), None);
        assert_eq!(index.seated_count(), 3);
    }

    #[test]
    fn first_table_wins_on_duplicate_seating() {
        // racing writers can briefly double-seat a user; lookup must be stable
        let tables = vec![table_with(1, &["dup"]), table_with(2, &["dup"])];
        let index = MembershipIndex::from_tables(&tables);

        assert_eq!(index.table_of("dup"), Some("t1"));
        assert_eq!(index.seated_count(), 1);
    }

    #[test]
    fn empty_snapshot_yields_empty_index() {
        let index = MembershipIndex::from_tables(&[]);
        assert!(!index.is_seated("a"));
        assert_eq!(index.seated_count(), 0);
    }
}

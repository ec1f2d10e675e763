//! Seating Table Model

use super::Participant;
use super::serde_helpers;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use surrealdb::RecordId;

/// seating_table 集合名
pub const TABLE_COLLECTION: &str = "seating_table";

/// Member snapshot (入座快照)
///
/// 参与者公开资料在入座时刻的反范式化拷贝。
/// 入座后资料变更不会回写到快照，这是设计属性而不是缺陷。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberSnapshot {
    pub user_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(default)]
    pub preferences: HashMap<String, String>,
}

impl MemberSnapshot {
    /// 冻结参与者的公开字段；记录缺失 ID 时返回 None
    pub fn from_participant(p: &Participant) -> Option<Self> {
        Some(Self {
            user_id: p.key()?,
            name: p.name.clone(),
            full_name: p.full_name.clone(),
            photo_ref: p.photo_ref.clone(),
            gender: p.gender.clone(),
            preferences: p.preferences.clone(),
        })
    }
}

/// Seating table entity (桌子)
///
/// Record key `t{n}`，n 为创建时分配的序号 (已有最大序号 + 1，
/// 删桌留下的空洞不回收复用)。
/// 成员列表只由变更协议修改，参与者不会直接写它。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeatingTable {
    #[serde(default, with = "serde_helpers::option_record_id")]
    pub id: Option<RecordId>,
    pub name: String,
    /// 创建序号，用于稳定的快照排序 (先创建者优先)
    pub ordinal: u32,
    #[serde(default)]
    pub members: Vec<MemberSnapshot>,
}

impl SeatingTable {
    /// 按序号新建空桌：id = `t{n}`，name = `Table {n}`
    pub fn with_ordinal(n: usize) -> Self {
        Self {
            id: Some(RecordId::from_table_key(TABLE_COLLECTION, format!("t{n}"))),
            name: format!("Table {n}"),
            ordinal: n as u32,
            members: Vec::new(),
        }
    }

    /// Record key ("t1", "t2", ...)
    pub fn key(&self) -> Option<String> {
        self.id.as_ref().map(|id| id.key().to_string())
    }

    pub fn contains(&self, user_id: &str) -> bool {
        self.members.iter().any(|m| m.user_id == user_id)
    }

    pub fn is_full(&self, max_people_per_table: u32) -> bool {
        self.members.len() >= max_people_per_table as usize
    }
}

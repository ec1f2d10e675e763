//! Participant Model

use super::serde_helpers;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use surrealdb::RecordId;

/// 地理位置 (来自客户端定位；定位失败时整体为 None)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
    /// 定位精度 (米)
    pub accuracy: f64,
}

/// Participant entity (活动参与者)
///
/// Record key = 身份提供方的用户 ID。首次登录时创建，
/// 只有本人可以修改资料字段；仅 owner 重置或本人离场时删除。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    #[serde(default, with = "serde_helpers::option_record_id")]
    pub id: Option<RecordId>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    /// 头像 URL (blob 存储上传后回填，仅 URL 过境)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    /// 命名属性 (dietary / interests / experience ...)
    #[serde(default)]
    pub preferences: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoPoint>,
    /// 匿名临时身份，离场时连同记录一起删除
    #[serde(default, deserialize_with = "serde_helpers::bool_false")]
    pub is_ephemeral: bool,
    #[serde(default)]
    pub created_at: i64,
}

impl Participant {
    /// Record key ("participant:xyz" 中的 "xyz")，空 key 视为缺失
    pub fn key(&self) -> Option<String> {
        self.id
            .as_ref()
            .map(|id| id.key().to_string())
            .filter(|k| !k.is_empty())
    }
}

/// Create/sign-in payload (upsert with merge)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantCreate {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_ref: Option<String>,
    pub is_ephemeral: bool,
    pub created_at: i64,
}

/// Profile update payload
///
/// 字段级合并：只覆盖载荷中出现的字段，未出现的保持原值。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParticipantUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_ref: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferences: Option<HashMap<String, String>>,
}

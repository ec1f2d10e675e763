//! Seating Settings Model

use serde::{Deserialize, Serialize};

/// 进程级共享设置 (settings 集合，固定 key "global")
///
/// 首次读取时若不存在则用默认值初始化；只有 admin 可以修改；
/// 分配引擎每次调用都重新读取。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeatingSettings {
    /// 每桌人数上限 (>= 2)
    pub max_people_per_table: u32,
    /// 是否按地理位置分组
    pub consider_location: bool,
}

impl Default for SeatingSettings {
    fn default() -> Self {
        Self {
            max_people_per_table: 5,
            consider_location: false,
        }
    }
}

/// Settings update payload (field-level merge)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_people_per_table: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consider_location: Option<bool>,
}

use serde::{Deserialize, Serialize};

// ==================== Notification Level ====================

/// 通知级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    /// 普通信息
    Info,
    /// 警告
    Warning,
    /// 错误
    Error,
}

// ==================== Payloads ====================

/// 通知载荷 (服务端 -> 客户端)
///
/// 用于向用户展示系统状态、错误或业务提示。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationPayload {
    /// 标题
    pub title: String,
    /// 消息内容
    pub message: String,
    /// 通知级别
    pub level: NotificationLevel,
    /// 附加数据 (JSON)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// 同步载荷 (服务端 -> 客户端)
///
/// 资源变更通知。客户端收到后应重新拉取整个集合快照，
/// 不做增量修补。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncPayload {
    /// 资源类型 (例如: "participant", "seating_table", "settings")
    pub resource: String,
    /// 版本号 (单调递增，用于客户端判断数据新旧)
    pub version: u64,
    /// 变更类型 (例如: "created", "updated", "deleted", "replaced")
    pub action: String,
    /// 资源 ID (集合级变更时为集合名)
    pub id: String,
    /// 资源数据 (可选，deleted 时为 None)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

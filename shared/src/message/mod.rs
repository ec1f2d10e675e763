//! 消息总线消息类型定义
//!
//! 这些类型在 gather-server 和 clients 之间共享，用于
//! 进程内（内存）和未来的网络传输。

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use uuid::Uuid;

pub mod payload;
pub use payload::*;

/// 简化消息总线事件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    /// 系统通知 (面向用户的提示)
    Notification,
    /// 同步信号 (资源变更)
    Sync,
}

/// 消息总线消息体
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusMessage {
    pub request_id: Uuid,
    pub event_type: EventType,
    pub source: Option<String>,
    pub payload: Vec<u8>,
}

impl BusMessage {
    pub fn new(event_type: EventType, payload: Vec<u8>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            event_type,
            source: None,
            payload,
        }
    }

    /// 创建同步消息
    pub fn sync(payload: &SyncPayload) -> Self {
        Self::new(
            EventType::Sync,
            serde_json::to_vec(payload).expect("Failed to serialize sync payload"),
        )
    }

    /// 创建通知消息
    pub fn notification(payload: &NotificationPayload) -> Self {
        Self::new(
            EventType::Notification,
            serde_json::to_vec(payload).expect("Failed to serialize notification payload"),
        )
    }

    /// 解析载荷为具体类型
    pub fn parse_payload<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.payload)
    }
}

//! Seating Module: 分桌核心
//!
//! - **engine**: 纯分配算法 (round-robin 填充、位置分组、shuffle、移动、统计)
//! - **location**: 位置桶划分
//! - **index**: 派生的成员索引 (user id → table)
//! - **service**: 变更协议: 快照读 → 引擎 → 原子批量写
//!
//! # Data Flow
//!
//! ```text
//! store commit → broadcast_sync → index rebuild → clients re-read
//!        ↑                                            ↓
//!   SeatingService  ←  engine result  ←  fresh snapshot on user action
//! ```

pub mod engine;
pub mod index;
pub mod location;
pub mod service;

// Re-exports
pub use engine::{DistributionStats, MoveError};
pub use index::MembershipIndex;
pub use service::{SeatingError, SeatingService};

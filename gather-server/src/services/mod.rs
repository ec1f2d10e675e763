//! 服务模块
//!
//! - [`MessageBusService`] - 进程内变更通知总线

pub mod message_bus;

pub use message_bus::MessageBusService;

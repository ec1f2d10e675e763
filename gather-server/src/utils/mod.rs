//! 工具模块 - 通用工具函数和类型
//!
//! # 内容
//!
//! - [`AppError`] - 应用错误类型
//! - [`AppResponse`] - API 响应结构
//! - 日志等工具

pub mod error;
pub mod logger;

pub use error::{AppError, AppResponse};
pub use error::{ok, ok_with_message};

/// 处理器的 Result 类型别名
pub type AppResult<T> = std::result::Result<T, AppError>;

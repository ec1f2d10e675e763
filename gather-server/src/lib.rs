//! Gather Server - 活动现场自动分桌服务
//!
//! # 架构概述
//!
//! 为线下活动把参与者自动分配到固定容量的桌子上：
//!
//! - **分桌引擎** (`seating`): 轮转填充、位置分组、洗牌、移动
//! - **数据库** (`db`): 嵌入式 SurrealDB 存储 (快照读 + 事务批量写)
//! - **认证** (`auth`): JWT 认证与角色门控
//! - **消息总线** (`services`): 进程内广播，驱动成员索引重建
//! - **HTTP API** (`api`): RESTful API 接口
//!
//! # 模块结构
//!
//! ```text
//! gather-server/src/
//! ├── core/          # 配置、状态、服务器、后台任务
//! ├── auth/          # JWT 认证、角色
//! ├── seating/       # 分桌引擎与服务
//! ├── services/      # 消息总线
//! ├── api/           # HTTP 路由和处理器
//! ├── utils/         # 错误、日志
//! └── db/            # 数据库层 (模型 + 仓储)
//! ```

pub mod api;
pub mod auth;
pub mod core;
pub mod db;
pub mod seating;
pub mod services;
pub mod utils;

// Re-export 公共类型
pub use auth::{CurrentUser, JwtService, Role};
pub use core::{Config, Server, ServerState};
pub use seating::{MembershipIndex, SeatingService};
pub use utils::{AppError, AppResult};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};

// Security logging macro - 支持 tracing 格式说明符
#[macro_export]
macro_rules! security_log {
    ($level:expr, $event:expr, $($key:ident = $value:expr),*) => {
        tracing::info!(
            target: "security",
            level = $level,
            event = $event,
            $($key = $value),*
        );
    };
}

/// 设置运行环境：dotenv、工作目录、日志
pub fn setup_environment() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    let config = Config::from_env();
    config.ensure_work_dir_structure()?;

    let log_dir = config.log_dir();
    let log_level = std::env::var("LOG_LEVEL").ok();
    init_logger_with_file(log_level.as_deref(), log_dir.to_str());

    Ok(())
}

pub fn print_banner() {
    println!(
        r#"
   ______      __  __
  / ____/___ _/ /_/ /_  ___  _____
 / / __/ __ `/ __/ __ \/ _ \/ ___/
/ /_/ / /_/ / /_/ / / /  __/ /
\____/\__,_/\__/_/ /_/\___/_/
    "#
    );
}

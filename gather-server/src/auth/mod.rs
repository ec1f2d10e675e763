//! 认证授权模块
//!
//! 提供 JWT 认证、角色管理和中间件：
//! - [`JwtService`] - JWT 令牌服务
//! - [`CurrentUser`] - 当前用户上下文
//! - [`require_auth`] - 认证中间件
//! - [`require_admin`] / [`require_owner`] - 角色检查中间件
//!
//! 角色如何授予不属于本服务核心：登录接口用配置中的密钥
//! 换取 admin/owner 角色，下游只检查令牌中的角色声明。

pub mod extractor;
pub mod jwt;
pub mod middleware;

pub use jwt::{Claims, CurrentUser, JwtConfig, JwtError, JwtService};
pub use middleware::{require_admin, require_auth, require_owner};

use serde::{Deserialize, Serialize};

/// 角色等级: participant < admin < owner
///
/// - admin 门禁: 设置更新、shuffle、reassign-all、clear-all
/// - owner 门禁: 批量用户管理 (删除用户)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Participant,
    Admin,
    Owner,
}

impl Role {
    /// 是否具有 admin 及以上权限
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin | Role::Owner)
    }

    /// 是否具有 owner 权限
    pub fn is_owner(&self) -> bool {
        matches!(self, Role::Owner)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Participant => write!(f, "participant"),
            Role::Admin => write!(f, "admin"),
            Role::Owner => write!(f, "owner"),
        }
    }
}

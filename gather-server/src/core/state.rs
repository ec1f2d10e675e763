use dashmap::DashMap;
use shared::message::{BusMessage, NotificationLevel, NotificationPayload, SyncPayload};
use std::sync::{Arc, RwLock};
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

use crate::auth::JwtService;
use crate::core::Config;
use crate::db::DbService;
use crate::seating::{MembershipIndex, SeatingService};
use crate::services::MessageBusService;

/// 资源版本管理器
///
/// 使用 DashMap 实现无锁并发的版本号管理。
/// 每种资源类型维护独立的版本号，支持原子递增。
///
/// # 使用场景
///
/// 用于 broadcast_sync 时自动生成递增的版本号，
/// 确保客户端可以通过版本号判断数据新旧。
#[derive(Debug)]
pub struct ResourceVersions {
    versions: DashMap<String, u64>,
}

impl ResourceVersions {
    /// 创建空的版本管理器
    pub fn new() -> Self {
        Self {
            versions: DashMap::new(),
        }
    }

    /// 递增指定资源的版本号并返回新值
    ///
    /// 如果资源不存在，从 0 开始递增（返回 1）
    pub fn increment(&self, resource: &str) -> u64 {
        let mut entry = self.versions.entry(resource.to_string()).or_insert(0);
        *entry += 1;
        *entry
    }

    /// 获取指定资源的当前版本号
    ///
    /// 如果资源不存在，返回 0
    pub fn get(&self, resource: &str) -> u64 {
        self.versions.get(resource).map(|v| *v).unwrap_or(0)
    }
}

impl Default for ResourceVersions {
    fn default() -> Self {
        Self::new()
    }
}

/// 服务器状态 - 持有所有服务的单例引用
///
/// ServerState 是分桌服务的核心数据结构，持有所有服务的共享引用。
/// 使用 Arc 实现浅拷贝，所有权成本极低。
///
/// # 服务组件
///
/// | 字段 | 类型 | 说明 |
/// |------|------|------|
/// | config | Config | 配置项 (不可变) |
/// | db | Surreal<Db> | 嵌入式数据库 |
/// | message_bus | MessageBusService | 进程内变更通知总线 |
/// | jwt_service | Arc<JwtService> | JWT 认证服务 |
/// | resource_versions | Arc<ResourceVersions> | 资源版本管理 |
/// | membership | Arc<RwLock<MembershipIndex>> | 派生成员索引缓存 |
///
/// 成员索引缓存只服务读路径；变更协议每次都读取最新快照，
/// 绝不把可写副本跨操作缓存。
#[derive(Clone, Debug)]
pub struct ServerState {
    /// 服务器配置
    pub config: Config,
    /// 嵌入式数据库 (SurrealDB)
    pub db: Surreal<Db>,
    /// 消息总线服务
    pub message_bus: MessageBusService,
    /// JWT 认证服务 (Arc 共享所有权)
    pub jwt_service: Arc<JwtService>,
    /// 资源版本管理器 (用于 broadcast_sync 自动递增版本号)
    pub resource_versions: Arc<ResourceVersions>,
    /// 成员索引缓存 (后台任务在每次桌子变更通知后整体重建)
    pub membership: Arc<RwLock<MembershipIndex>>,
}

impl ServerState {
    /// 初始化服务器状态
    ///
    /// 按顺序初始化：
    /// 1. 工作目录结构 (确保目录存在)
    /// 2. 数据库 (work_dir/database)
    /// 3. 各服务 (MessageBus, JWT)
    ///
    /// # Panics
    ///
    /// 数据库初始化失败时 panic
    pub async fn initialize(config: &Config) -> Self {
        config
            .ensure_work_dir_structure()
            .expect("Failed to create work directory structure");

        let db_service = DbService::new(&config.database_dir())
            .await
            .expect("Failed to initialize database");

        Self::with_db(config.clone(), db_service.db)
    }

    /// 用现成的数据库句柄构造状态 (测试用内存库)
    pub fn with_db(config: Config, db: Surreal<Db>) -> Self {
        let jwt_service = Arc::new(JwtService::new(config.jwt.clone()));
        Self {
            config,
            db,
            message_bus: MessageBusService::new(),
            jwt_service,
            resource_versions: Arc::new(ResourceVersions::new()),
            membership: Arc::new(RwLock::new(MembershipIndex::default())),
        }
    }

    /// 启动后台任务
    ///
    /// 必须在 `Server::run()` 之前调用
    ///
    /// 启动的任务：
    /// - 成员索引刷新器 (订阅总线，桌子变更时整体重建索引)
    pub fn start_background_tasks(&self) {
        crate::core::tasks::spawn_membership_refresher(self.clone());
    }

    /// 获取数据库实例
    pub fn get_db(&self) -> Surreal<Db> {
        self.db.clone()
    }

    /// 获取 JWT 服务
    pub fn get_jwt_service(&self) -> Arc<JwtService> {
        self.jwt_service.clone()
    }

    /// 分桌服务 (每次调用读取最新快照)
    pub fn seating_service(&self) -> SeatingService {
        SeatingService::new(self.db.clone())
    }

    /// 读取成员索引缓存的当前快照
    pub fn membership_snapshot(&self) -> MembershipIndex {
        self.membership
            .read()
            .map(|idx| idx.clone())
            .unwrap_or_default()
    }

    /// 广播同步消息
    ///
    /// 向所有订阅者广播资源变更通知。
    /// 版本号由 ResourceVersions 自动递增管理。
    ///
    /// # 参数
    /// - `resource`: 资源类型 (如 "participant", "seating_table", "settings")
    /// - `action`: 变更类型 ("created", "updated", "deleted", "replaced")
    /// - `id`: 资源 ID (集合级变更时传集合名)
    /// - `data`: 资源数据 (deleted 时为 None)
    pub fn broadcast_sync<T: serde::Serialize>(
        &self,
        resource: &str,
        action: &str,
        id: &str,
        data: Option<&T>,
    ) {
        let version = self.resource_versions.increment(resource);
        let payload = SyncPayload {
            resource: resource.to_string(),
            version,
            action: action.to_string(),
            id: id.to_string(),
            data: data.and_then(|d| serde_json::to_value(d).ok()),
        };
        self.message_bus.publish(BusMessage::sync(&payload));
    }

    /// 广播面向用户的通知 (管理操作后的提示文案)
    pub fn broadcast_notification(&self, title: &str, message: &str, level: NotificationLevel) {
        let payload = NotificationPayload {
            title: title.to_string(),
            message: message.to_string(),
            level,
            data: None,
        };
        self.message_bus.publish(BusMessage::notification(&payload));
    }
}

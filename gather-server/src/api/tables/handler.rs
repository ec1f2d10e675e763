use axum::Json;
use axum::extract::{Path, State};
use serde::Deserialize;
use shared::message::NotificationLevel;

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::db::models::{SeatingTable, TABLE_COLLECTION};
use crate::db::repository::TableRepository;
use crate::seating::DistributionStats;
use crate::utils::{AppError, AppResponse, AppResult, ok};

/// GET /api/tables - 获取所有桌子(按序号排序)
pub async fn list_tables(State(state): State<ServerState>) -> AppResult<Json<Vec<SeatingTable>>> {
    let repo = TableRepository::new(state.get_db());
    let tables = repo.find_all().await.map_err(AppError::from)?;
    Ok(Json(tables))
}

/// GET /api/tables/stats - 当前人数下的最优分布统计
pub async fn table_stats(State(state): State<ServerState>) -> AppResult<Json<DistributionStats>> {
    let stats = state.seating_service().stats().await?;
    Ok(Json(stats))
}

/// GET /api/tables/membership/{user_id} - 查询用户所在的桌子
///
/// 先查后台任务维护的成员索引缓存，命中时只取单个桌子文档。
/// 索引是异步重建的，可能滞后；未命中 (或命中的桌子已不存在)
/// 时回源最新快照确认。
pub async fn get_membership(
    State(state): State<ServerState>,
    Path(user_id): Path<String>,
) -> AppResult<Json<Option<SeatingTable>>> {
    let index = state.membership_snapshot();
    if let Some(key) = index.table_of(&user_id) {
        let repo = TableRepository::new(state.get_db());
        if let Some(table) = repo.find_by_id(key).await.map_err(AppError::from)? {
            return Ok(Json(Some(table)));
        }
    }

    let table = state.seating_service().membership(&user_id).await?;
    Ok(Json(table))
}

/// POST /api/tables/assign - 为所有未入座的参与者分桌
///
/// 已入座的保持不动。任何登录用户都可触发(入场时客户端自动调用)。
pub async fn assign_tables(State(state): State<ServerState>) -> AppResult<Json<Vec<SeatingTable>>> {
    let tables = state.seating_service().assign_all().await?;
    state.broadcast_sync(TABLE_COLLECTION, "replaced", TABLE_COLLECTION, Some(&tables));
    Ok(Json(tables))
}

/// POST /api/tables/reassign - 推倒重分(仅管理员)
pub async fn reassign_tables(
    State(state): State<ServerState>,
) -> AppResult<Json<Vec<SeatingTable>>> {
    let tables = state.seating_service().reassign_all().await?;
    state.broadcast_sync(TABLE_COLLECTION, "replaced", TABLE_COLLECTION, Some(&tables));
    state.broadcast_notification(
        "Tables reassigned",
        "An admin rebuilt the seating from scratch",
        NotificationLevel::Info,
    );
    Ok(Json(tables))
}

/// POST /api/tables/shuffle - 随机重排所有成员(仅管理员)
pub async fn shuffle_tables(
    State(state): State<ServerState>,
) -> AppResult<Json<Vec<SeatingTable>>> {
    let tables = state.seating_service().shuffle_all().await?;
    state.broadcast_sync(TABLE_COLLECTION, "replaced", TABLE_COLLECTION, Some(&tables));
    state.broadcast_notification(
        "Tables shuffled",
        "An admin reshuffled the seating",
        NotificationLevel::Info,
    );
    Ok(Json(tables))
}

/// DELETE /api/tables - 清空所有桌子(仅管理员)
pub async fn clear_tables(
    State(state): State<ServerState>,
    user: CurrentUser,
) -> AppResult<Json<AppResponse<()>>> {
    if !user.role.is_admin() {
        return Err(AppError::forbidden("Admin role required"));
    }

    state.seating_service().clear_all().await?;
    state.broadcast_sync::<()>(TABLE_COLLECTION, "replaced", TABLE_COLLECTION, None);
    state.broadcast_notification(
        "Tables cleared",
        "An admin cleared all seating",
        NotificationLevel::Warning,
    );
    Ok(ok(()))
}

#[derive(Debug, Deserialize)]
pub struct MoveRequest {
    pub user_id: String,
    pub from_table_id: String,
    pub to_table_id: String,
}

/// POST /api/tables/move - 把成员从一桌移到另一桌
///
/// 移动自己无需权限，移动别人需要管理员。
pub async fn move_member(
    State(state): State<ServerState>,
    user: CurrentUser,
    Json(req): Json<MoveRequest>,
) -> AppResult<Json<Vec<SeatingTable>>> {
    if req.user_id != user.id && !user.role.is_admin() {
        return Err(AppError::forbidden("Can only move yourself"));
    }

    let tables = state
        .seating_service()
        .move_member(&req.user_id, &req.from_table_id, &req.to_table_id)
        .await?;
    state.broadcast_sync(TABLE_COLLECTION, "replaced", TABLE_COLLECTION, Some(&tables));
    Ok(Json(tables))
}

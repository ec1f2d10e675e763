use axum::Json;
use axum::extract::{Path, State};
use serde::Deserialize;

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::db::models::{GeoPoint, Participant, ParticipantUpdate, TABLE_COLLECTION};
use crate::db::repository::ParticipantRepository;
use crate::utils::{AppError, AppResponse, AppResult, ok_with_message};

/// GET /api/participants - 获取所有参与者
pub async fn list_participants(
    State(state): State<ServerState>,
) -> AppResult<Json<Vec<Participant>>> {
    let repo = ParticipantRepository::new(state.get_db());
    let participants = repo.find_all().await.map_err(AppError::from)?;
    Ok(Json(participants))
}

/// PATCH /api/participants/{id} - 字段级合并更新资料
///
/// 只有本人或管理员可以修改。载荷中省略的字段保持原值。
pub async fn update_participant(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(patch): Json<ParticipantUpdate>,
) -> AppResult<Json<Participant>> {
    if user.id != id && !user.role.is_admin() {
        return Err(AppError::forbidden("Can only update your own profile"));
    }

    let repo = ParticipantRepository::new(state.get_db());
    let updated = repo
        .update_merge(&id, patch)
        .await
        .map_err(AppError::from)?
        .ok_or_else(|| AppError::not_found(format!("Participant not found: {id}")))?;
    state.broadcast_sync("participant", "updated", &id, Some(&updated));

    Ok(Json(updated))
}

#[derive(Debug, Deserialize)]
pub struct LocationRequest {
    /// None 表示清除位置(如用户拒绝授权)
    pub location: Option<GeoPoint>,
}

/// PUT /api/participants/{id}/location - 上报地理位置
///
/// 只有本人可以上报自己的位置。
pub async fn set_location(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(req): Json<LocationRequest>,
) -> AppResult<Json<Participant>> {
    if user.id != id {
        return Err(AppError::forbidden("Can only report your own location"));
    }

    let repo = ParticipantRepository::new(state.get_db());
    let updated = repo
        .set_location(&id, req.location)
        .await
        .map_err(AppError::from)?
        .ok_or_else(|| AppError::not_found(format!("Participant not found: {id}")))?;
    state.broadcast_sync("participant", "updated", &id, Some(&updated));

    Ok(Json(updated))
}

/// DELETE /api/participants/{id} - 删除参与者(仅 owner)
pub async fn delete_participant(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<AppResponse<()>>> {
    if !user.role.is_owner() {
        return Err(AppError::forbidden("Owner role required"));
    }

    // 先把人从桌上移掉，再删记录
    state.seating_service().leave(&id).await;
    state.broadcast_sync::<()>(TABLE_COLLECTION, "replaced", TABLE_COLLECTION, None);

    let repo = ParticipantRepository::new(state.get_db());
    let deleted = repo.delete(&id).await.map_err(AppError::from)?;
    if !deleted {
        return Err(AppError::not_found(format!("Participant not found: {id}")));
    }
    state.broadcast_sync::<Participant>("participant", "deleted", &id, None);

    tracing::info!(participant_id = %id, by = %user.id, "Participant deleted");
    Ok(ok_with_message((), "Participant deleted"))
}

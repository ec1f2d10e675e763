use axum::Json;
use axum::extract::State;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::{CurrentUser, Role};
use crate::core::ServerState;
use crate::db::models::{Participant, ParticipantCreate, ParticipantUpdate, TABLE_COLLECTION};
use crate::db::repository::ParticipantRepository;
use crate::utils::{AppError, AppResponse, AppResult, ok_with_message};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// 身份提供方的用户 ID，匿名登录时省略
    pub user_id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub photo_ref: Option<String>,
    /// 匿名临时身份，离场时删除记录
    #[serde(default)]
    pub is_ephemeral: bool,
    /// 管理密钥，匹配则提升角色
    #[serde(default)]
    pub access_key: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user_id: String,
    pub name: String,
    pub role: Role,
}

/// POST /api/auth/login - 登录(公开接口)
///
/// 首次登录创建参与者记录，老用户合并资料字段。
/// `access_key` 匹配 OWNER_KEY / ADMIN_KEY 时授予对应角色。
pub async fn login(
    State(state): State<ServerState>,
    Json(req): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let name = req.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::validation("name is required"));
    }

    let role = resolve_role(&state, req.access_key.as_deref());
    let user_id = match req.user_id.filter(|id| !id.is_empty()) {
        Some(id) => id,
        None => Uuid::new_v4().simple().to_string(),
    };

    let repo = ParticipantRepository::new(state.get_db());
    let existing = repo.find_by_id(&user_id).await.map_err(AppError::from)?;

    let (participant, action) = match existing {
        Some(_) => {
            let patch = ParticipantUpdate {
                name: Some(name.clone()),
                full_name: req.full_name,
                photo_ref: req.photo_ref,
                ..Default::default()
            };
            let updated = repo
                .update_merge(&user_id, patch)
                .await
                .map_err(AppError::from)?
                .ok_or_else(|| AppError::not_found(format!("Participant not found: {user_id}")))?;
            (updated, "updated")
        }
        None => {
            let created = repo
                .upsert(
                    &user_id,
                    ParticipantCreate {
                        name: name.clone(),
                        full_name: req.full_name,
                        photo_ref: req.photo_ref,
                        is_ephemeral: req.is_ephemeral,
                        created_at: Utc::now().timestamp_millis(),
                    },
                )
                .await
                .map_err(AppError::from)?;
            (created, "created")
        }
    };

    state.broadcast_sync("participant", action, &user_id, Some(&participant));

    let token = state
        .get_jwt_service()
        .generate_token(&user_id, &name, role)
        .map_err(|e| {
            tracing::error!(error = %e, "Token generation failed");
            AppError::Internal("Token generation failed".to_string())
        })?;

    tracing::info!(user_id, %role, "User logged in");

    Ok(Json(LoginResponse {
        token,
        user_id,
        name,
        role,
    }))
}

/// POST /api/auth/logout - 离场
///
/// 先把用户从所在桌移除(失败不阻断)，临时身份连记录一起删除。
pub async fn logout(
    State(state): State<ServerState>,
    user: CurrentUser,
) -> AppResult<Json<AppResponse<()>>> {
    state.seating_service().leave(&user.id).await;
    state.broadcast_sync::<()>(TABLE_COLLECTION, "replaced", TABLE_COLLECTION, None);

    let repo = ParticipantRepository::new(state.get_db());
    if let Some(p) = repo.find_by_id(&user.id).await.map_err(AppError::from)? {
        if p.is_ephemeral {
            repo.delete(&user.id).await.map_err(AppError::from)?;
            state.broadcast_sync::<Participant>("participant", "deleted", &user.id, None);
            tracing::info!(user_id = %user.id, "Ephemeral participant deleted on logout");
        }
    }

    tracing::info!(user_id = %user.id, "User logged out");
    Ok(ok_with_message((), "Logged out"))
}

fn resolve_role(state: &ServerState, access_key: Option<&str>) -> Role {
    let Some(key) = access_key.filter(|k| !k.is_empty()) else {
        return Role::Participant;
    };
    if state.config.owner_key.as_deref() == Some(key) {
        Role::Owner
    } else if state.config.admin_key.as_deref() == Some(key) {
        Role::Admin
    } else {
        tracing::warn!("Login with unrecognized access key, granting participant role");
        Role::Participant
    }
}

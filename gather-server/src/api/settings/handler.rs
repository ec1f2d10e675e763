use axum::Json;
use axum::extract::State;

use crate::core::ServerState;
use crate::db::models::{SeatingSettings, SettingsUpdate};
use crate::db::repository::SettingsRepository;
use crate::utils::{AppError, AppResult};

/// GET /api/settings - 读取共享设置(首次访问写入默认值)
pub async fn get_settings(State(state): State<ServerState>) -> AppResult<Json<SeatingSettings>> {
    let repo = SettingsRepository::new(state.get_db());
    let settings = repo.get_or_init().await.map_err(AppError::from)?;
    Ok(Json(settings))
}

/// PATCH /api/settings - 更新共享设置(仅管理员)
///
/// 字段级合并。容量下限为 2，一人一桌没有意义。
pub async fn update_settings(
    State(state): State<ServerState>,
    Json(patch): Json<SettingsUpdate>,
) -> AppResult<Json<SeatingSettings>> {
    if let Some(cap) = patch.max_people_per_table {
        if cap < 2 {
            return Err(AppError::validation(
                "max_people_per_table must be at least 2",
            ));
        }
    }

    let repo = SettingsRepository::new(state.get_db());
    let updated = repo.update_merge(patch).await.map_err(AppError::from)?;
    state.broadcast_sync("settings", "updated", "global", Some(&updated));

    tracing::info!(
        max_people_per_table = updated.max_people_per_table,
        consider_location = updated.consider_location,
        "Settings updated"
    );
    Ok(Json(updated))
}

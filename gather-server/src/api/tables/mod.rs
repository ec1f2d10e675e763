pub mod handler;

use axum::Router;
use axum::middleware;
use axum::routing::{get, post};

use crate::auth::require_admin;
use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new()
        // DELETE 的 admin 检查在 handler 内做，和 GET 共享一条路由
        .route(
            "/api/tables",
            get(handler::list_tables).delete(handler::clear_tables),
        )
        .route("/api/tables/stats", get(handler::table_stats))
        .route(
            "/api/tables/membership/{user_id}",
            get(handler::get_membership),
        )
        .route("/api/tables/assign", post(handler::assign_tables))
        .route("/api/tables/move", post(handler::move_member))
        // ========== 管理员操作 ==========
        .route(
            "/api/tables/reassign",
            post(handler::reassign_tables).layer(middleware::from_fn(require_admin)),
        )
        .route(
            "/api/tables/shuffle",
            post(handler::shuffle_tables).layer(middleware::from_fn(require_admin)),
        )
}

pub mod handler;

use axum::Router;
use axum::middleware;
use axum::routing::{get, patch};

use crate::auth::require_admin;
use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().route(
        "/api/settings",
        get(handler::get_settings)
            .merge(patch(handler::update_settings).layer(middleware::from_fn(require_admin))),
    )
}

pub mod handler;

use axum::Router;
use axum::routing::get;

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().route("/api/health", get(handler::health_check))
}

pub mod handler;

use axum::Router;
use axum::routing::post;

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/api/auth/login", post(handler::login))
        .route("/api/auth/logout", post(handler::logout))
}

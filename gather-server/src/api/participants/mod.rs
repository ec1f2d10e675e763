pub mod handler;

use axum::Router;
use axum::routing::{get, patch, put};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/api/participants", get(handler::list_participants))
        .route(
            "/api/participants/{id}",
            patch(handler::update_participant).delete(handler::delete_participant),
        )
        .route("/api/participants/{id}/location", put(handler::set_location))
}

use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Consume domain routes, nested under `/api/consume`. Read-only.
pub fn consume_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::get_consumes))
        .route("/{id}", get(handlers::get_consume))
}

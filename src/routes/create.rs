use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Create domain routes, nested under `/api/create`. No update surface: these
/// documents are written once and only ever read back.
pub fn create_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::create_create).get(handlers::get_creates))
        .route("/{id}", get(handlers::get_create))
}

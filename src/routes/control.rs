use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Control domain routes, nested under `/api/control`.
///
/// POST and PATCH require a writer role (checked in the service); GET requires
/// any authenticated caller. The list endpoint supports the standard pagination
/// parameters (`name`, `after_id`, `limit`, `sort_by`, `order`).
pub fn control_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            post(handlers::create_control).get(handlers::get_controls),
        )
        .route(
            "/{id}",
            get(handlers::get_control).patch(handlers::update_control),
        )
}

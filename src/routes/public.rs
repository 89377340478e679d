use crate::AppState;
use axum::{Router, routing::get};

/// Unauthenticated routes. `/health` returns immediately so load balancers and
/// container orchestrators can probe the service without credentials.
pub fn public_routes() -> Router<AppState> {
    Router::new().route("/health", get(|| async { "ok" }))
}

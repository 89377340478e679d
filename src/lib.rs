use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core application services and components.
pub mod auth;
pub mod breadcrumb;
pub mod config;
pub mod error;
pub mod handlers;
pub mod pagination;
pub mod repository;
pub mod response;
pub mod services;

// Routing, segregated per access surface and domain.
pub mod routes;
use auth::AuthUser;
use routes::{consume, control, create, public};

// --- Public Re-exports ---

// Core state types, accessible to the binary entry point and the tests.
pub use config::AppConfig;
pub use repository::{MongoRepository, Repository, RepositoryState};
pub use services::{ConsumeService, ControlService, CreateService};

/// ApiDoc
///
/// Aggregates the OpenAPI documentation for every annotated handler. The
/// generated JSON is served at `/api-docs/openapi.json` and browsable through
/// the Swagger UI, which stands in for a static docs explorer.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::create_control,
        handlers::get_controls,
        handlers::get_control,
        handlers::update_control,
        handlers::create_create,
        handlers::get_creates,
        handlers::get_create,
        handlers::get_consumes,
        handlers::get_consume,
    ),
    tags(
        (name = "mongo-api-template", description = "Document-store REST API template")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single, thread-safe container holding the domain services and the loaded
/// configuration, shared across all requests. Services wrap the repository, so
/// nothing below the state boundary needs a driver handle.
#[derive(Clone)]
pub struct AppState {
    pub control: ControlService,
    pub creates: CreateService,
    pub consume: ConsumeService,
    pub config: AppConfig,
}

impl AppState {
    /// Wires the three domain services onto a repository. Used by `main` with
    /// the Mongo-backed repository and by tests with an in-memory one.
    pub fn new(repo: RepositoryState, config: AppConfig) -> Self {
        Self {
            control: ControlService::new(repo.clone(), &config),
            creates: CreateService::new(repo.clone(), &config),
            consume: ConsumeService::new(repo, &config),
            config,
        }
    }
}

// Lets extractors (AuthUser, Breadcrumb) pull the configuration out of the
// shared state without seeing the rest of it.
impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Enforces authentication for everything nested under `/api`. The `AuthUser`
/// extractor rejects the request with 401 before the handler runs; on success
/// the request proceeds and handlers re-extract the identity they need.
async fn auth_middleware(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// create_router
///
/// Assembles the routing structure, applies the global middleware stack, and
/// registers the application state.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header carrying the request correlation id end to end.
    let x_request_id = HeaderName::from_static("x-request-id");

    let api_routes = Router::new()
        .nest("/control", control::control_routes())
        .nest("/create", create::create_routes())
        .nest("/consume", consume::consume_routes())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .nest("/api", api_routes)
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                // A unique id per request, generated before anything else runs,
                // so every log line and breadcrumb can be correlated.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// Customizes the per-request tracing span with the method, URI, and the
/// generated request id, so all log lines for one request share a correlation
/// key.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}

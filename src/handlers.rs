use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde_json::Value;

use crate::{
    AppState,
    auth::AuthUser,
    breadcrumb::Breadcrumb,
    error::ApiError,
    pagination::PageParams,
    response::{document_to_json, page_to_json},
};

/// Converts a JSON request body into a BSON document. Non-object bodies (arrays,
/// strings, null) are rejected before any service logic runs.
fn body_to_document(payload: &Value) -> Result<bson::Document, ApiError> {
    if !payload.is_object() {
        return Err(ApiError::invalid("body", "request body must be a JSON object"));
    }
    bson::to_document(payload)
        .map_err(|_| ApiError::invalid("body", "request body must be a JSON object"))
}

// --- Control domain (create, list, get, update) ---

/// [Writer Route] Creates a control document and returns the stored record,
/// including the assigned id and audit stamps.
#[utoipa::path(
    post,
    path = "/api/control",
    responses(
        (status = 201, description = "Created control document"),
        (status = 401, description = "Missing or invalid credentials"),
        (status = 403, description = "Caller lacks a writer role"),
    )
)]
pub async fn create_control(
    auth: AuthUser,
    crumb: Breadcrumb,
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let data = body_to_document(&payload)?;
    let created = state.control.create(&auth, &crumb, data).await?;
    Ok((StatusCode::CREATED, Json(document_to_json(created))))
}

/// Lists control documents as an infinite-scroll page.
#[utoipa::path(
    get,
    path = "/api/control",
    params(PageParams),
    responses(
        (status = 200, description = "Page of control documents"),
        (status = 400, description = "Invalid pagination parameter"),
    )
)]
pub async fn get_controls(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Result<Json<Value>, ApiError> {
    let page = state.control.page(&auth, params).await?;
    Ok(Json(page_to_json(page)))
}

#[utoipa::path(
    get,
    path = "/api/control/{id}",
    responses(
        (status = 200, description = "Control document"),
        (status = 404, description = "Not found"),
    )
)]
pub async fn get_control(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let document = state.control.get(&auth, &id).await?;
    Ok(Json(document_to_json(document)))
}

/// [Writer Route] Partially updates a control document. System-managed fields
/// (`_id`, `created`, `saved`) are off limits; the `saved` stamp is refreshed
/// automatically.
#[utoipa::path(
    patch,
    path = "/api/control/{id}",
    responses(
        (status = 200, description = "Updated control document"),
        (status = 403, description = "Writer role missing or restricted field touched"),
        (status = 404, description = "Not found"),
    )
)]
pub async fn update_control(
    auth: AuthUser,
    crumb: Breadcrumb,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let data = body_to_document(&payload)?;
    let updated = state.control.update(&auth, &crumb, &id, data).await?;
    Ok(Json(document_to_json(updated)))
}

// --- Create domain (create, list, get) ---

/// [Writer Route] Creates a create-domain document.
#[utoipa::path(
    post,
    path = "/api/create",
    responses(
        (status = 201, description = "Created document"),
        (status = 403, description = "Caller lacks a writer role"),
    )
)]
pub async fn create_create(
    auth: AuthUser,
    crumb: Breadcrumb,
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let data = body_to_document(&payload)?;
    let created = state.creates.create(&auth, &crumb, data).await?;
    Ok((StatusCode::CREATED, Json(document_to_json(created))))
}

#[utoipa::path(
    get,
    path = "/api/create",
    params(PageParams),
    responses(
        (status = 200, description = "Page of create documents"),
        (status = 400, description = "Invalid pagination parameter"),
    )
)]
pub async fn get_creates(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Result<Json<Value>, ApiError> {
    let page = state.creates.page(&auth, params).await?;
    Ok(Json(page_to_json(page)))
}

#[utoipa::path(
    get,
    path = "/api/create/{id}",
    responses(
        (status = 200, description = "Create document"),
        (status = 404, description = "Not found"),
    )
)]
pub async fn get_create(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let document = state.creates.get(&auth, &id).await?;
    Ok(Json(document_to_json(document)))
}

// --- Consume domain (read-only) ---

#[utoipa::path(
    get,
    path = "/api/consume",
    params(PageParams),
    responses(
        (status = 200, description = "Page of consume documents"),
        (status = 400, description = "Invalid pagination parameter"),
    )
)]
pub async fn get_consumes(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Result<Json<Value>, ApiError> {
    let page = state.consume.page(&auth, params).await?;
    Ok(Json(page_to_json(page)))
}

#[utoipa::path(
    get,
    path = "/api/consume/{id}",
    responses(
        (status = 200, description = "Consume document"),
        (status = 404, description = "Not found"),
    )
)]
pub async fn get_consume(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let document = state.consume.get(&auth, &id).await?;
    Ok(Json(document_to_json(document)))
}

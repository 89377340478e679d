use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// ApiError
///
/// The single error type owned by this crate. Every layer (validation, services,
/// repository) converges on this taxonomy, and the `IntoResponse` impl is the only
/// place where errors are turned into HTTP responses.
///
/// Two of the variants form the contract of the paginated query core:
/// - `InvalidParameter`: client-caused, always recoverable by correcting the request.
/// - `StorageUnavailable`: infrastructure-caused, not locally recoverable. The
///   component never retries; retry policy belongs to the caller.
#[derive(Debug, Error)]
pub enum ApiError {
    /// A request parameter failed validation. Carries the name of the offending
    /// parameter so the response body stays machine-readable.
    #[error("{message}")]
    InvalidParameter {
        param: &'static str,
        message: String,
    },

    /// Missing, expired, or otherwise unusable credentials.
    #[error("missing or invalid credentials")]
    Unauthorized,

    /// The caller is authenticated but lacks the role required for the operation,
    /// or attempted to touch a system-managed field.
    #[error("{0}")]
    Forbidden(String),

    /// The referenced document does not exist in its collection.
    #[error("{0}")]
    NotFound(String),

    /// The document store could not be reached or the query failed mid-flight.
    #[error("document store unavailable")]
    StorageUnavailable(#[from] mongodb::error::Error),

    /// Invariant violations that should not occur under normal operation.
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// Shorthand for validation failures, keeping call sites on one line.
    pub fn invalid(param: &'static str, message: impl Into<String>) -> Self {
        ApiError::InvalidParameter {
            param,
            message: message.into(),
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidParameter { .. } => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::StorageUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::InvalidParameter { .. } => "invalid_parameter",
            ApiError::Unauthorized => "unauthorized",
            ApiError::Forbidden(_) => "forbidden",
            ApiError::NotFound(_) => "not_found",
            ApiError::StorageUnavailable(_) => "storage_unavailable",
            ApiError::Internal(_) => "internal_error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Server-side failures are logged with their cause; the client only sees
        // the opaque message, never the underlying driver error.
        match &self {
            ApiError::StorageUnavailable(source) => {
                tracing::error!(error = %source, "document store failure");
            }
            ApiError::Internal(message) => {
                tracing::error!(%message, "internal error");
            }
            _ => {}
        }

        let mut body = json!({
            "error": self.code(),
            "message": self.to_string(),
        });
        if let ApiError::InvalidParameter { param, .. } = &self {
            body["param"] = json!(param);
        }

        (self.status(), Json(body)).into_response()
    }
}

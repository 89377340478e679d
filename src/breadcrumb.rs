use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use bson::Document;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{auth::AuthUser, config::AppConfig, error::ApiError};

/// Breadcrumb
///
/// The audit stamp attached to every mutating operation. A breadcrumb records
/// who changed a document, when, from where, and under which request correlation
/// id, and is persisted verbatim as the `created` / `saved` sub-documents.
#[derive(Debug, Clone)]
pub struct Breadcrumb {
    pub at_time: DateTime<Utc>,
    pub by_user: String,
    pub from_ip: String,
    pub correlation_id: String,
}

impl Breadcrumb {
    /// Renders the breadcrumb as a BSON sub-document, with `at_time` stored as a
    /// native BSON datetime rather than a string.
    pub fn to_document(&self) -> Document {
        let mut document = Document::new();
        document.insert("at_time", bson::DateTime::from_chrono(self.at_time));
        document.insert("by_user", self.by_user.clone());
        document.insert("from_ip", self.from_ip.clone());
        document.insert("correlation_id", self.correlation_id.clone());
        document
    }
}

/// Breadcrumb Extractor
///
/// Resolves the authenticated caller (reusing the `AuthUser` extractor), then
/// fills in request metadata:
/// - `from_ip` from `x-forwarded-for` (first hop), defaulting to 127.0.0.1 when
///   absent or empty, which happens behind Docker and some reverse proxies.
/// - `correlation_id` from the `x-request-id` header stamped by the request-id
///   layer, with a fresh UUID as fallback for direct in-process calls.
impl<S> FromRequestParts<S> for Breadcrumb
where
    S: Send + Sync,
    AppConfig: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth = AuthUser::from_request_parts(parts, state).await?;

        let from_ip = parts
            .headers
            .get("x-forwarded-for")
            .and_then(|value| value.to_str().ok())
            .and_then(|raw| raw.split(',').next())
            .map(str::trim)
            .filter(|ip| !ip.is_empty())
            .unwrap_or("127.0.0.1")
            .to_string();

        let correlation_id = parts
            .headers
            .get("x-request-id")
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        Ok(Breadcrumb {
            at_time: Utc::now(),
            by_user: auth.user_id,
            from_ip,
            correlation_id,
        })
    }
}

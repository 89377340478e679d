use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

use crate::{
    config::{AppConfig, Env},
    error::ApiError,
};

/// Roles permitted to perform write operations (POST/PATCH). Reads only require
/// a valid token. This is the entire authorization policy of the template: two
/// static role checks, nothing more.
pub const WRITER_ROLES: [&str; 2] = ["admin", "staff"];

/// Claims
///
/// The payload expected inside a bearer JWT. Roles travel in the token itself;
/// there is no user table to consult, which keeps the template free of any
/// identity storage.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the caller's user id.
    pub sub: String,
    /// Role names granted to the caller.
    #[serde(default)]
    pub roles: Vec<String>,
    /// Expiration time, seconds since the epoch. Always validated.
    pub exp: usize,
    /// Issued-at time.
    pub iat: usize,
}

/// AuthUser
///
/// The resolved identity of an authenticated request, produced by the extractor
/// below. Handlers and services receive this struct and never touch raw tokens.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
    pub roles: Vec<String>,
}

impl AuthUser {
    /// True when the caller holds one of the writer roles.
    pub fn can_write(&self) -> bool {
        self.roles
            .iter()
            .any(|role| WRITER_ROLES.contains(&role.as_str()))
    }

    /// Write gate used by every mutating service call.
    pub fn require_writer(&self) -> Result<(), ApiError> {
        if self.can_write() {
            Ok(())
        } else {
            Err(ApiError::Forbidden(format!(
                "write operations require one of the roles: {}",
                WRITER_ROLES.join(", ")
            )))
        }
    }
}

/// AuthUser Extractor Implementation
///
/// Implements Axum's `FromRequestParts`, making `AuthUser` usable as a handler
/// argument. Authentication stays in the extractor; business logic in handlers
/// and services never sees a token.
///
/// Resolution order:
/// 1. Local bypass: in `Env::Local` only, the `x-user-id` header (with an
///    optional comma-separated `x-user-roles`) stands in for a token. This keeps
///    local curl sessions and tests free of JWT plumbing.
/// 2. Bearer token: standard `Authorization: Bearer <jwt>` extraction, decoded
///    and validated (including expiry) against the configured secret.
///
/// Rejection: 401 through `ApiError::Unauthorized` on any failure.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    AppConfig: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let config = AppConfig::from_ref(state);

        if config.env == Env::Local {
            if let Some(user_id) = parts
                .headers
                .get("x-user-id")
                .and_then(|value| value.to_str().ok())
            {
                let roles = parts
                    .headers
                    .get("x-user-roles")
                    .and_then(|value| value.to_str().ok())
                    .map(|raw| {
                        raw.split(',')
                            .map(|role| role.trim().to_string())
                            .filter(|role| !role.is_empty())
                            .collect()
                    })
                    .unwrap_or_default();
                return Ok(AuthUser {
                    user_id: user_id.to_string(),
                    roles,
                });
            }
        }
        // Production, or no bypass header: fall through to JWT validation.

        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(ApiError::Unauthorized)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(ApiError::Unauthorized)?;

        let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
        let mut validation = Validation::default();
        validation.validate_exp = true;

        let token_data = decode::<Claims>(token, &decoding_key, &validation)
            .map_err(|_| ApiError::Unauthorized)?;

        Ok(AuthUser {
            user_id: token_data.claims.sub,
            roles: token_data.claims.roles,
        })
    }
}

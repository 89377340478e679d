//! Business layer: one service per resource domain.
//!
//! Services sit between the route handlers and the repository. They own the
//! role checks, the audit stamping of system-managed fields, and the handoff to
//! the paginated query core. Handlers stay thin: extract, delegate, serialize.

use bson::{Document, oid::ObjectId};

use crate::error::ApiError;

pub mod consume;
pub mod control;
pub mod create;

pub use consume::ConsumeService;
pub use control::ControlService;
pub use create::CreateService;

/// Fields managed by the server and never writable by clients.
const RESTRICTED_FIELDS: [&str; 3] = ["_id", "created", "saved"];

/// Rejects updates that touch a system-managed field. Mirrors the write gate:
/// violating it is a 403, not a validation error, since the caller is asking
/// for something the API will never allow.
pub(crate) fn reject_restricted(update: &Document) -> Result<(), ApiError> {
    for field in RESTRICTED_FIELDS {
        if update.contains_key(field) {
            return Err(ApiError::Forbidden(format!("Cannot update {field} field")));
        }
    }
    Ok(())
}

/// Parses a path segment as an object id, reporting the offending parameter on
/// failure.
pub(crate) fn parse_object_id(raw: &str, param: &'static str) -> Result<ObjectId, ApiError> {
    ObjectId::parse_str(raw)
        .map_err(|_| ApiError::invalid(param, format!("{param} must be a valid object id")))
}

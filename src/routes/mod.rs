//! Router modules, one per access surface.
//!
//! The public module carries the unauthenticated health probe; the three domain
//! modules are nested under `/api/<domain>` behind the authentication layer in
//! `create_router`. Write gating (the two-role check) happens inside the
//! services, so a domain router only declares which verbs exist.

/// Unauthenticated endpoints: health probe only.
pub mod public;

/// Control domain: full lifecycle (create, list, get, update).
pub mod control;

/// Create domain: append-only (create, list, get).
pub mod create;

/// Consume domain: read-only (list, get).
pub mod consume;

//! Router Module Index
//!
//! Routes are split by who may reach them. Enforcement lives in the
//! extractors each handler takes (`RequestContext`, `AuthUser`, `OrgAdmin`).

/// Routes open to anyone. Responses are projected by role where relevant.
pub mod public;

/// Routes behind the `AuthUser` middleware layer.
pub mod authenticated;

/// Organization-admin routes. Every handler takes `OrgAdmin`.
pub mod admin;

//! HTTP handlers, grouped by dashboard area.
//!
//! Admin handlers take `OrgAdmin` as their first argument: the role check runs
//! before any body is parsed, so a non-admin always sees 403.

pub mod config;
pub mod questions;
pub mod roadmap;
pub mod session;
pub mod webhooks;

use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Authenticated Router Module
///
/// Routes that need a signed-in user but no particular role. The router is
/// wrapped in `auth_middleware` by `create_router`, so unauthenticated
/// requests stop with 401 before reaching a handler.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /api/me
        // The caller's identity and role in the active organization.
        .route("/api/me", get(handlers::session::get_me))
}

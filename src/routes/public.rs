use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Public Router Module
///
/// Endpoints reachable without a session. The config endpoint is shared with
/// the embedded widget: anonymous callers only ever get the public projection.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for load balancers.
        .route("/health", get(|| async { "ok" }))
        // GET /api/config?organizationId=...  |  POST /api/config {organizationId}
        // Role-projected config. PATCH on the same path is admin-only: the
        // handler's `OrgAdmin` extractor rejects everyone else with 403.
        .route(
            "/api/config",
            get(handlers::config::get_config)
                .post(handlers::config::post_config)
                .patch(handlers::config::patch_config),
        )
}

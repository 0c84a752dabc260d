use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{delete, get, post},
};

/// Admin Router Module
///
/// The dashboard's management surface. Every handler here takes the `OrgAdmin`
/// extractor: the request must name an organization (400 otherwise) and the
/// caller must hold the `admin` role in it (403 otherwise).
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /api/settings
        // Integration settings shown on the settings page.
        .route("/api/settings", get(handlers::config::get_settings))
        // --- Questions ---
        // GET /api/questions?start=N
        // Twenty questions per page, grouped by how many days ago they were asked.
        .route("/api/questions", get(handlers::questions::get_questions))
        .route(
            "/api/questions/{id}",
            get(handlers::questions::get_question)
                .patch(handlers::questions::update_question)
                .delete(handlers::questions::delete_question),
        )
        // DELETE /api/replies/{id}
        // Any reply except the one that opens its thread.
        .route("/api/replies/{id}", delete(handlers::questions::delete_reply))
        // --- Roadmap ---
        .route(
            "/api/roadmap",
            get(handlers::roadmap::get_roadmap).post(handlers::roadmap::create_roadmap),
        )
        .route(
            "/api/roadmap/{id}",
            axum::routing::patch(handlers::roadmap::update_roadmap)
                .delete(handlers::roadmap::delete_roadmap),
        )
        .route("/api/teams", get(handlers::roadmap::get_teams))
        // --- Webhooks ---
        .route(
            "/api/webhooks",
            get(handlers::webhooks::get_webhooks).post(handlers::webhooks::create_webhook),
        )
        .route("/api/webhooks/{id}", delete(handlers::webhooks::delete_webhook))
        // POST /api/webhooks/{id}/test
        // Sends a sample alert to the target.
        .route("/api/webhooks/{id}/test", post(handlers::webhooks::test_webhook))
}

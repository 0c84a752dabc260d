use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod auth;
pub mod config;
pub mod error;
pub mod feed;
pub mod gate;
pub mod handlers;
pub mod models;
pub mod notifier;
pub mod repository;

// Routing segregation (Public, Authenticated, Admin).
pub mod routes;
use auth::AuthUser;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::{ApiError, ApiResult};
pub use gate::{ConfigView, OrgAdmin, Role};
pub use notifier::{HttpWebhookNotifier, MockWebhookNotifier, NotifierState};
pub use repository::{PostgresRepository, RepositoryState};

/// ApiDoc
///
/// OpenAPI document for every route, served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::config::get_config, handlers::config::post_config,
        handlers::config::patch_config, handlers::config::get_settings,
        handlers::session::get_me,
        handlers::questions::get_questions, handlers::questions::get_question,
        handlers::questions::update_question, handlers::questions::delete_question,
        handlers::questions::delete_reply,
        handlers::roadmap::get_roadmap, handlers::roadmap::create_roadmap,
        handlers::roadmap::update_roadmap, handlers::roadmap::delete_roadmap,
        handlers::roadmap::get_teams,
        handlers::webhooks::get_webhooks, handlers::webhooks::create_webhook,
        handlers::webhooks::delete_webhook, handlers::webhooks::test_webhook
    ),
    components(
        schemas(
            models::SqueakConfig, models::PublicConfig, models::UpdateConfigRequest,
            models::SettingsResponse, models::Message, models::Reply, models::ReplyAuthor,
            models::QuestionThread, models::UpdateQuestionRequest, models::QuestionSummary,
            models::DayGroup, models::QuestionFeed, models::ReplyView, models::ThreadView,
            models::Roadmap, models::CreateRoadmapRequest, models::UpdateRoadmapRequest,
            models::Team, models::WebhookConfig, models::CreateWebhookRequest,
            models::WebhookEvent, models::MeResponse, gate::Role, gate::ConfigView,
            handlers::config::ConfigParams,
        )
    ),
    tags(
        (name = "squeak", description = "Squeak admin dashboard API")
    )
)]
struct ApiDoc;

/// AppState
///
/// Immutable, cheaply cloned container shared by every request.
#[derive(Clone)]
pub struct AppState {
    /// Persistence, behind the `Repository` trait.
    pub repo: RepositoryState,
    /// Outgoing webhook delivery.
    pub notifier: NotifierState,
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for NotifierState {
    fn from_ref(app_state: &AppState) -> NotifierState {
        app_state.notifier.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Gate for `authenticated_routes`: extracting `AuthUser` rejects the request
/// with 401 before the handler runs.
async fn auth_middleware(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// create_router
///
/// Assembles all routes, the shared state, and the observability layers.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(
            authenticated::authenticated_routes()
                .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware)),
        )
        .merge(admin::admin_routes())
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                // Every request gets a UUID before tracing starts, so the span can carry it.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Per-request span carrying method, URI, request id and the organization the
/// request targets, so every log line of a request correlates.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");
    let organization = request
        .headers()
        .get(auth::ORGANIZATION_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("-");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
        org = %organization,
    )
}

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use url::Url;

use crate::{
    AppState,
    error::{ApiError, ApiResult},
    gate::OrgAdmin,
    models::{CreateWebhookRequest, WebhookConfig, WebhookEvent},
};

/// Only absolute http(s) URLs can receive alerts.
fn validate_target(raw: &str) -> ApiResult<String> {
    let url = Url::parse(raw.trim())
        .map_err(|e| ApiError::Validation(format!("invalid webhook url: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url.to_string()),
        other => Err(ApiError::Validation(format!("unsupported webhook scheme: {other}"))),
    }
}

#[utoipa::path(
    get,
    path = "/api/webhooks",
    responses((status = 200, description = "Webhooks", body = [WebhookConfig]))
)]
pub async fn get_webhooks(
    admin: OrgAdmin,
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<WebhookConfig>>> {
    Ok(Json(state.repo.get_webhooks(&admin.organization_id).await?))
}

#[utoipa::path(
    post,
    path = "/api/webhooks",
    request_body = CreateWebhookRequest,
    responses(
        (status = 201, description = "Created", body = WebhookConfig),
        (status = 400, description = "Invalid URL")
    )
)]
pub async fn create_webhook(
    admin: OrgAdmin,
    State(state): State<AppState>,
    Json(payload): Json<CreateWebhookRequest>,
) -> ApiResult<(StatusCode, Json<WebhookConfig>)> {
    let url = validate_target(&payload.url)?;
    let webhook = state.repo.create_webhook(&admin.organization_id, url).await?;
    Ok((StatusCode::CREATED, Json(webhook)))
}

#[utoipa::path(
    delete,
    path = "/api/webhooks/{id}",
    params(("id" = i64, Path, description = "Webhook ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_webhook(
    admin: OrgAdmin,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    if state.repo.delete_webhook(&admin.organization_id, id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("Webhook"))
    }
}

/// test_webhook
///
/// [Admin Route] Sends a sample alert so an admin can check the target is wired up.
#[utoipa::path(
    post,
    path = "/api/webhooks/{id}/test",
    params(("id" = i64, Path, description = "Webhook ID")),
    responses(
        (status = 200, description = "Delivered"),
        (status = 404, description = "Not Found"),
        (status = 502, description = "Target rejected or unreachable")
    )
)]
pub async fn test_webhook(
    admin: OrgAdmin,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    let webhook = state
        .repo
        .get_webhook(&admin.organization_id, id)
        .await?
        .ok_or(ApiError::NotFound("Webhook"))?;

    let event = WebhookEvent {
        event_type: "test".to_string(),
        organization_id: admin.organization_id.clone(),
        message: "Test alert from Squeak!".to_string(),
    };

    state.notifier.deliver(&webhook.url, &event).await.map_err(|e| {
        tracing::warn!(webhook_id = id, "webhook test failed: {}", e);
        ApiError::Delivery(e)
    })?;
    Ok(StatusCode::OK)
}

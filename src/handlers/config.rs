use axum::{
    Json,
    extract::{Query, State},
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{
    AppState,
    auth::RequestContext,
    error::{ApiError, ApiResult},
    gate::{self, ConfigView, OrgAdmin},
    models::{SettingsResponse, SqueakConfig, UpdateConfigRequest},
};

/// ConfigParams
///
/// Organization selector for the public config endpoint, accepted either as a
/// query parameter (GET) or a JSON body (POST).
#[derive(Debug, Default, Serialize, Deserialize, IntoParams, ToSchema)]
pub struct ConfigParams {
    #[serde(rename = "organizationId")]
    pub organization_id: Option<String>,
}

/// get_config
///
/// [Public Route] Config for an organization, projected by the caller's role.
#[utoipa::path(
    get,
    path = "/api/config",
    params(ConfigParams),
    responses(
        (status = 200, description = "Full config for admins, public subset otherwise", body = ConfigView),
        (status = 400, description = "Missing organizationId"),
        (status = 404, description = "Organization has no config")
    )
)]
pub async fn get_config(
    ctx: RequestContext,
    State(state): State<AppState>,
    Query(params): Query<ConfigParams>,
) -> ApiResult<Json<ConfigView>> {
    let view = gate::read_config(
        state.repo.as_ref(),
        params.organization_id.as_deref(),
        ctx.user.as_ref(),
    )
    .await?;
    Ok(Json(view))
}

/// post_config
///
/// [Public Route] Same as `get_config`, with the organization in the body.
/// The widget uses this form.
#[utoipa::path(
    post,
    path = "/api/config",
    request_body = ConfigParams,
    responses(
        (status = 200, description = "Full config for admins, public subset otherwise", body = ConfigView),
        (status = 400, description = "Missing organizationId"),
        (status = 404, description = "Organization has no config")
    )
)]
pub async fn post_config(
    ctx: RequestContext,
    State(state): State<AppState>,
    Json(params): Json<ConfigParams>,
) -> ApiResult<Json<ConfigView>> {
    let view = gate::read_config(
        state.repo.as_ref(),
        params.organization_id.as_deref(),
        ctx.user.as_ref(),
    )
    .await?;
    Ok(Json(view))
}

/// patch_config
///
/// [Admin Route] Partial update of the active organization's config. Only
/// fields present in the payload change.
#[utoipa::path(
    patch,
    path = "/api/config",
    request_body = UpdateConfigRequest,
    responses(
        (status = 200, description = "Updated config", body = SqueakConfig),
        (status = 403, description = "Not an admin of the organization"),
        (status = 500, description = "Organization has no config")
    )
)]
pub async fn patch_config(
    admin: OrgAdmin,
    State(state): State<AppState>,
    Json(payload): Json<UpdateConfigRequest>,
) -> ApiResult<Json<SqueakConfig>> {
    let config = state
        .repo
        .update_config(&admin.organization_id, payload)
        .await?
        .ok_or(ApiError::ConfigMissing)?;

    tracing::info!(
        organization_id = %admin.organization_id,
        user_id = %admin.user.id,
        "organization config updated"
    );
    Ok(Json(config))
}

/// get_settings
///
/// [Admin Route] Integration settings for the settings page. A tenant without
/// a config row gets empty values rather than an error.
#[utoipa::path(
    get,
    path = "/api/settings",
    responses(
        (status = 200, description = "Settings", body = SettingsResponse),
        (status = 403, description = "Not an admin of the organization")
    )
)]
pub async fn get_settings(
    admin: OrgAdmin,
    State(state): State<AppState>,
) -> ApiResult<Json<SettingsResponse>> {
    let config = state.repo.get_config(&admin.organization_id).await?;
    Ok(Json(config.as_ref().map(SettingsResponse::from).unwrap_or_default()))
}

use axum::{Json, extract::State};

use crate::{
    AppState,
    auth::RequestContext,
    error::{ApiError, ApiResult},
    gate::Role,
    models::MeResponse,
};

/// get_me
///
/// [Authenticated Route] The caller and their role in the active organization
/// (`anonymous` when no organization is selected or they hold no role there).
#[utoipa::path(
    get,
    path = "/api/me",
    responses(
        (status = 200, description = "Session", body = MeResponse),
        (status = 401, description = "Not signed in")
    )
)]
pub async fn get_me(ctx: RequestContext, State(state): State<AppState>) -> ApiResult<Json<MeResponse>> {
    let user = ctx.user.clone().ok_or(ApiError::Unauthorized)?;

    let role = match ctx.organization_id.as_deref() {
        Some(organization_id) => Role::resolve(state.repo.as_ref(), organization_id, Some(&user)).await?,
        None => Role::Anonymous,
    };

    Ok(Json(MeResponse {
        id: user.id,
        email: user.email,
        organization_id: ctx.organization_id,
        role,
    }))
}

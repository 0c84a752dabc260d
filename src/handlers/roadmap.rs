use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{
    AppState,
    error::{ApiError, ApiResult},
    gate::OrgAdmin,
    models::{CreateRoadmapRequest, Roadmap, Team, UpdateRoadmapRequest},
};

/// Teams are per organization; assigning another tenant's team is rejected.
async fn ensure_team(state: &AppState, organization_id: &str, team_id: Option<i64>) -> ApiResult<()> {
    let Some(team_id) = team_id else {
        return Ok(());
    };
    match state.repo.get_team(organization_id, team_id).await? {
        Some(_) => Ok(()),
        None => Err(ApiError::Validation(format!("unknown team {team_id}"))),
    }
}

#[utoipa::path(
    get,
    path = "/api/roadmap",
    responses((status = 200, description = "Roadmap", body = [Roadmap]))
)]
pub async fn get_roadmap(admin: OrgAdmin, State(state): State<AppState>) -> ApiResult<Json<Vec<Roadmap>>> {
    Ok(Json(state.repo.get_roadmap(&admin.organization_id).await?))
}

#[utoipa::path(
    post,
    path = "/api/roadmap",
    request_body = CreateRoadmapRequest,
    responses(
        (status = 201, description = "Created", body = Roadmap),
        (status = 400, description = "Invalid goal")
    )
)]
pub async fn create_roadmap(
    admin: OrgAdmin,
    State(state): State<AppState>,
    Json(payload): Json<CreateRoadmapRequest>,
) -> ApiResult<(StatusCode, Json<Roadmap>)> {
    if payload.title.trim().is_empty() {
        return Err(ApiError::Validation("title must not be empty".to_string()));
    }
    ensure_team(&state, &admin.organization_id, payload.team_id).await?;

    let goal = state.repo.create_roadmap(&admin.organization_id, payload).await?;
    Ok((StatusCode::CREATED, Json(goal)))
}

/// update_roadmap
///
/// [Admin Route] Partial update of a goal, including team assignment. An
/// explicit `null` clears a nullable column.
#[utoipa::path(
    patch,
    path = "/api/roadmap/{id}",
    params(("id" = i64, Path, description = "Roadmap item ID")),
    request_body = UpdateRoadmapRequest,
    responses(
        (status = 200, description = "Updated", body = Roadmap),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_roadmap(
    admin: OrgAdmin,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateRoadmapRequest>,
) -> ApiResult<Json<Roadmap>> {
    if matches!(&payload.title, Some(title) if title.trim().is_empty()) {
        return Err(ApiError::Validation("title must not be empty".to_string()));
    }
    // `teamId: null` unassigns and needs no check.
    ensure_team(&state, &admin.organization_id, payload.team_id.flatten()).await?;

    let goal = state
        .repo
        .update_roadmap(&admin.organization_id, id, payload)
        .await?
        .ok_or(ApiError::NotFound("Roadmap item"))?;
    Ok(Json(goal))
}

#[utoipa::path(
    delete,
    path = "/api/roadmap/{id}",
    params(("id" = i64, Path, description = "Roadmap item ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_roadmap(
    admin: OrgAdmin,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    if state.repo.delete_roadmap(&admin.organization_id, id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("Roadmap item"))
    }
}

#[utoipa::path(
    get,
    path = "/api/teams",
    responses((status = 200, description = "Teams", body = [Team]))
)]
pub async fn get_teams(admin: OrgAdmin, State(state): State<AppState>) -> ApiResult<Json<Vec<Team>>> {
    Ok(Json(state.repo.get_teams(&admin.organization_id).await?))
}

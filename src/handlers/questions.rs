use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    AppState,
    error::{ApiError, ApiResult},
    feed::{self, PAGE_SIZE},
    gate::OrgAdmin,
    models::{Message, QuestionFeed, ThreadView, UpdateQuestionRequest},
};

/// QuestionsParams
///
/// Pagination for the question feed.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct QuestionsParams {
    /// Offset of the first question on the page. Negative values clamp to 0.
    pub start: Option<i64>,
}

async fn company_domain(state: &AppState, organization_id: &str) -> ApiResult<Option<String>> {
    Ok(state
        .repo
        .get_config(organization_id)
        .await?
        .and_then(|config| config.company_domain))
}

/// get_questions
///
/// [Admin Route] One page of the organization's questions, grouped by day.
#[utoipa::path(
    get,
    path = "/api/questions",
    params(QuestionsParams),
    responses(
        (status = 200, description = "Question feed", body = QuestionFeed),
        (status = 403, description = "Not an admin of the organization")
    )
)]
pub async fn get_questions(
    admin: OrgAdmin,
    State(state): State<AppState>,
    Query(params): Query<QuestionsParams>,
) -> ApiResult<Json<QuestionFeed>> {
    let start = params.start.unwrap_or(0).max(0);
    let (threads, count) = state
        .repo
        .get_questions(&admin.organization_id, start, PAGE_SIZE)
        .await?;
    let domain = company_domain(&state, &admin.organization_id).await?;

    Ok(Json(feed::build_feed(threads, count, start, domain.as_deref(), Utc::now())))
}

/// get_question
///
/// [Admin Route] A single thread with all replies.
#[utoipa::path(
    get,
    path = "/api/questions/{id}",
    params(("id" = i64, Path, description = "Question ID")),
    responses(
        (status = 200, description = "Thread", body = ThreadView),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_question(
    admin: OrgAdmin,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<ThreadView>> {
    let thread = state
        .repo
        .get_question(&admin.organization_id, id)
        .await?
        .ok_or(ApiError::NotFound("Question"))?;
    let domain = company_domain(&state, &admin.organization_id).await?;

    Ok(Json(feed::thread_view(thread, domain.as_deref())))
}

/// update_question
///
/// [Admin Route] Edit thread options: subject, slugs, published, resolved.
#[utoipa::path(
    patch,
    path = "/api/questions/{id}",
    params(("id" = i64, Path, description = "Question ID")),
    request_body = UpdateQuestionRequest,
    responses(
        (status = 200, description = "Updated", body = Message),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_question(
    admin: OrgAdmin,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateQuestionRequest>,
) -> ApiResult<Json<Message>> {
    if matches!(&payload.subject, Some(subject) if subject.trim().is_empty()) {
        return Err(ApiError::Validation("subject must not be empty".to_string()));
    }

    let message = state
        .repo
        .update_question(&admin.organization_id, id, payload)
        .await?
        .ok_or(ApiError::NotFound("Question"))?;
    Ok(Json(message))
}

/// delete_question
///
/// [Admin Route] Removes a thread and all of its replies.
#[utoipa::path(
    delete,
    path = "/api/questions/{id}",
    params(("id" = i64, Path, description = "Question ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_question(
    admin: OrgAdmin,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    if !state.repo.delete_question(&admin.organization_id, id).await? {
        return Err(ApiError::NotFound("Question"));
    }
    tracing::info!(organization_id = %admin.organization_id, question_id = id, "question deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// delete_reply
///
/// [Admin Route] Removes one reply. The opening reply is the question body and
/// can only go away with the whole question.
#[utoipa::path(
    delete,
    path = "/api/replies/{id}",
    params(("id" = i64, Path, description = "Reply ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Reply opens its thread"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_reply(
    admin: OrgAdmin,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    match state.repo.reply_is_thread_root(&admin.organization_id, id).await? {
        None => return Err(ApiError::NotFound("Reply")),
        Some(true) => return Err(ApiError::Forbidden),
        Some(false) => {}
    }

    if !state.repo.delete_reply(&admin.organization_id, id).await? {
        return Err(ApiError::NotFound("Reply"));
    }
    tracing::info!(organization_id = %admin.organization_id, reply_id = id, "reply deleted");
    Ok(StatusCode::NO_CONTENT)
}

use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
};
use uuid::Uuid;
use validator::Validate;

use super::{DataResponse, MessageResponse};
use crate::{
    AppState,
    auth::AuthUser,
    error::{AppError, AppResult},
    models::{
        AptitudeListQuery, AptitudeQuestion, BulkStatusRequest, BulkStatusResponse, ContentStats,
        ContentStatus, CreateAptitudeRequest, PaginatedResponse, UpdateAptitudeRequest,
    },
};

fn question_not_found() -> AppError {
    AppError::not_found("Aptitude question not found")
}

/// list_questions
///
/// [Content Manager Route] Paginated listing of active questions.
#[utoipa::path(
    get,
    path = "/aptitude",
    params(AptitudeListQuery),
    responses(
        (status = 200, description = "Paginated questions"),
        (status = 400, description = "Bad page, limit, filter or sort key")
    )
)]
pub async fn list_questions(
    State(state): State<AppState>,
    query: Result<Query<AptitudeListQuery>, QueryRejection>,
) -> AppResult<Json<PaginatedResponse<AptitudeQuestion>>> {
    let Query(query) = query?;
    let filter = query.into_filter()?;
    let page = state.repo.list_aptitude(&filter).await?;
    Ok(Json(page.into()))
}

/// get_question
///
/// Soft-deleted questions are reported as absent.
#[utoipa::path(
    get,
    path = "/aptitude/{id}",
    params(("id" = Uuid, Path, description = "Question ID")),
    responses(
        (status = 200, body = AptitudeQuestion),
        (status = 404, description = "Absent or deleted")
    )
)]
pub async fn get_question(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> AppResult<Json<DataResponse<AptitudeQuestion>>> {
    let Path(id) = id?;
    let question = state
        .repo
        .get_aptitude(id)
        .await?
        .ok_or_else(question_not_found)?;
    Ok(Json(DataResponse::new(question)))
}

/// create_question
///
/// [Content Manager Route] Validates the payload, then stores it under the
/// next question number. Status defaults to Draft.
#[utoipa::path(
    post,
    path = "/aptitude",
    request_body = CreateAptitudeRequest,
    responses(
        (status = 201, description = "Created", body = AptitudeQuestion),
        (status = 400, description = "Missing or invalid fields"),
        (status = 409, description = "Question number collision, retry")
    )
)]
pub async fn create_question(
    auth: AuthUser,
    State(state): State<AppState>,
    payload: Result<Json<CreateAptitudeRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<DataResponse<AptitudeQuestion>>)> {
    let Json(payload) = payload?;
    let draft = payload.into_draft()?;
    let question = state.repo.create_aptitude(draft, auth.id).await?;

    tracing::info!(
        user_id = %auth.id,
        question_id = %question.id,
        question_number = question.question_number,
        "aptitude question created"
    );
    Ok((
        StatusCode::CREATED,
        Json(DataResponse::with_message(
            question,
            "Aptitude question created successfully",
        )),
    ))
}

/// update_question
///
/// [Content Manager Route] Merges the payload into the stored question and
/// validates the merged result. The question number never changes.
#[utoipa::path(
    put,
    path = "/aptitude/{id}",
    params(("id" = Uuid, Path, description = "Question ID")),
    request_body = UpdateAptitudeRequest,
    responses(
        (status = 200, body = AptitudeQuestion),
        (status = 400, description = "Invalid merged record"),
        (status = 404, description = "Absent or deleted")
    )
)]
pub async fn update_question(
    auth: AuthUser,
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdateAptitudeRequest>, JsonRejection>,
) -> AppResult<Json<DataResponse<AptitudeQuestion>>> {
    let Path(id) = id?;
    let Json(payload) = payload?;

    let existing = state
        .repo
        .get_aptitude(id)
        .await?
        .ok_or_else(question_not_found)?;
    let draft = payload.merge_into(existing.draft())?;

    let question = state
        .repo
        .update_aptitude(id, draft, auth.id)
        .await?
        .ok_or_else(question_not_found)?;

    Ok(Json(DataResponse::with_message(
        question,
        "Aptitude question updated successfully",
    )))
}

/// delete_question
///
/// [Content Manager Route] Soft delete: the row stays, hidden from every read.
#[utoipa::path(
    delete,
    path = "/aptitude/{id}",
    params(("id" = Uuid, Path, description = "Question ID")),
    responses(
        (status = 200, body = MessageResponse),
        (status = 404, description = "Absent or already deleted")
    )
)]
pub async fn delete_question(
    auth: AuthUser,
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> AppResult<Json<MessageResponse>> {
    let Path(id) = id?;
    if !state.repo.soft_delete_aptitude(id, auth.id).await? {
        return Err(question_not_found());
    }
    Ok(Json(MessageResponse::new(
        "Aptitude question deleted successfully",
    )))
}

/// purge_question
///
/// [Admin Route] Physically removes a question, including soft-deleted ones.
#[utoipa::path(
    delete,
    path = "/aptitude/{id}/permanent",
    params(("id" = Uuid, Path, description = "Question ID")),
    responses(
        (status = 200, body = MessageResponse),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "Absent")
    )
)]
pub async fn purge_question(
    auth: AuthUser,
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> AppResult<Json<MessageResponse>> {
    let Path(id) = id?;
    if !state.repo.purge_aptitude(id).await? {
        return Err(question_not_found());
    }

    tracing::warn!(admin_id = %auth.id, question_id = %id, "aptitude question permanently deleted");
    Ok(Json(MessageResponse::new(
        "Aptitude question permanently deleted",
    )))
}

/// question_stats
#[utoipa::path(
    get,
    path = "/aptitude/stats/overview",
    responses((status = 200, description = "Counts by status, difficulty and topic", body = ContentStats))
)]
pub async fn question_stats(
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<ContentStats>>> {
    let stats = state.repo.aptitude_stats().await?;
    Ok(Json(DataResponse::new(stats)))
}

/// bulk_update_question_status
///
/// [Content Manager Route] Sets one status on many questions. Ids that are
/// unknown or soft-deleted are skipped and not counted.
#[utoipa::path(
    patch,
    path = "/aptitude/bulk/status",
    request_body = BulkStatusRequest,
    responses(
        (status = 200, body = BulkStatusResponse),
        (status = 400, description = "Empty ids or invalid status")
    )
)]
pub async fn bulk_update_question_status(
    auth: AuthUser,
    State(state): State<AppState>,
    payload: Result<Json<BulkStatusRequest>, JsonRejection>,
) -> AppResult<Json<BulkStatusResponse>> {
    let Json(payload) = payload?;
    payload.validate()?;
    let status: ContentStatus = payload.status.trim().parse()?;

    let modified_count = state
        .repo
        .bulk_update_aptitude_status(&payload.ids, status, auth.id)
        .await?;

    Ok(Json(BulkStatusResponse {
        success: true,
        message: format!(
            "{modified_count} question(s) updated to {}",
            status.as_str()
        ),
        modified_count,
    }))
}

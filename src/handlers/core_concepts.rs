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
        BulkStatusRequest, BulkStatusResponse, ConceptListQuery, ContentStats, ContentStatus,
        CoreConcept, CreateConceptRequest, PaginatedResponse, UpdateConceptRequest,
    },
};

fn concept_not_found() -> AppError {
    AppError::not_found("Core concept not found")
}

/// list_concepts
#[utoipa::path(
    get,
    path = "/core-concepts",
    params(ConceptListQuery),
    responses(
        (status = 200, description = "Paginated concepts"),
        (status = 400, description = "Bad page, limit, filter or sort key")
    )
)]
pub async fn list_concepts(
    State(state): State<AppState>,
    query: Result<Query<ConceptListQuery>, QueryRejection>,
) -> AppResult<Json<PaginatedResponse<CoreConcept>>> {
    let Query(query) = query?;
    let filter = query.into_filter()?;
    let page = state.repo.list_concepts(&filter).await?;
    Ok(Json(page.into()))
}

/// get_concept
#[utoipa::path(
    get,
    path = "/core-concepts/{id}",
    params(("id" = Uuid, Path, description = "Concept ID")),
    responses((status = 200, body = CoreConcept), (status = 404, description = "Absent or deleted"))
)]
pub async fn get_concept(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> AppResult<Json<DataResponse<CoreConcept>>> {
    let Path(id) = id?;
    let concept = state
        .repo
        .get_concept(id)
        .await?
        .ok_or_else(concept_not_found)?;
    Ok(Json(DataResponse::new(concept)))
}

/// create_concept
///
/// [Content Manager Route] Stores a concept under the next concept number.
#[utoipa::path(
    post,
    path = "/core-concepts",
    request_body = CreateConceptRequest,
    responses(
        (status = 201, description = "Created", body = CoreConcept),
        (status = 400, description = "Missing or invalid fields"),
        (status = 409, description = "Concept number collision, retry")
    )
)]
pub async fn create_concept(
    auth: AuthUser,
    State(state): State<AppState>,
    payload: Result<Json<CreateConceptRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<DataResponse<CoreConcept>>)> {
    let Json(payload) = payload?;
    let draft = payload.into_draft()?;
    let concept = state.repo.create_concept(draft, auth.id).await?;

    tracing::info!(
        user_id = %auth.id,
        concept_id = %concept.id,
        concept_number = concept.concept_number,
        "core concept created"
    );
    Ok((
        StatusCode::CREATED,
        Json(DataResponse::with_message(
            concept,
            "Core concept created successfully",
        )),
    ))
}

/// update_concept
#[utoipa::path(
    put,
    path = "/core-concepts/{id}",
    params(("id" = Uuid, Path, description = "Concept ID")),
    request_body = UpdateConceptRequest,
    responses(
        (status = 200, body = CoreConcept),
        (status = 400, description = "Invalid merged record"),
        (status = 404, description = "Absent or deleted")
    )
)]
pub async fn update_concept(
    auth: AuthUser,
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdateConceptRequest>, JsonRejection>,
) -> AppResult<Json<DataResponse<CoreConcept>>> {
    let Path(id) = id?;
    let Json(payload) = payload?;

    let existing = state
        .repo
        .get_concept(id)
        .await?
        .ok_or_else(concept_not_found)?;
    let draft = payload.merge_into(existing.draft())?;

    let concept = state
        .repo
        .update_concept(id, draft, auth.id)
        .await?
        .ok_or_else(concept_not_found)?;

    Ok(Json(DataResponse::with_message(
        concept,
        "Core concept updated successfully",
    )))
}

/// delete_concept
#[utoipa::path(
    delete,
    path = "/core-concepts/{id}",
    params(("id" = Uuid, Path, description = "Concept ID")),
    responses(
        (status = 200, body = MessageResponse),
        (status = 404, description = "Absent or already deleted")
    )
)]
pub async fn delete_concept(
    auth: AuthUser,
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> AppResult<Json<MessageResponse>> {
    let Path(id) = id?;
    if !state.repo.soft_delete_concept(id, auth.id).await? {
        return Err(concept_not_found());
    }
    Ok(Json(MessageResponse::new("Core concept deleted successfully")))
}

/// concept_stats
#[utoipa::path(
    get,
    path = "/core-concepts/stats/overview",
    responses((status = 200, description = "Counts by status, difficulty and subject", body = ContentStats))
)]
pub async fn concept_stats(
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<ContentStats>>> {
    let stats = state.repo.concept_stats().await?;
    Ok(Json(DataResponse::new(stats)))
}

/// bulk_update_concept_status
#[utoipa::path(
    patch,
    path = "/core-concepts/bulk/status",
    request_body = BulkStatusRequest,
    responses(
        (status = 200, body = BulkStatusResponse),
        (status = 400, description = "Empty ids or invalid status")
    )
)]
pub async fn bulk_update_concept_status(
    auth: AuthUser,
    State(state): State<AppState>,
    payload: Result<Json<BulkStatusRequest>, JsonRejection>,
) -> AppResult<Json<BulkStatusResponse>> {
    let Json(payload) = payload?;
    payload.validate()?;
    let status: ContentStatus = payload.status.trim().parse()?;

    let modified_count = state
        .repo
        .bulk_update_concept_status(&payload.ids, status, auth.id)
        .await?;

    Ok(Json(BulkStatusResponse {
        success: true,
        message: format!("{modified_count} concept(s) updated to {}", status.as_str()),
        modified_count,
    }))
}

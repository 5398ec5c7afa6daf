use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{DataResponse, MessageResponse};
use crate::{
    AppState,
    auth::AuthUser,
    error::{AppError, AppResult},
    models::{
        CreateNotificationRequest, MyNotificationsResponse, Notification, PageRequest,
        PaginatedResponse,
    },
};

/// FeedQuery
///
/// `page`/`limit` for the notification listings.
#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct FeedQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl FeedQuery {
    fn page(&self) -> AppResult<PageRequest> {
        PageRequest::parse(self.page.as_deref(), self.limit.as_deref())
    }
}

/// MarkAllReadResponse
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MarkAllReadResponse {
    pub success: bool,
    pub message: String,
    pub modified_count: u64,
}

fn notification_not_found() -> AppError {
    AppError::not_found("Notification not found")
}

/// my_notifications
///
/// [Authenticated Route] The caller's feed, newest first. Every item carries
/// the caller's own `read`/`readAt`; `unreadCount` covers the returned page.
#[utoipa::path(
    get,
    path = "/notifications/my-notifications",
    params(FeedQuery),
    responses((status = 200, description = "Paginated feed with unreadCount"))
)]
pub async fn my_notifications(
    auth: AuthUser,
    State(state): State<AppState>,
    query: Result<Query<FeedQuery>, QueryRejection>,
) -> AppResult<Json<MyNotificationsResponse>> {
    let Query(query) = query?;
    let page = state
        .repo
        .notifications_for(auth.id, auth.role, query.page()?)
        .await?;

    let unread_count = page.items.iter().filter(|n| !n.read).count();
    let total_pages = page.total_pages();
    let current_page = page.request.page;

    Ok(Json(MyNotificationsResponse {
        success: true,
        unread_count,
        total_pages,
        current_page,
        total: page.total,
        has_next_page: i64::from(current_page) < total_pages,
        has_prev_page: current_page > 1,
        items: page.items,
    }))
}

/// mark_read
///
/// [Authenticated Route] Idempotent. A notification the caller cannot see is
/// reported as absent.
#[utoipa::path(
    patch,
    path = "/notifications/mark-read/{id}",
    params(("id" = Uuid, Path, description = "Notification ID")),
    responses(
        (status = 200, body = MessageResponse),
        (status = 404, description = "Absent, expired or not addressed to the caller")
    )
)]
pub async fn mark_read(
    auth: AuthUser,
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> AppResult<Json<MessageResponse>> {
    let Path(id) = id?;
    if !state
        .repo
        .mark_notification_read(id, auth.id, auth.role)
        .await?
    {
        return Err(notification_not_found());
    }
    Ok(Json(MessageResponse::new("Notification marked as read")))
}

/// mark_all_read
#[utoipa::path(
    patch,
    path = "/notifications/mark-all-read",
    responses((status = 200, body = MarkAllReadResponse))
)]
pub async fn mark_all_read(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<MarkAllReadResponse>> {
    let modified_count = state
        .repo
        .mark_all_notifications_read(auth.id, auth.role)
        .await?;

    Ok(Json(MarkAllReadResponse {
        success: true,
        message: format!("{modified_count} notification(s) marked as read"),
        modified_count,
    }))
}

/// create_notification
///
/// [Content Manager Route] Publishes a notification to an audience and/or an
/// explicit recipient list.
#[utoipa::path(
    post,
    path = "/notifications",
    request_body = CreateNotificationRequest,
    responses(
        (status = 201, description = "Created", body = Notification),
        (status = 400, description = "Missing title/message, bad enum or past expiry")
    )
)]
pub async fn create_notification(
    auth: AuthUser,
    State(state): State<AppState>,
    payload: Result<Json<CreateNotificationRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<DataResponse<Notification>>)> {
    let Json(payload) = payload?;
    let new = payload.into_new(auth.id, Utc::now())?;
    let notification = state.repo.create_notification(new).await?;

    tracing::info!(
        user_id = %auth.id,
        notification_id = %notification.id,
        audience = notification.target_audience.as_str(),
        recipients = notification.recipients.len(),
        "notification created"
    );
    Ok((
        StatusCode::CREATED,
        Json(DataResponse::with_message(
            notification,
            "Notification created successfully",
        )),
    ))
}

/// list_notifications
///
/// [Content Manager Route] All active notifications with their recipient lists.
#[utoipa::path(
    get,
    path = "/notifications",
    params(FeedQuery),
    responses((status = 200, description = "Paginated notifications"))
)]
pub async fn list_notifications(
    State(state): State<AppState>,
    query: Result<Query<FeedQuery>, QueryRejection>,
) -> AppResult<Json<PaginatedResponse<Notification>>> {
    let Query(query) = query?;
    let page = state.repo.list_notifications(query.page()?).await?;
    Ok(Json(page.into()))
}

/// delete_notification
#[utoipa::path(
    delete,
    path = "/notifications/{id}",
    params(("id" = Uuid, Path, description = "Notification ID")),
    responses(
        (status = 200, body = MessageResponse),
        (status = 404, description = "Absent or already deleted")
    )
)]
pub async fn delete_notification(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> AppResult<Json<MessageResponse>> {
    let Path(id) = id?;
    if !state.repo.soft_delete_notification(id).await? {
        return Err(notification_not_found());
    }
    Ok(Json(MessageResponse::new("Notification deleted successfully")))
}

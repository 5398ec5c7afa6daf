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
    auth::{AuthUser, hash_password},
    error::{AppError, AppResult},
    guards::{SelfAction, guard_self_action},
    models::{
        AdminDashboardStats, CreateUserRequest, NewUser, PaginatedResponse, Role,
        UpdateRoleRequest, UpdateUserRequest, User, UserChanges, UserListQuery,
        user::normalize_email,
    },
};

fn user_not_found() -> AppError {
    AppError::not_found("User not found")
}

/// list_users
///
/// [Moderator Route] Paginated user listing with search over name and email,
/// `role` and `isActive` filters and whitelisted sort keys.
#[utoipa::path(
    get,
    path = "/admin/users",
    params(UserListQuery),
    responses(
        (status = 200, description = "Paginated users"),
        (status = 400, description = "Bad page, limit, filter or sort key")
    )
)]
pub async fn list_users(
    State(state): State<AppState>,
    query: Result<Query<UserListQuery>, QueryRejection>,
) -> AppResult<Json<PaginatedResponse<User>>> {
    let Query(query) = query?;
    let filter = query.into_filter()?;
    let page = state.repo.list_users(&filter).await?;
    Ok(Json(page.into()))
}

/// get_user
#[utoipa::path(
    get,
    path = "/admin/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses((status = 200, body = User), (status = 404, description = "Not found"))
)]
pub async fn get_user(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> AppResult<Json<DataResponse<User>>> {
    let Path(id) = id?;
    let user = state.repo.get_user(id).await?.ok_or_else(user_not_found)?;
    Ok(Json(DataResponse::new(user)))
}

/// create_user
///
/// [Admin Route] Creates an account with an explicit role (default `user`).
/// The email is stored lower-cased; a duplicate is a 409.
#[utoipa::path(
    post,
    path = "/admin/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "Created", body = User),
        (status = 409, description = "Email already in use")
    )
)]
pub async fn create_user(
    auth: AuthUser,
    State(state): State<AppState>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<DataResponse<User>>)> {
    let Json(payload) = payload?;
    let payload = payload.trimmed();
    payload.validate()?;

    let new_user = NewUser {
        name: payload.name,
        email: normalize_email(&payload.email),
        password_hash: hash_password(&payload.password)?,
        role: payload.role.unwrap_or_default(),
    };
    let user = state.repo.create_user(new_user).await?;

    tracing::info!(admin_id = %auth.id, user_id = %user.id, role = %user.role, "user created");
    Ok((
        StatusCode::CREATED,
        Json(DataResponse::with_message(user, "User created successfully")),
    ))
}

/// update_user
///
/// [Admin Route] Merges `name` and `email` into the stored profile.
#[utoipa::path(
    put,
    path = "/admin/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses((status = 200, body = User), (status = 404, description = "Not found"))
)]
pub async fn update_user(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> AppResult<Json<DataResponse<User>>> {
    let Path(id) = id?;
    let Json(payload) = payload?;
    let payload = payload.trimmed();
    payload.validate()?;

    let changes = UserChanges {
        name: payload.name,
        email: payload.email.as_deref().map(normalize_email),
    };
    let user = state
        .repo
        .update_user(id, changes)
        .await?
        .ok_or_else(user_not_found)?;

    Ok(Json(DataResponse::with_message(user, "User updated successfully")))
}

/// update_user_role
///
/// [Admin Route] Assigns a role. An admin may not demote themselves.
#[utoipa::path(
    put,
    path = "/admin/users/{id}/role",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UpdateRoleRequest,
    responses(
        (status = 200, body = User),
        (status = 400, description = "Invalid role or self-demotion"),
        (status = 404, description = "Not found")
    )
)]
pub async fn update_user_role(
    auth: AuthUser,
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdateRoleRequest>, JsonRejection>,
) -> AppResult<Json<DataResponse<User>>> {
    let Path(id) = id?;
    let Json(payload) = payload?;
    let role: Role = payload.role.trim().parse()?;

    guard_self_action(&auth, id, SelfAction::ChangeRole(role))?;

    let user = state
        .repo
        .set_user_role(id, role)
        .await?
        .ok_or_else(user_not_found)?;

    tracing::info!(admin_id = %auth.id, user_id = %id, %role, "user role changed");
    Ok(Json(DataResponse::with_message(
        user,
        format!("User role updated to {role}"),
    )))
}

/// toggle_user_status
///
/// [Admin Route] Flips `isActive`. An admin may not deactivate themselves.
#[utoipa::path(
    put,
    path = "/admin/users/{id}/status",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, body = User),
        (status = 400, description = "Self-deactivation"),
        (status = 404, description = "Not found")
    )
)]
pub async fn toggle_user_status(
    auth: AuthUser,
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> AppResult<Json<DataResponse<User>>> {
    let Path(id) = id?;
    let current = state.repo.get_user(id).await?.ok_or_else(user_not_found)?;
    let is_active = !current.is_active;

    guard_self_action(&auth, id, SelfAction::SetActive(is_active))?;

    let user = state
        .repo
        .set_user_active(id, is_active)
        .await?
        .ok_or_else(user_not_found)?;

    let verb = if is_active { "activated" } else { "deactivated" };
    tracing::info!(admin_id = %auth.id, user_id = %id, is_active, "user status toggled");
    Ok(Json(DataResponse::with_message(
        user,
        format!("User {verb} successfully"),
    )))
}

/// delete_user
///
/// [Admin Route] Permanently removes an account. An admin may not delete themselves.
#[utoipa::path(
    delete,
    path = "/admin/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, body = MessageResponse),
        (status = 400, description = "Self-deletion"),
        (status = 404, description = "Not found")
    )
)]
pub async fn delete_user(
    auth: AuthUser,
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> AppResult<Json<MessageResponse>> {
    let Path(id) = id?;
    guard_self_action(&auth, id, SelfAction::Delete)?;

    if !state.repo.delete_user(id).await? {
        return Err(user_not_found());
    }

    tracing::info!(admin_id = %auth.id, user_id = %id, "user deleted");
    Ok(Json(MessageResponse::new("User deleted successfully")))
}

/// get_admin_stats
///
/// [Moderator Route] Dashboard counters: users by role and activity plus
/// active content totals.
#[utoipa::path(
    get,
    path = "/admin/stats",
    responses((status = 200, description = "Dashboard statistics", body = AdminDashboardStats))
)]
pub async fn get_admin_stats(
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<AdminDashboardStats>>> {
    let stats = state.repo.get_stats().await?;
    Ok(Json(DataResponse::new(stats)))
}

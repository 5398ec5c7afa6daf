use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    AppState,
    auth::{AuthUser, issue_token, verify_password},
    error::{AppError, AppResult},
    models::{LoginRequest, LoginResponse, User, user::normalize_email},
};

/// MeResponse
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct MeResponse {
    pub success: bool,
    pub user: User,
}

fn invalid_credentials() -> AppError {
    AppError::unauthenticated("Invalid email or password")
}

/// login
///
/// [Public Route] Exchanges email and password for a bearer token.
///
/// Unknown email and wrong password share one message so the endpoint does not
/// reveal which accounts exist. Deactivated accounts are refused even with the
/// right password.
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token issued", body = LoginResponse),
        (status = 401, description = "Invalid credentials or deactivated account")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> AppResult<Json<LoginResponse>> {
    let Json(payload) = payload?;
    payload.validate()?;

    let email = normalize_email(&payload.email);
    let user = state
        .repo
        .find_user_by_email(&email)
        .await?
        .ok_or_else(invalid_credentials)?;

    if !verify_password(&payload.password, &user.password_hash)? {
        tracing::info!(user_id = %user.id, "login rejected: wrong password");
        return Err(invalid_credentials());
    }
    if !user.is_active {
        tracing::warn!(user_id = %user.id, "login rejected: account deactivated");
        return Err(AppError::unauthenticated("Account is deactivated"));
    }

    state.repo.record_login(user.id).await?;
    // Reload so the response carries the fresh lastLogin.
    let user = state.repo.get_user(user.id).await?.unwrap_or(user);
    let token = issue_token(&user, &state.config)?;

    tracing::info!(user_id = %user.id, role = %user.role, "user logged in");
    Ok(Json(LoginResponse {
        success: true,
        token,
        user,
    }))
}

/// get_me
///
/// [Authenticated Route] Returns the caller's own user record.
#[utoipa::path(
    get,
    path = "/auth/me",
    responses(
        (status = 200, description = "Current user", body = MeResponse),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn get_me(auth: AuthUser, State(state): State<AppState>) -> AppResult<Json<MeResponse>> {
    let user = state
        .repo
        .get_user(auth.id)
        .await?
        .ok_or_else(|| AppError::unauthenticated("User not found"))?;

    Ok(Json(MeResponse {
        success: true,
        user,
    }))
}

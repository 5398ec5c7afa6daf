//! Route guards.
//!
//! Routers compose these as middleware so that each chain reads as a sentence:
//! authenticate, then require a role. The self-protection rule for admin
//! endpoints lives here as well, next to the role checks it complements.

use axum::{extract::Request, middleware::Next, response::Response};
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    error::{AppError, AppResult},
    models::Role,
};

pub const ADMIN_ONLY: &[Role] = &[Role::Admin];
pub const MODERATORS: &[Role] = &[Role::Admin, Role::Moderator];
pub const CONTENT_MANAGERS: &[Role] = &[Role::Admin, Role::ContentManager];

/// authenticate
///
/// Runs the Auth Guard once and stores the resolved identity in the request
/// extensions for the role guards and handlers further down the chain.
/// Rejection happens in the `AuthUser` extractor (401).
pub async fn authenticate(auth: AuthUser, mut request: Request, next: Next) -> Response {
    request.extensions_mut().insert(auth);
    next.run(request).await
}

/// Pure role check used by every guard.
pub fn check_role(auth: &AuthUser, allowed: &[Role]) -> AppResult<()> {
    if allowed.contains(&auth.role) {
        return Ok(());
    }
    let required = allowed
        .iter()
        .map(Role::code)
        .collect::<Vec<_>>()
        .join(" or ");
    Err(AppError::forbidden(format!(
        "Access denied. Required role: {required}"
    )))
}

/// require_role
///
/// Generic Role Guard. Must run after `authenticate`; a request that reaches it
/// without an identity is treated as unauthenticated.
pub async fn require_role(
    allowed: &'static [Role],
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth = request
        .extensions()
        .get::<AuthUser>()
        .ok_or_else(|| AppError::unauthenticated("Authentication required"))?;

    if let Err(denied) = check_role(auth, allowed) {
        tracing::debug!(user_id = %auth.id, role = %auth.role, "role guard denied request");
        return Err(denied);
    }

    Ok(next.run(request).await)
}

pub async fn require_admin(request: Request, next: Next) -> Result<Response, AppError> {
    require_role(ADMIN_ONLY, request, next).await
}

pub async fn require_moderator(request: Request, next: Next) -> Result<Response, AppError> {
    require_role(MODERATORS, request, next).await
}

pub async fn require_content_manager(request: Request, next: Next) -> Result<Response, AppError> {
    require_role(CONTENT_MANAGERS, request, next).await
}

// --- Self-protection ---

/// SelfAction
///
/// A mutation an administrator may attempt against a user account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelfAction {
    ChangeRole(Role),
    SetActive(bool),
    Delete,
}

/// guard_self_action
///
/// An admin acting on their own account may not give up the admin role,
/// deactivate themselves or delete themselves. Checked before any mutation;
/// a violation is a 400 with an explicit message.
pub fn guard_self_action(actor: &AuthUser, target: Uuid, action: SelfAction) -> AppResult<()> {
    if actor.id != target {
        return Ok(());
    }

    let message = match action {
        SelfAction::ChangeRole(Role::Admin) | SelfAction::SetActive(true) => return Ok(()),
        SelfAction::ChangeRole(_) => "You cannot change your own admin role",
        SelfAction::SetActive(false) => "You cannot deactivate your own account",
        SelfAction::Delete => "You cannot delete your own account",
    };

    tracing::warn!(user_id = %actor.id, ?action, "blocked self-targeting admin action");
    Err(AppError::validation(message))
}

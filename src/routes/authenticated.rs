use crate::{AppState, handlers::auth, handlers::notifications};
use axum::{
    Router,
    routing::{get, patch},
};

/// Authenticated Router Module
///
/// Routes for any user who passed the Auth Guard, whatever their role. Each
/// handler scopes its work to the caller through the `AuthUser` extractor.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /auth/me
        .route("/auth/me", get(auth::get_me))
        // --- Notification feed ---
        // GET /notifications/my-notifications?page&limit
        // Visible notifications projected with the caller's read state.
        .route(
            "/notifications/my-notifications",
            get(notifications::my_notifications),
        )
        // PATCH /notifications/mark-read/{id}
        // 404 unless the notification is visible to the caller.
        .route(
            "/notifications/mark-read/{id}",
            patch(notifications::mark_read),
        )
        // PATCH /notifications/mark-all-read
        .route(
            "/notifications/mark-all-read",
            patch(notifications::mark_all_read),
        )
}

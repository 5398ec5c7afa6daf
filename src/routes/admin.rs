use crate::{
    AppState,
    guards::{require_admin, require_moderator},
    handlers::users,
};
use axum::{
    Router,
    middleware::from_fn,
    routing::{delete, get, post, put},
};

/// Admin Router Module
///
/// User management and the dashboard, nested under `/admin`.
///
/// Access Control:
/// Guards are attached per method. Moderators may read (`GET`); only admins
/// may create, edit, change roles, toggle status or delete. Registering the
/// same path twice merges the method routers, each keeping its own guard.
/// Self-targeting mutations are additionally checked in the handlers.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /admin/users (moderator) | POST /admin/users (admin)
        .route(
            "/users",
            get(users::list_users).route_layer(from_fn(require_moderator)),
        )
        .route(
            "/users",
            post(users::create_user).route_layer(from_fn(require_admin)),
        )
        // GET (moderator) | PUT, DELETE (admin) /admin/users/{id}
        .route(
            "/users/{id}",
            get(users::get_user).route_layer(from_fn(require_moderator)),
        )
        .route(
            "/users/{id}",
            put(users::update_user)
                .merge(delete(users::delete_user))
                .route_layer(from_fn(require_admin)),
        )
        // PUT /admin/users/{id}/role
        .route(
            "/users/{id}/role",
            put(users::update_user_role).route_layer(from_fn(require_admin)),
        )
        // PUT /admin/users/{id}/status
        // Toggles isActive.
        .route(
            "/users/{id}/status",
            put(users::toggle_user_status).route_layer(from_fn(require_admin)),
        )
        // GET /admin/stats
        .route(
            "/stats",
            get(users::get_admin_stats).route_layer(from_fn(require_moderator)),
        )
}

use crate::{
    AppState,
    guards::{require_admin, require_content_manager},
    handlers::{aptitude, core_concepts, notifications},
};
use axum::{
    Router,
    middleware::from_fn,
    routing::{delete, get, patch},
};

/// Aptitude Router
///
/// Nested under `/aptitude`. Every route requires admin or content-manager;
/// the permanent delete additionally requires admin.
pub fn aptitude_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(aptitude::list_questions).post(aptitude::create_question),
        )
        .route("/stats/overview", get(aptitude::question_stats))
        .route(
            "/bulk/status",
            patch(aptitude::bulk_update_question_status),
        )
        .route(
            "/{id}",
            get(aptitude::get_question)
                .put(aptitude::update_question)
                .delete(aptitude::delete_question),
        )
        .route(
            "/{id}/permanent",
            delete(aptitude::purge_question).route_layer(from_fn(require_admin)),
        )
        .route_layer(from_fn(require_content_manager))
}

/// Core Concept Router
///
/// Nested under `/core-concepts`. Same contract as the aptitude router,
/// without a permanent delete.
pub fn core_concept_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(core_concepts::list_concepts).post(core_concepts::create_concept),
        )
        .route("/stats/overview", get(core_concepts::concept_stats))
        .route(
            "/bulk/status",
            patch(core_concepts::bulk_update_concept_status),
        )
        .route(
            "/{id}",
            get(core_concepts::get_concept)
                .put(core_concepts::update_concept)
                .delete(core_concepts::delete_concept),
        )
        .route_layer(from_fn(require_content_manager))
}

/// Notification Management Router
///
/// Publishing, listing and retiring notifications. The per-user feed lives
/// in the authenticated router.
pub fn notification_admin_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/notifications",
            get(notifications::list_notifications).post(notifications::create_notification),
        )
        .route(
            "/notifications/{id}",
            delete(notifications::delete_notification),
        )
        .route_layer(from_fn(require_content_manager))
}

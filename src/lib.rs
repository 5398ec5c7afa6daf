use axum::{
    Json, Router,
    extract::FromRef,
    http::HeaderName,
    middleware,
    routing::get,
};
use utoipa::OpenApi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core application services and components.
pub mod auth;
pub mod config;
pub mod error;
pub mod guards;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod sequence;

// Routing segregated by guard chain (Public, Authenticated, Admin, Content).
pub mod routes;
use routes::{admin, authenticated, content, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use repository::{InMemoryRepository, PostgresRepository, RepositoryState};

use models::{NewUser, Role, user::normalize_email};

/// ApiDoc
///
/// Aggregates every `#[utoipa::path]` handler and `ToSchema` model into one
/// OpenAPI document, served as JSON at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::auth::login, handlers::auth::get_me,
        handlers::users::list_users, handlers::users::get_user, handlers::users::create_user,
        handlers::users::update_user, handlers::users::update_user_role,
        handlers::users::toggle_user_status, handlers::users::delete_user,
        handlers::users::get_admin_stats,
        handlers::aptitude::list_questions, handlers::aptitude::get_question,
        handlers::aptitude::create_question, handlers::aptitude::update_question,
        handlers::aptitude::delete_question, handlers::aptitude::purge_question,
        handlers::aptitude::question_stats, handlers::aptitude::bulk_update_question_status,
        handlers::core_concepts::list_concepts, handlers::core_concepts::get_concept,
        handlers::core_concepts::create_concept, handlers::core_concepts::update_concept,
        handlers::core_concepts::delete_concept, handlers::core_concepts::concept_stats,
        handlers::core_concepts::bulk_update_concept_status,
        handlers::notifications::my_notifications, handlers::notifications::mark_read,
        handlers::notifications::mark_all_read, handlers::notifications::create_notification,
        handlers::notifications::list_notifications,
        handlers::notifications::delete_notification,
    ),
    components(
        schemas(
            models::Role, models::User, models::UserSummary, models::CreateUserRequest,
            models::UpdateUserRequest, models::UpdateRoleRequest, models::LoginRequest,
            models::LoginResponse, models::AdminDashboardStats,
            models::AptitudeQuestion, models::QuestionOptions, models::AnswerOption,
            models::CreateAptitudeRequest, models::UpdateAptitudeRequest,
            models::CoreConcept, models::CreateConceptRequest, models::UpdateConceptRequest,
            models::Difficulty, models::ContentStatus, models::ContentStats,
            models::BulkStatusRequest, models::BulkStatusResponse,
            models::Notification, models::NotificationView, models::NotificationType,
            models::Priority, models::TargetAudience, models::Recipient,
            models::CreateNotificationRequest,
            handlers::MessageResponse, handlers::auth::MeResponse,
            handlers::notifications::MarkAllReadResponse,
        )
    ),
    tags(
        (name = "skill-sync", description = "Skill Sync placement preparation API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single, cloneable container of shared services handed to every request.
#[derive(Clone)]
pub struct AppState {
    /// Repository Layer: Postgres in deployments, in-memory for local runs and tests.
    pub repo: RepositoryState,
    /// Configuration: The loaded, immutable environment configuration.
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

// Let extractors such as `AuthUser` pull single components out of AppState.

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Assembles the routing tree, applies guards and the observability stack,
/// and registers the application state.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name constant for Request Correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Protected routes: the Auth Guard runs first, role guards inside it.
    let protected = Router::new()
        .merge(authenticated::authenticated_routes())
        .nest("/admin", admin::admin_routes())
        .nest("/aptitude", content::aptitude_routes())
        .nest("/core-concepts", content::core_concept_routes())
        .merge(content::notification_admin_routes())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            guards::authenticate,
        ));

    // 3. Base Router Assembly
    let base_router = Router::new()
        // Documentation: the generated OpenAPI document.
        .route("/api-docs/openapi.json", get(openapi_json))
        .merge(public::public_routes())
        .merge(protected)
        .with_state(state);

    // 4. Observability and Correlation Layers
    base_router
        .layer(
            ServiceBuilder::new()
                // 4a. Request ID Generation: a UUID for every incoming request.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                // 4b. Request Tracing: one span per request, tagged with the request ID.
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // 4c. Request ID Propagation: echo x-request-id back to the client.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 5. CORS Layer
        .layer(cors)
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// trace_span_logger
///
/// Builds the `TraceLayer` span: HTTP method, URI and the `x-request-id`
/// header, so every log line of one request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}

/// bootstrap_admin
///
/// Ensures the configured bootstrap account exists with the admin role.
/// An existing account with that email is promoted and reactivated; its
/// password is left untouched.
pub async fn bootstrap_admin(repo: &RepositoryState, config: &AppConfig) -> AppResult<()> {
    let Some(bootstrap) = &config.bootstrap_admin else {
        return Ok(());
    };
    let email = normalize_email(&bootstrap.email);

    match repo.find_user_by_email(&email).await? {
        Some(existing) => {
            if existing.role != Role::Admin {
                repo.set_user_role(existing.id, Role::Admin).await?;
            }
            if !existing.is_active {
                repo.set_user_active(existing.id, true).await?;
            }
            tracing::info!(user_id = %existing.id, "bootstrap admin already present");
        }
        None => {
            let user = repo
                .create_user(NewUser {
                    name: "Administrator".to_string(),
                    email,
                    password_hash: auth::hash_password(&bootstrap.password)?,
                    role: Role::Admin,
                })
                .await?;
            tracing::info!(user_id = %user.id, "bootstrap admin created");
        }
    }
    Ok(())
}

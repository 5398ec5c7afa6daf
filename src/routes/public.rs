use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints that run without the Auth Guard: the liveness probe and the
/// login exchange that issues bearer tokens.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Returns "ok" for monitoring and load balancer checks.
        .route("/health", get(handlers::health))
        // POST /auth/login
        // Verifies credentials and returns a signed token plus the user record.
        .route("/auth/login", post(handlers::auth::login))
}

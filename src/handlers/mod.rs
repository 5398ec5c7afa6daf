//! HTTP handlers, one module per resource.
//!
//! Handlers are thin: parse and validate input, call the repository, shape
//! the envelope. Authorization is already settled by the route guards by the
//! time a handler runs; only the admin self-protection rule is checked here
//! because it depends on the target id.

use serde::{Deserialize, Serialize};

pub mod aptitude;
pub mod auth;
pub mod core_concepts;
pub mod notifications;
pub mod users;

/// DataResponse
///
/// Envelope for single-record responses: `{success, message?, data}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub data: T,
}

impl<T> DataResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data,
        }
    }

    pub fn with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data,
        }
    }
}

/// MessageResponse
///
/// Envelope for actions that return no record.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

/// health
///
/// Liveness probe for load balancers and container orchestration.
#[utoipa::path(get, path = "/health", responses((status = 200, description = "Service is up")))]
pub async fn health() -> &'static str {
    "ok"
}

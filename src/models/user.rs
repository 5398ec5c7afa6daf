use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::models::{
    content::{UserSummary, parse_optional},
    pagination::{PageRequest, SortOrder, normalize_search},
    role::Role,
};

/// User
///
/// The canonical identity record. `password_hash` never leaves the server.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip)]
    pub password_hash: String,
    pub role: Role,
    pub is_active: bool,
    pub email_verified: bool,
    #[ts(type = "string | null")]
    pub last_login: Option<DateTime<Utc>>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
        }
    }
}

/// NewUser
///
/// A validated, hashed user ready for insertion.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

/// UserChanges
///
/// Profile fields an administrator may edit; `None` leaves the field untouched.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<String>,
}

/// Lower-cases and trims an email so lookups and uniqueness are case-insensitive.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

// --- Request payloads ---

/// CreateUserRequest
///
/// Input payload for `POST /admin/users`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate)]
#[ts(export)]
pub struct CreateUserRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "A valid email is required"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    #[serde(default)]
    pub role: Option<Role>,
}

/// UpdateUserRequest
///
/// Partial update payload for `PUT /admin/users/{id}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, ToSchema, Validate)]
#[ts(export)]
pub struct UpdateUserRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, message = "Name cannot be empty"))]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(email(message = "A valid email is required"))]
    pub email: Option<String>,
}

impl CreateUserRequest {
    /// Trims surrounding whitespace so blank values fail validation.
    pub fn trimmed(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            ..self
        }
    }
}

impl UpdateUserRequest {
    pub fn trimmed(self) -> Self {
        Self {
            name: self.name.map(|name| name.trim().to_string()),
            email: self.email.map(|email| email.trim().to_string()),
        }
    }
}

/// UpdateRoleRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UpdateRoleRequest {
    pub role: String,
}

/// LoginRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate)]
#[ts(export)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Email is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// LoginResponse
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginResponse {
    pub success: bool,
    pub token: String,
    pub user: User,
}

// --- Listing ---

/// UserListQuery
///
/// Raw query parameters for `GET /admin/users`. Kept as strings so that bad
/// values produce the standard 400 envelope.
#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct UserListQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    /// Case-insensitive match on name or email.
    pub search: Option<String>,
    pub role: Option<String>,
    pub is_active: Option<String>,
    /// One of `createdAt`, `name`, `email`, `lastLogin`.
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UserSortField {
    #[default]
    CreatedAt,
    Name,
    Email,
    LastLogin,
}

/// UserFilter
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub page: PageRequest,
    pub search: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
    pub sort_by: UserSortField,
    pub sort_order: SortOrder,
}

impl UserListQuery {
    pub fn into_filter(self) -> AppResult<UserFilter> {
        let sort_by = match self.sort_by.as_deref().map(str::trim) {
            None | Some("") | Some("createdAt") => UserSortField::CreatedAt,
            Some("name") => UserSortField::Name,
            Some("email") => UserSortField::Email,
            Some("lastLogin") => UserSortField::LastLogin,
            Some(other) => {
                return Err(AppError::validation(format!("Cannot sort users by '{other}'")));
            }
        };
        let is_active = match self.is_active.as_deref().map(str::trim) {
            None | Some("") => None,
            Some("true") => Some(true),
            Some("false") => Some(false),
            Some(_) => return Err(AppError::validation("isActive must be true or false")),
        };

        Ok(UserFilter {
            page: PageRequest::parse(self.page.as_deref(), self.limit.as_deref())?,
            search: normalize_search(self.search),
            role: parse_optional(self.role.as_deref())?,
            is_active,
            sort_by,
            sort_order: SortOrder::parse(self.sort_order.as_deref())?,
        })
    }
}

// --- Dashboard ---

/// AdminDashboardStats
///
/// Output schema for `GET /admin/stats`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct AdminDashboardStats {
    pub total_users: i64,
    pub active_users: i64,
    pub inactive_users: i64,
    pub admins: i64,
    pub moderators: i64,
    pub content_managers: i64,
    pub regular_users: i64,
    pub aptitude_questions: i64,
    pub core_concepts: i64,
    pub notifications: i64,
}

impl AdminDashboardStats {
    /// Accumulates one user into the role and activity counters.
    pub fn record_user(&mut self, role: Role, is_active: bool) {
        self.total_users += 1;
        if is_active {
            self.active_users += 1;
        } else {
            self.inactive_users += 1;
        }
        match role {
            Role::Admin => self.admins += 1,
            Role::Moderator => self.moderators += 1,
            Role::ContentManager => self.content_managers += 1,
            Role::User => self.regular_users += 1,
        }
    }
}

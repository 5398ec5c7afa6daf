use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::models::{content::UserSummary, content::parse_optional, role::Role};

/// NotificationType
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum NotificationType {
    #[default]
    Info,
    Success,
    Warning,
    Error,
    Announcement,
}

impl NotificationType {
    pub const ALL: [NotificationType; 5] = [
        NotificationType::Info,
        NotificationType::Success,
        NotificationType::Warning,
        NotificationType::Error,
        NotificationType::Announcement,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            NotificationType::Info => "info",
            NotificationType::Success => "success",
            NotificationType::Warning => "warning",
            NotificationType::Error => "error",
            NotificationType::Announcement => "announcement",
        }
    }
}

impl FromStr for NotificationType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NotificationType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| {
                AppError::validation(
                    "Invalid type. Must be info, success, warning, error, or announcement",
                )
            })
    }
}

/// Priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub const ALL: [Priority; 4] = [Priority::Low, Priority::Medium, Priority::High, Priority::Urgent];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }
}

impl FromStr for Priority {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Priority::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| AppError::validation("Invalid priority. Must be low, medium, high, or urgent"))
    }
}

/// TargetAudience
///
/// Implicit visibility group of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "kebab-case")]
#[ts(export)]
pub enum TargetAudience {
    #[default]
    All,
    Users,
    Admins,
    ContentManagers,
}

impl TargetAudience {
    pub const ALL: [TargetAudience; 4] = [
        TargetAudience::All,
        TargetAudience::Users,
        TargetAudience::Admins,
        TargetAudience::ContentManagers,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            TargetAudience::All => "all",
            TargetAudience::Users => "users",
            TargetAudience::Admins => "admins",
            TargetAudience::ContentManagers => "content-managers",
        }
    }

    /// The audience a role implicitly belongs to. Moderators have none and only
    /// see `all` notifications or ones that list them explicitly.
    pub const fn for_role(role: Role) -> Option<TargetAudience> {
        match role {
            Role::User => Some(TargetAudience::Users),
            Role::Admin => Some(TargetAudience::Admins),
            Role::ContentManager => Some(TargetAudience::ContentManagers),
            Role::Moderator => None,
        }
    }

    pub fn matches(&self, role: Role) -> bool {
        *self == TargetAudience::All || TargetAudience::for_role(role) == Some(*self)
    }
}

impl FromStr for TargetAudience {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TargetAudience::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| {
                AppError::validation(
                    "Invalid targetAudience. Must be all, users, admins, or content-managers",
                )
            })
    }
}

/// Recipient
///
/// Per-user read state of a notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Recipient {
    pub user_id: Uuid,
    pub read: bool,
    #[ts(type = "string | null")]
    pub read_at: Option<DateTime<Utc>>,
}

/// Notification
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Notification {
    pub id: Uuid,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub priority: Priority,
    pub target_audience: TargetAudience,
    pub recipients: Vec<Recipient>,
    pub created_by: Option<UserSummary>,
    #[ts(type = "string | null")]
    pub expires_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// Visible = active, not expired, and addressed to the caller either by
    /// audience or by explicit recipient entry.
    pub fn is_visible_to(&self, user_id: Uuid, role: Role, now: DateTime<Utc>) -> bool {
        self.is_active
            && self.expires_at.is_none_or(|expires| expires > now)
            && (self.target_audience.matches(role) || self.recipient(user_id).is_some())
    }

    pub fn recipient(&self, user_id: Uuid) -> Option<&Recipient> {
        self.recipients.iter().find(|r| r.user_id == user_id)
    }

    /// Inserts or updates the caller's entry as read. Returns `true` if the
    /// entry was previously unread or absent.
    pub fn mark_read(&mut self, user_id: Uuid, now: DateTime<Utc>) -> bool {
        match self.recipients.iter_mut().find(|r| r.user_id == user_id) {
            Some(entry) => {
                let was_unread = !entry.read;
                entry.read = true;
                entry.read_at = Some(now);
                was_unread
            }
            None => {
                self.recipients.push(Recipient {
                    user_id,
                    read: true,
                    read_at: Some(now),
                });
                true
            }
        }
    }

    /// Projects the notification for one user, defaulting to unread.
    pub fn view_for(&self, user_id: Uuid) -> NotificationView {
        let entry = self.recipient(user_id);
        NotificationView {
            id: self.id,
            title: self.title.clone(),
            message: self.message.clone(),
            notification_type: self.notification_type,
            priority: self.priority,
            target_audience: self.target_audience,
            created_by: self.created_by.clone(),
            expires_at: self.expires_at,
            created_at: self.created_at,
            read: entry.is_some_and(|r| r.read),
            read_at: entry.and_then(|r| r.read_at),
        }
    }
}

/// NotificationView
///
/// A notification as seen by one user, with that user's read state.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NotificationView {
    pub id: Uuid,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub priority: Priority,
    pub target_audience: TargetAudience,
    pub created_by: Option<UserSummary>,
    #[ts(type = "string | null")]
    pub expires_at: Option<DateTime<Utc>>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    pub read: bool,
    #[ts(type = "string | null")]
    pub read_at: Option<DateTime<Utc>>,
}

/// NewNotification
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub title: String,
    pub message: String,
    pub notification_type: NotificationType,
    pub priority: Priority,
    pub target_audience: TargetAudience,
    pub recipient_ids: Vec<Uuid>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_by: Uuid,
}

/// CreateNotificationRequest
///
/// Input payload for `POST /notifications`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CreateNotificationRequest {
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    #[validate(length(min = 1, message = "Message is required"))]
    pub message: String,
    #[serde(rename = "type")]
    pub notification_type: Option<String>,
    pub priority: Option<String>,
    pub target_audience: Option<String>,
    #[serde(default)]
    pub recipient_ids: Vec<Uuid>,
    #[ts(type = "string | null")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl CreateNotificationRequest {
    pub fn into_new(self, created_by: Uuid, now: DateTime<Utc>) -> AppResult<NewNotification> {
        // Trim first so whitespace-only text fails the length checks.
        let request = Self {
            title: self.title.trim().to_string(),
            message: self.message.trim().to_string(),
            ..self
        };
        request.validate()?;
        if request.expires_at.is_some_and(|expires| expires <= now) {
            return Err(AppError::validation("expiresAt must be in the future"));
        }

        let mut recipient_ids = request.recipient_ids;
        recipient_ids.sort();
        recipient_ids.dedup();

        Ok(NewNotification {
            title: request.title,
            message: request.message,
            notification_type: parse_optional(request.notification_type.as_deref())?
                .unwrap_or_default(),
            priority: parse_optional(request.priority.as_deref())?.unwrap_or_default(),
            target_audience: parse_optional(request.target_audience.as_deref())?
                .unwrap_or_default(),
            recipient_ids,
            expires_at: request.expires_at,
            created_by,
        })
    }
}

/// MyNotificationsResponse
///
/// The paginated feed of `GET /notifications/my-notifications`. `unread_count`
/// counts unread items in this page only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MyNotificationsResponse {
    pub success: bool,
    pub items: Vec<NotificationView>,
    pub unread_count: usize,
    pub total_pages: i64,
    pub current_page: u32,
    pub total: i64,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn notification(audience: TargetAudience) -> Notification {
        Notification {
            id: Uuid::new_v4(),
            title: "Mock test".into(),
            message: "Starts at 10".into(),
            notification_type: NotificationType::Info,
            priority: Priority::Medium,
            target_audience: audience,
            recipients: vec![],
            created_by: None,
            expires_at: None,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_audience_matching() {
        assert!(TargetAudience::All.matches(Role::Moderator));
        assert!(TargetAudience::Users.matches(Role::User));
        assert!(!TargetAudience::Users.matches(Role::Admin));
        assert!(TargetAudience::ContentManagers.matches(Role::ContentManager));
        assert!(!TargetAudience::Admins.matches(Role::Moderator));
    }

    #[test]
    fn test_explicit_recipient_sees_other_audience() {
        let user = Uuid::new_v4();
        let mut n = notification(TargetAudience::Admins);
        assert!(!n.is_visible_to(user, Role::User, Utc::now()));

        n.recipients.push(Recipient {
            user_id: user,
            read: false,
            read_at: None,
        });
        assert!(n.is_visible_to(user, Role::User, Utc::now()));
    }

    #[test]
    fn test_expired_and_inactive_are_hidden() {
        let user = Uuid::new_v4();
        let now = Utc::now();

        let mut expired = notification(TargetAudience::All);
        expired.expires_at = Some(now - Duration::minutes(1));
        assert!(!expired.is_visible_to(user, Role::User, now));

        let mut inactive = notification(TargetAudience::All);
        inactive.is_active = false;
        assert!(!inactive.is_visible_to(user, Role::User, now));
    }

    #[test]
    fn test_mark_read_is_idempotent() {
        let user = Uuid::new_v4();
        let mut n = notification(TargetAudience::All);
        assert!(!n.view_for(user).read);

        assert!(n.mark_read(user, Utc::now()));
        assert!(!n.mark_read(user, Utc::now()));
        assert_eq!(n.recipients.len(), 1);

        let view = n.view_for(user);
        assert!(view.read);
        assert!(view.read_at.is_some());
    }

    #[test]
    fn test_create_request_defaults_and_past_expiry() {
        let now = Utc::now();
        let new = CreateNotificationRequest {
            title: "Hello".into(),
            message: "World".into(),
            ..Default::default()
        }
        .into_new(Uuid::new_v4(), now)
        .unwrap();
        assert_eq!(new.target_audience, TargetAudience::All);
        assert_eq!(new.priority, Priority::Medium);

        let past = CreateNotificationRequest {
            title: "Hello".into(),
            message: "World".into(),
            expires_at: Some(now - Duration::hours(1)),
            ..Default::default()
        };
        assert!(past.into_new(Uuid::new_v4(), now).is_err());
    }
}

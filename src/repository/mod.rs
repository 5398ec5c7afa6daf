use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        AdminDashboardStats, AptitudeDraft, AptitudeQuestion, ContentFilter, ContentStats,
        ContentStatus, CoreConcept, CoreConceptDraft, NewNotification, NewUser, Notification,
        NotificationView, Page, PageRequest, Role, User, UserChanges, UserFilter,
    },
};

pub mod memory;
pub mod postgres;

pub use memory::InMemoryRepository;
pub use postgres::PostgresRepository;

/// Repository Trait
///
/// The persistence contract behind every handler. Lookups by id on numbered
/// content only return active rows; the soft-delete flag is enforced here, not
/// by the callers.
///
/// **Send + Sync + async_trait** keep `Arc<dyn Repository>` shareable across
/// Axum's task boundaries.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    async fn get_user(&self, id: Uuid) -> AppResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>>;
    async fn list_users(&self, filter: &UserFilter) -> AppResult<Page<User>>;
    // Duplicate email surfaces as `AppError::Conflict`.
    async fn create_user(&self, user: NewUser) -> AppResult<User>;
    async fn update_user(&self, id: Uuid, changes: UserChanges) -> AppResult<Option<User>>;
    async fn set_user_role(&self, id: Uuid, role: Role) -> AppResult<Option<User>>;
    async fn set_user_active(&self, id: Uuid, is_active: bool) -> AppResult<Option<User>>;
    // Hard delete. Returns false when the user did not exist.
    async fn delete_user(&self, id: Uuid) -> AppResult<bool>;
    async fn record_login(&self, id: Uuid) -> AppResult<()>;
    async fn get_stats(&self) -> AppResult<AdminDashboardStats>;

    // --- Aptitude questions ---
    async fn list_aptitude(&self, filter: &ContentFilter) -> AppResult<Page<AptitudeQuestion>>;
    async fn get_aptitude(&self, id: Uuid) -> AppResult<Option<AptitudeQuestion>>;
    /// Assigns the next question number atomically.
    async fn create_aptitude(
        &self,
        draft: AptitudeDraft,
        created_by: Uuid,
    ) -> AppResult<AptitudeQuestion>;
    async fn update_aptitude(
        &self,
        id: Uuid,
        draft: AptitudeDraft,
        updated_by: Uuid,
    ) -> AppResult<Option<AptitudeQuestion>>;
    async fn soft_delete_aptitude(&self, id: Uuid, deleted_by: Uuid) -> AppResult<bool>;
    /// Physically removes a question, active or not.
    async fn purge_aptitude(&self, id: Uuid) -> AppResult<bool>;
    async fn bulk_update_aptitude_status(
        &self,
        ids: &[Uuid],
        status: ContentStatus,
        updated_by: Uuid,
    ) -> AppResult<u64>;
    async fn aptitude_stats(&self) -> AppResult<ContentStats>;

    // --- Core concepts ---
    async fn list_concepts(&self, filter: &ContentFilter) -> AppResult<Page<CoreConcept>>;
    async fn get_concept(&self, id: Uuid) -> AppResult<Option<CoreConcept>>;
    async fn create_concept(
        &self,
        draft: CoreConceptDraft,
        created_by: Uuid,
    ) -> AppResult<CoreConcept>;
    async fn update_concept(
        &self,
        id: Uuid,
        draft: CoreConceptDraft,
        updated_by: Uuid,
    ) -> AppResult<Option<CoreConcept>>;
    async fn soft_delete_concept(&self, id: Uuid, deleted_by: Uuid) -> AppResult<bool>;
    async fn bulk_update_concept_status(
        &self,
        ids: &[Uuid],
        status: ContentStatus,
        updated_by: Uuid,
    ) -> AppResult<u64>;
    async fn concept_stats(&self) -> AppResult<ContentStats>;

    // --- Notifications ---
    async fn create_notification(&self, new: NewNotification) -> AppResult<Notification>;
    // Active notifications, newest first, with their full recipient lists.
    async fn list_notifications(&self, page: PageRequest) -> AppResult<Page<Notification>>;
    async fn soft_delete_notification(&self, id: Uuid) -> AppResult<bool>;
    // The caller's visible feed, projected with the caller's read state.
    async fn notifications_for(
        &self,
        user_id: Uuid,
        role: Role,
        page: PageRequest,
    ) -> AppResult<Page<NotificationView>>;
    // Upserts the caller's entry as read. False when not visible to the caller.
    async fn mark_notification_read(
        &self,
        notification_id: Uuid,
        user_id: Uuid,
        role: Role,
    ) -> AppResult<bool>;
    // Returns how many visible notifications went from unread to read.
    async fn mark_all_notifications_read(&self, user_id: Uuid, role: Role) -> AppResult<u64>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

/// Domain and wire types.
///
/// Structs that cross the HTTP boundary derive `TS` (exported to the React
/// frontend as TypeScript bindings) and `ToSchema` (OpenAPI). JSON field names
/// are camelCase throughout.
pub mod aptitude;
pub mod concept;
pub mod content;
pub mod notification;
pub mod pagination;
pub mod role;
pub mod user;

pub use aptitude::{
    AnswerOption, AptitudeDraft, AptitudeListQuery, AptitudeQuestion, CreateAptitudeRequest,
    QuestionOptions, UpdateAptitudeRequest,
};
pub use concept::{
    ConceptListQuery, CoreConcept, CoreConceptDraft, CreateConceptRequest, UpdateConceptRequest,
};
pub use content::{
    BulkStatusRequest, BulkStatusResponse, ContentFilter, ContentSortField, ContentStats,
    ContentStatus, Difficulty, UserSummary,
};
pub use notification::{
    CreateNotificationRequest, MyNotificationsResponse, NewNotification, Notification,
    NotificationType, NotificationView, Priority, Recipient, TargetAudience,
};
pub use pagination::{Page, PageRequest, PaginatedResponse, SortOrder};
pub use role::Role;
pub use user::{
    AdminDashboardStats, CreateUserRequest, LoginRequest, LoginResponse, NewUser,
    UpdateRoleRequest, UpdateUserRequest, User, UserChanges, UserFilter, UserListQuery,
    UserSortField,
};

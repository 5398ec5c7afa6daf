use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::{
    cmp::Ordering,
    collections::{BTreeSet, HashMap},
};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::Repository;
use crate::{
    error::{AppError, AppResult},
    models::{
        AdminDashboardStats, AptitudeDraft, AptitudeQuestion, ContentFilter, ContentSortField,
        ContentStats, ContentStatus, CoreConcept, CoreConceptDraft, Difficulty, NewNotification,
        NewUser, Notification, NotificationView, Page, PageRequest, Recipient, Role, SortOrder,
        User, UserChanges, UserFilter, UserSortField, UserSummary,
    },
    sequence::{SequenceCounters, SequenceKind},
};

/// InMemoryRepository
///
/// A process-local implementation of `Repository`. It honours the same
/// contracts as the Postgres store (soft delete, atomic sequence numbers,
/// unique emails) and backs local runs without `DATABASE_URL` and the test
/// suite. All state sits behind one `RwLock`, so every operation is atomic.
#[derive(Default)]
pub struct InMemoryRepository {
    store: RwLock<Store>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a fully formed user, bypassing email normalization. Test and
    /// seeding helper.
    pub async fn insert_user(&self, user: User) -> User {
        let mut store = self.store.write().await;
        store.users.insert(user.id, user.clone());
        user
    }

    /// Total stored questions including soft-deleted ones.
    pub async fn stored_aptitude_count(&self) -> usize {
        self.store.read().await.aptitude.len()
    }

    /// Whether a question row exists at all, regardless of its active flag.
    pub async fn aptitude_exists(&self, id: Uuid) -> bool {
        self.store.read().await.aptitude.contains_key(&id)
    }
}

#[derive(Debug, Clone)]
struct ContentRecord<D> {
    id: Uuid,
    number: i64,
    draft: D,
    created_by: Uuid,
    updated_by: Option<Uuid>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Field access shared by the two numbered content drafts.
trait ContentBody: Clone {
    fn matches_search(&self, needle: &str) -> bool;
    fn difficulty(&self) -> Difficulty;
    fn status(&self) -> ContentStatus;
    fn set_status(&mut self, status: ContentStatus);
    fn category(&self) -> &str;
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

impl ContentBody for AptitudeDraft {
    fn matches_search(&self, needle: &str) -> bool {
        contains_ci(&self.question, needle)
            || contains_ci(&self.topic, needle)
            || self
                .explanation
                .as_deref()
                .is_some_and(|e| contains_ci(e, needle))
    }
    fn difficulty(&self) -> Difficulty {
        self.difficulty
    }
    fn status(&self) -> ContentStatus {
        self.status
    }
    fn set_status(&mut self, status: ContentStatus) {
        self.status = status;
    }
    fn category(&self) -> &str {
        &self.topic
    }
}

impl ContentBody for CoreConceptDraft {
    fn matches_search(&self, needle: &str) -> bool {
        contains_ci(&self.title, needle)
            || contains_ci(&self.description, needle)
            || contains_ci(&self.subject, needle)
    }
    fn difficulty(&self) -> Difficulty {
        self.difficulty
    }
    fn status(&self) -> ContentStatus {
        self.status
    }
    fn set_status(&mut self, status: ContentStatus) {
        self.status = status;
    }
    fn category(&self) -> &str {
        &self.subject
    }
}

#[derive(Debug, Clone)]
struct NotificationRecord {
    notification: Notification,
    created_by: Uuid,
}

#[derive(Default)]
struct Store {
    users: HashMap<Uuid, User>,
    aptitude: HashMap<Uuid, ContentRecord<AptitudeDraft>>,
    concepts: HashMap<Uuid, ContentRecord<CoreConceptDraft>>,
    notifications: HashMap<Uuid, NotificationRecord>,
    counters: SequenceCounters,
}

impl Store {
    fn summary(&self, id: Option<Uuid>) -> Option<UserSummary> {
        id.and_then(|id| self.users.get(&id)).map(User::summary)
    }

    fn email_taken(&self, email: &str, except: Option<Uuid>) -> bool {
        self.users
            .values()
            .any(|u| u.email == email && Some(u.id) != except)
    }

    fn aptitude_view(&self, r: &ContentRecord<AptitudeDraft>) -> AptitudeQuestion {
        let d = &r.draft;
        AptitudeQuestion {
            id: r.id,
            question_number: r.number,
            question: d.question.clone(),
            options: d.options.clone(),
            correct_answer: d.correct_answer,
            explanation: d.explanation.clone(),
            difficulty: d.difficulty,
            topic: d.topic.clone(),
            tags: d.tags.clone(),
            status: d.status,
            created_by: self.summary(Some(r.created_by)),
            updated_by: self.summary(r.updated_by),
            is_active: r.is_active,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }

    fn concept_view(&self, r: &ContentRecord<CoreConceptDraft>) -> CoreConcept {
        let d = &r.draft;
        CoreConcept {
            id: r.id,
            concept_number: r.number,
            title: d.title.clone(),
            subject: d.subject.clone(),
            description: d.description.clone(),
            content: d.content.clone(),
            difficulty: d.difficulty,
            tags: d.tags.clone(),
            status: d.status,
            created_by: self.summary(Some(r.created_by)),
            updated_by: self.summary(r.updated_by),
            is_active: r.is_active,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }

    fn notification_view(&self, record: &NotificationRecord) -> Notification {
        Notification {
            created_by: self.summary(Some(record.created_by)),
            ..record.notification.clone()
        }
    }
}

// --- Generic numbered-content helpers ---

fn insert_content<D>(
    records: &mut HashMap<Uuid, ContentRecord<D>>,
    counters: &mut SequenceCounters,
    kind: SequenceKind,
    draft: D,
    created_by: Uuid,
) -> AppResult<Uuid> {
    // Seed from every stored number, soft-deleted rows included.
    let highest = || records.values().map(|r| r.number).max().unwrap_or(0);
    let number = counters.next(kind, highest);
    if records.values().any(|r| r.number == number) {
        return Err(kind.conflict());
    }

    let now = Utc::now();
    let id = Uuid::new_v4();
    records.insert(
        id,
        ContentRecord {
            id,
            number,
            draft,
            created_by,
            updated_by: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        },
    );
    Ok(id)
}

fn compare_content<D: ContentBody>(
    a: &ContentRecord<D>,
    b: &ContentRecord<D>,
    field: ContentSortField,
) -> Ordering {
    let primary = match field {
        ContentSortField::CreatedAt => a.created_at.cmp(&b.created_at),
        ContentSortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
        ContentSortField::Number => Ordering::Equal,
        ContentSortField::Difficulty => a
            .draft
            .difficulty()
            .as_str()
            .cmp(b.draft.difficulty().as_str()),
        ContentSortField::Category => a.draft.category().cmp(b.draft.category()),
    };
    primary.then(a.number.cmp(&b.number))
}

fn select_content<'a, D: ContentBody>(
    records: &'a HashMap<Uuid, ContentRecord<D>>,
    filter: &ContentFilter,
) -> Vec<&'a ContentRecord<D>> {
    let needle = filter.search.as_deref().map(str::to_lowercase);
    let mut selected: Vec<_> = records
        .values()
        .filter(|r| r.is_active)
        .filter(|r| filter.difficulty.is_none_or(|d| r.draft.difficulty() == d))
        .filter(|r| filter.status.is_none_or(|s| r.draft.status() == s))
        .filter(|r| {
            filter
                .category
                .as_deref()
                .is_none_or(|c| r.draft.category() == c)
        })
        .filter(|r| {
            needle
                .as_deref()
                .is_none_or(|n| r.draft.matches_search(n))
        })
        .collect();

    selected.sort_by(|a, b| {
        let ordering = compare_content(a, b, filter.sort_by);
        match filter.sort_order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    });
    selected
}

fn content_stats<D: ContentBody>(records: &HashMap<Uuid, ContentRecord<D>>) -> ContentStats {
    let mut stats = ContentStats::default();
    for r in records.values().filter(|r| r.is_active) {
        stats.record(r.draft.status(), r.draft.difficulty(), r.draft.category());
    }
    stats
}

fn bulk_status<D: ContentBody>(
    records: &mut HashMap<Uuid, ContentRecord<D>>,
    ids: &[Uuid],
    status: ContentStatus,
    updated_by: Uuid,
) -> u64 {
    let now = Utc::now();
    let unique: BTreeSet<Uuid> = ids.iter().copied().collect();
    let mut modified = 0;
    for id in unique {
        if let Some(r) = records.get_mut(&id).filter(|r| r.is_active) {
            r.draft.set_status(status);
            r.updated_by = Some(updated_by);
            r.updated_at = now;
            modified += 1;
        }
    }
    modified
}

fn replace_draft<D>(
    records: &mut HashMap<Uuid, ContentRecord<D>>,
    id: Uuid,
    draft: D,
    updated_by: Uuid,
) -> bool {
    match records.get_mut(&id).filter(|r| r.is_active) {
        Some(r) => {
            r.draft = draft;
            r.updated_by = Some(updated_by);
            r.updated_at = Utc::now();
            true
        }
        None => false,
    }
}

fn soft_delete<D>(records: &mut HashMap<Uuid, ContentRecord<D>>, id: Uuid, by: Uuid) -> bool {
    match records.get_mut(&id).filter(|r| r.is_active) {
        Some(r) => {
            r.is_active = false;
            r.updated_by = Some(by);
            r.updated_at = Utc::now();
            true
        }
        None => false,
    }
}

fn compare_users(a: &User, b: &User, field: UserSortField) -> Ordering {
    let primary = match field {
        UserSortField::CreatedAt => Ordering::Equal,
        UserSortField::Name => a.name.cmp(&b.name),
        UserSortField::Email => a.email.cmp(&b.email),
        UserSortField::LastLogin => a.last_login.cmp(&b.last_login),
    };
    primary
        .then(a.created_at.cmp(&b.created_at))
        .then(a.id.cmp(&b.id))
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn get_user(&self, id: Uuid) -> AppResult<Option<User>> {
        Ok(self.store.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let store = self.store.read().await;
        Ok(store.users.values().find(|u| u.email == email).cloned())
    }

    async fn list_users(&self, filter: &UserFilter) -> AppResult<Page<User>> {
        let store = self.store.read().await;
        let needle = filter.search.as_deref().map(str::to_lowercase);
        let mut users: Vec<User> = store
            .users
            .values()
            .filter(|u| filter.role.is_none_or(|role| u.role == role))
            .filter(|u| filter.is_active.is_none_or(|active| u.is_active == active))
            .filter(|u| {
                needle
                    .as_deref()
                    .is_none_or(|n| contains_ci(&u.name, n) || contains_ci(&u.email, n))
            })
            .cloned()
            .collect();

        users.sort_by(|a, b| {
            let ordering = compare_users(a, b, filter.sort_by);
            match filter.sort_order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        });
        Ok(Page::slice(users, filter.page))
    }

    async fn create_user(&self, new: NewUser) -> AppResult<User> {
        let mut store = self.store.write().await;
        if store.email_taken(&new.email, None) {
            return Err(AppError::conflict("User with this email already exists"));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            name: new.name,
            email: new.email,
            password_hash: new.password_hash,
            role: new.role,
            is_active: true,
            email_verified: false,
            last_login: None,
            created_at: now,
            updated_at: now,
        };
        store.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update_user(&self, id: Uuid, changes: UserChanges) -> AppResult<Option<User>> {
        let mut store = self.store.write().await;
        if let Some(email) = changes.email.as_deref() {
            if store.email_taken(email, Some(id)) {
                return Err(AppError::conflict("User with this email already exists"));
            }
        }

        Ok(store.users.get_mut(&id).map(|user| {
            if let Some(name) = changes.name {
                user.name = name;
            }
            if let Some(email) = changes.email {
                user.email = email;
            }
            user.updated_at = Utc::now();
            user.clone()
        }))
    }

    async fn set_user_role(&self, id: Uuid, role: Role) -> AppResult<Option<User>> {
        let mut store = self.store.write().await;
        Ok(store.users.get_mut(&id).map(|user| {
            user.role = role;
            user.updated_at = Utc::now();
            user.clone()
        }))
    }

    async fn set_user_active(&self, id: Uuid, is_active: bool) -> AppResult<Option<User>> {
        let mut store = self.store.write().await;
        Ok(store.users.get_mut(&id).map(|user| {
            user.is_active = is_active;
            user.updated_at = Utc::now();
            user.clone()
        }))
    }

    async fn delete_user(&self, id: Uuid) -> AppResult<bool> {
        let mut store = self.store.write().await;
        let removed = store.users.remove(&id).is_some();
        if removed {
            for record in store.notifications.values_mut() {
                record.notification.recipients.retain(|r| r.user_id != id);
            }
        }
        Ok(removed)
    }

    async fn record_login(&self, id: Uuid) -> AppResult<()> {
        let mut store = self.store.write().await;
        if let Some(user) = store.users.get_mut(&id) {
            user.last_login = Some(Utc::now());
        }
        Ok(())
    }

    async fn get_stats(&self) -> AppResult<AdminDashboardStats> {
        let store = self.store.read().await;
        let mut stats = AdminDashboardStats::default();
        for user in store.users.values() {
            stats.record_user(user.role, user.is_active);
        }
        stats.aptitude_questions = store.aptitude.values().filter(|r| r.is_active).count() as i64;
        stats.core_concepts = store.concepts.values().filter(|r| r.is_active).count() as i64;
        stats.notifications = store
            .notifications
            .values()
            .filter(|r| r.notification.is_active)
            .count() as i64;
        Ok(stats)
    }

    // --- Aptitude questions ---

    async fn list_aptitude(&self, filter: &ContentFilter) -> AppResult<Page<AptitudeQuestion>> {
        let store = self.store.read().await;
        let items = select_content(&store.aptitude, filter)
            .into_iter()
            .map(|r| store.aptitude_view(r))
            .collect();
        Ok(Page::slice(items, filter.page))
    }

    async fn get_aptitude(&self, id: Uuid) -> AppResult<Option<AptitudeQuestion>> {
        let store = self.store.read().await;
        Ok(store
            .aptitude
            .get(&id)
            .filter(|r| r.is_active)
            .map(|r| store.aptitude_view(r)))
    }

    async fn create_aptitude(
        &self,
        draft: AptitudeDraft,
        created_by: Uuid,
    ) -> AppResult<AptitudeQuestion> {
        let mut guard = self.store.write().await;
        let store = &mut *guard;
        let id = insert_content(
            &mut store.aptitude,
            &mut store.counters,
            SequenceKind::AptitudeQuestion,
            draft,
            created_by,
        )?;
        let record = &store.aptitude[&id];
        Ok(store.aptitude_view(record))
    }

    async fn update_aptitude(
        &self,
        id: Uuid,
        draft: AptitudeDraft,
        updated_by: Uuid,
    ) -> AppResult<Option<AptitudeQuestion>> {
        let mut store = self.store.write().await;
        if !replace_draft(&mut store.aptitude, id, draft, updated_by) {
            return Ok(None);
        }
        Ok(store.aptitude.get(&id).map(|r| store.aptitude_view(r)))
    }

    async fn soft_delete_aptitude(&self, id: Uuid, deleted_by: Uuid) -> AppResult<bool> {
        let mut store = self.store.write().await;
        Ok(soft_delete(&mut store.aptitude, id, deleted_by))
    }

    async fn purge_aptitude(&self, id: Uuid) -> AppResult<bool> {
        Ok(self.store.write().await.aptitude.remove(&id).is_some())
    }

    async fn bulk_update_aptitude_status(
        &self,
        ids: &[Uuid],
        status: ContentStatus,
        updated_by: Uuid,
    ) -> AppResult<u64> {
        let mut store = self.store.write().await;
        Ok(bulk_status(&mut store.aptitude, ids, status, updated_by))
    }

    async fn aptitude_stats(&self) -> AppResult<ContentStats> {
        Ok(content_stats(&self.store.read().await.aptitude))
    }

    // --- Core concepts ---

    async fn list_concepts(&self, filter: &ContentFilter) -> AppResult<Page<CoreConcept>> {
        let store = self.store.read().await;
        let items = select_content(&store.concepts, filter)
            .into_iter()
            .map(|r| store.concept_view(r))
            .collect();
        Ok(Page::slice(items, filter.page))
    }

    async fn get_concept(&self, id: Uuid) -> AppResult<Option<CoreConcept>> {
        let store = self.store.read().await;
        Ok(store
            .concepts
            .get(&id)
            .filter(|r| r.is_active)
            .map(|r| store.concept_view(r)))
    }

    async fn create_concept(
        &self,
        draft: CoreConceptDraft,
        created_by: Uuid,
    ) -> AppResult<CoreConcept> {
        let mut guard = self.store.write().await;
        let store = &mut *guard;
        let id = insert_content(
            &mut store.concepts,
            &mut store.counters,
            SequenceKind::CoreConcept,
            draft,
            created_by,
        )?;
        let record = &store.concepts[&id];
        Ok(store.concept_view(record))
    }

    async fn update_concept(
        &self,
        id: Uuid,
        draft: CoreConceptDraft,
        updated_by: Uuid,
    ) -> AppResult<Option<CoreConcept>> {
        let mut store = self.store.write().await;
        if !replace_draft(&mut store.concepts, id, draft, updated_by) {
            return Ok(None);
        }
        Ok(store.concepts.get(&id).map(|r| store.concept_view(r)))
    }

    async fn soft_delete_concept(&self, id: Uuid, deleted_by: Uuid) -> AppResult<bool> {
        let mut store = self.store.write().await;
        Ok(soft_delete(&mut store.concepts, id, deleted_by))
    }

    async fn bulk_update_concept_status(
        &self,
        ids: &[Uuid],
        status: ContentStatus,
        updated_by: Uuid,
    ) -> AppResult<u64> {
        let mut store = self.store.write().await;
        Ok(bulk_status(&mut store.concepts, ids, status, updated_by))
    }

    async fn concept_stats(&self) -> AppResult<ContentStats> {
        Ok(content_stats(&self.store.read().await.concepts))
    }

    // --- Notifications ---

    async fn create_notification(&self, new: NewNotification) -> AppResult<Notification> {
        let mut store = self.store.write().await;
        let recipients = new
            .recipient_ids
            .iter()
            .filter(|id| store.users.contains_key(id))
            .map(|&user_id| Recipient {
                user_id,
                read: false,
                read_at: None,
            })
            .collect();

        let record = NotificationRecord {
            notification: Notification {
                id: Uuid::new_v4(),
                title: new.title,
                message: new.message,
                notification_type: new.notification_type,
                priority: new.priority,
                target_audience: new.target_audience,
                recipients,
                created_by: None,
                expires_at: new.expires_at,
                is_active: true,
                created_at: Utc::now(),
            },
            created_by: new.created_by,
        };
        let view = store.notification_view(&record);
        store.notifications.insert(view.id, record);
        Ok(view)
    }

    async fn list_notifications(&self, page: PageRequest) -> AppResult<Page<Notification>> {
        let store = self.store.read().await;
        let mut active: Vec<Notification> = store
            .notifications
            .values()
            .filter(|r| r.notification.is_active)
            .map(|r| store.notification_view(r))
            .collect();
        active.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(Page::slice(active, page))
    }

    async fn soft_delete_notification(&self, id: Uuid) -> AppResult<bool> {
        let mut store = self.store.write().await;
        Ok(match store
            .notifications
            .get_mut(&id)
            .filter(|r| r.notification.is_active)
        {
            Some(record) => {
                record.notification.is_active = false;
                true
            }
            None => false,
        })
    }

    async fn notifications_for(
        &self,
        user_id: Uuid,
        role: Role,
        page: PageRequest,
    ) -> AppResult<Page<NotificationView>> {
        let store = self.store.read().await;
        let now = Utc::now();
        let mut visible: Vec<Notification> = store
            .notifications
            .values()
            .filter(|r| r.notification.is_visible_to(user_id, role, now))
            .map(|r| store.notification_view(r))
            .collect();
        visible.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(Page::slice(visible, page).map(|n| n.view_for(user_id)))
    }

    async fn mark_notification_read(
        &self,
        notification_id: Uuid,
        user_id: Uuid,
        role: Role,
    ) -> AppResult<bool> {
        let mut store = self.store.write().await;
        let now = Utc::now();
        match store
            .notifications
            .get_mut(&notification_id)
            .filter(|r| r.notification.is_visible_to(user_id, role, now))
        {
            Some(record) => {
                record.notification.mark_read(user_id, now);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn mark_all_notifications_read(&self, user_id: Uuid, role: Role) -> AppResult<u64> {
        let mut store = self.store.write().await;
        let now = Utc::now();
        let mut modified = 0;
        for record in store.notifications.values_mut() {
            let notification = &mut record.notification;
            let unread = !notification.recipient(user_id).is_some_and(|r| r.read);
            if unread && notification.is_visible_to(user_id, role, now) {
                notification.mark_read(user_id, now);
                modified += 1;
            }
        }
        Ok(modified)
    }
}

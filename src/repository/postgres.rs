use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{
    FromRow, PgConnection, PgPool, Postgres, postgres::PgRow, query_builder::QueryBuilder,
    types::Json,
};
use std::{collections::HashMap, str::FromStr};
use uuid::Uuid;

use super::Repository;
use crate::{
    error::{AppError, AppResult},
    models::{
        AdminDashboardStats, AptitudeDraft, AptitudeQuestion, ContentFilter, ContentSortField,
        ContentStats, ContentStatus, CoreConcept, CoreConceptDraft, NewNotification, NewUser,
        Notification, NotificationView, Page, PageRequest, QuestionOptions, Recipient, Role,
        SortOrder, TargetAudience, User, UserChanges, UserFilter, UserSortField, UserSummary,
    },
    sequence::SequenceKind,
};

/// PostgresRepository
///
/// The concrete implementation of the `Repository` trait, backed by PostgreSQL.
/// Queries are built at runtime with `QueryBuilder` and bound parameters; only
/// whitelisted column names are ever interpolated.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const USER_COLUMNS: &str = "id, name, email, password_hash, role, is_active, email_verified, \
                            last_login, created_at, updated_at";

const USERS_EMAIL_KEY: &str = "users_email_key";

const APTITUDE_SELECT: &str = r#"
    SELECT c.id, c.question_number AS number, c.question, c.options, c.correct_answer,
           c.explanation, c.difficulty, c.topic, c.tags, c.status, c.is_active,
           c.created_at, c.updated_at,
           cu.id AS created_by_id, cu.name AS created_by_name, cu.email AS created_by_email,
           uu.id AS updated_by_id, uu.name AS updated_by_name, uu.email AS updated_by_email
    FROM aptitude_questions c
    LEFT JOIN users cu ON cu.id = c.created_by
    LEFT JOIN users uu ON uu.id = c.updated_by
    WHERE c.is_active
"#;

const CONCEPT_SELECT: &str = r#"
    SELECT c.id, c.concept_number AS number, c.title, c.subject, c.description, c.content,
           c.difficulty, c.tags, c.status, c.is_active, c.created_at, c.updated_at,
           cu.id AS created_by_id, cu.name AS created_by_name, cu.email AS created_by_email,
           uu.id AS updated_by_id, uu.name AS updated_by_name, uu.email AS updated_by_email
    FROM core_concepts c
    LEFT JOIN users cu ON cu.id = c.created_by
    LEFT JOIN users uu ON uu.id = c.updated_by
    WHERE c.is_active
"#;

const NOTIFICATION_COLUMNS: &str = r#"
    n.id, n.title, n.message, n.notification_type, n.priority, n.target_audience,
    n.expires_at, n.is_active, n.created_at,
    cu.id AS created_by_id, cu.name AS created_by_name, cu.email AS created_by_email
"#;

// $1 = caller id, $2 = the caller's implicit audience (NULL for moderators).
const VISIBLE_TO_CALLER: &str = r#"
    FROM notifications n
    LEFT JOIN notification_recipients r ON r.notification_id = n.id AND r.user_id = $1
    LEFT JOIN users cu ON cu.id = n.created_by
    WHERE n.is_active
      AND (n.expires_at IS NULL OR n.expires_at > NOW())
      AND (n.target_audience = 'all' OR n.target_audience = $2 OR r.user_id IS NOT NULL)
"#;

/// Column layout of one numbered content table, aliased as `c`.
struct ContentTable {
    kind: SequenceKind,
    select: &'static str,
    number: &'static str,
    category: &'static str,
    search: &'static [&'static str],
}

const APTITUDE: ContentTable = ContentTable {
    kind: SequenceKind::AptitudeQuestion,
    select: APTITUDE_SELECT,
    number: "c.question_number",
    category: "c.topic",
    search: &["c.question", "c.topic", "c.explanation"],
};

const CONCEPTS: ContentTable = ContentTable {
    kind: SequenceKind::CoreConcept,
    select: CONCEPT_SELECT,
    number: "c.concept_number",
    category: "c.subject",
    search: &["c.title", "c.description", "c.subject"],
};

impl ContentTable {
    fn sort_column(&self, field: ContentSortField) -> &'static str {
        match field {
            ContentSortField::CreatedAt => "c.created_at",
            ContentSortField::UpdatedAt => "c.updated_at",
            ContentSortField::Number => self.number,
            ContentSortField::Difficulty => "c.difficulty",
            ContentSortField::Category => self.category,
        }
    }

    fn push_filters(&self, builder: &mut QueryBuilder<'_, Postgres>, filter: &ContentFilter) {
        if let Some(difficulty) = filter.difficulty {
            builder.push(" AND c.difficulty = ");
            builder.push_bind(difficulty.as_str());
        }
        if let Some(status) = filter.status {
            builder.push(" AND c.status = ");
            builder.push_bind(status.as_str());
        }
        if let Some(category) = &filter.category {
            builder.push(format!(" AND {} = ", self.category));
            builder.push_bind(category.clone());
        }
        if let Some(search) = &filter.search {
            push_search(builder, self.search, search);
        }
    }
}

/// Appends `AND (col ILIKE $n OR ...)` with LIKE metacharacters escaped.
fn push_search(builder: &mut QueryBuilder<'_, Postgres>, columns: &[&str], term: &str) {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    let pattern = format!("%{escaped}%");

    builder.push(" AND (");
    for (i, column) in columns.iter().enumerate() {
        if i > 0 {
            builder.push(" OR ");
        }
        builder.push(format!("{column} ILIKE "));
        builder.push_bind(pattern.clone());
    }
    builder.push(")");
}

fn push_page(builder: &mut QueryBuilder<'_, Postgres>, page: PageRequest) {
    builder.push(" LIMIT ");
    builder.push_bind(i64::from(page.limit));
    builder.push(" OFFSET ");
    builder.push_bind(page.offset());
}

/// Null ordering that matches `Option`'s: absent values sort lowest.
const fn nulls(order: SortOrder) -> &'static str {
    match order {
        SortOrder::Asc => "NULLS FIRST",
        SortOrder::Desc => "NULLS LAST",
    }
}

/// Parses a TEXT column holding an enum code. A bad value is a data fault.
fn decode<T: FromStr<Err = AppError>>(raw: &str, column: &str) -> AppResult<T> {
    raw.parse().map_err(|_| {
        AppError::internal(format!("unexpected value '{raw}' in column {column}"))
    })
}

fn summary(id: Option<Uuid>, name: Option<String>, email: Option<String>) -> Option<UserSummary> {
    Some(UserSummary {
        id: id?,
        name: name.unwrap_or_default(),
        email: email.unwrap_or_default(),
    })
}

/// Maps the unique-constraint violation named `constraint` to `conflict`,
/// passing every other database error through.
fn map_unique(err: sqlx::Error, constraint: &str, conflict: impl FnOnce() -> AppError) -> AppError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() && db.constraint() == Some(constraint) {
            return conflict();
        }
    }
    AppError::Database(err)
}

fn email_conflict() -> AppError {
    AppError::conflict("User with this email already exists")
}

/// Advances the counter for `kind` and returns the new value. The first call
/// seeds the counter from the highest number stored, soft-deleted rows included.
async fn next_number(conn: &mut PgConnection, kind: SequenceKind) -> AppResult<i64> {
    let sql = format!(
        "INSERT INTO sequence_counters (name, value) \
         VALUES ($1, (SELECT COALESCE(MAX({column}), 0) FROM {table}) + 1) \
         ON CONFLICT (name) DO UPDATE SET value = sequence_counters.value + 1 \
         RETURNING value",
        column = kind.column(),
        table = kind.table(),
    );
    let value = sqlx::query_scalar::<_, i64>(&sql)
        .bind(kind.counter_name())
        .fetch_one(conn)
        .await?;
    Ok(value)
}

// --- Row types ---

#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    name: String,
    email: String,
    password_hash: String,
    role: String,
    is_active: bool,
    email_verified: bool,
    last_login: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = AppError;

    fn try_from(row: UserRow) -> AppResult<Self> {
        Ok(User {
            role: decode::<Role>(&row.role, "users.role")?,
            id: row.id,
            name: row.name,
            email: row.email,
            password_hash: row.password_hash,
            is_active: row.is_active,
            email_verified: row.email_verified,
            last_login: row.last_login,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct AptitudeRow {
    id: Uuid,
    number: i64,
    question: String,
    options: Json<QuestionOptions>,
    correct_answer: String,
    explanation: Option<String>,
    difficulty: String,
    topic: String,
    tags: Vec<String>,
    status: String,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    created_by_id: Option<Uuid>,
    created_by_name: Option<String>,
    created_by_email: Option<String>,
    updated_by_id: Option<Uuid>,
    updated_by_name: Option<String>,
    updated_by_email: Option<String>,
}

impl TryFrom<AptitudeRow> for AptitudeQuestion {
    type Error = AppError;

    fn try_from(row: AptitudeRow) -> AppResult<Self> {
        Ok(AptitudeQuestion {
            id: row.id,
            question_number: row.number,
            question: row.question,
            options: row.options.0,
            correct_answer: decode(&row.correct_answer, "aptitude_questions.correct_answer")?,
            explanation: row.explanation,
            difficulty: decode(&row.difficulty, "aptitude_questions.difficulty")?,
            topic: row.topic,
            tags: row.tags,
            status: decode(&row.status, "aptitude_questions.status")?,
            created_by: summary(row.created_by_id, row.created_by_name, row.created_by_email),
            updated_by: summary(row.updated_by_id, row.updated_by_name, row.updated_by_email),
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct ConceptRow {
    id: Uuid,
    number: i64,
    title: String,
    subject: String,
    description: String,
    content: String,
    difficulty: String,
    tags: Vec<String>,
    status: String,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    created_by_id: Option<Uuid>,
    created_by_name: Option<String>,
    created_by_email: Option<String>,
    updated_by_id: Option<Uuid>,
    updated_by_name: Option<String>,
    updated_by_email: Option<String>,
}

impl TryFrom<ConceptRow> for CoreConcept {
    type Error = AppError;

    fn try_from(row: ConceptRow) -> AppResult<Self> {
        Ok(CoreConcept {
            id: row.id,
            concept_number: row.number,
            title: row.title,
            subject: row.subject,
            description: row.description,
            content: row.content,
            difficulty: decode(&row.difficulty, "core_concepts.difficulty")?,
            tags: row.tags,
            status: decode(&row.status, "core_concepts.status")?,
            created_by: summary(row.created_by_id, row.created_by_name, row.created_by_email),
            updated_by: summary(row.updated_by_id, row.updated_by_name, row.updated_by_email),
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct NotificationRow {
    id: Uuid,
    title: String,
    message: String,
    notification_type: String,
    priority: String,
    target_audience: String,
    expires_at: Option<DateTime<Utc>>,
    is_active: bool,
    created_at: DateTime<Utc>,
    created_by_id: Option<Uuid>,
    created_by_name: Option<String>,
    created_by_email: Option<String>,
}

impl NotificationRow {
    fn into_notification(self, recipients: Vec<Recipient>) -> AppResult<Notification> {
        Ok(Notification {
            id: self.id,
            title: self.title,
            message: self.message,
            notification_type: decode(&self.notification_type, "notifications.notification_type")?,
            priority: decode(&self.priority, "notifications.priority")?,
            target_audience: decode(&self.target_audience, "notifications.target_audience")?,
            recipients,
            created_by: summary(self.created_by_id, self.created_by_name, self.created_by_email),
            expires_at: self.expires_at,
            is_active: self.is_active,
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct RecipientRow {
    notification_id: Uuid,
    user_id: Uuid,
    read: bool,
    read_at: Option<DateTime<Utc>>,
}

#[derive(FromRow)]
struct FeedRow {
    #[sqlx(flatten)]
    notification: NotificationRow,
    read: Option<bool>,
    read_at: Option<DateTime<Utc>>,
}

impl TryFrom<FeedRow> for NotificationView {
    type Error = AppError;

    fn try_from(row: FeedRow) -> AppResult<Self> {
        let n = row.notification.into_notification(Vec::new())?;
        Ok(NotificationView {
            id: n.id,
            title: n.title,
            message: n.message,
            notification_type: n.notification_type,
            priority: n.priority,
            target_audience: n.target_audience,
            created_by: n.created_by,
            expires_at: n.expires_at,
            created_at: n.created_at,
            read: row.read.unwrap_or(false),
            read_at: row.read_at,
        })
    }
}

fn convert_all<R, T>(rows: Vec<R>) -> AppResult<Vec<T>>
where
    T: TryFrom<R, Error = AppError>,
{
    rows.into_iter().map(T::try_from).collect()
}

impl PostgresRepository {
    /// Counts and fetches one page of active content from `table`.
    async fn list_content<R>(
        &self,
        table: &ContentTable,
        filter: &ContentFilter,
    ) -> AppResult<(Vec<R>, i64)>
    where
        R: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        let mut count: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT COUNT(*) FROM {} c WHERE c.is_active",
            table.kind.table()
        ));
        table.push_filters(&mut count, filter);
        let total = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut select: QueryBuilder<Postgres> = QueryBuilder::new(table.select);
        table.push_filters(&mut select, filter);
        let direction = filter.sort_order.sql();
        select.push(format!(
            " ORDER BY {} {direction}, {} {direction}",
            table.sort_column(filter.sort_by),
            table.number,
        ));
        push_page(&mut select, filter.page);

        let rows = select.build_query_as::<R>().fetch_all(&self.pool).await?;
        Ok((rows, total))
    }

    async fn find_content<R>(&self, table: &ContentTable, id: Uuid) -> AppResult<Option<R>>
    where
        R: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        let sql = format!("{} AND c.id = $1", table.select);
        let row = sqlx::query_as::<_, R>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn soft_delete_content(
        &self,
        table: &ContentTable,
        id: Uuid,
        deleted_by: Uuid,
    ) -> AppResult<bool> {
        let sql = format!(
            "UPDATE {} SET is_active = FALSE, updated_by = $2, updated_at = NOW() \
             WHERE id = $1 AND is_active",
            table.kind.table()
        );
        let result = sqlx::query(&sql)
            .bind(id)
            .bind(deleted_by)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn bulk_status(
        &self,
        table: &ContentTable,
        ids: &[Uuid],
        status: ContentStatus,
        updated_by: Uuid,
    ) -> AppResult<u64> {
        let sql = format!(
            "UPDATE {} SET status = $1, updated_by = $2, updated_at = NOW() \
             WHERE id = ANY($3) AND is_active",
            table.kind.table()
        );
        let result = sqlx::query(&sql)
            .bind(status.as_str())
            .bind(updated_by)
            .bind(ids.to_vec())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn content_stats(&self, table: &ContentTable) -> AppResult<ContentStats> {
        let sql = format!(
            "SELECT c.status, c.difficulty, {category}, COUNT(*) FROM {table} c \
             WHERE c.is_active GROUP BY c.status, c.difficulty, {category}",
            category = table.category,
            table = table.kind.table(),
        );
        let groups = sqlx::query_as::<_, (String, String, String, i64)>(&sql)
            .fetch_all(&self.pool)
            .await?;

        let mut stats = ContentStats::default();
        for (status, difficulty, category, count) in groups {
            stats.record_group(
                decode(&status, "status")?,
                decode(&difficulty, "difficulty")?,
                &category,
                count,
            );
        }
        Ok(stats)
    }

    /// Loads recipient lists for a batch of notification rows.
    async fn with_recipients(&self, rows: Vec<NotificationRow>) -> AppResult<Vec<Notification>> {
        let ids: Vec<Uuid> = rows.iter().map(|row| row.id).collect();
        let recipients = sqlx::query_as::<_, RecipientRow>(
            "SELECT notification_id, user_id, read, read_at FROM notification_recipients \
             WHERE notification_id = ANY($1) ORDER BY user_id",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        let mut grouped: HashMap<Uuid, Vec<Recipient>> = HashMap::new();
        for r in recipients {
            grouped.entry(r.notification_id).or_default().push(Recipient {
                user_id: r.user_id,
                read: r.read,
                read_at: r.read_at,
            });
        }

        rows.into_iter()
            .map(|row| {
                let recipients = grouped.remove(&row.id).unwrap_or_default();
                row.into_notification(recipients)
            })
            .collect()
    }

    async fn load_notification(&self, id: Uuid) -> AppResult<Option<Notification>> {
        let sql = format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications n \
             LEFT JOIN users cu ON cu.id = n.created_by WHERE n.id = $1"
        );
        let row = sqlx::query_as::<_, NotificationRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => Ok(self.with_recipients(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    // --- Users ---

    async fn get_user(&self, id: Uuid) -> AppResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }

    /// list_users
    ///
    /// Filtered, sorted and paginated user listing. Sort keys are whitelisted
    /// through `UserSortField`; ties break on creation time, then id.
    async fn list_users(&self, filter: &UserFilter) -> AppResult<Page<User>> {
        fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &UserFilter) {
            if let Some(role) = filter.role {
                builder.push(" AND role = ");
                builder.push_bind(role.code());
            }
            if let Some(is_active) = filter.is_active {
                builder.push(" AND is_active = ");
                builder.push_bind(is_active);
            }
            if let Some(search) = &filter.search {
                push_search(builder, &["name", "email"], search);
            }
        }

        let mut count: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM users WHERE TRUE");
        push_filters(&mut count, filter);
        let total = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut select: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {USER_COLUMNS} FROM users WHERE TRUE"));
        push_filters(&mut select, filter);

        let column = match filter.sort_by {
            UserSortField::CreatedAt => "created_at",
            UserSortField::Name => "name",
            UserSortField::Email => "email",
            UserSortField::LastLogin => "last_login",
        };
        let direction = filter.sort_order.sql();
        select.push(format!(
            " ORDER BY {column} {direction} {}, created_at {direction}, id {direction}",
            nulls(filter.sort_order)
        ));
        push_page(&mut select, filter.page);

        let rows = select
            .build_query_as::<UserRow>()
            .fetch_all(&self.pool)
            .await?;

        Ok(Page {
            items: convert_all(rows)?,
            total,
            request: filter.page,
        })
    }

    async fn create_user(&self, new: NewUser) -> AppResult<User> {
        let sql = format!(
            "INSERT INTO users (id, name, email, password_hash, role) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(new.name)
            .bind(new.email)
            .bind(new.password_hash)
            .bind(new.role.code())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_unique(e, USERS_EMAIL_KEY, email_conflict))?;
        User::try_from(row)
    }

    /// update_user
    ///
    /// Partial update; `COALESCE` keeps the stored value for absent fields.
    async fn update_user(&self, id: Uuid, changes: UserChanges) -> AppResult<Option<User>> {
        let sql = format!(
            "UPDATE users SET name = COALESCE($2, name), email = COALESCE($3, email), \
             updated_at = NOW() WHERE id = $1 RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .bind(changes.name)
            .bind(changes.email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_unique(e, USERS_EMAIL_KEY, email_conflict))?
            .map(User::try_from)
            .transpose()
    }

    async fn set_user_role(&self, id: Uuid, role: Role) -> AppResult<Option<User>> {
        let sql = format!(
            "UPDATE users SET role = $2, updated_at = NOW() WHERE id = $1 RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .bind(role.code())
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn set_user_active(&self, id: Uuid, is_active: bool) -> AppResult<Option<User>> {
        let sql = format!(
            "UPDATE users SET is_active = $2, updated_at = NOW() WHERE id = $1 \
             RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .bind(is_active)
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn delete_user(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn record_login(&self, id: Uuid) -> AppResult<()> {
        sqlx::query("UPDATE users SET last_login = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// get_stats
    ///
    /// Compiles all dashboard counters in a single round trip.
    async fn get_stats(&self) -> AppResult<AdminDashboardStats> {
        let (
            total_users,
            active_users,
            inactive_users,
            admins,
            moderators,
            content_managers,
            regular_users,
            aptitude_questions,
            core_concepts,
            notifications,
        ) = sqlx::query_as::<_, (i64, i64, i64, i64, i64, i64, i64, i64, i64, i64)>(
            r#"
            SELECT
                COUNT(*),
                COUNT(*) FILTER (WHERE is_active),
                COUNT(*) FILTER (WHERE NOT is_active),
                COUNT(*) FILTER (WHERE role = 'admin'),
                COUNT(*) FILTER (WHERE role = 'moderator'),
                COUNT(*) FILTER (WHERE role = 'content-manager'),
                COUNT(*) FILTER (WHERE role = 'user'),
                (SELECT COUNT(*) FROM aptitude_questions WHERE is_active),
                (SELECT COUNT(*) FROM core_concepts WHERE is_active),
                (SELECT COUNT(*) FROM notifications WHERE is_active)
            FROM users
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(AdminDashboardStats {
            total_users,
            active_users,
            inactive_users,
            admins,
            moderators,
            content_managers,
            regular_users,
            aptitude_questions,
            core_concepts,
            notifications,
        })
    }

    // --- Aptitude questions ---

    async fn list_aptitude(&self, filter: &ContentFilter) -> AppResult<Page<AptitudeQuestion>> {
        let (rows, total) = self.list_content::<AptitudeRow>(&APTITUDE, filter).await?;
        Ok(Page {
            items: convert_all(rows)?,
            total,
            request: filter.page,
        })
    }

    async fn get_aptitude(&self, id: Uuid) -> AppResult<Option<AptitudeQuestion>> {
        self.find_content::<AptitudeRow>(&APTITUDE, id)
            .await?
            .map(AptitudeQuestion::try_from)
            .transpose()
    }

    /// create_aptitude
    ///
    /// Draws the next question number and inserts the row in one transaction.
    /// The unique constraint on `question_number` is the backstop; tripping it
    /// yields a retryable 409.
    async fn create_aptitude(
        &self,
        draft: AptitudeDraft,
        created_by: Uuid,
    ) -> AppResult<AptitudeQuestion> {
        let kind = APTITUDE.kind;
        let id = Uuid::new_v4();

        let mut tx = self.pool.begin().await?;
        let number = next_number(&mut *tx, kind).await?;
        sqlx::query(
            r#"
            INSERT INTO aptitude_questions
                (id, question_number, question, options, correct_answer, explanation,
                 difficulty, topic, tags, status, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(id)
        .bind(number)
        .bind(draft.question)
        .bind(Json(draft.options))
        .bind(draft.correct_answer.as_str())
        .bind(draft.explanation)
        .bind(draft.difficulty.as_str())
        .bind(draft.topic)
        .bind(draft.tags)
        .bind(draft.status.as_str())
        .bind(created_by)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_unique(e, kind.constraint(), || kind.conflict()))?;
        tx.commit().await?;

        self.get_aptitude(id)
            .await?
            .ok_or_else(|| AppError::internal("inserted question could not be reloaded"))
    }

    async fn update_aptitude(
        &self,
        id: Uuid,
        draft: AptitudeDraft,
        updated_by: Uuid,
    ) -> AppResult<Option<AptitudeQuestion>> {
        let result = sqlx::query(
            r#"
            UPDATE aptitude_questions
            SET question = $2, options = $3, correct_answer = $4, explanation = $5,
                difficulty = $6, topic = $7, tags = $8, status = $9,
                updated_by = $10, updated_at = NOW()
            WHERE id = $1 AND is_active
            "#,
        )
        .bind(id)
        .bind(draft.question)
        .bind(Json(draft.options))
        .bind(draft.correct_answer.as_str())
        .bind(draft.explanation)
        .bind(draft.difficulty.as_str())
        .bind(draft.topic)
        .bind(draft.tags)
        .bind(draft.status.as_str())
        .bind(updated_by)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_aptitude(id).await
    }

    async fn soft_delete_aptitude(&self, id: Uuid, deleted_by: Uuid) -> AppResult<bool> {
        self.soft_delete_content(&APTITUDE, id, deleted_by).await
    }

    async fn purge_aptitude(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM aptitude_questions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn bulk_update_aptitude_status(
        &self,
        ids: &[Uuid],
        status: ContentStatus,
        updated_by: Uuid,
    ) -> AppResult<u64> {
        self.bulk_status(&APTITUDE, ids, status, updated_by).await
    }

    async fn aptitude_stats(&self) -> AppResult<ContentStats> {
        self.content_stats(&APTITUDE).await
    }

    // --- Core concepts ---

    async fn list_concepts(&self, filter: &ContentFilter) -> AppResult<Page<CoreConcept>> {
        let (rows, total) = self.list_content::<ConceptRow>(&CONCEPTS, filter).await?;
        Ok(Page {
            items: convert_all(rows)?,
            total,
            request: filter.page,
        })
    }

    async fn get_concept(&self, id: Uuid) -> AppResult<Option<CoreConcept>> {
        self.find_content::<ConceptRow>(&CONCEPTS, id)
            .await?
            .map(CoreConcept::try_from)
            .transpose()
    }

    async fn create_concept(
        &self,
        draft: CoreConceptDraft,
        created_by: Uuid,
    ) -> AppResult<CoreConcept> {
        let kind = CONCEPTS.kind;
        let id = Uuid::new_v4();

        let mut tx = self.pool.begin().await?;
        let number = next_number(&mut *tx, kind).await?;
        sqlx::query(
            r#"
            INSERT INTO core_concepts
                (id, concept_number, title, subject, description, content,
                 difficulty, tags, status, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(id)
        .bind(number)
        .bind(draft.title)
        .bind(draft.subject)
        .bind(draft.description)
        .bind(draft.content)
        .bind(draft.difficulty.as_str())
        .bind(draft.tags)
        .bind(draft.status.as_str())
        .bind(created_by)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_unique(e, kind.constraint(), || kind.conflict()))?;
        tx.commit().await?;

        self.get_concept(id)
            .await?
            .ok_or_else(|| AppError::internal("inserted concept could not be reloaded"))
    }

    async fn update_concept(
        &self,
        id: Uuid,
        draft: CoreConceptDraft,
        updated_by: Uuid,
    ) -> AppResult<Option<CoreConcept>> {
        let result = sqlx::query(
            r#"
            UPDATE core_concepts
            SET title = $2, subject = $3, description = $4, content = $5,
                difficulty = $6, tags = $7, status = $8,
                updated_by = $9, updated_at = NOW()
            WHERE id = $1 AND is_active
            "#,
        )
        .bind(id)
        .bind(draft.title)
        .bind(draft.subject)
        .bind(draft.description)
        .bind(draft.content)
        .bind(draft.difficulty.as_str())
        .bind(draft.tags)
        .bind(draft.status.as_str())
        .bind(updated_by)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_concept(id).await
    }

    async fn soft_delete_concept(&self, id: Uuid, deleted_by: Uuid) -> AppResult<bool> {
        self.soft_delete_content(&CONCEPTS, id, deleted_by).await
    }

    async fn bulk_update_concept_status(
        &self,
        ids: &[Uuid],
        status: ContentStatus,
        updated_by: Uuid,
    ) -> AppResult<u64> {
        self.bulk_status(&CONCEPTS, ids, status, updated_by).await
    }

    async fn concept_stats(&self) -> AppResult<ContentStats> {
        self.content_stats(&CONCEPTS).await
    }

    // --- Notifications ---

    /// create_notification
    ///
    /// Inserts the notification and its explicit recipients in one transaction.
    /// Recipient ids that name no user are dropped.
    async fn create_notification(&self, new: NewNotification) -> AppResult<Notification> {
        let id = Uuid::new_v4();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO notifications
                (id, title, message, notification_type, priority, target_audience,
                 created_by, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(id)
        .bind(new.title)
        .bind(new.message)
        .bind(new.notification_type.as_str())
        .bind(new.priority.as_str())
        .bind(new.target_audience.as_str())
        .bind(new.created_by)
        .bind(new.expires_at)
        .execute(&mut *tx)
        .await?;

        if !new.recipient_ids.is_empty() {
            sqlx::query(
                "INSERT INTO notification_recipients (notification_id, user_id) \
                 SELECT $1, u.id FROM users u WHERE u.id = ANY($2)",
            )
            .bind(id)
            .bind(new.recipient_ids)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        self.load_notification(id)
            .await?
            .ok_or_else(|| AppError::internal("inserted notification could not be reloaded"))
    }

    async fn list_notifications(&self, page: PageRequest) -> AppResult<Page<Notification>> {
        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM notifications WHERE is_active",
        )
        .fetch_one(&self.pool)
        .await?;

        let sql = format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications n \
             LEFT JOIN users cu ON cu.id = n.created_by WHERE n.is_active \
             ORDER BY n.created_at DESC, n.id DESC LIMIT $1 OFFSET $2"
        );
        let rows = sqlx::query_as::<_, NotificationRow>(&sql)
            .bind(i64::from(page.limit))
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        Ok(Page {
            items: self.with_recipients(rows).await?,
            total,
            request: page,
        })
    }

    async fn soft_delete_notification(&self, id: Uuid) -> AppResult<bool> {
        let result =
            sqlx::query("UPDATE notifications SET is_active = FALSE WHERE id = $1 AND is_active")
                .bind(id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// notifications_for
    ///
    /// The caller's feed: active, unexpired notifications addressed to the
    /// caller's audience or naming the caller explicitly, newest first.
    async fn notifications_for(
        &self,
        user_id: Uuid,
        role: Role,
        page: PageRequest,
    ) -> AppResult<Page<NotificationView>> {
        let audience = TargetAudience::for_role(role).map(|a| a.as_str());

        let count_sql = format!("SELECT COUNT(*) {VISIBLE_TO_CALLER}");
        let total = sqlx::query_scalar::<_, i64>(&count_sql)
            .bind(user_id)
            .bind(audience)
            .fetch_one(&self.pool)
            .await?;

        let sql = format!(
            "SELECT {NOTIFICATION_COLUMNS}, r.read, r.read_at {VISIBLE_TO_CALLER} \
             ORDER BY n.created_at DESC, n.id DESC LIMIT $3 OFFSET $4"
        );
        let rows = sqlx::query_as::<_, FeedRow>(&sql)
            .bind(user_id)
            .bind(audience)
            .bind(i64::from(page.limit))
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        Ok(Page {
            items: convert_all(rows)?,
            total,
            request: page,
        })
    }

    /// mark_notification_read
    ///
    /// Upserts the caller's recipient entry, but only for a notification the
    /// caller can see. Zero affected rows means not visible.
    async fn mark_notification_read(
        &self,
        notification_id: Uuid,
        user_id: Uuid,
        role: Role,
    ) -> AppResult<bool> {
        let sql = format!(
            "INSERT INTO notification_recipients (notification_id, user_id, read, read_at) \
             SELECT n.id, $1, TRUE, NOW() {VISIBLE_TO_CALLER} AND n.id = $3 \
             ON CONFLICT (notification_id, user_id) \
             DO UPDATE SET read = TRUE, read_at = EXCLUDED.read_at"
        );
        let result = sqlx::query(&sql)
            .bind(user_id)
            .bind(TargetAudience::for_role(role).map(|a| a.as_str()))
            .bind(notification_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn mark_all_notifications_read(&self, user_id: Uuid, role: Role) -> AppResult<u64> {
        let sql = format!(
            "INSERT INTO notification_recipients (notification_id, user_id, read, read_at) \
             SELECT n.id, $1, TRUE, NOW() {VISIBLE_TO_CALLER} \
             AND (r.read IS NULL OR NOT r.read) \
             ON CONFLICT (notification_id, user_id) \
             DO UPDATE SET read = TRUE, read_at = EXCLUDED.read_at"
        );
        let result = sqlx::query(&sql)
            .bind(user_id)
            .bind(TargetAudience::for_role(role).map(|a| a.as_str()))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

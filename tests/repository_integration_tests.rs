use chrono::Utc;
use serde_json::json;
use serial_test::serial;
use skill_sync_api::{
    AppError, PostgresRepository,
    models::{
        AptitudeDraft, CreateAptitudeRequest, NewNotification, NewUser, PageRequest, Role,
        TargetAudience, User,
    },
    repository::Repository,
    sequence::SequenceKind,
};
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

// --- Test Context and Setup ---

/// Holds the database pool for one test. These tests share a real database,
/// so they run serially and only assert on rows they created themselves.
struct DbTestContext {
    pool: PgPool,
}

impl DbTestContext {
    /// Connects and migrates, or returns `None` when `DATABASE_URL` is unset so
    /// the suite still passes on machines without Postgres.
    async fn setup() -> Option<Self> {
        dotenv::dotenv().ok();

        let Ok(db_url) = std::env::var("DATABASE_URL") else {
            eprintln!("DATABASE_URL not set; skipping Postgres repository test");
            return None;
        };

        let pool = PgPool::connect(&db_url)
            .await
            .expect("Failed to connect to database for integration tests.");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run database migrations.");

        Some(DbTestContext { pool })
    }

    fn repository(&self) -> PostgresRepository {
        PostgresRepository::new(self.pool.clone())
    }
}

// --- Test Data Helpers ---

async fn create_test_user(repo: &PostgresRepository, role: Role) -> User {
    repo.create_user(NewUser {
        name: format!("{role} fixture"),
        email: format!("{}@repo-test.skillsync.dev", Uuid::new_v4()),
        password_hash: "$argon2id$fixture".to_string(),
        role,
    })
    .await
    .expect("Failed to create test user")
}

fn aptitude_draft(question: &str) -> AptitudeDraft {
    serde_json::from_value::<CreateAptitudeRequest>(json!({
        "question": question,
        "options": {"A": "1", "B": "2", "C": "3", "D": "4"},
        "correctAnswer": "C",
        "difficulty": "Medium",
        "topic": "Repository"
    }))
    .unwrap()
    .into_draft()
    .unwrap()
}

fn notification(
    title: &str,
    audience: TargetAudience,
    recipient_ids: Vec<Uuid>,
    created_by: Uuid,
) -> NewNotification {
    NewNotification {
        title: title.to_string(),
        message: format!("{title} body"),
        notification_type: Default::default(),
        priority: Default::default(),
        target_audience: audience,
        recipient_ids,
        expires_at: None,
        created_by,
    }
}

fn wide_page() -> PageRequest {
    PageRequest { page: 1, limit: 100 }
}

async fn feed_ids(repo: &PostgresRepository, user: &User) -> Vec<Uuid> {
    repo.notifications_for(user.id, user.role, wide_page())
        .await
        .unwrap()
        .items
        .into_iter()
        .map(|view| view.id)
        .collect()
}

// --- Tests ---

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[serial]
async fn test_concurrent_creates_get_consecutive_unique_numbers() {
    let Some(ctx) = DbTestContext::setup().await else { return };
    let repo = Arc::new(ctx.repository());
    let author = create_test_user(&repo, Role::ContentManager).await;

    let author_id = author.id;
    let mut handles = Vec::new();
    for i in 0..8 {
        let repo = repo.clone();
        handles.push(tokio::spawn(async move {
            repo.create_aptitude(aptitude_draft(&format!("concurrent {i}")), author_id)
                .await
        }));
    }

    let mut created = Vec::new();
    for handle in handles {
        created.push(handle.await.unwrap().expect("create succeeds"));
    }
    created.sort_unstable_by_key(|q| q.question_number);
    let first = created[0].question_number;
    let numbers: Vec<i64> = created.iter().map(|q| q.question_number).collect();
    assert_eq!(numbers, (first..first + 8).collect::<Vec<_>>());

    // Soft-deleting the newest row never frees its number.
    let newest = created.last().unwrap();
    assert!(repo.soft_delete_aptitude(newest.id, author.id).await.unwrap());
    assert!(repo.get_aptitude(newest.id).await.unwrap().is_none());

    let next = repo
        .create_aptitude(aptitude_draft("after delete"), author.id)
        .await
        .unwrap();
    assert_eq!(next.question_number, first + 8);
}

#[tokio::test]
#[serial]
async fn test_number_collision_maps_to_conflict() {
    let Some(ctx) = DbTestContext::setup().await else { return };
    let repo = ctx.repository();
    let author = create_test_user(&repo, Role::ContentManager).await;
    repo.create_aptitude(aptitude_draft("latest"), author.id)
        .await
        .unwrap();

    // Wind the counter back so the next number is already taken.
    sqlx::query("UPDATE sequence_counters SET value = value - 1 WHERE name = $1")
        .bind(SequenceKind::AptitudeQuestion.counter_name())
        .execute(&ctx.pool)
        .await
        .unwrap();

    let err = repo
        .create_aptitude(aptitude_draft("collides"), author.id)
        .await
        .unwrap_err();
    match err {
        AppError::Conflict(message) => {
            assert_eq!(message, "Question number already exists, please retry")
        }
        other => panic!("expected conflict, got {other:?}"),
    }

    // The failed transaction rolled back, so the counter is still behind by one
    // and a retry collides again until it passes the taken number.
    let retried = repo
        .create_aptitude(aptitude_draft("retry"), author.id)
        .await;
    assert!(matches!(retried, Err(AppError::Conflict(_))));
    sqlx::query("UPDATE sequence_counters SET value = value + 1 WHERE name = $1")
        .bind(SequenceKind::AptitudeQuestion.counter_name())
        .execute(&ctx.pool)
        .await
        .unwrap();
    assert!(repo
        .create_aptitude(aptitude_draft("retry"), author.id)
        .await
        .is_ok());
}

#[tokio::test]
#[serial]
async fn test_duplicate_email_maps_to_conflict() {
    let Some(ctx) = DbTestContext::setup().await else { return };
    let repo = ctx.repository();
    let existing = create_test_user(&repo, Role::User).await;

    let err = repo
        .create_user(NewUser {
            name: "Duplicate".to_string(),
            email: existing.email.clone(),
            password_hash: "$argon2id$fixture".to_string(),
            role: Role::User,
        })
        .await
        .unwrap_err();
    match err {
        AppError::Conflict(message) => assert_eq!(message, "User with this email already exists"),
        other => panic!("expected conflict, got {other:?}"),
    }
}

#[tokio::test]
#[serial]
async fn test_feed_visibility_follows_audience_and_recipients() {
    let Some(ctx) = DbTestContext::setup().await else { return };
    let repo = ctx.repository();
    let manager = create_test_user(&repo, Role::ContentManager).await;
    let student = create_test_user(&repo, Role::User).await;
    let moderator = create_test_user(&repo, Role::Moderator).await;

    let for_users = repo
        .create_notification(notification("users", TargetAudience::Users, vec![], manager.id))
        .await
        .unwrap();
    let for_moderator = repo
        .create_notification(notification(
            "direct",
            TargetAudience::Admins,
            vec![moderator.id],
            manager.id,
        ))
        .await
        .unwrap();
    let for_everyone = repo
        .create_notification(notification("all", TargetAudience::All, vec![], manager.id))
        .await
        .unwrap();
    let withdrawn = repo
        .create_notification(notification("gone", TargetAudience::Users, vec![], manager.id))
        .await
        .unwrap();
    assert!(repo.soft_delete_notification(withdrawn.id).await.unwrap());

    let student_feed = feed_ids(&repo, &student).await;
    assert!(student_feed.contains(&for_users.id));
    assert!(student_feed.contains(&for_everyone.id));
    assert!(!student_feed.contains(&for_moderator.id));
    assert!(!student_feed.contains(&withdrawn.id));

    // Moderators only see broadcasts and notifications naming them.
    let moderator_feed = feed_ids(&repo, &moderator).await;
    assert!(moderator_feed.contains(&for_moderator.id));
    assert!(moderator_feed.contains(&for_everyone.id));
    assert!(!moderator_feed.contains(&for_users.id));

    // Recipient ids that name no user are dropped on insert.
    let stray = repo
        .create_notification(notification(
            "stray",
            TargetAudience::Admins,
            vec![Uuid::new_v4(), student.id],
            manager.id,
        ))
        .await
        .unwrap();
    assert_eq!(stray.recipients.len(), 1);
    assert_eq!(stray.recipients[0].user_id, student.id);
}

#[tokio::test]
#[serial]
async fn test_mark_read_upsert_is_idempotent() {
    let Some(ctx) = DbTestContext::setup().await else { return };
    let repo = ctx.repository();
    let manager = create_test_user(&repo, Role::ContentManager).await;
    let moderator = create_test_user(&repo, Role::Moderator).await;
    let student = create_test_user(&repo, Role::User).await;

    // Clear broadcasts left behind by earlier runs.
    repo.mark_all_notifications_read(moderator.id, moderator.role)
        .await
        .unwrap();

    let first = repo
        .create_notification(notification(
            "first",
            TargetAudience::Admins,
            vec![moderator.id],
            manager.id,
        ))
        .await
        .unwrap();
    let second = repo
        .create_notification(notification(
            "second",
            TargetAudience::Admins,
            vec![moderator.id],
            manager.id,
        ))
        .await
        .unwrap();

    for _ in 0..2 {
        assert!(repo
            .mark_notification_read(first.id, moderator.id, moderator.role)
            .await
            .unwrap());
    }
    // Not visible to the student, so nothing is recorded.
    assert!(!repo
        .mark_notification_read(first.id, student.id, student.role)
        .await
        .unwrap());

    let feed = repo
        .notifications_for(moderator.id, moderator.role, wide_page())
        .await
        .unwrap();
    let read = feed.items.iter().find(|v| v.id == first.id).unwrap();
    assert!(read.read);
    assert!(read.read_at.is_some_and(|at| at <= Utc::now()));
    let unread = feed.items.iter().find(|v| v.id == second.id).unwrap();
    assert!(!unread.read);

    assert_eq!(
        repo.mark_all_notifications_read(moderator.id, moderator.role)
            .await
            .unwrap(),
        1
    );
    assert_eq!(
        repo.mark_all_notifications_read(moderator.id, moderator.role)
            .await
            .unwrap(),
        0
    );
}

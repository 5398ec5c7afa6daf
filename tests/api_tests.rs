use chrono::Utc;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::{Value, json};
use skill_sync_api::{
    AppConfig, AppState, InMemoryRepository, auth, create_router,
    models::{Role, User},
    repository::RepositoryState,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use uuid::Uuid;

const STUDENT_PASSWORD: &str = "student-pass";

pub struct TestApp {
    pub address: String,
    pub repo: Arc<InMemoryRepository>,
    pub client: Client,
    pub config: AppConfig,
    pub admin: User,
    pub moderator: User,
    pub manager: User,
    pub student: User,
}

fn seed_user(name: &str, role: Role, password_hash: String) -> User {
    let now = Utc::now();
    User {
        id: Uuid::new_v4(),
        name: name.to_string(),
        email: format!("{}@skillsync.dev", name.to_lowercase()),
        password_hash,
        role,
        is_active: true,
        email_verified: true,
        last_login: None,
        created_at: now,
        updated_at: now,
    }
}

/// Boots the full router on an ephemeral port over a fresh in-memory store.
/// Helper requests authenticate with bearer tokens signed by the app's config.
async fn spawn_app() -> TestApp {
    spawn_app_with(AppConfig::default()).await
}

async fn spawn_app_with(config: AppConfig) -> TestApp {
    let repo = Arc::new(InMemoryRepository::new());
    let hash = auth::hash_password(STUDENT_PASSWORD).unwrap();

    let admin = repo.insert_user(seed_user("Admin", Role::Admin, hash.clone())).await;
    let moderator = repo
        .insert_user(seed_user("Moderator", Role::Moderator, hash.clone()))
        .await;
    let manager = repo
        .insert_user(seed_user("Manager", Role::ContentManager, hash.clone()))
        .await;
    let student = repo.insert_user(seed_user("Student", Role::User, hash)).await;

    let state = AppState {
        repo: repo.clone() as RepositoryState,
        config: config.clone(),
    };
    let router = create_router(state);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{port}");

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    TestApp {
        address,
        repo,
        client: Client::new(),
        config,
        admin,
        moderator,
        manager,
        student,
    }
}

impl TestApp {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    fn token_for(&self, user: &User) -> String {
        auth::issue_token(user, &self.config).expect("issue token")
    }

    fn get(&self, path: &str, as_user: &User) -> RequestBuilder {
        self.client
            .get(self.url(path))
            .bearer_auth(self.token_for(as_user))
    }

    fn post(&self, path: &str, as_user: &User) -> RequestBuilder {
        self.client
            .post(self.url(path))
            .bearer_auth(self.token_for(as_user))
    }

    fn put(&self, path: &str, as_user: &User) -> RequestBuilder {
        self.client
            .put(self.url(path))
            .bearer_auth(self.token_for(as_user))
    }

    fn patch(&self, path: &str, as_user: &User) -> RequestBuilder {
        self.client
            .patch(self.url(path))
            .bearer_auth(self.token_for(as_user))
    }

    fn delete(&self, path: &str, as_user: &User) -> RequestBuilder {
        self.client
            .delete(self.url(path))
            .bearer_auth(self.token_for(as_user))
    }

    async fn create_concept(&self, title: &str, subject: &str) -> Value {
        let response = self
            .post("/core-concepts", &self.manager)
            .json(&json!({
                "title": title,
                "subject": subject,
                "description": format!("{title} explained")
            }))
            .send()
            .await
            .expect("create concept");
        assert_eq!(response.status(), StatusCode::CREATED);
        response.json::<Value>().await.unwrap()["data"].clone()
    }

    async fn create_question(&self, question: &str) -> Value {
        let response = self
            .post("/aptitude", &self.manager)
            .json(&json!({
                "question": question,
                "options": {"A": "3", "B": "4", "C": "5", "D": "6"},
                "correctAnswer": "B",
                "difficulty": "Easy",
                "topic": "Math"
            }))
            .send()
            .await
            .expect("create question");
        assert_eq!(response.status(), StatusCode::CREATED);
        response.json::<Value>().await.unwrap()["data"].clone()
    }
}

async fn send(request: RequestBuilder) -> (StatusCode, Value) {
    let response = request.send().await.expect("request failed");
    let status = response.status();
    let body = response.json::<Value>().await.unwrap_or(Value::Null);
    (status, body)
}

// --- Infrastructure ---

#[tokio::test]
async fn test_health_check() {
    let app = spawn_app().await;
    let response = app.client.get(app.url("/health")).send().await.unwrap();

    assert!(response.status().is_success());
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let app = spawn_app().await;
    let (status, body) = send(app.client.get(app.url("/api-docs/openapi.json"))).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/aptitude/bulk/status"].is_object());
}

// --- Auth Guard & Role Guards ---

#[tokio::test]
async fn test_protected_routes_require_authentication() {
    let app = spawn_app().await;

    for path in ["/aptitude", "/admin/users", "/notifications/my-notifications", "/auth/me"] {
        let (status, body) = send(app.client.get(app.url(path))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{path}");
        assert_eq!(body["success"], false);
        assert!(body["message"].is_string());
    }
}

#[tokio::test]
async fn test_user_id_header_alone_is_rejected_by_default() {
    let app = spawn_app().await;

    let (status, body) = send(
        app.client
            .get(app.url("/admin/users"))
            .header("x-user-id", app.admin.id.to_string()),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_user_id_header_accepted_when_bypass_enabled() {
    let app = spawn_app_with(AppConfig {
        dev_auth_bypass: true,
        ..AppConfig::default()
    })
    .await;

    let (status, _) = send(
        app.client
            .get(app.url("/admin/users"))
            .header("x-user-id", app.admin.id.to_string()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_role_guards_per_route_group() {
    let app = spawn_app().await;

    // Content routes: admin and content-manager only.
    let (status, _) = send(app.get("/aptitude", &app.student)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(app.get("/core-concepts", &app.moderator)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(app.get("/aptitude", &app.manager)).await;
    assert_eq!(status, StatusCode::OK);

    // Admin reads: moderators allowed; admin writes: admin only.
    let (status, body) = send(app.get("/admin/users", &app.moderator)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 4);
    let (status, _) = send(app.get("/admin/stats", &app.manager)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, body) = send(
        app.post("/admin/users", &app.moderator).json(&json!({
            "name": "Nope",
            "email": "nope@skillsync.dev",
            "password": "secret123"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_login_and_me_with_bearer_token() {
    let app = spawn_app().await;

    let (status, body) = send(app.client.post(app.url("/auth/login")).json(&json!({
        "email": "STUDENT@skillsync.dev",
        "password": STUDENT_PASSWORD
    })))
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["role"], "user");
    assert!(body["user"].get("passwordHash").is_none());
    let token = body["token"].as_str().unwrap().to_string();

    let (status, body) = send(
        app.client
            .get(app.url("/auth/me"))
            .bearer_auth(&token),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["id"], app.student.id.to_string());
    assert!(body["user"]["lastLogin"].is_string());

    let (status, body) = send(app.client.post(app.url("/auth/login")).json(&json!({
        "email": "student@skillsync.dev",
        "password": "wrong"
    })))
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid email or password");
}

#[tokio::test]
async fn test_deactivated_user_loses_access_immediately() {
    let app = spawn_app().await;

    let (status, _) = send(app.put(&format!("/admin/users/{}/status", app.student.id), &app.admin)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(app.get("/notifications/my-notifications", &app.student)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Account is deactivated");
}

// --- Admin self-protection ---

#[tokio::test]
async fn test_admin_cannot_weaken_own_account() {
    let app = spawn_app().await;
    let me = app.admin.id;

    let (status, body) = send(
        app.put(&format!("/admin/users/{me}/role"), &app.admin)
            .json(&json!({"role": "user"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, _) = send(app.put(&format!("/admin/users/{me}/status"), &app.admin)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(app.delete(&format!("/admin/users/{me}"), &app.admin)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Nothing was mutated.
    let (status, body) = send(app.get(&format!("/admin/users/{me}"), &app.admin)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["role"], "admin");
    assert_eq!(body["data"]["isActive"], true);
}

#[tokio::test]
async fn test_admin_manages_other_accounts() {
    let app = spawn_app().await;

    let (status, body) = send(app.post("/admin/users", &app.admin).json(&json!({
        "name": "Priya",
        "email": "Priya@SkillSync.dev",
        "password": "secret123",
        "role": "content-manager"
    })))
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["email"], "priya@skillsync.dev");
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, _) = send(app.post("/admin/users", &app.admin).json(&json!({
        "name": "   ",
        "email": "blank@skillsync.dev",
        "password": "secret123"
    })))
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Duplicate email, case-insensitively.
    let (status, _) = send(app.post("/admin/users", &app.admin).json(&json!({
        "name": "Priya Again",
        "email": "PRIYA@skillsync.dev",
        "password": "secret123"
    })))
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send(
        app.put(&format!("/admin/users/{id}/role"), &app.admin)
            .json(&json!({"role": "superuser"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("Invalid role"));

    let (status, body) = send(
        app.put(&format!("/admin/users/{id}/role"), &app.admin)
            .json(&json!({"role": "moderator"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["role"], "moderator");

    let (status, _) = send(app.delete(&format!("/admin/users/{id}"), &app.admin)).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(app.get(&format!("/admin/users/{id}"), &app.admin)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// --- Numbered content ---

#[tokio::test]
async fn test_aptitude_numbering_and_defaults() {
    let app = spawn_app().await;

    let first = app.create_question("2+2?").await;
    assert_eq!(first["questionNumber"], 1);
    assert_eq!(first["status"], "Draft");
    assert_eq!(first["isActive"], true);
    assert_eq!(first["createdBy"]["id"], app.manager.id.to_string());

    let id = first["id"].as_str().unwrap();
    let (status, body) = send(app.get(&format!("/aptitude/{id}"), &app.admin)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["question"], "2+2?");
    assert_eq!(body["data"]["options"]["B"], "4");
    assert_eq!(body["data"]["correctAnswer"], "B");
    assert_eq!(body["data"]["isActive"], true);

    let second = app.create_question("3+3?").await;
    assert_eq!(second["questionNumber"], 2);
}

#[tokio::test]
async fn test_numbers_are_not_reused_after_soft_delete() {
    let app = spawn_app().await;

    let first = app.create_question("first").await;
    let second = app.create_question("second").await;
    let second_id = second["id"].as_str().unwrap();

    let (status, _) = send(app.delete(&format!("/aptitude/{second_id}"), &app.manager)).await;
    assert_eq!(status, StatusCode::OK);

    let third = app.create_question("third").await;
    assert_eq!(third["questionNumber"], 3);

    // Soft-deleted rows disappear from reads but stay stored.
    let (status, _) = send(app.get(&format!("/aptitude/{second_id}"), &app.manager)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(app.delete(&format!("/aptitude/{second_id}"), &app.manager)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = send(app.get("/aptitude?sortBy=questionNumber&sortOrder=asc", &app.manager)).await;
    assert_eq!(body["total"], 2);
    assert_eq!(body["items"][0]["id"], first["id"]);
    assert_eq!(body["items"][1]["questionNumber"], 3);
    assert_eq!(app.repo.stored_aptitude_count().await, 3);
}

#[tokio::test]
async fn test_concept_numbers_are_independent() {
    let app = spawn_app().await;
    app.create_question("warm-up").await;

    let (status, body) = send(app.post("/core-concepts", &app.manager).json(&json!({
        "title": "Normalization",
        "subject": "DBMS",
        "description": "1NF through BCNF"
    })))
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["conceptNumber"], 1);
    assert_eq!(body["data"]["difficulty"], "Medium");
    assert_eq!(body["data"]["status"], "Draft");
}

#[tokio::test]
async fn test_concept_update_keeps_number_and_validates_merge() {
    let app = spawn_app().await;
    app.create_concept("Paging", "OS").await;
    let concept = app.create_concept("Deadlocks", "OS").await;
    let id = concept["id"].as_str().unwrap();

    let (status, body) = send(app.put(&format!("/core-concepts/{id}"), &app.admin).json(&json!({
        "title": "Deadlock avoidance",
        "difficulty": "Hard",
        "tags": [" banker ", ""]
    })))
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["title"], "Deadlock avoidance");
    assert_eq!(body["data"]["subject"], "OS");
    assert_eq!(body["data"]["difficulty"], "Hard");
    assert_eq!(body["data"]["tags"], json!(["banker"]));
    assert_eq!(body["data"]["conceptNumber"], 2);
    assert_eq!(body["data"]["updatedBy"]["id"], app.admin.id.to_string());

    let (status, _) = send(app.put(&format!("/core-concepts/{id}"), &app.admin).json(&json!({
        "subject": "   "
    })))
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(app.put(&format!("/core-concepts/{id}"), &app.admin).json(&json!({
        "difficulty": "Extreme"
    })))
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        app.put(&format!("/core-concepts/{}", Uuid::new_v4()), &app.admin)
            .json(&json!({"title": "Ghost"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_concept_soft_delete_hides_row_and_keeps_number() {
    let app = spawn_app().await;
    let first = app.create_concept("Normalization", "DBMS").await;
    let second = app.create_concept("Indexing", "DBMS").await;
    let second_id = second["id"].as_str().unwrap();

    let (status, body) = send(app.delete(&format!("/core-concepts/{second_id}"), &app.manager)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (status, body) = send(app.get(&format!("/core-concepts/{second_id}"), &app.manager)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    let (status, _) = send(app.delete(&format!("/core-concepts/{second_id}"), &app.manager)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(
        app.put(&format!("/core-concepts/{second_id}"), &app.manager)
            .json(&json!({"title": "Revived"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let third = app.create_concept("Transactions", "DBMS").await;
    assert_eq!(third["conceptNumber"], 3);

    let (status, body) = send(app.get("/core-concepts?sortBy=conceptNumber&sortOrder=asc", &app.manager)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);
    assert_eq!(body["items"][0]["id"], first["id"]);
    assert_eq!(body["items"][1]["conceptNumber"], 3);
}

#[tokio::test]
async fn test_concept_bulk_status_skips_soft_deleted_ids() {
    let app = spawn_app().await;
    let active = app.create_concept("Scheduling", "OS").await;
    let deleted = app.create_concept("Thrashing", "OS").await;
    let deleted_id = deleted["id"].as_str().unwrap();
    send(app.delete(&format!("/core-concepts/{deleted_id}"), &app.manager)).await;

    let (status, body) = send(app.patch("/core-concepts/bulk/status", &app.manager).json(&json!({
        "ids": [active["id"], deleted["id"], Uuid::new_v4()],
        "status": "Archived"
    })))
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["modifiedCount"], 1);

    let (_, body) = send(app.get("/core-concepts?status=Archived", &app.manager)).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["items"][0]["id"], active["id"]);

    let (status, _) = send(app.patch("/core-concepts/bulk/status", &app.manager).json(&json!({
        "ids": [],
        "status": "Published"
    })))
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(app.patch("/core-concepts/bulk/status", &app.manager).json(&json!({
        "ids": [active["id"]],
        "status": "Hidden"
    })))
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_concept_stats_overview_counts_active_rows() {
    let app = spawn_app().await;
    let published = app.create_concept("Routing", "Networks").await;
    app.create_concept("Subnetting", "Networks").await;
    let removed = app.create_concept("Joins", "DBMS").await;
    send(app.patch("/core-concepts/bulk/status", &app.manager).json(&json!({
        "ids": [published["id"]],
        "status": "Published"
    })))
    .await;
    let removed_id = removed["id"].as_str().unwrap();
    send(app.delete(&format!("/core-concepts/{removed_id}"), &app.manager)).await;

    let (status, body) = send(app.get("/core-concepts/stats/overview", &app.admin)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 2);
    assert_eq!(body["data"]["published"], 1);
    assert_eq!(body["data"]["draft"], 1);
    assert_eq!(body["data"]["archived"], 0);
    assert_eq!(body["data"]["byDifficulty"]["Medium"], 2);
    assert_eq!(body["data"]["byCategory"]["Networks"], 2);
    assert!(body["data"]["byCategory"].get("DBMS").is_none());

    let (status, _) = send(app.get("/core-concepts/stats/overview", &app.student)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_bulk_status_skips_soft_deleted_ids() {
    let app = spawn_app().await;

    let active = app.create_question("active").await;
    let deleted = app.create_question("deleted").await;
    let deleted_id = deleted["id"].as_str().unwrap();
    send(app.delete(&format!("/aptitude/{deleted_id}"), &app.manager)).await;

    let (status, body) = send(app.patch("/aptitude/bulk/status", &app.manager).json(&json!({
        "ids": [active["id"], deleted["id"], Uuid::new_v4()],
        "status": "Published"
    })))
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["modifiedCount"], 1);

    let (_, body) = send(app.get("/aptitude?status=Published", &app.manager)).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["items"][0]["id"], active["id"]);

    let (status, _) = send(app.patch("/aptitude/bulk/status", &app.manager).json(&json!({
        "ids": [],
        "status": "Published"
    })))
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(app.patch("/aptitude/bulk/status", &app.manager).json(&json!({
        "ids": [active["id"]],
        "status": "Live"
    })))
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_permanent_delete_is_admin_only() {
    let app = spawn_app().await;
    let question = app.create_question("doomed").await;
    let id = question["id"].as_str().unwrap();
    send(app.delete(&format!("/aptitude/{id}"), &app.manager)).await;

    let (status, _) = send(app.delete(&format!("/aptitude/{id}/permanent"), &app.manager)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Soft-deleted rows can still be purged.
    let (status, _) = send(app.delete(&format!("/aptitude/{id}/permanent"), &app.admin)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(!app.repo.aptitude_exists(id.parse().unwrap()).await);
}

#[tokio::test]
async fn test_update_keeps_number_and_validates_merge() {
    let app = spawn_app().await;
    let question = app.create_question("original").await;
    let id = question["id"].as_str().unwrap();

    let (status, body) = send(app.put(&format!("/aptitude/{id}"), &app.admin).json(&json!({
        "question": "rewritten",
        "difficulty": "Hard"
    })))
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["question"], "rewritten");
    assert_eq!(body["data"]["difficulty"], "Hard");
    assert_eq!(body["data"]["questionNumber"], 1);
    assert_eq!(body["data"]["updatedBy"]["id"], app.admin.id.to_string());

    let (status, _) = send(app.put(&format!("/aptitude/{id}"), &app.admin).json(&json!({
        "correctAnswer": "E"
    })))
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_rejects_bad_query_and_caps_limit() {
    let app = spawn_app().await;
    app.create_question("only").await;

    for query in ["limit=0", "page=abc", "sortBy=password", "difficulty=Extreme", "sortOrder=up"] {
        let (status, body) = send(app.get(&format!("/aptitude?{query}"), &app.manager)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{query}");
        assert_eq!(body["success"], false);
    }

    let (status, body) = send(app.get("/aptitude?limit=500&search=ONL", &app.manager)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["totalPages"], 1);
    assert_eq!(body["hasNextPage"], false);
}

#[tokio::test]
async fn test_content_stats_overview() {
    let app = spawn_app().await;
    let a = app.create_question("a").await;
    app.create_question("b").await;
    send(app.patch("/aptitude/bulk/status", &app.manager).json(&json!({
        "ids": [a["id"]],
        "status": "Published"
    })))
    .await;

    let (status, body) = send(app.get("/aptitude/stats/overview", &app.manager)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 2);
    assert_eq!(body["data"]["published"], 1);
    assert_eq!(body["data"]["draft"], 1);

    let (_, body) = send(app.get("/admin/stats", &app.moderator)).await;
    assert_eq!(body["data"]["totalUsers"], 4);
    assert_eq!(body["data"]["aptitudeQuestions"], 2);
}

// --- Notifications ---

#[tokio::test]
async fn test_notification_feed_and_read_state() {
    let app = spawn_app().await;

    let (status, body) = send(app.post("/notifications", &app.manager).json(&json!({
        "title": "Mock test",
        "message": "Aptitude mock test at 10:00",
        "targetAudience": "users",
        "priority": "high"
    })))
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let (_, feed) = send(app.get("/notifications/my-notifications", &app.student)).await;
    assert_eq!(feed["total"], 1);
    assert_eq!(feed["unreadCount"], 1);
    assert_eq!(feed["items"][0]["read"], false);

    // Moderators have no implicit audience.
    let (_, feed) = send(app.get("/notifications/my-notifications", &app.moderator)).await;
    assert_eq!(feed["total"], 0);
    let (status, _) = send(app.patch(&format!("/notifications/mark-read/{id}"), &app.moderator)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Idempotent.
    for _ in 0..2 {
        let (status, _) = send(app.patch(&format!("/notifications/mark-read/{id}"), &app.student)).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (_, feed) = send(app.get("/notifications/my-notifications", &app.student)).await;
    assert_eq!(feed["unreadCount"], 0);
    assert_eq!(feed["items"][0]["read"], true);
    assert!(feed["items"][0]["readAt"].is_string());

    let (status, body) = send(app.patch("/notifications/mark-all-read", &app.student)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["modifiedCount"], 0);
}

#[tokio::test]
async fn test_explicit_recipients_and_mark_all() {
    let app = spawn_app().await;

    for title in ["one", "two"] {
        let (status, _) = send(app.post("/notifications", &app.admin).json(&json!({
            "title": title,
            "message": "For the moderator only",
            "targetAudience": "admins",
            "recipientIds": [app.moderator.id]
        })))
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (_, feed) = send(app.get("/notifications/my-notifications", &app.moderator)).await;
    assert_eq!(feed["total"], 2);
    assert_eq!(feed["items"][0]["title"], "two");

    let (_, body) = send(app.patch("/notifications/mark-all-read", &app.moderator)).await;
    assert_eq!(body["modifiedCount"], 2);

    // The student is neither in the audience nor a recipient.
    let (_, feed) = send(app.get("/notifications/my-notifications", &app.student)).await;
    assert_eq!(feed["total"], 0);
}

#[tokio::test]
async fn test_notification_management_requires_content_role() {
    let app = spawn_app().await;

    let (status, _) = send(app.post("/notifications", &app.student).json(&json!({
        "title": "Spam",
        "message": "Nope"
    })))
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    for title in ["", "   "] {
        let (status, _) = send(app.post("/notifications", &app.manager).json(&json!({
            "title": title,
            "message": "Missing title"
        })))
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    let (status, body) = send(app.post("/notifications", &app.manager).json(&json!({
        "title": "Short-lived",
        "message": "Gone soon"
    })))
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, _) = send(app.delete(&format!("/notifications/{id}"), &app.manager)).await;
    assert_eq!(status, StatusCode::OK);

    let (_, feed) = send(app.get("/notifications/my-notifications", &app.student)).await;
    assert_eq!(feed["total"], 0);
}

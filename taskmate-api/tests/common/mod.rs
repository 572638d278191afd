/// Common test utilities for integration tests
///
/// - Test database setup (created if missing, migrations run on connect)
/// - A freshly registered user per context, with its session cookie
/// - Request helpers against the full router

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use chrono::Utc;
use serde_json::Value;
use sqlx::PgPool;
use std::sync::Arc;
use taskmate_api::app::{build_router, AppState};
use taskmate_api::config::Config;
use taskmate_shared::auth::account::{register, Registration, SignedIn};
use taskmate_shared::auth::session::{MemorySessionStore, SessionManager};
use taskmate_shared::db::migrations::{ensure_database_exists, run_migrations};
use tower::Service as _;
use uuid::Uuid;

/// Test context containing all necessary resources
pub struct TestContext {
    pub db: PgPool,
    pub sessions: SessionManager,
    pub app: Router,
    pub user: SignedIn,
}

impl TestContext {
    /// Connects to `DATABASE_URL`, migrates, and registers a new user
    pub async fn new() -> anyhow::Result<Self> {
        let config = Config::from_env()?;

        ensure_database_exists(&config.database.url).await?;
        let db = PgPool::connect(&config.database.url).await?;
        run_migrations(&db).await?;

        let sessions = SessionManager::new(Arc::new(MemorySessionStore::new()));
        let user = register_user(&db, &sessions).await?;

        let state = AppState::new(db.clone(), sessions.clone(), config);
        let app = build_router(state);

        Ok(TestContext {
            db,
            sessions,
            app,
            user,
        })
    }

    /// Cookie header value for the context's user
    pub fn cookie(&self) -> String {
        format!("taskmate-session={}", self.user.session.id)
    }

    pub fn user_id(&self) -> Uuid {
        self.user.user.id
    }

    /// Sends a request with the user's session cookie
    pub async fn send(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        self.send_with_cookie(method, uri, body, Some(self.cookie())).await
    }

    pub async fn send_with_cookie(
        &self,
        method: &str,
        uri: &str,
        body: Option<Value>,
        cookie: Option<String>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }

        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().call(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        (status, json)
    }

    /// Id of one of the user's boards by slug
    pub async fn board_id(&self, slug: &str) -> Uuid {
        let (_, boards) = self.send("GET", "/api/boards", None).await;
        boards
            .as_array()
            .unwrap()
            .iter()
            .find(|b| b["slug"] == slug)
            .and_then(|b| b["id"].as_str())
            .and_then(|id| id.parse().ok())
            .expect("board exists")
    }

    /// Creates a task through the API and returns its JSON
    pub async fn create_task(&self, title: &str, board_slug: &str) -> Value {
        let board_id = self.board_id(board_slug).await;
        let (status, task) = self
            .send(
                "POST",
                "/api/tasks",
                Some(serde_json::json!({ "title": title, "board_id": board_id })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create failed: {}", task);
        task
    }

    /// Cleans up test data (projects, boards and tasks cascade)
    pub async fn cleanup(&self) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(self.user_id())
            .execute(&self.db)
            .await?;
        Ok(())
    }
}

/// Registers a user with a unique email
pub async fn register_user(db: &PgPool, sessions: &SessionManager) -> anyhow::Result<SignedIn> {
    let signed_in = register(
        db,
        sessions,
        Registration {
            email: format!("test-{}@example.com", Uuid::new_v4()),
            password: "secret1".to_string(),
            name: "Test User".to_string(),
        },
        Utc::now(),
    )
    .await?;

    Ok(signed_in)
}

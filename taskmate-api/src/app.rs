/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use taskmate_api::{app::AppState, config::Config};
/// use taskmate_shared::auth::session::{MemorySessionStore, SessionManager};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let sessions = SessionManager::new(Arc::new(MemorySessionStore::new()));
/// let state = AppState::new(pool, sessions, config);
/// let app = taskmate_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{
    config::Config,
    middleware::{security::SecurityHeadersLayer, session::session_auth_layer},
    routes,
};
use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post, put},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use taskmate_shared::auth::session::SessionManager;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state, cloned into every handler
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub sessions: SessionManager,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(db: PgPool, sessions: SessionManager, config: Config) -> Self {
        Self {
            db,
            sessions,
            config: Arc::new(config),
        }
    }

    /// Whether cookies should carry the `Secure` attribute
    pub fn secure_cookies(&self) -> bool {
        self.config.api.production
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// ```text
/// /
/// ├── GET  /health
/// └── /api
///     ├── /auth
///     │   ├── POST /register, /login, /logout     (public)
///     │   └── GET  /me                            (session)
///     ├── GET|POST      /tasks                    (session)
///     ├── PUT|DELETE    /tasks/:id                (session)
///     ├── POST          /tasks/:id/move           (session)
///     ├── GET           /boards                   (session)
///     ├── GET|POST      /tags                     (session)
///     ├── GET           /users                    (session)
///     ├── GET|POST      /cleanup                  (session)
///     └── GET|POST      /cron/cleanup             (reports its own failures)
/// ```
pub fn build_router(state: AppState) -> Router {
    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    let session_layer = axum::middleware::from_fn_with_state(state.clone(), session_auth_layer);

    let auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/logout", post(routes::auth::logout))
        .merge(
            Router::new()
                .route("/me", get(routes::auth::me))
                .route_layer(session_layer.clone()),
        );

    let protected_routes = Router::new()
        .route(
            "/tasks",
            get(routes::tasks::list_tasks).post(routes::tasks::create_task),
        )
        .route(
            "/tasks/:id",
            put(routes::tasks::update_task).delete(routes::tasks::delete_task),
        )
        .route("/tasks/:id/move", post(routes::tasks::move_task))
        .route("/boards", get(routes::boards::list_boards))
        .route(
            "/tags",
            get(routes::tags::list_tags).post(routes::tags::create_tag),
        )
        .route("/users", get(routes::users::list_users))
        .route(
            "/cleanup",
            get(routes::cleanup::cleanup_stats).post(routes::cleanup::run_cleanup),
        )
        .route_layer(session_layer);

    let cron_routes = Router::new().route(
        "/cleanup",
        get(routes::cron::scheduled_cleanup).post(routes::cron::scheduled_cleanup),
    );

    let api_routes = Router::new()
        .nest("/auth", auth_routes)
        .nest("/cron", cron_routes)
        .merge(protected_routes);

    let cors = if state.config.allows_any_origin() {
        // Development mode: permissive CORS
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::CONTENT_TYPE, header::COOKIE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    Router::new()
        .merge(health_routes)
        .nest("/api", api_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

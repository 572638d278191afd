/// Registration, login and logout
///
/// Registering creates the whole personal workspace in one transaction: the
/// user, the default project, its four boards and five starter tags. Either
/// all of it exists afterwards or none of it does.

use chrono::{DateTime, Utc};
use futures::FutureExt;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::password::{hash_password, validate_password_length, verify_password};
use super::session::{IssuedSession, SessionManager};
use crate::db::query::{with_retry, with_transaction, RetryPolicy};
use crate::error::{TaskMateError, TaskMateResult};
use crate::models::board::{Board, DEFAULT_BOARDS};
use crate::models::project::{Project, DEFAULT_PROJECT_DESCRIPTION, DEFAULT_PROJECT_NAME};
use crate::models::tag::{Tag, DEFAULT_TAGS};
use crate::models::user::{normalize_email, CreateUser, PublicUser, User};

const DUPLICATE_EMAIL: &str = "User with this email already exists";
const INVALID_CREDENTIALS: &str = "Invalid email or password";

/// Registration input, as submitted
#[derive(Debug, Clone)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub name: String,
}

/// A signed-in user plus the session that was issued for them
#[derive(Debug, Clone)]
pub struct SignedIn {
    pub user: PublicUser,
    pub session: IssuedSession,
}

/// Creates an account and its default workspace, then signs the user in.
///
/// # Errors
///
/// - `Validation` for missing fields, a short password, or a taken email
/// - `Database` / `SessionStore` for backend failures
pub async fn register(
    pool: &PgPool,
    sessions: &SessionManager,
    input: Registration,
    now: DateTime<Utc>,
) -> TaskMateResult<SignedIn> {
    let email = normalize_email(&input.email);
    let name = input.name.trim().to_string();

    if email.is_empty() || input.password.is_empty() || name.is_empty() {
        return Err(TaskMateError::validation("Email, password, and name are required"));
    }

    validate_password_length(&input.password)
        .map_err(|message| TaskMateError::invalid_field(message, "password"))?;

    if User::email_exists(pool, &email).await? {
        return Err(TaskMateError::invalid_field(DUPLICATE_EMAIL, "email"));
    }

    let password_hash = hash_blocking(input.password).await?;

    let user = with_transaction(pool, move |conn| {
        async move {
            let user = User::create(
                &mut *conn,
                CreateUser {
                    email,
                    password_hash,
                    name,
                },
            )
            .await?;
            seed_workspace(conn, user.id).await?;
            Ok::<_, TaskMateError>(user)
        }
        .boxed()
    })
    .await
    .map_err(|err| match err {
        TaskMateError::Database { code: Some(ref code), .. } if code == "23505" => {
            TaskMateError::invalid_field(DUPLICATE_EMAIL, "email")
        }
        other => other,
    })?;

    tracing::info!(user_id = %user.id, "User registered");

    let session = sessions.issue(user.id, now).await?;
    Ok(SignedIn {
        user: user.into(),
        session,
    })
}

/// Creates the default project with its boards and tags for `owner`.
pub async fn seed_workspace(conn: &mut PgConnection, owner: Uuid) -> TaskMateResult<Project> {
    let project = Project::create(
        &mut *conn,
        owner,
        DEFAULT_PROJECT_NAME,
        Some(DEFAULT_PROJECT_DESCRIPTION),
    )
    .await?;

    for template in DEFAULT_BOARDS {
        Board::create(&mut *conn, template.into_create(project.id)).await?;
    }

    for (name, color) in DEFAULT_TAGS {
        Tag::create(&mut *conn, project.id, name, color).await?;
    }

    tracing::debug!(owner = %owner, project_id = %project.id, "Default workspace created");
    Ok(project)
}

/// Checks credentials and issues a session.
///
/// Unknown emails and wrong passwords produce the same error.
pub async fn login(
    pool: &PgPool,
    sessions: &SessionManager,
    email: &str,
    password: &str,
    now: DateTime<Utc>,
) -> TaskMateResult<SignedIn> {
    let email = normalize_email(email);
    if email.is_empty() || password.is_empty() {
        return Err(TaskMateError::validation("Email and password are required"));
    }

    let user = with_retry(&RetryPolicy::default(), "find_user_by_email", || {
        User::find_by_email(pool, &email)
    })
    .await?
    .ok_or_else(|| TaskMateError::unauthorized(INVALID_CREDENTIALS))?;

    if !verify_blocking(password.to_string(), user.password_hash.clone()).await? {
        tracing::info!(user_id = %user.id, "Login rejected: wrong password");
        return Err(TaskMateError::unauthorized(INVALID_CREDENTIALS));
    }

    let session = sessions.issue(user.id, now).await?;
    tracing::info!(user_id = %user.id, "User logged in");

    Ok(SignedIn {
        user: user.into(),
        session,
    })
}

/// The user behind a session, if the session is live and the user still exists.
pub async fn current_user(
    pool: &PgPool,
    sessions: &SessionManager,
    session_id: &str,
    now: DateTime<Utc>,
) -> TaskMateResult<Option<PublicUser>> {
    let Some(user_id) = sessions.resolve(session_id, now).await? else {
        return Ok(None);
    };

    let user = with_retry(&RetryPolicy::default(), "find_user_by_id", || {
        User::find_by_id(pool, user_id)
    })
    .await?;

    Ok(user.map(PublicUser::from))
}

pub async fn logout(sessions: &SessionManager, session_id: &str) -> TaskMateResult<()> {
    sessions.revoke(session_id).await?;
    Ok(())
}

// Argon2 with 64 MiB of memory is too slow for the async executor.
async fn hash_blocking(password: String) -> TaskMateResult<String> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| TaskMateError::Internal(format!("password hashing task failed: {}", e)))?
        .map_err(TaskMateError::from)
}

async fn verify_blocking(password: String, hash: String) -> TaskMateResult<bool> {
    tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| TaskMateError::Internal(format!("password verification task failed: {}", e)))?
        .map_err(TaskMateError::from)
}

/// Request authentication
///
/// [`authenticate`] turns a raw `Cookie` header into an [`AuthContext`]. The
/// HTTP layer calls it once per protected request and stores the context in
/// the request extensions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::cookie::session_id_from_cookies;
use super::session::SessionManager;
use crate::db::query::{with_retry, RetryPolicy};
use crate::error::TaskMateError;
use crate::models::user::User;

/// The authenticated caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub email: String,
    pub name: String,

    /// The session the request came in on, for logout
    #[serde(skip)]
    pub session_id: String,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("No session found")]
    MissingSession,

    #[error("Invalid session")]
    InvalidSession,

    #[error(transparent)]
    Backend(#[from] TaskMateError),
}

impl From<sqlx::Error> for AuthError {
    fn from(err: sqlx::Error) -> Self {
        AuthError::Backend(err.into())
    }
}

impl From<AuthError> for TaskMateError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Backend(inner) => inner,
            other => TaskMateError::Authorization(other.to_string()),
        }
    }
}

/// Resolves the session cookie in `cookie_header` to a user.
///
/// # Errors
///
/// - `MissingSession` when there is no session cookie
/// - `InvalidSession` when the session is unknown, expired, or its user is gone
pub async fn authenticate(
    pool: &PgPool,
    sessions: &SessionManager,
    cookie_header: Option<&str>,
    now: DateTime<Utc>,
) -> Result<AuthContext, AuthError> {
    let session_id = cookie_header
        .and_then(session_id_from_cookies)
        .ok_or(AuthError::MissingSession)?;

    let user_id = sessions
        .resolve(&session_id, now)
        .await
        .map_err(TaskMateError::from)?
        .ok_or(AuthError::InvalidSession)?;

    let user = with_retry(&RetryPolicy::default(), "authenticate_user", || {
        User::find_by_id(pool, user_id)
    })
    .await?
    .ok_or(AuthError::InvalidSession)?;

    Ok(AuthContext {
        user_id: user.id,
        email: user.email,
        name: user.name,
        session_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::session::MemorySessionStore;
    use sqlx::postgres::PgPoolOptions;
    use std::sync::Arc;

    fn offline_pool() -> PgPool {
        PgPoolOptions::new()
            .connect_lazy("postgresql://localhost/taskmate_offline")
            .expect("valid url")
    }

    #[tokio::test]
    async fn test_missing_cookie() {
        let sessions = SessionManager::new(Arc::new(MemorySessionStore::new()));

        let err = authenticate(&offline_pool(), &sessions, None, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::MissingSession));

        let err = authenticate(&offline_pool(), &sessions, Some("theme=dark"), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::MissingSession));
    }

    #[tokio::test]
    async fn test_unknown_session() {
        let sessions = SessionManager::new(Arc::new(MemorySessionStore::new()));

        let err = authenticate(
            &offline_pool(),
            &sessions,
            Some("taskmate-session=forged"),
            Utc::now(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AuthError::InvalidSession));
    }

    #[tokio::test]
    async fn test_expired_session() {
        let sessions = SessionManager::new(Arc::new(MemorySessionStore::new()));
        let issued_at = Utc::now() - chrono::Duration::hours(48);
        let issued = sessions.issue(Uuid::new_v4(), issued_at).await.unwrap();
        let header = format!("taskmate-session={}", issued.id);

        let err = authenticate(&offline_pool(), &sessions, Some(&header), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidSession));
    }

    #[test]
    fn test_auth_error_maps_to_authorization() {
        let err: TaskMateError = AuthError::InvalidSession.into();
        assert!(matches!(err, TaskMateError::Authorization(ref m) if m == "Invalid session"));

        let err: TaskMateError = AuthError::MissingSession.into();
        assert_eq!(err.to_string(), "No session found");
    }
}

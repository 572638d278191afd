/// Authentication
///
/// - `password`: Argon2id hashing and the registration length rule
/// - `session`: session records, stores (Redis / in-memory) and the manager
/// - `cookie`: reading and writing the `taskmate-session` cookie
/// - `account`: register, login, current user, logout
/// - `middleware`: cookie header to [`middleware::AuthContext`]
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use chrono::Utc;
/// use taskmate_shared::auth::account::{login, register, Registration};
/// use taskmate_shared::auth::session::{MemorySessionStore, SessionManager};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), Box<dyn std::error::Error>> {
/// let sessions = SessionManager::new(Arc::new(MemorySessionStore::new()));
///
/// register(
///     &pool,
///     &sessions,
///     Registration {
///         email: "ada@example.com".into(),
///         password: "secret1".into(),
///         name: "Ada".into(),
///     },
///     Utc::now(),
/// )
/// .await?;
///
/// let signed_in = login(&pool, &sessions, "ada@example.com", "secret1", Utc::now()).await?;
/// println!("session {}", signed_in.session.id);
/// # Ok(())
/// # }
/// ```

pub mod account;
pub mod cookie;
pub mod middleware;
pub mod password;
pub mod session;

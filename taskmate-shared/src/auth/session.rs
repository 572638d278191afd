/// Server-side sessions
///
/// A session is an opaque random id (the cookie value) mapped to a
/// [`SessionRecord`]. Records live in a [`SessionStore`]:
///
/// - [`RedisSessionStore`] for deployments; entries carry a Redis TTL so they
///   expire even if nobody reads them again.
/// - [`MemorySessionStore`] for development and tests.
///
/// Store keys are `session:{sha256(id)}`, so a leaked store dump does not
/// reveal usable cookie values.
///
/// [`SessionManager`] is the only thing the rest of the code talks to.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use chrono::Utc;
/// use taskmate_shared::auth::session::{MemorySessionStore, SessionManager};
/// use uuid::Uuid;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let sessions = SessionManager::new(Arc::new(MemorySessionStore::new()));
/// let user_id = Uuid::new_v4();
///
/// let issued = sessions.issue(user_id, Utc::now()).await?;
/// assert_eq!(sessions.resolve(&issued.id, Utc::now()).await?, Some(user_id));
///
/// sessions.revoke(&issued.id).await?;
/// assert_eq!(sessions.resolve(&issued.id, Utc::now()).await?, None);
/// # Ok(())
/// # }
/// ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::{distributions::Alphanumeric, Rng};
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::redis::RedisClient;

/// Session lifetime unless configured otherwise
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Length of a generated session id
pub const SESSION_ID_LENGTH: usize = 48;

#[derive(Debug, thiserror::Error)]
pub enum SessionStoreError {
    #[error("session backend error: {0}")]
    Backend(String),

    #[error("session record is not valid JSON: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("session backend did not answer within {0:?}")]
    Timeout(Duration),
}

impl From<redis::RedisError> for SessionStoreError {
    fn from(err: redis::RedisError) -> Self {
        SessionStoreError::Backend(err.to_string())
    }
}

/// What a session id resolves to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

impl SessionRecord {
    /// A record is usable strictly before its expiry instant.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

/// Storage backend for session records
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, session_id: &str) -> Result<Option<SessionRecord>, SessionStoreError>;

    /// Stores `record`; the backend may drop it after `ttl`.
    async fn put(
        &self,
        session_id: &str,
        record: &SessionRecord,
        ttl: Duration,
    ) -> Result<(), SessionStoreError>;

    async fn delete(&self, session_id: &str) -> Result<(), SessionStoreError>;
}

/// Store key for a session id
pub fn session_key(session_id: &str) -> String {
    format!("session:{}", hex::encode(Sha256::digest(session_id.as_bytes())))
}

/// Random alphanumeric id of [`SESSION_ID_LENGTH`] characters
pub fn generate_session_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SESSION_ID_LENGTH)
        .map(char::from)
        .collect()
}

/// Runs one backend command, giving up after `limit`.
async fn bounded<T, F>(limit: Duration, command: F) -> Result<T, SessionStoreError>
where
    F: std::future::Future<Output = Result<T, redis::RedisError>>,
{
    match tokio::time::timeout(limit, command).await {
        Ok(result) => Ok(result?),
        Err(_) => {
            tracing::warn!(timeout = ?limit, "Session store command timed out");
            Err(SessionStoreError::Timeout(limit))
        }
    }
}

/// Redis-backed store using `SET key value EX ttl`
///
/// Every command is bounded by the client's command timeout, so a stalled
/// Redis fails the request instead of hanging it.
#[derive(Clone)]
pub struct RedisSessionStore {
    client: RedisClient,
}

impl RedisSessionStore {
    pub fn new(client: RedisClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn get(&self, session_id: &str) -> Result<Option<SessionRecord>, SessionStoreError> {
        let mut conn = self.client.connection();
        let value = bounded(
            self.client.command_timeout(),
            conn.get::<_, Option<String>>(session_key(session_id)),
        )
        .await?;

        match value {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn put(
        &self,
        session_id: &str,
        record: &SessionRecord,
        ttl: Duration,
    ) -> Result<(), SessionStoreError> {
        let mut conn = self.client.connection();
        let value = serde_json::to_string(record)?;

        bounded(
            self.client.command_timeout(),
            conn.set_ex::<_, _, ()>(session_key(session_id), value, ttl.as_secs().max(1)),
        )
        .await
    }

    async fn delete(&self, session_id: &str) -> Result<(), SessionStoreError> {
        let mut conn = self.client.connection();
        bounded(self.client.command_timeout(), conn.del::<_, ()>(session_key(session_id))).await
    }
}

/// Process-local store. Sessions do not survive a restart and are not
/// shared between instances.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    entries: RwLock<HashMap<String, SessionRecord>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, session_id: &str) -> Result<Option<SessionRecord>, SessionStoreError> {
        Ok(self.entries.read().await.get(&session_key(session_id)).copied())
    }

    async fn put(
        &self,
        session_id: &str,
        record: &SessionRecord,
        _ttl: Duration,
    ) -> Result<(), SessionStoreError> {
        self.entries
            .write()
            .await
            .insert(session_key(session_id), *record);
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> Result<(), SessionStoreError> {
        self.entries.write().await.remove(&session_key(session_id));
        Ok(())
    }
}

/// A freshly issued session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedSession {
    /// Cookie value
    pub id: String,
    pub expires_at: DateTime<Utc>,
}

/// Issues, resolves and revokes sessions against a store
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    ttl: Duration,
}

impl SessionManager {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self::with_ttl(store, DEFAULT_SESSION_TTL)
    }

    pub fn with_ttl(store: Arc<dyn SessionStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Creates a session for `user_id` valid for the configured TTL.
    pub async fn issue(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<IssuedSession, SessionStoreError> {
        let id = generate_session_id();
        let lifetime = chrono::Duration::from_std(self.ttl)
            .map_err(|e| SessionStoreError::Backend(format!("session ttl out of range: {}", e)))?;
        let record = SessionRecord {
            user_id,
            expires_at: now + lifetime,
        };

        self.store.put(&id, &record, self.ttl).await?;
        tracing::debug!(user_id = %user_id, expires_at = %record.expires_at, "Session issued");

        Ok(IssuedSession {
            id,
            expires_at: record.expires_at,
        })
    }

    /// The user a session belongs to, if it exists and has not expired.
    ///
    /// Expired records are deleted on the way out.
    pub async fn resolve(&self, session_id: &str, now: DateTime<Utc>) -> Result<Option<Uuid>, SessionStoreError> {
        if session_id.is_empty() {
            return Ok(None);
        }

        match self.store.get(session_id).await? {
            Some(record) if record.is_valid_at(now) => Ok(Some(record.user_id)),
            Some(record) => {
                tracing::debug!(user_id = %record.user_id, "Session expired");
                self.store.delete(session_id).await?;
                Ok(None)
            }
            None => Ok(None),
        }
    }

    pub async fn revoke(&self, session_id: &str) -> Result<(), SessionStoreError> {
        self.store.delete(session_id).await
    }
}

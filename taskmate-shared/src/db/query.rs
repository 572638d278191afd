/// Retry and transaction helpers
///
/// Two rules govern how TaskMate talks to Postgres:
///
/// - Idempotent reads and the single-statement cleanup sweep go through
///   [`with_retry`], which re-runs them on transient connection failures.
/// - Multi-statement writes go through [`with_transaction`] and are never
///   retried, so a partial write can not be applied twice.
///
/// # Example
///
/// ```no_run
/// use futures::FutureExt;
/// use taskmate_shared::db::query::{with_retry, with_transaction, RetryPolicy};
/// use taskmate_shared::error::TaskMateError;
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), TaskMateError> {
/// let users: i64 = with_retry(&RetryPolicy::default(), "count_users", || {
///     sqlx::query_scalar("SELECT COUNT(*) FROM users").fetch_one(&pool)
/// })
/// .await?;
///
/// with_transaction(&pool, |conn| {
///     async move {
///         sqlx::query("UPDATE users SET updated_at = NOW()").execute(&mut *conn).await?;
///         Ok::<_, TaskMateError>(())
///     }
///     .boxed()
/// })
/// .await?;
/// # Ok(())
/// # }
/// ```

use futures::future::BoxFuture;
use sqlx::{PgConnection, PgPool};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// How often and how patiently to retry a transient failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,

    /// Pause between attempts
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            delay: Duration::ZERO,
        }
    }
}

/// Whether an error is worth retrying.
///
/// Transient: I/O, TLS, pool exhaustion, the Postgres `08` connection
/// exception class, and the `57P01`..`57P03` shutdown codes.
pub fn is_transient(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Io(_) | sqlx::Error::Tls(_) | sqlx::Error::PoolTimedOut => true,
        sqlx::Error::Database(db_err) => db_err
            .code()
            .map(|code| code.starts_with("08") || matches!(&*code, "57P01" | "57P02" | "57P03"))
            .unwrap_or(false),
        _ => false,
    }
}

/// Runs `op` until it succeeds, fails with a non-transient error, or the
/// policy runs out of attempts.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    operation: &str,
    mut op: F,
) -> Result<T, sqlx::Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, sqlx::Error>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < max_attempts && is_transient(&err) => {
                warn!(
                    operation,
                    attempt,
                    max_attempts,
                    error = %err,
                    "Transient database error, retrying"
                );
                tokio::time::sleep(policy.delay).await;
                attempt += 1;
            }
            Err(err) => {
                if attempt > 1 {
                    warn!(operation, attempt, error = %err, "Giving up after retries");
                }
                return Err(err);
            }
        }
    }
}

/// Runs `op` inside a transaction.
///
/// Commits when `op` returns `Ok`, rolls back otherwise. A failed rollback is
/// logged and the original error is returned.
pub async fn with_transaction<T, E, F>(pool: &PgPool, op: F) -> Result<T, E>
where
    F: for<'c> FnOnce(&'c mut PgConnection) -> BoxFuture<'c, Result<T, E>>,
    E: From<sqlx::Error>,
{
    let mut tx = pool.begin().await?;

    match op(&mut *tx).await {
        Ok(value) => {
            tx.commit().await?;
            debug!("Transaction committed");
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                warn!(error = %rollback_err, "Transaction rollback failed");
            } else {
                debug!("Transaction rolled back");
            }
            Err(err)
        }
    }
}

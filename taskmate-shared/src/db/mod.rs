/// Database layer
///
/// - `pool`: connection pool construction, health check and stats
/// - `migrations`: embedded schema migrations
/// - `query`: transient-failure retry and transaction helpers
///
/// Row types and their queries live in the crate-level `models` module.

pub mod migrations;
pub mod pool;
pub mod query;

pub use pool::{create_pool, DatabaseConfig};
pub use query::{with_retry, with_transaction, RetryPolicy};

/// Embedded schema migrations
///
/// SQL files live in `migrations/` at the workspace root and are compiled into
/// the binary with `sqlx::migrate!`, so the API server and the worker always
/// agree on the schema they were built against.
///
/// # Example
///
/// ```no_run
/// use taskmate_shared::db::migrations::{run_migrations, get_migration_status};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), Box<dyn std::error::Error>> {
/// run_migrations(&pool).await?;
/// let status = get_migration_status(&pool).await?;
/// assert!(status.is_up_to_date);
/// # Ok(())
/// # }
/// ```

use sqlx::migrate::{MigrateDatabase, Migrator};
use sqlx::{postgres::PgPool, Postgres};
use tracing::{debug, info, warn};

static MIGRATOR: Migrator = sqlx::migrate!("../migrations");

/// Applied-migration summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStatus {
    /// Successfully applied migrations
    pub applied_migrations: usize,

    /// Migrations compiled into this binary
    pub known_migrations: usize,

    /// Highest applied version
    pub latest_version: Option<i64>,

    pub is_up_to_date: bool,
}

impl MigrationStatus {
    fn from_counts(applied: usize, known: usize, latest_version: Option<i64>) -> Self {
        Self {
            applied_migrations: applied,
            known_migrations: known,
            latest_version,
            is_up_to_date: applied >= known,
        }
    }
}

/// Applies every pending migration.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    info!(known = MIGRATOR.iter().count(), "Running database migrations");

    MIGRATOR.run(pool).await.map_err(|e| {
        warn!(error = %e, "Migration failed");
        e
    })?;

    info!("Database schema is up to date");
    Ok(())
}

/// Reports how many of the embedded migrations have been applied.
pub async fn get_migration_status(pool: &PgPool) -> Result<MigrationStatus, sqlx::Error> {
    let known = MIGRATOR.iter().count();

    let table_exists: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS (
            SELECT FROM information_schema.tables
            WHERE table_schema = 'public' AND table_name = '_sqlx_migrations'
        )
        "#,
    )
    .fetch_one(pool)
    .await?;

    if !table_exists {
        debug!("Migrations table does not exist yet");
        return Ok(MigrationStatus::from_counts(0, known, None));
    }

    let (count, latest_version): (i64, Option<i64>) = sqlx::query_as(
        "SELECT COUNT(*), MAX(version) FROM _sqlx_migrations WHERE success = true",
    )
    .fetch_one(pool)
    .await?;

    debug!(applied = count, known, latest_version = ?latest_version, "Migration status");
    Ok(MigrationStatus::from_counts(count as usize, known, latest_version))
}

/// Creates the database named in `database_url` when it is missing.
///
/// Intended for development and test setups.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), sqlx::Error> {
    if Postgres::database_exists(database_url).await? {
        debug!("Database already exists");
        return Ok(());
    }

    info!("Database does not exist, creating it");
    Postgres::create_database(database_url).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_migrations_present() {
        assert!(MIGRATOR.iter().count() >= 1);
    }

    #[test]
    fn test_status_up_to_date_when_all_applied() {
        let status = MigrationStatus::from_counts(1, 1, Some(20250101000000));
        assert!(status.is_up_to_date);

        let status = MigrationStatus::from_counts(0, 1, None);
        assert!(!status.is_up_to_date);
    }
}

/// Projects group boards and tags. Every user owns exactly one default
/// project, created at registration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;

/// Name of the project created for every new user
pub const DEFAULT_PROJECT_NAME: &str = "My Tasks";

/// Description attached to the default project
pub const DEFAULT_PROJECT_DESCRIPTION: &str = "Default project for personal tasks";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    pub async fn create<'e, E>(
        executor: E,
        owner_id: Uuid,
        name: &str,
        description: Option<&str>,
    ) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Project>(
            r#"
            INSERT INTO projects (name, description, owner_id)
            VALUES ($1, $2, $3)
            RETURNING id, name, description, owner_id, created_at, updated_at
            "#,
        )
        .bind(name)
        .bind(description)
        .bind(owner_id)
        .fetch_one(executor)
        .await
    }

    /// The owner's default project, or `None` if registration never finished.
    pub async fn find_default<'e, E>(executor: E, owner_id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Project>(
            r#"
            SELECT id, name, description, owner_id, created_at, updated_at
            FROM projects
            WHERE owner_id = $1 AND name = $2
            ORDER BY created_at ASC
            LIMIT 1
            "#,
        )
        .bind(owner_id)
        .bind(DEFAULT_PROJECT_NAME)
        .fetch_optional(executor)
        .await
    }
}

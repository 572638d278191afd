/// Tags are per-project labels attached to tasks through `task_tags`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;

/// Color used when a tag is created without one
pub const DEFAULT_TAG_COLOR: &str = "#6B7280";

/// Tags seeded into every new project: (name, color)
pub const DEFAULT_TAGS: [(&str, &str); 5] = [
    ("frontend", "#3B82F6"),
    ("backend", "#10B981"),
    ("urgent", "#EF4444"),
    ("bug", "#F59E0B"),
    ("feature", "#8B5CF6"),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
    pub color: String,
    pub project_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Tag fields embedded in a task's relations (decoded from a JSON aggregate)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagSummary {
    pub id: Uuid,
    pub name: String,
    pub color: String,
}

impl From<&Tag> for TagSummary {
    fn from(tag: &Tag) -> Self {
        Self {
            id: tag.id,
            name: tag.name.clone(),
            color: tag.color.clone(),
        }
    }
}

impl Tag {
    pub async fn create<'e, E>(
        executor: E,
        project_id: Uuid,
        name: &str,
        color: &str,
    ) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Tag>(
            r#"
            INSERT INTO tags (name, color, project_id)
            VALUES ($1, $2, $3)
            RETURNING id, name, color, project_id, created_at
            "#,
        )
        .bind(name)
        .bind(color)
        .bind(project_id)
        .fetch_one(executor)
        .await
    }

    /// Tags of a project, alphabetically.
    pub async fn list_for_project<'e, E>(executor: E, project_id: Uuid) -> Result<Vec<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Tag>(
            r#"
            SELECT id, name, color, project_id, created_at
            FROM tags
            WHERE project_id = $1
            ORDER BY name ASC
            "#,
        )
        .bind(project_id)
        .fetch_all(executor)
        .await
    }

    /// How many of `tag_ids` exist in the project. Duplicates count once.
    pub async fn count_in_project<'e, E>(
        executor: E,
        project_id: Uuid,
        tag_ids: &[Uuid],
    ) -> Result<i64, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(DISTINCT id) FROM tags WHERE project_id = $1 AND id = ANY($2)",
        )
        .bind(project_id)
        .bind(tag_ids)
        .fetch_one(executor)
        .await
    }
}

/// Number of distinct ids in `tag_ids`; compare with [`Tag::count_in_project`].
pub fn distinct_count(tag_ids: &[Uuid]) -> i64 {
    let mut ids = tag_ids.to_vec();
    ids.sort_unstable();
    ids.dedup();
    ids.len() as i64
}

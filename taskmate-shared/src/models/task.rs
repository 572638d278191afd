/// Task model and database operations
///
/// Tasks are read in two shapes:
///
/// - [`Task`]: the bare row, returned by inserts.
/// - [`TaskWithRelations`]: the row joined with its assignee, its board and
///   its tags. The join is decoded into a [`TaskDetailRow`] exactly once and
///   converted with `From`, so the relation mapping lives in one place.
///
/// Every read and write here is scoped to the task's creator; callers pass
/// the authenticated user as `owner`.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE tasks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     title VARCHAR(500) NOT NULL,
///     description TEXT,
///     board_id UUID NOT NULL REFERENCES boards(id) ON DELETE CASCADE,
///     assignee_id UUID REFERENCES users(id) ON DELETE SET NULL,
///     creator_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     priority task_priority NOT NULL DEFAULT 'medium',
///     due_date TIMESTAMPTZ,
///     position INTEGER NOT NULL DEFAULT 0,
///     estimated_hours DOUBLE PRECISION,
///     actual_hours DOUBLE PRECISION,
///     completed_at TIMESTAMPTZ,       -- set only while on the done board
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::{PgConnection, PgExecutor, Postgres, QueryBuilder};
use uuid::Uuid;

use super::board::{BoardSlug, BoardSummary};
use super::tag::TagSummary;

/// Task priority, ordered from least to most pressing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_priority", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl TaskPriority {
    /// Sort weight: urgent = 4 down to low = 1
    pub fn rank(&self) -> u8 {
        match self {
            TaskPriority::Low => 1,
            TaskPriority::Medium => 2,
            TaskPriority::High => 3,
            TaskPriority::Urgent => 4,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::Low => "low",
            TaskPriority::Medium => "medium",
            TaskPriority::High => "high",
            TaskPriority::Urgent => "urgent",
        }
    }
}

/// Bare task row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub board_id: Uuid,
    pub assignee_id: Option<Uuid>,
    pub creator_id: Uuid,
    pub priority: TaskPriority,
    pub due_date: Option<DateTime<Utc>>,
    pub position: i32,
    pub estimated_hours: Option<f64>,
    pub actual_hours: Option<f64>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Assignee fields embedded in a task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssigneeSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

/// A task with its assignee, board and tags
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskWithRelations {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub board_id: Uuid,
    pub assignee_id: Option<Uuid>,
    pub creator_id: Uuid,
    pub priority: TaskPriority,
    pub due_date: Option<DateTime<Utc>>,
    pub position: i32,
    pub estimated_hours: Option<f64>,
    pub actual_hours: Option<f64>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub assignee: Option<AssigneeSummary>,
    #[serde(default)]
    pub board: Option<BoardSummary>,
    #[serde(default)]
    pub tags: Vec<TagSummary>,
}

/// Raw result of the task/assignee/board/tags join
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TaskDetailRow {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub board_id: Uuid,
    pub assignee_id: Option<Uuid>,
    pub creator_id: Uuid,
    pub priority: TaskPriority,
    pub due_date: Option<DateTime<Utc>>,
    pub position: i32,
    pub estimated_hours: Option<f64>,
    pub actual_hours: Option<f64>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub assignee_name: Option<String>,
    pub assignee_email: Option<String>,
    pub assignee_avatar_url: Option<String>,
    pub board_name: String,
    pub board_slug: BoardSlug,
    pub board_color: String,
    pub board_wip_limit: Option<i32>,
    pub tags: Json<Vec<TagSummary>>,
}

impl From<TaskDetailRow> for TaskWithRelations {
    fn from(row: TaskDetailRow) -> Self {
        let assignee = match (row.assignee_id, row.assignee_name, row.assignee_email) {
            (Some(id), Some(name), Some(email)) => Some(AssigneeSummary {
                id,
                name,
                email,
                avatar_url: row.assignee_avatar_url,
            }),
            _ => None,
        };

        let board = BoardSummary {
            id: row.board_id,
            name: row.board_name,
            slug: row.board_slug,
            color: row.board_color,
            wip_limit: row.board_wip_limit,
        };

        Self {
            id: row.id,
            title: row.title,
            description: row.description,
            board_id: row.board_id,
            assignee_id: row.assignee_id,
            creator_id: row.creator_id,
            priority: row.priority,
            due_date: row.due_date,
            position: row.position,
            estimated_hours: row.estimated_hours,
            actual_hours: row.actual_hours,
            completed_at: row.completed_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
            assignee,
            board: Some(board),
            tags: row.tags.0,
        }
    }
}

/// Input for [`Task::insert`]
#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub board_id: Uuid,
    pub assignee_id: Option<Uuid>,
    pub creator_id: Uuid,
    pub priority: TaskPriority,
    pub due_date: Option<DateTime<Utc>>,
    pub estimated_hours: Option<f64>,
    pub position: i32,
}

/// Column changes for [`Task::apply_changes`].
///
/// `None` leaves a column alone; for nullable columns `Some(None)` clears it.
/// Board moves and completion stamps go through the lifecycle module instead.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskChanges {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub assignee_id: Option<Option<Uuid>>,
    pub priority: Option<TaskPriority>,
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub estimated_hours: Option<Option<f64>>,
    pub actual_hours: Option<Option<f64>>,
    pub position: Option<i32>,
}

impl TaskChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.assignee_id.is_none()
            && self.priority.is_none()
            && self.due_date.is_none()
            && self.estimated_hours.is_none()
            && self.actual_hours.is_none()
            && self.position.is_none()
    }

    /// Appends `, column = $n` for every set field.
    fn push_assignments(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        if let Some(title) = &self.title {
            qb.push(", title = ").push_bind(title.clone());
        }
        if let Some(description) = &self.description {
            qb.push(", description = ").push_bind(description.clone());
        }
        if let Some(assignee_id) = self.assignee_id {
            qb.push(", assignee_id = ").push_bind(assignee_id);
        }
        if let Some(priority) = self.priority {
            qb.push(", priority = ").push_bind(priority);
        }
        if let Some(due_date) = self.due_date {
            qb.push(", due_date = ").push_bind(due_date);
        }
        if let Some(estimated_hours) = self.estimated_hours {
            qb.push(", estimated_hours = ").push_bind(estimated_hours);
        }
        if let Some(actual_hours) = self.actual_hours {
            qb.push(", actual_hours = ").push_bind(actual_hours);
        }
        if let Some(position) = self.position {
            qb.push(", position = ").push_bind(position);
        }
    }
}

const TASK_COLUMNS: &str = "id, title, description, board_id, assignee_id, creator_id, priority, \
     due_date, position, estimated_hours, actual_hours, completed_at, created_at, updated_at";

const DETAIL_SELECT: &str = r#"
    SELECT
        t.id, t.title, t.description, t.board_id, t.assignee_id, t.creator_id,
        t.priority, t.due_date, t.position, t.estimated_hours, t.actual_hours,
        t.completed_at, t.created_at, t.updated_at,
        u.name AS assignee_name, u.email AS assignee_email, u.avatar_url AS assignee_avatar_url,
        b.name AS board_name, b.slug AS board_slug, b.color AS board_color,
        b.wip_limit AS board_wip_limit,
        COALESCE(
            json_agg(
                json_build_object('id', tg.id, 'name', tg.name, 'color', tg.color)
                ORDER BY tg.name
            ) FILTER (WHERE tg.id IS NOT NULL),
            '[]'::json
        ) AS tags
    FROM tasks t
    JOIN boards b ON b.id = t.board_id
    LEFT JOIN users u ON u.id = t.assignee_id
    LEFT JOIN task_tags tt ON tt.task_id = t.id
    LEFT JOIN tags tg ON tg.id = tt.tag_id
"#;

impl Task {
    pub async fn insert<'e, E>(executor: E, data: NewTask) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let sql = format!(
            r#"
            INSERT INTO tasks (title, description, board_id, assignee_id, creator_id,
                               priority, due_date, position, estimated_hours)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {TASK_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Task>(&sql)
            .bind(data.title)
            .bind(data.description)
            .bind(data.board_id)
            .bind(data.assignee_id)
            .bind(data.creator_id)
            .bind(data.priority)
            .bind(data.due_date)
            .bind(data.position)
            .bind(data.estimated_hours)
            .fetch_one(executor)
            .await
    }

    /// One task with relations, if `owner` created it.
    pub async fn find_detail<'e, E>(
        executor: E,
        owner: Uuid,
        id: Uuid,
    ) -> Result<Option<TaskWithRelations>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let sql = format!(
            "{DETAIL_SELECT} WHERE t.creator_id = $1 AND t.id = $2 GROUP BY t.id, u.id, b.id"
        );

        let row = sqlx::query_as::<_, TaskDetailRow>(&sql)
            .bind(owner)
            .bind(id)
            .fetch_optional(executor)
            .await?;

        Ok(row.map(TaskWithRelations::from))
    }

    /// All of `owner`'s tasks, optionally restricted to one board, by position.
    pub async fn list_details_for_owner<'e, E>(
        executor: E,
        owner: Uuid,
        board_id: Option<Uuid>,
    ) -> Result<Vec<TaskWithRelations>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let sql = format!(
            r#"{DETAIL_SELECT}
            WHERE t.creator_id = $1 AND ($2::uuid IS NULL OR t.board_id = $2)
            GROUP BY t.id, u.id, b.id
            ORDER BY t.position ASC, t.created_at ASC"#
        );

        let rows = sqlx::query_as::<_, TaskDetailRow>(&sql)
            .bind(owner)
            .bind(board_id)
            .fetch_all(executor)
            .await?;

        Ok(rows.into_iter().map(TaskWithRelations::from).collect())
    }

    /// The board a task currently sits on, if `owner` created it.
    pub async fn current_board<'e, E>(executor: E, owner: Uuid, id: Uuid) -> Result<Option<Uuid>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_scalar::<_, Uuid>("SELECT board_id FROM tasks WHERE id = $1 AND creator_id = $2")
            .bind(id)
            .bind(owner)
            .fetch_optional(executor)
            .await
    }

    /// One past the highest position on the board (1 for an empty board).
    pub async fn next_position<'e, E>(executor: E, board_id: Uuid) -> Result<i32, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_scalar::<_, i32>(
            "SELECT COALESCE(MAX(position), 0) + 1 FROM tasks WHERE board_id = $1",
        )
        .bind(board_id)
        .fetch_one(executor)
        .await
    }

    /// Writes `changes` and bumps `updated_at`. Returns the affected row count
    /// (0 when the task is missing or not `owner`'s).
    pub async fn apply_changes<'e, E>(
        executor: E,
        owner: Uuid,
        id: Uuid,
        changes: &TaskChanges,
    ) -> Result<u64, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE tasks SET updated_at = NOW()");
        changes.push_assignments(&mut qb);
        qb.push(" WHERE id = ").push_bind(id);
        qb.push(" AND creator_id = ").push_bind(owner);

        let result = qb.build().execute(executor).await?;
        Ok(result.rows_affected())
    }

    /// Moves a task to another board and position.
    pub async fn set_board<'e, E>(
        executor: E,
        id: Uuid,
        board_id: Uuid,
        position: i32,
    ) -> Result<(), sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query("UPDATE tasks SET board_id = $2, position = $3, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(board_id)
            .bind(position)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn set_completed_at<'e, E>(
        executor: E,
        id: Uuid,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<(), sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query("UPDATE tasks SET completed_at = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(completed_at)
            .execute(executor)
            .await?;
        Ok(())
    }

    /// Replaces the task's tag set with `tag_ids`.
    pub async fn replace_tags(conn: &mut PgConnection, id: Uuid, tag_ids: &[Uuid]) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM task_tags WHERE task_id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        if tag_ids.is_empty() {
            return Ok(());
        }

        sqlx::query(
            r#"
            INSERT INTO task_tags (task_id, tag_id)
            SELECT $1, tag_id FROM UNNEST($2::uuid[]) AS tag_id
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(id)
        .bind(tag_ids)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Deletes a task owned by `owner`. Tag links cascade.
    pub async fn delete_for_owner<'e, E>(executor: E, owner: Uuid, id: Uuid) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1 AND creator_id = $2")
            .bind(id)
            .bind(owner)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

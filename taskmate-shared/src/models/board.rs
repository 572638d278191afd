/// Board model and database operations
///
/// A board is one lane of the kanban: `backlog`, `todo`, `in_progress` or
/// `done`. Each project has exactly one board per slug, and the `done` board is
/// the one the completion stamp and the cleanup sweep key off.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE boards (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(255) NOT NULL,
///     slug board_slug NOT NULL,
///     description TEXT,
///     project_id UUID NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
///     position INTEGER NOT NULL DEFAULT 0,
///     wip_limit INTEGER,
///     color VARCHAR(16) NOT NULL DEFAULT '#6B7280',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     UNIQUE (project_id, slug)
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use std::fmt;
use uuid::Uuid;

/// Lane identifier, unique within a project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "board_slug", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BoardSlug {
    Backlog,
    Todo,
    InProgress,
    Done,
}

impl BoardSlug {
    pub fn as_str(&self) -> &'static str {
        match self {
            BoardSlug::Backlog => "backlog",
            BoardSlug::Todo => "todo",
            BoardSlug::InProgress => "in_progress",
            BoardSlug::Done => "done",
        }
    }
}

impl fmt::Display for BoardSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Board {
    pub id: Uuid,
    pub name: String,
    pub slug: BoardSlug,
    pub description: Option<String>,
    pub project_id: Uuid,

    /// Left-to-right order on screen
    pub position: i32,

    /// Maximum tasks allowed at once; `None` means unlimited
    pub wip_limit: Option<i32>,

    /// Hex color, e.g. `#3B82F6`
    pub color: String,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Board fields embedded in a task's relations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardSummary {
    pub id: Uuid,
    pub name: String,
    pub slug: BoardSlug,
    pub color: String,
    pub wip_limit: Option<i32>,
}

impl From<&Board> for BoardSummary {
    fn from(board: &Board) -> Self {
        Self {
            id: board.id,
            name: board.name.clone(),
            slug: board.slug,
            color: board.color.clone(),
            wip_limit: board.wip_limit,
        }
    }
}

/// Input for [`Board::create`]
#[derive(Debug, Clone)]
pub struct CreateBoard {
    pub project_id: Uuid,
    pub name: String,
    pub slug: BoardSlug,
    pub description: Option<String>,
    pub position: i32,
    pub wip_limit: Option<i32>,
    pub color: String,
}

/// Template for one of the four boards every project starts with
#[derive(Debug, Clone, Copy)]
pub struct BoardTemplate {
    pub name: &'static str,
    pub slug: BoardSlug,
    pub color: &'static str,
    pub position: i32,
    pub wip_limit: Option<i32>,
}

impl BoardTemplate {
    pub fn into_create(self, project_id: Uuid) -> CreateBoard {
        CreateBoard {
            project_id,
            name: self.name.to_string(),
            slug: self.slug,
            description: Some(format!("{} tasks", self.name)),
            position: self.position,
            wip_limit: self.wip_limit,
            color: self.color.to_string(),
        }
    }
}

pub const DEFAULT_BOARDS: [BoardTemplate; 4] = [
    BoardTemplate {
        name: "Backlog",
        slug: BoardSlug::Backlog,
        color: "#8B5CF6",
        position: 0,
        wip_limit: None,
    },
    BoardTemplate {
        name: "To Do",
        slug: BoardSlug::Todo,
        color: "#6B7280",
        position: 1,
        wip_limit: None,
    },
    BoardTemplate {
        name: "In Progress",
        slug: BoardSlug::InProgress,
        color: "#3B82F6",
        position: 2,
        wip_limit: Some(1),
    },
    BoardTemplate {
        name: "Done",
        slug: BoardSlug::Done,
        color: "#10B981",
        position: 3,
        wip_limit: None,
    },
];

const BOARD_COLUMNS: &str =
    "id, name, slug, description, project_id, position, wip_limit, color, created_at, updated_at";

impl Board {
    pub async fn create<'e, E>(executor: E, data: CreateBoard) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let sql = format!(
            r#"
            INSERT INTO boards (name, slug, description, project_id, position, wip_limit, color)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {BOARD_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Board>(&sql)
            .bind(data.name)
            .bind(data.slug)
            .bind(data.description)
            .bind(data.project_id)
            .bind(data.position)
            .bind(data.wip_limit)
            .bind(data.color)
            .fetch_one(executor)
            .await
    }

    /// All boards of a project, left to right.
    pub async fn list_for_project<'e, E>(executor: E, project_id: Uuid) -> Result<Vec<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let sql = format!("SELECT {BOARD_COLUMNS} FROM boards WHERE project_id = $1 ORDER BY position ASC");

        sqlx::query_as::<_, Board>(&sql)
            .bind(project_id)
            .fetch_all(executor)
            .await
    }

    pub async fn find_by_slug<'e, E>(
        executor: E,
        project_id: Uuid,
        slug: BoardSlug,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let sql = format!("SELECT {BOARD_COLUMNS} FROM boards WHERE project_id = $1 AND slug = $2");

        sqlx::query_as::<_, Board>(&sql)
            .bind(project_id)
            .bind(slug)
            .fetch_optional(executor)
            .await
    }

    /// A board by id, only if it belongs to `project_id`.
    pub async fn find_in_project<'e, E>(
        executor: E,
        project_id: Uuid,
        board_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let sql = format!("SELECT {BOARD_COLUMNS} FROM boards WHERE id = $1 AND project_id = $2");

        sqlx::query_as::<_, Board>(&sql)
            .bind(board_id)
            .bind(project_id)
            .fetch_optional(executor)
            .await
    }

    pub async fn count_tasks<'e, E>(executor: E, board_id: Uuid) -> Result<i64, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM tasks WHERE board_id = $1")
            .bind(board_id)
            .fetch_one(executor)
            .await
    }
}

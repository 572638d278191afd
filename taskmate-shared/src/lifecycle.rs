/// Task lifecycle: moving tasks between boards
///
/// A move does three things, always together in one transaction:
///
/// 1. checks the target board's WIP limit (only when the board changes),
/// 2. updates the task's board and position,
/// 3. stamps or clears `completed_at` when the move crosses the `done` board.
///
/// `completed_at` is written nowhere else, which keeps it non-null exactly
/// while the task sits on the done board.
///
/// # Example
///
/// ```no_run
/// use chrono::Utc;
/// use taskmate_shared::lifecycle::{move_task, MoveTask};
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, owner: Uuid, task: Uuid, done: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// let moved = move_task(&pool, owner, task, MoveTask { board_id: done, position: None }, Utc::now()).await?;
/// assert!(moved.completed_at.is_some());
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::db::query::with_transaction;
use crate::error::{TaskMateError, TaskMateResult};
use crate::models::board::{Board, BoardSlug};
use crate::models::project::Project;
use crate::models::task::{Task, TaskWithRelations};

/// What a board change does to `completed_at`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionTransition {
    /// Entered the done board: stamp `now`
    Complete,
    /// Left the done board: clear
    Reopen,
    /// done to done, or between two non-done boards
    Unchanged,
}

impl CompletionTransition {
    pub fn between(previous_board: Uuid, target_board: Uuid, done_board: Uuid) -> Self {
        match (previous_board == done_board, target_board == done_board) {
            (false, true) => CompletionTransition::Complete,
            (true, false) => CompletionTransition::Reopen,
            _ => CompletionTransition::Unchanged,
        }
    }

    /// The value to write, or `None` to leave the column untouched.
    pub fn completed_at(self, now: DateTime<Utc>) -> Option<Option<DateTime<Utc>>> {
        match self {
            CompletionTransition::Complete => Some(Some(now)),
            CompletionTransition::Reopen => Some(None),
            CompletionTransition::Unchanged => None,
        }
    }
}

/// Outcome of a WIP-limit check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WipLimitResult {
    pub can_move: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub current_count: i64,
    pub limit: Option<i32>,
}

/// Whether one more task fits on `board` given its current task count.
pub fn check_wip_limit(board: &Board, current_count: i64) -> WipLimitResult {
    match board.wip_limit {
        Some(limit) if current_count >= i64::from(limit) => WipLimitResult {
            can_move: false,
            reason: Some(format!(
                "WIP limit reached for board {} ({}/{})",
                board.name, current_count, limit
            )),
            current_count,
            limit: Some(limit),
        },
        limit => WipLimitResult {
            can_move: true,
            reason: None,
            current_count,
            limit,
        },
    }
}

/// Request to move a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveTask {
    pub board_id: Uuid,

    /// Target position; the end of the target board when omitted
    #[serde(default)]
    pub position: Option<i32>,
}

/// What [`relocate`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relocation {
    pub from_board: Uuid,
    pub to_board: Uuid,
    pub transition: CompletionTransition,
}

/// Moves a task and returns it with relations.
pub async fn move_task(
    pool: &PgPool,
    owner: Uuid,
    task_id: Uuid,
    request: MoveTask,
    now: DateTime<Utc>,
) -> TaskMateResult<TaskWithRelations> {
    with_transaction(pool, move |conn| {
        async move {
            relocate(conn, owner, task_id, request.board_id, request.position, now).await?;
            Task::find_detail(&mut *conn, owner, task_id)
                .await?
                .ok_or_else(TaskMateError::task_not_found)
        }
        .boxed()
    })
    .await
}

/// Applies a board change inside an open transaction.
///
/// Also used by task updates that carry a `board_id`.
pub async fn relocate(
    conn: &mut PgConnection,
    owner: Uuid,
    task_id: Uuid,
    target_board_id: Uuid,
    position: Option<i32>,
    now: DateTime<Utc>,
) -> TaskMateResult<Relocation> {
    let from_board = Task::current_board(&mut *conn, owner, task_id)
        .await?
        .ok_or_else(TaskMateError::task_not_found)?;

    let project = Project::find_default(&mut *conn, owner)
        .await?
        .ok_or_else(|| TaskMateError::unauthorized("Default project not found"))?;

    let done = Board::find_by_slug(&mut *conn, project.id, BoardSlug::Done)
        .await?
        .ok_or_else(|| TaskMateError::unauthorized("Done board not found"))?;

    let target = Board::find_in_project(&mut *conn, project.id, target_board_id)
        .await?
        .ok_or_else(|| TaskMateError::unauthorized("Board not found or access denied"))?;

    let board_changed = from_board != target.id;

    if board_changed {
        let count = Board::count_tasks(&mut *conn, target.id).await?;
        let check = check_wip_limit(&target, count);
        if !check.can_move {
            let reason = check.reason.unwrap_or_else(|| "WIP limit reached".to_string());
            tracing::info!(task_id = %task_id, board_id = %target.id, count, "Move blocked by WIP limit");
            return Err(TaskMateError::invalid_field(reason, "board_id"));
        }
    }

    let position = match position {
        Some(position) => Some(position),
        None if board_changed => Some(Task::next_position(&mut *conn, target.id).await?),
        None => None,
    };

    if let Some(position) = position {
        Task::set_board(&mut *conn, task_id, target.id, position).await?;
    }

    let transition = CompletionTransition::between(from_board, target.id, done.id);
    if let Some(completed_at) = transition.completed_at(now) {
        Task::set_completed_at(&mut *conn, task_id, completed_at).await?;
    }

    tracing::info!(
        task_id = %task_id,
        from_board = %from_board,
        to_board = %target.id,
        transition = ?transition,
        "Task moved"
    );

    Ok(Relocation {
        from_board,
        to_board: target.id,
        transition,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board(name: &str, wip_limit: Option<i32>) -> Board {
        Board {
            id: Uuid::new_v4(),
            name: name.to_string(),
            slug: BoardSlug::InProgress,
            description: None,
            project_id: Uuid::new_v4(),
            position: 2,
            wip_limit,
            color: "#3B82F6".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_entering_done_stamps_completion() {
        let (todo, done) = (Uuid::new_v4(), Uuid::new_v4());
        let now = Utc::now();

        let transition = CompletionTransition::between(todo, done, done);
        assert_eq!(transition, CompletionTransition::Complete);
        assert_eq!(transition.completed_at(now), Some(Some(now)));
    }

    #[test]
    fn test_leaving_done_clears_completion() {
        let (todo, done) = (Uuid::new_v4(), Uuid::new_v4());

        let transition = CompletionTransition::between(done, todo, done);
        assert_eq!(transition, CompletionTransition::Reopen);
        assert_eq!(transition.completed_at(Utc::now()), Some(None));
    }

    #[test]
    fn test_other_moves_leave_completion_alone() {
        let (backlog, todo, done) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

        assert_eq!(
            CompletionTransition::between(done, done, done),
            CompletionTransition::Unchanged
        );
        assert_eq!(
            CompletionTransition::between(backlog, todo, done),
            CompletionTransition::Unchanged
        );
        assert_eq!(CompletionTransition::Unchanged.completed_at(Utc::now()), None);
    }

    #[test]
    fn test_wip_limit_reached() {
        let result = check_wip_limit(&board("In Progress", Some(1)), 1);

        assert!(!result.can_move);
        assert_eq!(result.current_count, 1);
        assert_eq!(result.limit, Some(1));
        assert_eq!(
            result.reason.as_deref(),
            Some("WIP limit reached for board In Progress (1/1)")
        );
    }

    #[test]
    fn test_wip_limit_has_room() {
        let result = check_wip_limit(&board("In Progress", Some(3)), 2);
        assert!(result.can_move);
        assert!(result.reason.is_none());
    }

    #[test]
    fn test_unlimited_board_always_accepts() {
        let result = check_wip_limit(&board("Backlog", None), 500);
        assert!(result.can_move);
        assert_eq!(result.limit, None);
    }

    #[test]
    fn test_wip_result_serializes_camel_case() {
        let json = serde_json::to_value(check_wip_limit(&board("In Progress", Some(1)), 1)).unwrap();
        assert_eq!(json["canMove"], false);
        assert_eq!(json["currentCount"], 1);
    }

    #[test]
    fn test_move_request_position_optional() {
        let board_id = Uuid::new_v4();
        let request: MoveTask = serde_json::from_str(&format!("{{\"board_id\":\"{}\"}}", board_id)).unwrap();
        assert_eq!(request.board_id, board_id);
        assert_eq!(request.position, None);
    }
}

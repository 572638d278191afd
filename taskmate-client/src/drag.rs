/// Drag-and-drop between boards
///
/// A drag tracks the task being carried and the board under the pointer.
/// Dropping produces a [`MoveTaskCommand`] only when the target is a loaded
/// board other than the task's own; reordering within a board is not a move.

use taskmate_shared::models::Board;
use uuid::Uuid;

use crate::command::MoveTaskCommand;
use crate::store::TaskStore;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DragState {
    active_task: Option<Uuid>,
    over_board: Option<Uuid>,
}

impl DragState {
    pub fn start(&mut self, task_id: Uuid) {
        self.active_task = Some(task_id);
        self.over_board = None;
    }

    pub fn hover(&mut self, board_id: Option<Uuid>) {
        if self.active_task.is_some() {
            self.over_board = board_id;
        }
    }

    pub fn cancel(&mut self) {
        *self = Self::default();
    }

    pub fn active_task(&self) -> Option<Uuid> {
        self.active_task
    }

    pub fn over_board(&self) -> Option<Uuid> {
        self.over_board
    }

    pub fn is_dragging(&self) -> bool {
        self.active_task.is_some()
    }

    /// Ends the drag and resolves the drop against `store`.
    pub fn finish(&mut self, store: &TaskStore) -> Option<MoveTaskCommand> {
        let DragState {
            active_task,
            over_board,
        } = std::mem::take(self);
        resolve_drop(store, active_task?, over_board?)
    }
}

pub fn resolve_drop(store: &TaskStore, task_id: Uuid, target_board: Uuid) -> Option<MoveTaskCommand> {
    let task = store.task(task_id)?;
    store.board(target_board)?;

    if task.board_id == target_board {
        return None;
    }

    tracing::debug!(task_id = %task_id, board_id = %target_board, "Task dropped on board");
    Some(MoveTaskCommand::new(task_id, target_board, None))
}

/// WIP badge state for a board header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WipStatus {
    pub count: usize,
    pub limit: Option<i32>,

    /// No room for another task
    pub limit_reached: bool,

    /// More tasks than the limit allows
    pub over_limit: bool,
}

impl WipStatus {
    pub fn for_board(board: &Board, count: usize) -> Self {
        let (limit_reached, over_limit) = match board.wip_limit {
            Some(limit) => {
                let limit = usize::try_from(limit).unwrap_or(0);
                (count >= limit, count > limit)
            }
            None => (false, false),
        };

        Self {
            count,
            limit: board.wip_limit,
            limit_reached,
            over_limit,
        }
    }
}

/// Local mirror of the server's kanban state
///
/// `tasks` is the source of truth; each board's `tasks` list and `task_count`
/// are rebuilt from it after every mutation, ordered by position.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use taskmate_shared::actions::{BoardWithTasks, CreateTask, UpdateTask};
use taskmate_shared::models::{BoardSlug, BoardSummary, PublicUser, Tag, TagSummary, TaskWithRelations};
use uuid::Uuid;

use crate::error::{ClientError, ClientResult};
use crate::filter::{filter_and_sort, FilterOptions};

#[derive(Debug, Clone, Default)]
pub struct TaskStore {
    tasks: Vec<TaskWithRelations>,
    boards: Vec<BoardWithTasks>,
    users: Vec<PublicUser>,
    tags: Vec<Tag>,
    filters: FilterOptions,
    loading: bool,
    error: Option<String>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tasks(&self) -> &[TaskWithRelations] {
        &self.tasks
    }

    pub fn boards(&self) -> &[BoardWithTasks] {
        &self.boards
    }

    pub fn users(&self) -> &[PublicUser] {
        &self.users
    }

    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    pub fn filters(&self) -> &FilterOptions {
        &self.filters
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn task(&self, id: Uuid) -> Option<&TaskWithRelations> {
        self.tasks.iter().find(|task| task.id == id)
    }

    pub fn board(&self, id: Uuid) -> Option<&BoardWithTasks> {
        self.boards.iter().find(|board| board.board.id == id)
    }

    /// Replaces the boards and takes their tasks as the task list.
    pub fn set_boards(&mut self, boards: Vec<BoardWithTasks>) {
        self.tasks = boards.iter().flat_map(|board| board.tasks.iter().cloned()).collect();
        self.boards = boards;
        self.sync_boards();
    }

    pub fn set_tasks(&mut self, tasks: Vec<TaskWithRelations>) {
        self.tasks = tasks;
        self.sync_boards();
    }

    pub fn set_users(&mut self, users: Vec<PublicUser>) {
        self.users = users;
    }

    pub fn set_tags(&mut self, tags: Vec<Tag>) {
        self.tags = tags;
    }

    pub fn set_filters(&mut self, filters: FilterOptions) {
        self.filters = filters;
    }

    pub fn clear_filters(&mut self) {
        self.filters = FilterOptions::default();
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    pub fn set_error(&mut self, error: impl Into<String>) {
        self.error = Some(error.into());
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    /// Adds a not-yet-saved task under a temporary id and returns that id.
    ///
    /// The task goes to the end of its board.
    pub fn add_task(&mut self, input: &CreateTask, creator_id: Uuid, now: DateTime<Utc>) -> ClientResult<Uuid> {
        let board_id = input
            .board_id
            .ok_or_else(|| ClientError::Invalid("Board ID is required".to_string()))?;
        if input.title.trim().is_empty() {
            return Err(ClientError::Invalid("Task title is required".to_string()));
        }

        let id = Uuid::new_v4();
        let task = TaskWithRelations {
            id,
            title: input.title.trim().to_string(),
            description: input.description.clone(),
            board_id,
            assignee_id: input.assignee_id,
            creator_id,
            priority: input.priority,
            due_date: input.due_date,
            position: self.next_position(board_id),
            estimated_hours: input.estimated_hours,
            actual_hours: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
            assignee: None,
            board: self.board_summary(board_id),
            tags: self.tag_summaries(&input.tag_ids),
        };

        self.tasks.push(task);
        self.sync_boards();
        Ok(id)
    }

    /// Applies an update locally. Returns `false` if the task is not loaded.
    pub fn update_task(&mut self, id: Uuid, changes: &UpdateTask, now: DateTime<Utc>) -> bool {
        let board = changes.board_id.map(|board_id| (board_id, self.board_summary(board_id)));
        let tags = changes.tag_ids.as_deref().map(|ids| self.tag_summaries(ids));

        let Some(task) = self.tasks.iter_mut().find(|task| task.id == id) else {
            return false;
        };

        if let Some(title) = &changes.title {
            task.title = title.trim().to_string();
        }
        if let Some(description) = &changes.description {
            task.description = description.clone();
        }
        if let Some(assignee_id) = changes.assignee_id {
            task.assignee_id = assignee_id;
            task.assignee = None;
        }
        if let Some(priority) = changes.priority {
            task.priority = priority;
        }
        if let Some(due_date) = changes.due_date {
            task.due_date = due_date;
        }
        if let Some(estimated_hours) = changes.estimated_hours {
            task.estimated_hours = estimated_hours;
        }
        if let Some(actual_hours) = changes.actual_hours {
            task.actual_hours = actual_hours;
        }
        if let Some(position) = changes.position {
            task.position = position;
        }
        if let Some((board_id, summary)) = board {
            task.board_id = board_id;
            task.board = summary;
        }
        if let Some(tags) = tags {
            task.tags = tags;
        }
        task.updated_at = now;

        self.sync_boards();
        true
    }

    /// Moves a task to another board, at `position` or its current one.
    pub fn move_task(&mut self, id: Uuid, board_id: Uuid, position: Option<i32>, now: DateTime<Utc>) -> bool {
        let summary = self.board_summary(board_id);

        let Some(task) = self.tasks.iter_mut().find(|task| task.id == id) else {
            return false;
        };
        task.board_id = board_id;
        task.board = summary;
        if let Some(position) = position {
            task.position = position;
        }
        task.updated_at = now;

        self.sync_boards();
        true
    }

    pub fn remove_task(&mut self, id: Uuid) -> Option<TaskWithRelations> {
        let index = self.tasks.iter().position(|task| task.id == id)?;
        let removed = self.tasks.remove(index);
        self.sync_boards();
        Some(removed)
    }

    /// Puts a task back, replacing any task with the same id.
    pub fn insert_task(&mut self, task: TaskWithRelations) {
        self.tasks.retain(|existing| existing.id != task.id);
        self.tasks.push(task);
        self.sync_boards();
    }

    /// Swaps the task stored under `id` for `task`, which may carry a new id.
    pub fn replace_task(&mut self, id: Uuid, task: TaskWithRelations) {
        if task.id != id {
            self.tasks.retain(|existing| existing.id != task.id);
        }
        match self.tasks.iter().position(|existing| existing.id == id) {
            Some(index) => self.tasks[index] = task,
            None => self.tasks.push(task),
        }
        self.sync_boards();
    }

    pub fn tasks_by_board(&self, board_id: Uuid) -> Vec<&TaskWithRelations> {
        self.tasks.iter().filter(|task| task.board_id == board_id).collect()
    }

    pub fn board_by_slug(&self, slug: BoardSlug) -> Option<&BoardWithTasks> {
        self.boards.iter().find(|board| board.board.slug == slug)
    }

    /// One board's tasks through the current filters.
    pub fn filtered_and_sorted(&self, board_id: Uuid, now: DateTime<Utc>) -> Vec<TaskWithRelations> {
        filter_and_sort(&self.tasks, board_id, &self.filters, now)
    }

    fn next_position(&self, board_id: Uuid) -> i32 {
        self.tasks
            .iter()
            .filter(|task| task.board_id == board_id)
            .map(|task| task.position)
            .max()
            .unwrap_or(0)
            + 1
    }

    fn board_summary(&self, board_id: Uuid) -> Option<BoardSummary> {
        self.board(board_id).map(|board| BoardSummary::from(&board.board))
    }

    fn tag_summaries(&self, ids: &[Uuid]) -> Vec<TagSummary> {
        let by_id: HashMap<Uuid, &Tag> = self.tags.iter().map(|tag| (tag.id, tag)).collect();
        ids.iter()
            .filter_map(|id| by_id.get(id))
            .map(|tag| TagSummary {
                id: tag.id,
                name: tag.name.clone(),
                color: tag.color.clone(),
            })
            .collect()
    }

    fn sync_boards(&mut self) {
        for board in &mut self.boards {
            let mut tasks: Vec<TaskWithRelations> = self
                .tasks
                .iter()
                .filter(|task| task.board_id == board.board.id)
                .cloned()
                .collect();
            tasks.sort_by_key(|task| task.position);
            board.task_count = tasks.len();
            board.tasks = tasks;
        }
    }
}

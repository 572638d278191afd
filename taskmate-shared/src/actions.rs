/// Owner-scoped task, board, tag and user operations
///
/// Every function takes the authenticated user as `owner` and only ever sees
/// that user's default project and the tasks they created. Reads retry on
/// transient failures; multi-statement writes run in a single transaction.

use chrono::{DateTime, Utc};
use futures::FutureExt;
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::{PgConnection, PgPool};
use std::collections::HashMap;
use uuid::Uuid;

use crate::db::query::{with_retry, with_transaction, RetryPolicy};
use crate::error::{TaskMateError, TaskMateResult};
use crate::lifecycle::relocate;
use crate::models::board::Board;
use crate::models::project::Project;
use crate::models::tag::{distinct_count, Tag, DEFAULT_TAG_COLOR};
use crate::models::task::{NewTask, Task, TaskChanges, TaskPriority, TaskWithRelations};
use crate::models::user::{PublicUser, User};

/// A board with its tasks, as the kanban view renders it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardWithTasks {
    #[serde(flatten)]
    pub board: Board,
    pub tasks: Vec<TaskWithRelations>,
    #[serde(rename = "taskCount")]
    pub task_count: usize,
}

/// Input for [`create_task`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateTask {
    #[serde(default)]
    pub title: String,
    pub description: Option<String>,
    pub board_id: Option<Uuid>,
    pub assignee_id: Option<Uuid>,
    #[serde(default)]
    pub priority: TaskPriority,
    pub due_date: Option<DateTime<Utc>>,
    pub estimated_hours: Option<f64>,
    #[serde(default)]
    pub tag_ids: Vec<Uuid>,
}

/// Input for [`update_task`]
///
/// Absent fields are left alone. For nullable columns an explicit `null`
/// clears the value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateTask {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub board_id: Option<Uuid>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub assignee_id: Option<Option<Uuid>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<TaskPriority>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub due_date: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub estimated_hours: Option<Option<f64>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub actual_hours: Option<Option<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_ids: Option<Vec<Uuid>>,
}

// Present-but-null becomes Some(None); absent stays None via #[serde(default)].
fn nullable<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl UpdateTask {
    pub fn has_changes(&self) -> bool {
        self.board_id.is_some() || self.tag_ids.is_some() || !self.column_changes().is_empty()
    }

    fn column_changes(&self) -> TaskChanges {
        TaskChanges {
            title: self.title.as_ref().map(|t| t.trim().to_string()),
            description: self.description.clone(),
            assignee_id: self.assignee_id,
            priority: self.priority,
            due_date: self.due_date,
            estimated_hours: self.estimated_hours,
            actual_hours: self.actual_hours,
            // With a board change the position travels with the move.
            position: if self.board_id.is_some() { None } else { self.position },
        }
    }
}

fn retry() -> RetryPolicy {
    RetryPolicy::default()
}

async fn default_project(pool: &PgPool, owner: Uuid) -> TaskMateResult<Project> {
    with_retry(&retry(), "find_default_project", || Project::find_default(pool, owner))
        .await?
        .ok_or_else(|| TaskMateError::unauthorized("Default project not found"))
}

/// Boards of the owner's default project, each with its tasks.
pub async fn list_boards(pool: &PgPool, owner: Uuid) -> TaskMateResult<Vec<BoardWithTasks>> {
    let project = default_project(pool, owner).await?;

    let boards = with_retry(&retry(), "list_boards", || Board::list_for_project(pool, project.id)).await?;
    let tasks = with_retry(&retry(), "list_tasks", || Task::list_details_for_owner(pool, owner, None)).await?;

    Ok(group_by_board(boards, tasks))
}

/// Attaches tasks to their boards, keeping both orders.
pub fn group_by_board(boards: Vec<Board>, tasks: Vec<TaskWithRelations>) -> Vec<BoardWithTasks> {
    let mut by_board: HashMap<Uuid, Vec<TaskWithRelations>> = HashMap::new();
    for task in tasks {
        by_board.entry(task.board_id).or_default().push(task);
    }

    boards
        .into_iter()
        .map(|board| {
            let tasks = by_board.remove(&board.id).unwrap_or_default();
            BoardWithTasks {
                task_count: tasks.len(),
                board,
                tasks,
            }
        })
        .collect()
}

/// The owner's tasks by position, optionally limited to one board.
pub async fn list_tasks(
    pool: &PgPool,
    owner: Uuid,
    board_id: Option<Uuid>,
) -> TaskMateResult<Vec<TaskWithRelations>> {
    let tasks = with_retry(&retry(), "list_tasks", || {
        Task::list_details_for_owner(pool, owner, board_id)
    })
    .await?;
    Ok(tasks)
}

pub async fn get_task(pool: &PgPool, owner: Uuid, task_id: Uuid) -> TaskMateResult<TaskWithRelations> {
    with_retry(&retry(), "get_task", || Task::find_detail(pool, owner, task_id))
        .await?
        .ok_or_else(TaskMateError::task_not_found)
}

/// Creates a task at the end of its board.
///
/// # Errors
///
/// - `Validation` when the title or board is missing, or a tag id is unknown
/// - `Authorization` when the board is not in the owner's project
pub async fn create_task(pool: &PgPool, owner: Uuid, input: CreateTask) -> TaskMateResult<TaskWithRelations> {
    let title = input.title.trim().to_string();
    if title.is_empty() {
        return Err(TaskMateError::invalid_field("Task title is required", "title"));
    }
    let board_id = input
        .board_id
        .ok_or_else(|| TaskMateError::invalid_field("Board ID is required", "board_id"))?;

    let project = default_project(pool, owner).await?;

    with_transaction(pool, move |conn| {
        async move {
            Board::find_in_project(&mut *conn, project.id, board_id)
                .await?
                .ok_or_else(|| TaskMateError::unauthorized("Board not found or access denied"))?;

            ensure_tags_in_project(conn, project.id, &input.tag_ids).await?;

            let position = Task::next_position(&mut *conn, board_id).await?;
            let task = Task::insert(
                &mut *conn,
                NewTask {
                    title,
                    description: input.description,
                    board_id,
                    assignee_id: input.assignee_id,
                    creator_id: owner,
                    priority: input.priority,
                    due_date: input.due_date,
                    estimated_hours: input.estimated_hours,
                    position,
                },
            )
            .await?;

            if !input.tag_ids.is_empty() {
                Task::replace_tags(conn, task.id, &input.tag_ids).await?;
            }

            tracing::info!(task_id = %task.id, board_id = %board_id, owner = %owner, "Task created");

            Task::find_detail(&mut *conn, owner, task.id)
                .await?
                .ok_or_else(TaskMateError::task_not_found)
        }
        .boxed()
    })
    .await
}

async fn ensure_tags_in_project(conn: &mut PgConnection, project_id: Uuid, tag_ids: &[Uuid]) -> TaskMateResult<()> {
    if tag_ids.is_empty() {
        return Ok(());
    }

    let found = Tag::count_in_project(&mut *conn, project_id, tag_ids).await?;
    if found != distinct_count(tag_ids) {
        return Err(TaskMateError::invalid_field("One or more tags do not exist", "tag_ids"));
    }
    Ok(())
}

/// Applies a partial update.
///
/// A `board_id` goes through the lifecycle rules (WIP check and completion
/// stamp); `tag_ids` replaces the whole tag set.
pub async fn update_task(
    pool: &PgPool,
    owner: Uuid,
    task_id: Uuid,
    update: UpdateTask,
    now: DateTime<Utc>,
) -> TaskMateResult<TaskWithRelations> {
    if !update.has_changes() {
        return Err(TaskMateError::validation("No valid fields to update"));
    }
    if matches!(&update.title, Some(title) if title.trim().is_empty()) {
        return Err(TaskMateError::invalid_field("Task title is required", "title"));
    }

    with_transaction(pool, move |conn| {
        async move {
            if Task::current_board(&mut *conn, owner, task_id).await?.is_none() {
                return Err(TaskMateError::task_not_found());
            }

            if let Some(board_id) = update.board_id {
                relocate(conn, owner, task_id, board_id, update.position, now).await?;
            }

            let changes = update.column_changes();
            if !changes.is_empty() {
                Task::apply_changes(&mut *conn, owner, task_id, &changes).await?;
            }

            if let Some(tag_ids) = &update.tag_ids {
                let project = Project::find_default(&mut *conn, owner)
                    .await?
                    .ok_or_else(|| TaskMateError::unauthorized("Default project not found"))?;
                ensure_tags_in_project(conn, project.id, tag_ids).await?;
                Task::replace_tags(conn, task_id, tag_ids).await?;
            }

            tracing::info!(task_id = %task_id, owner = %owner, "Task updated");

            Task::find_detail(&mut *conn, owner, task_id)
                .await?
                .ok_or_else(TaskMateError::task_not_found)
        }
        .boxed()
    })
    .await
}

pub async fn delete_task(pool: &PgPool, owner: Uuid, task_id: Uuid) -> TaskMateResult<()> {
    if !Task::delete_for_owner(pool, owner, task_id).await? {
        return Err(TaskMateError::task_not_found());
    }

    tracing::info!(task_id = %task_id, owner = %owner, "Task deleted");
    Ok(())
}

/// Tags of the owner's project, alphabetically.
pub async fn list_tags(pool: &PgPool, owner: Uuid) -> TaskMateResult<Vec<Tag>> {
    let project = default_project(pool, owner).await?;
    let tags = with_retry(&retry(), "list_tags", || Tag::list_for_project(pool, project.id)).await?;
    Ok(tags)
}

pub async fn create_tag(pool: &PgPool, owner: Uuid, name: &str, color: Option<&str>) -> TaskMateResult<Tag> {
    let name = name.trim();
    if name.is_empty() {
        return Err(TaskMateError::invalid_field("Tag name is required", "name"));
    }
    let color = color.map(str::trim).filter(|c| !c.is_empty()).unwrap_or(DEFAULT_TAG_COLOR);

    let project = default_project(pool, owner).await?;
    let tag = Tag::create(pool, project.id, name, color).await?;

    tracing::info!(tag_id = %tag.id, owner = %owner, "Tag created");
    Ok(tag)
}

/// Users visible to the owner: only the owner.
pub async fn list_users(pool: &PgPool, owner: Uuid) -> TaskMateResult<Vec<PublicUser>> {
    let user = with_retry(&retry(), "find_user_by_id", || User::find_by_id(pool, owner)).await?;
    Ok(user.into_iter().map(PublicUser::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::board::BoardSlug;
    use sqlx::postgres::PgPoolOptions;

    fn offline_pool() -> PgPool {
        PgPoolOptions::new()
            .connect_lazy("postgresql://localhost/taskmate_offline")
            .expect("valid url")
    }

    fn board(slug: BoardSlug, position: i32) -> Board {
        Board {
            id: Uuid::new_v4(),
            name: slug.to_string(),
            slug,
            description: None,
            project_id: Uuid::nil(),
            position,
            wip_limit: None,
            color: "#6B7280".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn task_on(board_id: Uuid, title: &str) -> TaskWithRelations {
        let now = Utc::now();
        TaskWithRelations {
            id: Uuid::new_v4(),
            title: title.to_string(),
            description: None,
            board_id,
            assignee_id: None,
            creator_id: Uuid::nil(),
            priority: TaskPriority::Medium,
            due_date: None,
            position: 0,
            estimated_hours: None,
            actual_hours: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
            assignee: None,
            board: None,
            tags: vec![],
        }
    }

    #[test]
    fn test_update_nullable_fields() {
        let update: UpdateTask = serde_json::from_str(r#"{"description": null, "priority": "high"}"#).unwrap();
        assert_eq!(update.description, Some(None));
        assert_eq!(update.priority, Some(TaskPriority::High));
        assert_eq!(update.due_date, None);
        assert!(update.has_changes());
    }

    #[test]
    fn test_update_without_recognized_fields() {
        let update: UpdateTask = serde_json::from_str(r#"{"status": "done", "foo": 1}"#).unwrap();
        assert!(!update.has_changes());
    }

    #[test]
    fn test_update_position_and_tags_are_recognized() {
        let update: UpdateTask = serde_json::from_str(r#"{"position": 4}"#).unwrap();
        assert!(update.has_changes());
        assert_eq!(update.column_changes().position, Some(4));

        let update: UpdateTask = serde_json::from_str(r#"{"tag_ids": []}"#).unwrap();
        assert!(update.has_changes());
    }

    #[test]
    fn test_position_follows_board_change() {
        let update = UpdateTask {
            board_id: Some(Uuid::new_v4()),
            position: Some(2),
            ..Default::default()
        };
        assert_eq!(update.column_changes().position, None);
    }

    #[test]
    fn test_group_by_board() {
        let todo = board(BoardSlug::Todo, 1);
        let done = board(BoardSlug::Done, 3);
        let tasks = vec![
            task_on(todo.id, "a"),
            task_on(done.id, "b"),
            task_on(todo.id, "c"),
        ];

        let grouped = group_by_board(vec![todo.clone(), done.clone()], tasks);

        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[0].board.id, todo.id);
        assert_eq!(grouped[0].task_count, 2);
        let titles: Vec<&str> = grouped[0].tasks.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["a", "c"]);
        assert_eq!(grouped[1].task_count, 1);
    }

    #[test]
    fn test_board_with_tasks_json_shape() {
        let grouped = group_by_board(vec![board(BoardSlug::Backlog, 0)], vec![]);
        let json = serde_json::to_value(&grouped[0]).unwrap();

        assert_eq!(json["slug"], "backlog");
        assert_eq!(json["taskCount"], 0);
        assert!(json["tasks"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_with_no_fields_is_rejected() {
        let err = update_task(&offline_pool(), Uuid::new_v4(), Uuid::new_v4(), UpdateTask::default(), Utc::now())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "No valid fields to update");
    }

    #[tokio::test]
    async fn test_create_requires_title() {
        let input = CreateTask {
            title: "   ".to_string(),
            board_id: Some(Uuid::new_v4()),
            ..Default::default()
        };
        let err = create_task(&offline_pool(), Uuid::new_v4(), input).await.unwrap_err();
        assert_eq!(err.to_string(), "Task title is required");
    }

    #[tokio::test]
    async fn test_create_requires_board() {
        let input = CreateTask {
            title: "Ship it".to_string(),
            ..Default::default()
        };
        let err = create_task(&offline_pool(), Uuid::new_v4(), input).await.unwrap_err();
        assert_eq!(err.to_string(), "Board ID is required");
    }

    #[tokio::test]
    async fn test_create_tag_requires_name() {
        let err = create_tag(&offline_pool(), Uuid::new_v4(), "  ", None).await.unwrap_err();
        assert_eq!(err.to_string(), "Tag name is required");
    }
}

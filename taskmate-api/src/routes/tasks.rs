/// Task endpoints
///
/// - `GET    /api/tasks[?board_id=]`: the caller's tasks by position
/// - `POST   /api/tasks`: create (201)
/// - `PUT    /api/tasks/:id`: partial update
/// - `DELETE /api/tasks/:id`: delete
/// - `POST   /api/tasks/:id/move`: move to another board
///
/// A task that does not exist and a task owned by someone else are
/// indistinguishable: both answer 401 "Task not found or access denied".
/// A malformed id or `board_id` answers 400 with the usual error body.

use crate::{
    app::AppState,
    error::ApiResult,
    extract::{ApiJson, ApiPath, ApiQuery},
};
use axum::{
    extract::State,
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use taskmate_shared::{
    actions::{self, CreateTask, UpdateTask},
    auth::middleware::AuthContext,
    lifecycle::{self, MoveTask},
    models::task::TaskWithRelations,
};
use uuid::Uuid;

#[derive(Debug, Default, Deserialize)]
pub struct TaskListQuery {
    pub board_id: Option<Uuid>,
}

pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiQuery(query): ApiQuery<TaskListQuery>,
) -> ApiResult<Json<Vec<TaskWithRelations>>> {
    let tasks = actions::list_tasks(&state.db, auth.user_id, query.board_id).await?;
    Ok(Json(tasks))
}

/// Create a task
///
/// ```text
/// POST /api/tasks
/// { "title": "Write docs", "board_id": "uuid", "priority": "high", "tag_ids": ["uuid"] }
/// ```
///
/// # Errors
///
/// - `400`: missing title or board, unknown tag
/// - `401`: board outside the caller's project
pub async fn create_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(req): ApiJson<CreateTask>,
) -> ApiResult<(StatusCode, Json<TaskWithRelations>)> {
    let task = actions::create_task(&state.db, auth.user_id, req).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

/// Partial update
///
/// Absent fields are untouched; `null` clears a nullable field. A changed
/// `board_id` is subject to the target board's WIP limit and updates the
/// completion stamp.
pub async fn update_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<UpdateTask>,
) -> ApiResult<Json<TaskWithRelations>> {
    let task = actions::update_task(&state.db, auth.user_id, id, req, Utc::now()).await?;
    Ok(Json(task))
}

pub async fn delete_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Value>> {
    actions::delete_task(&state.db, auth.user_id, id).await?;
    Ok(Json(json!({ "success": true })))
}

/// Move a task
///
/// ```text
/// POST /api/tasks/:id/move
/// { "board_id": "uuid", "position": 2 }
/// ```
///
/// # Errors
///
/// - `400`: the target board's WIP limit is reached
/// - `401`: task or board not the caller's
pub async fn move_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<MoveTask>,
) -> ApiResult<Json<TaskWithRelations>> {
    let task = lifecycle::move_task(&state.db, auth.user_id, id, req, Utc::now()).await?;
    Ok(Json(task))
}

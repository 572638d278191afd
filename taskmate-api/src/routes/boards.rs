/// `GET /api/boards`: the caller's boards left to right, each with its tasks
/// and a `taskCount`.

use crate::{app::AppState, error::ApiResult};
use axum::{extract::State, Extension, Json};
use taskmate_shared::{
    actions::{self, BoardWithTasks},
    auth::middleware::AuthContext,
};

pub async fn list_boards(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<BoardWithTasks>>> {
    let boards = actions::list_boards(&state.db, auth.user_id).await?;
    Ok(Json(boards))
}

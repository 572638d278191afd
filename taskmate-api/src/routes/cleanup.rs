/// On-demand cleanup
///
/// - `GET  /api/cleanup`: what the next sweep would delete
/// - `POST /api/cleanup`: delete the caller's done tasks completed more than
///   48 hours ago

use crate::{app::AppState, error::ApiResult};
use axum::{extract::State, Extension, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use taskmate_shared::{
    auth::middleware::AuthContext,
    cleanup::{self, CleanedTask, CleanupStats},
};

#[derive(Debug, Serialize, Deserialize)]
pub struct CleanupStatsResponse {
    pub success: bool,
    pub stats: CleanupStats,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupRunResponse {
    pub success: bool,
    pub message: String,
    pub deleted_count: usize,
    pub deleted_tasks: Vec<CleanedTask>,
}

pub async fn cleanup_stats(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<CleanupStatsResponse>> {
    let stats = cleanup::cleanup_stats(&state.db, auth.user_id, Utc::now()).await?;
    Ok(Json(CleanupStatsResponse { success: true, stats }))
}

pub async fn run_cleanup(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<CleanupRunResponse>> {
    let outcome = cleanup::cleanup_old_done_tasks(&state.db, auth.user_id, Utc::now()).await?;

    Ok(Json(CleanupRunResponse {
        success: true,
        message: format!("Successfully deleted {} old tasks", outcome.deleted_count),
        deleted_count: outcome.deleted_count,
        deleted_tasks: outcome.deleted_tasks,
    }))
}

/// Scheduled cleanup trigger
///
/// ```text
/// GET|POST /api/cron/cleanup
/// ```
///
/// Meant for an external scheduler. It runs the same sweep as
/// `POST /api/cleanup` for the session's owner, but reports every failure,
/// a missing session included, as a 500 with its own body:
///
/// ```json
/// { "message": "Cleanup completed successfully", "deletedCount": 3, "timestamp": "..." }
/// { "message": "Cleanup failed", "error": "No session found", "timestamp": "..." }
/// ```

use crate::{app::AppState, middleware::session::cookie_header};
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use taskmate_shared::{
    auth::middleware::authenticate,
    cleanup::{cleanup_old_done_tasks, CleanupOutcome, ScheduledRunReport},
    error::{TaskMateError, TaskMateResult},
};

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CronResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl From<&ScheduledRunReport> for CronResponse {
    fn from(report: &ScheduledRunReport) -> Self {
        if report.success {
            Self {
                message: "Cleanup completed successfully".to_string(),
                deleted_count: Some(report.deleted_count),
                error: None,
                timestamp: report.timestamp,
            }
        } else {
            Self {
                message: "Cleanup failed".to_string(),
                deleted_count: None,
                error: Some(report.error.clone().unwrap_or_else(|| "Unknown error".to_string())),
                timestamp: report.timestamp,
            }
        }
    }
}

pub async fn scheduled_cleanup(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> (StatusCode, Json<CronResponse>) {
    let now = Utc::now();
    let report = ScheduledRunReport::from_result(run(&state, &headers, now).await, now);

    if report.success {
        tracing::info!(deleted_count = report.deleted_count, "Scheduled cleanup completed");
        (StatusCode::OK, Json(CronResponse::from(&report)))
    } else {
        tracing::error!(error = ?report.error, "Scheduled cleanup failed");
        (StatusCode::INTERNAL_SERVER_ERROR, Json(CronResponse::from(&report)))
    }
}

async fn run(state: &AppState, headers: &HeaderMap, now: DateTime<Utc>) -> TaskMateResult<CleanupOutcome> {
    let cookies = cookie_header(headers);
    let auth = authenticate(&state.db, &state.sessions, cookies.as_deref(), now)
        .await
        .map_err(TaskMateError::from)?;

    cleanup_old_done_tasks(&state.db, auth.user_id, now).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_body() {
        let report = ScheduledRunReport::from_result(
            Ok(CleanupOutcome {
                deleted_count: 3,
                deleted_tasks: vec![],
            }),
            Utc::now(),
        );
        let json = serde_json::to_value(CronResponse::from(&report)).unwrap();

        assert_eq!(json["message"], "Cleanup completed successfully");
        assert_eq!(json["deletedCount"], 3);
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_failure_body() {
        let report = ScheduledRunReport::from_result(Err(TaskMateError::unauthorized("Invalid session")), Utc::now());
        let json = serde_json::to_value(CronResponse::from(&report)).unwrap();

        assert_eq!(json["message"], "Cleanup failed");
        assert_eq!(json["error"], "Invalid session");
        assert!(json.get("deletedCount").is_none());
    }
}

/// Cleanup of stale completed tasks
///
/// Tasks that have sat on an owner's `done` board for longer than
/// [`RETENTION_HOURS`] are deleted. Selection is by `completed_at`, never by
/// `updated_at`, and tasks without a completion stamp are never touched.
///
/// The sweep is one `DELETE ... RETURNING` statement, so it is atomic and safe
/// to retry: running it again with nothing eligible deletes nothing.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::query::{with_retry, RetryPolicy};
use crate::error::TaskMateResult;

/// How long a completed task stays on the done board
pub const RETENTION_HOURS: i64 = 48;

pub fn retention() -> Duration {
    Duration::hours(RETENTION_HOURS)
}

/// Tasks completed strictly before this instant are eligible.
pub fn cutoff(now: DateTime<Utc>) -> DateTime<Utc> {
    now - retention()
}

/// A task removed by the sweep
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct CleanedTask {
    pub id: Uuid,
    pub title: String,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupOutcome {
    pub deleted_count: usize,
    pub deleted_tasks: Vec<CleanedTask>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct TaskCompletion {
    pub title: String,
    pub completed_at: DateTime<Utc>,
}

/// What the next sweep would delete
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupStats {
    pub tasks_to_delete: i64,
    pub oldest_task: Option<TaskCompletion>,
    pub newest_task: Option<TaskCompletion>,
}

/// Result of one scheduled sweep, successful or not
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledRunReport {
    pub success: bool,
    pub deleted_count: usize,
    pub deleted_tasks: Vec<CleanedTask>,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ScheduledRunReport {
    pub fn from_result(result: TaskMateResult<CleanupOutcome>, timestamp: DateTime<Utc>) -> Self {
        match result {
            Ok(outcome) => Self {
                success: true,
                deleted_count: outcome.deleted_count,
                deleted_tasks: outcome.deleted_tasks,
                timestamp,
                error: None,
            },
            Err(err) => Self {
                success: false,
                deleted_count: 0,
                deleted_tasks: Vec::new(),
                timestamp,
                error: Some(err.to_string()),
            },
        }
    }
}

// $1 = owner, $2 = cutoff
const ELIGIBLE: &str = r#"
    board_id IN (
        SELECT b.id FROM boards b
        JOIN projects p ON p.id = b.project_id
        WHERE p.owner_id = $1 AND b.slug = 'done'
    )
    AND creator_id = $1
    AND completed_at IS NOT NULL
    AND completed_at < $2
"#;

/// Deletes `owner`'s done tasks completed more than 48 hours before `now`.
pub async fn cleanup_old_done_tasks(pool: &PgPool, owner: Uuid, now: DateTime<Utc>) -> TaskMateResult<CleanupOutcome> {
    let cutoff = cutoff(now);
    let sql = format!("DELETE FROM tasks WHERE {ELIGIBLE} RETURNING id, title, completed_at");

    let deleted_tasks = with_retry(&RetryPolicy::default(), "cleanup_old_done_tasks", || {
        sqlx::query_as::<_, CleanedTask>(&sql)
            .bind(owner)
            .bind(cutoff)
            .fetch_all(pool)
    })
    .await?;

    tracing::info!(
        owner = %owner,
        cutoff = %cutoff,
        deleted_count = deleted_tasks.len(),
        "Cleanup sweep finished"
    );

    Ok(CleanupOutcome {
        deleted_count: deleted_tasks.len(),
        deleted_tasks,
    })
}

/// Read-only preview of [`cleanup_old_done_tasks`].
pub async fn cleanup_stats(pool: &PgPool, owner: Uuid, now: DateTime<Utc>) -> TaskMateResult<CleanupStats> {
    let cutoff = cutoff(now);
    let sql = format!("SELECT title, completed_at FROM tasks WHERE {ELIGIBLE} ORDER BY completed_at ASC");

    let eligible = with_retry(&RetryPolicy::default(), "cleanup_stats", || {
        sqlx::query_as::<_, TaskCompletion>(&sql)
            .bind(owner)
            .bind(cutoff)
            .fetch_all(pool)
    })
    .await?;

    Ok(summarize(eligible))
}

/// Builds stats from eligible tasks ordered oldest first.
pub fn summarize(eligible: Vec<TaskCompletion>) -> CleanupStats {
    CleanupStats {
        tasks_to_delete: eligible.len() as i64,
        oldest_task: eligible.first().cloned(),
        newest_task: eligible.last().cloned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn completion(title: &str, hours_ago: i64, now: DateTime<Utc>) -> TaskCompletion {
        TaskCompletion {
            title: title.to_string(),
            completed_at: now - Duration::hours(hours_ago),
        }
    }

    #[test]
    fn test_cutoff_is_48_hours_back() {
        let now = Utc::now();
        assert_eq!(now - cutoff(now), Duration::hours(48));
    }

    #[test]
    fn test_eligibility_boundary() {
        let now = Utc::now();
        let stale = now - Duration::hours(50);
        let fresh = now - Duration::hours(10);

        assert!(stale < cutoff(now));
        assert!(fresh >= cutoff(now));
        // Exactly 48h old is not yet eligible
        let boundary = now - Duration::hours(48);
        assert!(boundary >= cutoff(now));
    }

    #[test]
    fn test_summarize_oldest_and_newest() {
        let now = Utc::now();
        let stats = summarize(vec![
            completion("old", 90, now),
            completion("mid", 70, now),
            completion("recent", 49, now),
        ]);

        assert_eq!(stats.tasks_to_delete, 3);
        assert_eq!(stats.oldest_task.unwrap().title, "old");
        assert_eq!(stats.newest_task.unwrap().title, "recent");
    }

    #[test]
    fn test_summarize_nothing_eligible() {
        let stats = summarize(vec![]);
        assert_eq!(stats, CleanupStats::default());
    }

    #[test]
    fn test_outcome_json_shape() {
        let outcome = CleanupOutcome {
            deleted_count: 1,
            deleted_tasks: vec![CleanedTask {
                id: Uuid::nil(),
                title: "Old".to_string(),
                completed_at: Utc::now(),
            }],
        };
        let json = serde_json::to_value(&outcome).unwrap();

        assert_eq!(json["deletedCount"], 1);
        assert_eq!(json["deletedTasks"][0]["title"], "Old");
        assert!(json["deletedTasks"][0]["completed_at"].is_string());
    }

    #[test]
    fn test_report_from_success() {
        let now = Utc::now();
        let report = ScheduledRunReport::from_result(
            Ok(CleanupOutcome {
                deleted_count: 2,
                deleted_tasks: vec![],
            }),
            now,
        );

        assert!(report.success);
        assert_eq!(report.deleted_count, 2);
        assert_eq!(report.timestamp, now);
        assert!(report.error.is_none());
    }

    #[test]
    fn test_report_from_failure() {
        let report = ScheduledRunReport::from_result(
            Err(crate::error::TaskMateError::unauthorized("No session found")),
            Utc::now(),
        );

        assert!(!report.success);
        assert_eq!(report.deleted_count, 0);
        assert_eq!(report.error.as_deref(), Some("No session found"));
    }

    #[test]
    fn test_stats_json_shape() {
        let json = serde_json::to_value(CleanupStats::default()).unwrap();
        assert_eq!(json["tasksToDelete"], 0);
        assert!(json["oldestTask"].is_null());
    }
}

/// Interval-driven cleanup sweeps
///
/// The scheduler sweeps one owner's done board every `interval` until its
/// cancellation token fires. Each sweep produces a [`ScheduledRunReport`];
/// a failed sweep is logged and reported but never stops the loop.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use std::time::Duration;
/// use taskmate_worker::scheduler::{CleanupScheduler, PgCleanupJob};
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, owner: Uuid) {
/// let scheduler = CleanupScheduler::new(Arc::new(PgCleanupJob::new(pool)), owner, Duration::from_secs(86400));
/// let token = scheduler.shutdown_token();
///
/// tokio::spawn(async move {
///     let _ = tokio::signal::ctrl_c().await;
///     token.cancel();
/// });
///
/// scheduler.run().await;
/// # }
/// ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use taskmate_shared::cleanup::{self, CleanupOutcome, ScheduledRunReport, RETENTION_HOURS};
use taskmate_shared::error::TaskMateResult;
use tokio::sync::RwLock;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// One cleanup pass for an owner
#[async_trait]
pub trait CleanupJob: Send + Sync {
    async fn sweep(&self, owner: Uuid, now: DateTime<Utc>) -> TaskMateResult<CleanupOutcome>;
}

/// Sweeps against PostgreSQL
pub struct PgCleanupJob {
    pool: PgPool,
}

impl PgCleanupJob {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CleanupJob for PgCleanupJob {
    async fn sweep(&self, owner: Uuid, now: DateTime<Utc>) -> TaskMateResult<CleanupOutcome> {
        cleanup::cleanup_old_done_tasks(&self.pool, owner, now).await
    }
}

/// Snapshot of the scheduler for monitoring
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitoringStats {
    pub last_cleanup: Option<ScheduledRunReport>,
    pub next_scheduled_cleanup: DateTime<Utc>,
    pub cleanup_interval: String,
    pub retention_period: String,
}

#[derive(Debug, Default)]
struct SchedulerState {
    last_report: Option<ScheduledRunReport>,
    next_run: Option<DateTime<Utc>>,
}

pub struct CleanupScheduler {
    job: Arc<dyn CleanupJob>,
    owner: Uuid,
    interval: Duration,
    run_on_start: bool,
    state: RwLock<SchedulerState>,
    shutdown_token: CancellationToken,
}

impl CleanupScheduler {
    pub fn new(job: Arc<dyn CleanupJob>, owner: Uuid, interval: Duration) -> Self {
        Self {
            job,
            owner,
            interval,
            run_on_start: true,
            state: RwLock::new(SchedulerState::default()),
            shutdown_token: CancellationToken::new(),
        }
    }

    /// Whether [`run`](Self::run) sweeps once before the first wait
    pub fn with_run_on_start(mut self, run_on_start: bool) -> Self {
        self.run_on_start = run_on_start;
        self
    }

    /// Cancelling this token stops [`run`](Self::run) at its next wait.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Runs sweeps until the shutdown token is cancelled
    pub async fn run(&self) {
        tracing::info!(
            owner = %self.owner,
            interval = %describe(self.interval),
            "Cleanup scheduler starting"
        );

        if self.run_on_start && !self.shutdown_token.is_cancelled() {
            self.run_once().await;
        }

        loop {
            self.state.write().await.next_run = Some(self.next_after(Utc::now()));

            tokio::select! {
                _ = self.shutdown_token.cancelled() => {
                    tracing::info!("Shutdown requested, cleanup scheduler stopping");
                    break;
                }
                _ = sleep(self.interval) => {
                    self.run_once().await;
                }
            }
        }
    }

    /// Sweeps once now and records the report
    pub async fn run_once(&self) -> ScheduledRunReport {
        let now = Utc::now();
        tracing::debug!(owner = %self.owner, "Running scheduled cleanup");

        let report = ScheduledRunReport::from_result(self.job.sweep(self.owner, now).await, now);

        match &report.error {
            None => tracing::info!(
                owner = %self.owner,
                deleted_count = report.deleted_count,
                "Scheduled cleanup completed"
            ),
            Some(error) => tracing::error!(
                owner = %self.owner,
                error = %error,
                "Scheduled cleanup failed"
            ),
        }

        self.state.write().await.last_report = Some(report.clone());
        report
    }

    pub async fn last_report(&self) -> Option<ScheduledRunReport> {
        self.state.read().await.last_report.clone()
    }

    pub async fn monitoring_stats(&self) -> MonitoringStats {
        let state = self.state.read().await;
        let next_scheduled_cleanup = state
            .next_run
            .unwrap_or_else(|| self.next_after(Utc::now()));

        MonitoringStats {
            last_cleanup: state.last_report.clone(),
            next_scheduled_cleanup,
            cleanup_interval: describe(self.interval),
            retention_period: format!("{} hours", RETENTION_HOURS),
        }
    }

    fn next_after(&self, from: DateTime<Utc>) -> DateTime<Utc> {
        let interval = chrono::Duration::from_std(self.interval).unwrap_or(chrono::Duration::days(1));
        from + interval
    }
}

/// Human-readable interval, in the largest whole unit
fn describe(interval: Duration) -> String {
    let secs = interval.as_secs();
    let (value, unit) = if secs > 0 && secs % 3600 == 0 {
        (secs / 3600, "hour")
    } else if secs > 0 && secs % 60 == 0 {
        (secs / 60, "minute")
    } else {
        (secs, "second")
    };

    if value == 1 {
        format!("1 {}", unit)
    } else {
        format!("{} {}s", value, unit)
    }
}

/// Configuration for the cleanup worker
///
/// # Environment Variables
///
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 2)
/// - `CLEANUP_OWNER_ID`: User whose done board is swept (required)
/// - `CLEANUP_INTERVAL_SECS`: Seconds between sweeps (default: 86400)
/// - `CLEANUP_RUN_ON_START`: Sweep once immediately at startup (default: true)
/// - `RUST_LOG`: Log filter (default: taskmate_worker=debug)
/// - `LOG_FORMAT`: `json` for JSON log lines

use std::env;
use std::time::Duration;
use uuid::Uuid;

/// Default time between sweeps: once a day
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub owner_id: Uuid,
    pub interval: Duration,
    pub run_on_start: bool,
}

impl WorkerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "2".to_string())
            .parse::<u32>()?;

        let owner_id = env::var("CLEANUP_OWNER_ID")
            .map_err(|_| anyhow::anyhow!("CLEANUP_OWNER_ID environment variable is required"))?;
        let owner_id = Uuid::parse_str(owner_id.trim())
            .map_err(|e| anyhow::anyhow!("CLEANUP_OWNER_ID is not a valid UUID: {}", e))?;

        let interval = match env::var("CLEANUP_INTERVAL_SECS") {
            Ok(raw) => parse_interval(&raw)?,
            Err(_) => DEFAULT_INTERVAL,
        };

        let run_on_start = env::var("CLEANUP_RUN_ON_START")
            .map(|v| parse_flag(&v))
            .unwrap_or(true);

        Ok(Self {
            database_url,
            max_connections,
            owner_id,
            interval,
            run_on_start,
        })
    }
}

fn parse_interval(raw: &str) -> anyhow::Result<Duration> {
    let secs = raw.trim().parse::<u64>()?;
    if secs == 0 {
        anyhow::bail!("CLEANUP_INTERVAL_SECS must be greater than zero");
    }
    Ok(Duration::from_secs(secs))
}

fn parse_flag(raw: &str) -> bool {
    matches!(raw.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_interval() {
        assert_eq!(parse_interval("3600").unwrap(), Duration::from_secs(3600));
        assert_eq!(parse_interval(" 60 ").unwrap(), Duration::from_secs(60));
    }

    #[test]
    fn test_parse_interval_rejects_zero_and_garbage() {
        assert!(parse_interval("0").is_err());
        assert!(parse_interval("daily").is_err());
        assert!(parse_interval("-5").is_err());
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("true"));
        assert!(parse_flag("YES"));
        assert!(parse_flag("1"));
        assert!(!parse_flag("false"));
        assert!(!parse_flag("0"));
        assert!(!parse_flag(""));
    }

    #[test]
    fn test_default_interval_is_one_day() {
        assert_eq!(DEFAULT_INTERVAL.as_secs(), 86400);
    }
}

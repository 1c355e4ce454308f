use std::time::Duration;

use vidgen_core::config::env_parse;
use vidgen_core::ConfigError;

/// Scheduler tuning loaded from environment variables.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Upper bound on tasks in `processing` or `generating`.
    pub max_concurrent: usize,
    pub admission_interval: Duration,
    pub reconcile_interval: Duration,
    /// How long a task may sit in `generating` before its status is queried.
    pub status_poll_after: Duration,
    /// How long a task may sit in `generating` before it is failed.
    pub generation_timeout: Duration,
    /// Age (by creation time) after which completed tasks are dropped.
    pub retention: Duration,
    pub retention_sweep_interval: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 5,
            admission_interval: Duration::from_secs(5),
            reconcile_interval: Duration::from_secs(30),
            status_poll_after: Duration::from_secs(120),
            generation_timeout: Duration::from_secs(30 * 60),
            retention: Duration::from_secs(24 * 3600),
            retention_sweep_interval: Duration::from_secs(3600),
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                         | Default |
    /// |---------------------------------|---------|
    /// | `MAX_CONCURRENT_TASKS`          | `5`     |
    /// | `ADMISSION_INTERVAL_SECS`       | `5`     |
    /// | `RECONCILE_INTERVAL_SECS`       | `30`    |
    /// | `STATUS_POLL_AFTER_SECS`        | `120`   |
    /// | `GENERATION_TIMEOUT_SECS`       | `1800`  |
    /// | `RETENTION_HOURS`               | `24`    |
    /// | `RETENTION_SWEEP_INTERVAL_SECS` | `3600`  |
    pub fn from_env() -> Result<Self, ConfigError> {
        let max_concurrent: usize = env_parse("MAX_CONCURRENT_TASKS", 5)?;
        if max_concurrent == 0 {
            return Err(ConfigError::Invalid {
                key: "MAX_CONCURRENT_TASKS",
                value: "0".into(),
                reason: "must be at least 1".into(),
            });
        }

        let config = Self {
            max_concurrent,
            admission_interval: secs("ADMISSION_INTERVAL_SECS", 5)?,
            reconcile_interval: secs("RECONCILE_INTERVAL_SECS", 30)?,
            status_poll_after: secs("STATUS_POLL_AFTER_SECS", 120)?,
            generation_timeout: secs("GENERATION_TIMEOUT_SECS", 1800)?,
            retention: hours("RETENTION_HOURS", 24)?,
            retention_sweep_interval: secs("RETENTION_SWEEP_INTERVAL_SECS", 3600)?,
        };

        if config.generation_timeout < config.status_poll_after {
            tracing::warn!(
                status_poll_after_secs = config.status_poll_after.as_secs(),
                generation_timeout_secs = config.generation_timeout.as_secs(),
                "Generation timeout is shorter than the status poll grace period; \
                 stuck tasks will be failed without a status query",
            );
        }

        Ok(config)
    }
}

/// Read a positive number of seconds. Zero would make `tokio::time::interval`
/// panic, so it is rejected here.
fn secs(key: &'static str, default: u64) -> Result<Duration, ConfigError> {
    let value: u64 = env_parse(key, default)?;
    if value == 0 {
        return Err(ConfigError::Invalid {
            key,
            value: "0".into(),
            reason: "must be at least 1 second".into(),
        });
    }
    Ok(Duration::from_secs(value))
}

/// Read a number of hours, rejecting values too large to express in seconds.
fn hours(key: &'static str, default: u64) -> Result<Duration, ConfigError> {
    let value: u64 = env_parse(key, default)?;
    value
        .checked_mul(3600)
        .map(Duration::from_secs)
        .ok_or_else(|| ConfigError::Invalid {
            key,
            value: value.to_string(),
            reason: "too large".into(),
        })
}

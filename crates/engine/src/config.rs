//! Runner configuration.

use std::time::Duration;

use thiserror::Error;

/// Environment variable naming the runner (shows up in logs and thread names).
pub const ENV_RUNNER_NAME: &str = "CREWJOBS_RUNNER_NAME";

/// Environment variable holding the caller-side run timeout in whole seconds
/// (`0` disables the timeout).
pub const ENV_RUN_TIMEOUT_SECS: &str = "CREWJOBS_RUN_TIMEOUT_SECS";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value `{value}` for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Job runner configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerConfig {
    /// Name for logging
    pub name: String,
    /// Upper bound on one run when using `run_with_timeout`
    pub timeout: Option<Duration>,
    /// Append the job's log lines to the result output
    pub capture_output: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            name: "job-runner".to_string(),
            timeout: None,
            capture_output: true,
        }
    }
}

impl RunnerConfig {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn without_capture(mut self) -> Self {
        self.capture_output = false;
        self
    }

    /// Defaults overridden by `CREWJOBS_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(name) = lookup(ENV_RUNNER_NAME).filter(|n| !n.trim().is_empty()) {
            config.name = name.trim().to_string();
        }

        if let Some(raw) = lookup(ENV_RUN_TIMEOUT_SECS) {
            let secs = raw.trim().parse::<u64>().map_err(|e| ConfigError::Invalid {
                key: ENV_RUN_TIMEOUT_SECS,
                value: raw.clone(),
                reason: e.to_string(),
            })?;
            config.timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }

        Ok(config)
    }
}

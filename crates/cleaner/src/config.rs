//! Cleaner configuration with environment overrides

use lazyclean_core::{
    Error, Result, DEFAULT_IDLE_TIMEOUT_MS, DEFAULT_WORKER_NAME, IDLE_TIMEOUT_ENV_VAR,
    WORKER_NAME_ENV_VAR,
};
use std::time::Duration;
use tokio::runtime::Handle;

/// Configuration for a [`Cleaner`](crate::Cleaner)
#[derive(Debug, Clone)]
pub struct CleanerConfig {
    /// How long an idle worker waits for a leaked owner before it stops
    pub idle_timeout: Duration,
    /// Name used for the worker's wait span and the shared runtime threads
    pub worker_name: String,
    /// Runtime to spawn the worker on; see
    /// [`spawn_handle`](lazyclean_utils::spawn_handle) when unset
    pub runtime: Option<Handle>,
}

impl Default for CleanerConfig {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_millis(DEFAULT_IDLE_TIMEOUT_MS),
            worker_name: DEFAULT_WORKER_NAME.to_string(),
            runtime: None,
        }
    }
}

impl CleanerConfig {
    /// Build a configuration from `LAZYCLEAN_IDLE_TIMEOUT_MS` and
    /// `LAZYCLEAN_WORKER_NAME`, falling back to defaults for unset variables.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(raw) = std::env::var(IDLE_TIMEOUT_ENV_VAR) {
            config.idle_timeout = parse_idle_timeout(&raw)?;
        }

        if let Ok(name) = std::env::var(WORKER_NAME_ENV_VAR) {
            let name = name.trim();
            if !name.is_empty() {
                config.worker_name = name.to_string();
            }
        }

        Ok(config)
    }

    #[must_use]
    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    #[must_use]
    pub fn with_worker_name(mut self, worker_name: impl Into<String>) -> Self {
        self.worker_name = worker_name.into();
        self
    }

    #[must_use]
    pub fn with_runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }
}

fn parse_idle_timeout(raw: &str) -> Result<Duration> {
    let millis: u64 = raw.trim().parse().map_err(|e| {
        Error::configuration(format!(
            "{IDLE_TIMEOUT_ENV_VAR} must be a whole number of milliseconds, got '{raw}': {e}"
        ))
    })?;

    if millis == 0 {
        return Err(Error::configuration(format!(
            "{IDLE_TIMEOUT_ENV_VAR} must be greater than zero"
        )));
    }

    Ok(Duration::from_millis(millis))
}

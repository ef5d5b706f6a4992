use garde::Validate;
use serde::Deserialize;
use std::time::Duration;

use crate::services::poller::PollerSettings;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AppConfig {
    /// Keyword backend base URL (e.g., "http://127.0.0.1:8000")
    #[serde(default = "default_api_base_url")]
    #[garde(length(min = 1, max = 2048))]
    pub api_base_url: String,

    /// Delay between two status ticks, in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    #[garde(range(min = 1))]
    pub poll_interval_ms: u64,

    /// Total time a session waits before reporting the jobs as still running
    #[serde(default = "default_max_wait_secs")]
    #[garde(range(min = 1))]
    pub max_wait_secs: u64,

    /// Per-request timeout for status queries
    #[serde(default = "default_request_timeout_secs")]
    #[garde(range(min = 1, max = 300))]
    pub request_timeout_secs: u64,

    /// Rows shown in the jobs overview
    #[serde(default = "default_jobs_overview_limit")]
    #[garde(range(min = 1, max = 500))]
    pub jobs_overview_limit: u32,
}

fn default_api_base_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

fn default_poll_interval_ms() -> u64 {
    2_000
}

fn default_max_wait_secs() -> u64 {
    180
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_jobs_overview_limit() -> u32 {
    20
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let config: Self = envy::from_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Build from an explicit key/value list, as `from_env` would.
    pub fn from_vars<I>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let config: Self = envy::from_iter(vars)?;
        config.validate()?;
        Ok(config)
    }

    pub fn poller_settings(&self) -> PollerSettings {
        PollerSettings {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            max_wait: Duration::from_secs(self.max_wait_secs),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read configuration from environment: {0}")]
    Env(#[from] envy::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(#[from] garde::Report),
}

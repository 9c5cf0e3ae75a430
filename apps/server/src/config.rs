//! Environment-driven server configuration.

use std::time::Duration;

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_secs(key: &str, default_secs: u64) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(Duration::from_secs(default_secs))
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Socket address the HTTP server binds to.
    pub listen_addr: String,
    /// Directory holding the SQLite database file.
    pub data_dir: String,
    /// Optional webhook URL push notifications are POSTed to. Unset means
    /// notifications are stored only.
    pub push_endpoint: Option<String>,
    /// Cadence of the daily assignment reset.
    pub daily_reset_interval: Duration,
    /// Cadence of the weekly and monthly creation-anchored reset checks.
    pub recurring_reset_interval: Duration,
    /// Cadence of the goal expiry sweep.
    pub expiry_sweep_interval: Duration,
    /// Delay before the scheduler's first run after startup.
    pub scheduler_initial_delay: Duration,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            listen_addr: env_or("FQ_LISTEN_ADDR", "0.0.0.0:8080"),
            data_dir: env_or("FQ_DATA_DIR", "./data"),
            push_endpoint: std::env::var("FQ_PUSH_ENDPOINT")
                .ok()
                .filter(|v| !v.trim().is_empty()),
            daily_reset_interval: env_secs("FQ_DAILY_RESET_SECS", 24 * 60 * 60),
            recurring_reset_interval: env_secs("FQ_RECURRING_RESET_SECS", 24 * 60 * 60),
            expiry_sweep_interval: env_secs("FQ_EXPIRY_SWEEP_SECS", 30 * 60),
            scheduler_initial_delay: env_secs("FQ_SCHEDULER_DELAY_SECS", 60),
        }
    }
}

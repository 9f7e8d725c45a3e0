//! Client configuration parsed from environment variables.

use std::path::PathBuf;
use std::time::Duration;

use crate::state::task::DEFAULT_POLL_INTERVAL;

pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8000/api";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
const SESSION_FILE_NAME: &str = "session.json";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub session_file: PathBuf,
    pub poll_interval: Duration,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
}

impl ClientConfig {
    /// Build typed client config from environment variables.
    ///
    /// Optional:
    /// - `QUIZ_API_BASE_URL`: default `http://127.0.0.1:8000/api`
    /// - `QUIZ_SESSION_FILE`: default `<local data dir>/quizclient/session.json`
    /// - `QUIZ_TASK_POLL_INTERVAL_MS`: default 2000, must be non-zero
    /// - `QUIZ_REQUEST_TIMEOUT_SECS`: default 30
    /// - `QUIZ_CONNECT_TIMEOUT_SECS`: default 10
    ///
    /// # Errors
    ///
    /// Returns an error if a numeric variable is set but malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_base_url = lookup("QUIZ_API_BASE_URL")
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_owned())
            .trim_end_matches('/')
            .to_owned();
        let session_file = lookup("QUIZ_SESSION_FILE").map_or_else(default_session_file, PathBuf::from);

        let poll_ms = parse_u64(&lookup, "QUIZ_TASK_POLL_INTERVAL_MS")?;
        if poll_ms == Some(0) {
            return Err(ConfigError::Invalid { var: "QUIZ_TASK_POLL_INTERVAL_MS", value: "0".into() });
        }
        let poll_interval = poll_ms.map_or(DEFAULT_POLL_INTERVAL, Duration::from_millis);

        let request_timeout = Duration::from_secs(
            parse_u64(&lookup, "QUIZ_REQUEST_TIMEOUT_SECS")?.unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        );
        let connect_timeout = Duration::from_secs(
            parse_u64(&lookup, "QUIZ_CONNECT_TIMEOUT_SECS")?.unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS),
        );

        Ok(Self { api_base_url, session_file, poll_interval, request_timeout, connect_timeout })
    }
}

fn parse_u64(lookup: &impl Fn(&str) -> Option<String>, var: &'static str) -> Result<Option<u64>, ConfigError> {
    match lookup(var) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { var, value: raw }),
    }
}

fn default_session_file() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("quizclient")
        .join(SESSION_FILE_NAME)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;

//! Error types for the tracker.

use std::time::Duration;
use thiserror::Error;

/// A failed upstream fetch. Transient: a monitor skips the poll and tries
/// again on its next tick.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("scoreboard API returned {0}")]
    Status(reqwest::StatusCode),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("game not found on scoreboard: {0}")]
    GameNotFound(String),

    #[error("malformed response: {0}")]
    Malformed(String),
}

/// A failed delivery to one notification channel.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{channel} webhook returned {status}")]
    Status {
        channel: String,
        status: reqwest::StatusCode,
    },

    #[error("{channel} delivery timed out after {timeout:?}")]
    Timeout { channel: String, timeout: Duration },

    #[error("{0}")]
    Rejected(String),
}

/// Errors surfaced to callers of the scheduler and registry.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// Unknown channel or category, missing request field, bad setting.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Game discovery failed during a scheduling run.
    #[error("game discovery failed: {0}")]
    Discovery(#[source] FetchError),

    /// The registry refused to start a monitor.
    #[error("failed to spawn monitor {identity}: {reason}")]
    Spawn { identity: String, reason: String },
}

impl TrackerError {
    pub fn is_configuration(&self) -> bool {
        matches!(self, TrackerError::Configuration(_))
    }
}

/// Result type for tracker operations.
pub type Result<T> = std::result::Result<T, TrackerError>;

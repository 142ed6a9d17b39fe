//! Replay error types

use thiserror::Error;

use crate::config::ConfigError;

/// Errors that prevent a replay from being constructed.
#[derive(Error, Debug)]
pub enum ReplayError {
    /// No events to replay
    #[error("recording has no events")]
    EmptyTimeline,

    /// An incremental event has no full snapshot to apply onto
    #[error("incremental event at {at}ms precedes the first full snapshot")]
    MissingBaseSnapshot { at: i64 },

    /// Nothing to render: the recording holds no full snapshot
    #[error("recording has no full snapshot")]
    NoFullSnapshot,

    #[error("failed to parse recording: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type for replay construction
pub type Result<T> = std::result::Result<T, ReplayError>;

//! Error types for the tracking engine

use thiserror::Error;

/// Result type alias for the tracking engine
pub type Result<T> = std::result::Result<T, TrackError>;

/// Programmer and configuration errors; detection misses are never errors
#[derive(Error, Debug)]
pub enum TrackError {
    #[error("Rectangle must be [x, y, w, h], got {0} values")]
    InvalidRect(usize),

    #[error("Statistics have {actual} channels but thresholds expect {expected}")]
    ChannelMismatch { expected: usize, actual: usize },

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl TrackError {
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::ConfigError(msg.into())
    }
}

//! Error types for the onboard vision runtime

use thiserror::Error;

/// Result type alias for the vision runtime
pub type Result<T> = std::result::Result<T, VisionError>;

/// Errors that can occur in front ends, telemetry and configuration
#[derive(Error, Debug)]
pub enum VisionError {
    #[error("Camera error: {0}")]
    CameraError(String),

    #[error("End of frame sequence after {0} frames")]
    EndOfSequence(usize),

    #[error("Frame has {actual} channels, expected {expected}")]
    ChannelMismatch { expected: usize, actual: usize },

    #[error("Invalid region: {0}")]
    InvalidRegion(String),

    #[error("Telemetry payload has {0} words, at most 14 fit in a frame")]
    PayloadTooLong(usize),

    #[error("Telemetry decode error: {0}")]
    DecodeError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Image processing error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("JSON serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Tracking error: {0}")]
    TrackError(#[from] blobtrack::TrackError),
}

impl VisionError {
    pub fn camera<S: Into<String>>(msg: S) -> Self {
        Self::CameraError(msg.into())
    }

    pub fn decode<S: Into<String>>(msg: S) -> Self {
        Self::DecodeError(msg.into())
    }

    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn region<S: Into<String>>(msg: S) -> Self {
        Self::InvalidRegion(msg.into())
    }
}

//! Onboard vision runtime
//!
//! Detection front ends, hardware abstraction and telemetry for the
//! `blobtrack` engine. Two detection sources are provided: static colour
//! thresholding for steady targets, and active-illumination differencing for
//! retroreflective goals. A `Session` switches between them on commands from
//! the flight controller.

pub mod active_illumination;
pub mod blobs;
pub mod camera;
pub mod color_detector;
pub mod config;
pub mod error;
pub mod session;
pub mod statistics;
pub mod status;
pub mod telemetry;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use active_illumination::{edge_mask, ActiveIlluminationDetector, EdgeParams};
pub use blobs::{find_blobs, Blob};
pub use camera::{
    settle, Camera, Clock, IlluminationSource, ImageSequenceCamera, NullIllumination, SystemClock,
};
pub use color_detector::ColorThresholdDetector;
pub use config::{ModeConfig, TrackingMode, VisionConfig};
pub use error::{Result, VisionError};
pub use session::Session;
pub use statistics::region_statistics;
pub use status::{LedPattern, LogIndicator, StatusIndicator};
pub use telemetry::{
    checksum, classify, decode, encode, track_payload, ModeCommand, TelemetryLink, FRAME_LEN,
};
pub use types::{BlobParams, Frame, PhaseBlobParams, PixelFormat};

/// Get library version information
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

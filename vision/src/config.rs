//! Runtime configuration loaded from JSON
//!
//! Top-level sections have defaults, so a config file only needs the values
//! it changes. A mode section that is present must list its thresholds:
//!
//! ```json
//! {
//!   "initial_mode": "goal",
//!   "goal": {
//!     "thresholds": [[{ "min": 0, "max": 20 }]],
//!     "tracker": { "max_untracked_frames": 8 }
//!   },
//!   "settle_us": 40000
//! }
//! ```

use crate::error::{Result, VisionError};
use crate::types::{PhaseBlobParams, PixelFormat};
use blobtrack::{Thresholds, TrackerConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// What the vehicle is currently looking for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackingMode {
    /// Steady coloured target, segmented on colour frames
    #[default]
    Target,
    /// Blinking retroreflective goal, found by active illumination
    Goal,
}

impl TrackingMode {
    pub fn pixel_format(&self) -> PixelFormat {
        match self {
            TrackingMode::Target => PixelFormat::Rgb,
            TrackingMode::Goal => PixelFormat::Grayscale,
        }
    }
}

/// Everything one mode needs to build its tracker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModeConfig {
    /// One bound set per target class, in the mode's pixel format
    pub thresholds: Vec<Thresholds>,
    /// Missing fields are taken from the balloon profile
    #[serde(default)]
    pub tracker: TrackerConfig,
    /// Missing fields are taken from the colour target parameters
    #[serde(default)]
    pub blobs: PhaseBlobParams,
}

impl ModeConfig {
    pub fn target() -> Self {
        Self {
            // Green balloon, R/G/B
            thresholds: vec![Thresholds::from_pairs(&[
                (0.0, 90.0),
                (100.0, 255.0),
                (0.0, 90.0),
            ])],
            tracker: TrackerConfig::balloon(),
            blobs: PhaseBlobParams::target(),
        }
    }

    pub fn goal() -> Self {
        Self {
            // Negated difference image: the reflector reads dark
            thresholds: vec![Thresholds::from_pairs(&[(0.0, 20.0)])],
            tracker: TrackerConfig::goal(),
            blobs: PhaseBlobParams::goal(),
        }
    }

    fn validate(&self, mode: TrackingMode) -> Result<()> {
        self.tracker.validate()?;
        if self.thresholds.is_empty() {
            return Err(VisionError::config(format!(
                "{:?} mode needs at least one threshold set",
                mode
            )));
        }
        let channels = mode.pixel_format().channels();
        for thresholds in &self.thresholds {
            thresholds.validate()?;
            if thresholds.len() != channels {
                return Err(VisionError::ChannelMismatch {
                    expected: channels,
                    actual: thresholds.len(),
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionConfig {
    pub initial_mode: TrackingMode,
    /// Expected sensor frame size (width, height)
    pub frame_size: (u32, u32),
    pub target: ModeConfig,
    pub goal: ModeConfig,
    /// Wait after every illumination transition, in microseconds
    pub settle_us: u64,
    /// Mask ambient edges while tracking the goal
    pub edge_removal: bool,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            initial_mode: TrackingMode::Target,
            // HQVGA
            frame_size: (240, 160),
            target: ModeConfig::target(),
            goal: ModeConfig::goal(),
            settle_us: 50_000,
            edge_removal: true,
        }
    }
}

impl VisionConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config: VisionConfig = serde_json::from_str(&text)?;
        config.validate()?;
        log::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.frame_size.0 == 0 || self.frame_size.1 == 0 {
            return Err(VisionError::config("frame_size must be non-zero"));
        }
        self.target.validate(TrackingMode::Target)?;
        self.goal.validate(TrackingMode::Goal)?;
        Ok(())
    }

    pub fn settle(&self) -> Duration {
        Duration::from_micros(self.settle_us)
    }

    pub fn mode(&self, mode: TrackingMode) -> &ModeConfig {
        match mode {
            TrackingMode::Target => &self.target,
            TrackingMode::Goal => &self.goal,
        }
    }
}

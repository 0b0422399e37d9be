/// Configuration types for the tracking engine
///
/// Every section deserializes with defaults so partial JSON documents work.
use crate::error::{Result, TrackError};
use serde::{Deserialize, Serialize};

/// Distance used to compare feature vectors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Norm {
    /// Sum of absolute differences, cheaper on small processors
    L1,
    /// Euclidean distance
    #[default]
    L2,
}

/// Configuration for feature association
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssociatorConfig {
    pub norm: Norm,
    /// Candidates at or beyond this feature distance are treated as clutter
    pub feature_dist_threshold: f32,
    /// Number of past candidates in the moving average
    pub window_size: usize,
}

impl Default for AssociatorConfig {
    fn default() -> Self {
        Self {
            norm: Norm::L2,
            feature_dist_threshold: 100.0,
            window_size: 3,
        }
    }
}

/// Pair of forgetting factors, each in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForgettingFactors {
    pub position: f32,
    pub size: f32,
}

impl ForgettingFactors {
    pub fn new(position: f32, size: f32) -> Self {
        Self { position, size }
    }
}

/// Configuration for the predictive region of interest
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoiConfig {
    /// Applied when no detection was made (blend toward the full frame)
    pub decay: ForgettingFactors,
    /// Applied when fusing a new detection
    pub fuse: ForgettingFactors,
    /// Detection width/height multiplier before fusing
    pub inflate_scale: f32,
    /// Top-left shift as a fraction of the detection size
    pub inflate_offset: f32,
}

impl Default for RoiConfig {
    fn default() -> Self {
        Self {
            decay: ForgettingFactors::new(0.01, 0.025),
            fuse: ForgettingFactors::new(0.1, 0.1),
            inflate_scale: 1.3,
            inflate_offset: -0.15,
        }
    }
}

/// Configuration for dynamic threshold adaptation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptationConfig {
    pub enabled: bool,
    /// Weight given to the new target on every blend
    pub rate: f32,
    /// Thresholds are placed at mean +/- stdev_multiplier * stdev
    pub stdev_multiplier: f32,
}

impl Default for AdaptationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            rate: 0.0,
            stdev_multiplier: 3.0,
        }
    }
}

/// Shape filter applied while searching for a target to lock onto
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquisitionConfig {
    pub min_density: f32,
    pub min_roundness: f32,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            min_density: 0.25,
            min_roundness: 0.35,
        }
    }
}

/// Full parameter bundle of one tracker
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub associator: AssociatorConfig,
    pub roi: RoiConfig,
    pub adaptation: AdaptationConfig,
    pub acquisition: AcquisitionConfig,
    /// Consecutive misses before the track is dropped
    pub max_untracked_frames: u32,
    /// Identity tag of the tracked target
    pub target_id: u32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self::balloon()
    }
}

impl TrackerConfig {
    /// Steady colour target (balloon) profile
    pub fn balloon() -> Self {
        Self {
            associator: AssociatorConfig {
                norm: Norm::L1,
                feature_dist_threshold: 300.0,
                window_size: 3,
            },
            roi: RoiConfig::default(),
            adaptation: AdaptationConfig::default(),
            acquisition: AcquisitionConfig::default(),
            max_untracked_frames: 15,
            target_id: 0,
        }
    }

    /// Blinking retroreflective goal profile
    pub fn goal() -> Self {
        Self {
            associator: AssociatorConfig {
                norm: Norm::L1,
                feature_dist_threshold: 200.0,
                window_size: 3,
            },
            roi: RoiConfig::default(),
            adaptation: AdaptationConfig::default(),
            acquisition: AcquisitionConfig {
                min_density: 0.0,
                min_roundness: 0.55,
            },
            max_untracked_frames: 5,
            target_id: 1,
        }
    }

    /// Reject parameter combinations the engine cannot honour
    pub fn validate(&self) -> Result<()> {
        if self.associator.window_size == 0 {
            return Err(TrackError::config("associator.window_size must be at least 1"));
        }
        if !(self.associator.feature_dist_threshold > 0.0) {
            return Err(TrackError::config(
                "associator.feature_dist_threshold must be positive",
            ));
        }
        if self.max_untracked_frames == 0 {
            return Err(TrackError::config("max_untracked_frames must be at least 1"));
        }
        for (name, value) in [
            ("roi.decay.position", self.roi.decay.position),
            ("roi.decay.size", self.roi.decay.size),
            ("roi.fuse.position", self.roi.fuse.position),
            ("roi.fuse.size", self.roi.fuse.size),
            ("adaptation.rate", self.adaptation.rate),
        ] {
            check_unit(name, value)?;
        }
        if !(self.roi.inflate_scale > 0.0) {
            return Err(TrackError::config("roi.inflate_scale must be positive"));
        }
        if self.adaptation.stdev_multiplier < 0.0 {
            return Err(TrackError::config(
                "adaptation.stdev_multiplier must not be negative",
            ));
        }
        Ok(())
    }
}

fn check_unit(name: &str, value: f32) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(TrackError::config(format!(
            "{} must be within [0, 1], got {}",
            name, value
        )))
    }
}

//! Single-target blob tracking engine
//!
//! This crate holds the frame-to-frame logic of an onboard tracker: feature
//! association with a moving-average target, a predictive search window,
//! segmentation threshold adaptation and the SEARCHING/TRACKING state
//! machine. It has no image or I/O dependencies; detection front ends plug in
//! through the `DetectionSource` trait.
//!
//! ```rust,ignore
//! use blobtrack::{Thresholds, TrackOutput, Tracker, TrackerConfig};
//!
//! let thresholds = vec![Thresholds::from_pairs(&[(0.0, 20.0)])];
//! let mut tracker = Tracker::new(source, thresholds, TrackerConfig::goal())?;
//!
//! loop {
//!     match tracker.tick()? {
//!         TrackOutput::Tracked(report) => println!("{:?}", report.features),
//!         TrackOutput::Searching | TrackOutput::Lost => {}
//!     }
//! }
//! ```

pub mod associator;
pub mod candidate;
pub mod config;
pub mod error;
pub mod geometry;
pub mod region;
pub mod source;
pub mod threshold;
pub mod tracker;

pub use associator::{FeatureAssociator, Track, TrackedTarget, MAX_FEATURE_DISTANCE};
pub use candidate::{ChannelStats, DetectionCandidate, FeatureVector, RegionStatistics};
pub use config::{
    AcquisitionConfig, AdaptationConfig, AssociatorConfig, ForgettingFactors, Norm, RoiConfig,
    TrackerConfig,
};
pub use error::{Result, TrackError};
pub use geometry::{PixelRect, Rect};
pub use region::RegionPredictor;
pub use source::{DetectionPhase, DetectionRequest, DetectionSource};
pub use threshold::{ChannelBounds, ThresholdAdapter, ThresholdUpdate, Thresholds};
pub use tracker::{select_reference, TrackOutput, TrackReport, TrackStatus, Tracker, TrackingState};

//! Single-target tracking state machine
//!
//! One engine drives every target type: the detection capability and the
//! parameter bundle are the only things that differ between a steady colour
//! target and a blinking retroreflective goal.
//!
//! Per tick the order is fixed: detection, association, ROI and threshold
//! updates, then the output.

use crate::associator::FeatureAssociator;
use crate::candidate::{DetectionCandidate, FeatureVector};
use crate::config::{AcquisitionConfig, TrackerConfig};
use crate::geometry::{PixelRect, Rect};
use crate::region::RegionPredictor;
use crate::source::{DetectionPhase, DetectionRequest, DetectionSource};
use crate::threshold::{ThresholdAdapter, ThresholdUpdate, Thresholds};
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// State of the tracking loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TrackingState {
    /// No target locked; acquisition runs every tick
    #[default]
    Searching,
    /// Target locked; detection is constrained to the ROI
    Tracking,
}

/// Snapshot of a locked track
#[derive(Debug, Clone, PartialEq)]
pub struct TrackReport {
    pub features: FeatureVector,
    pub roi: PixelRect,
    /// Whether the target was matched this tick
    pub detected: bool,
    pub untracked_frames: u32,
}

/// What a tick produced
#[derive(Debug, Clone, PartialEq)]
pub enum TrackOutput {
    /// Still searching, nothing acquired this tick
    Searching,
    /// Locked track, detected or coasting
    Tracked(TrackReport),
    /// Miss budget exhausted this tick; no valid feature vector
    Lost,
}

/// Indicator state derived from an output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrackStatus {
    /// Tracking and seeing the target
    Detecting,
    /// Tracking on the last known state
    Coasting,
    /// No track
    Lost,
}

impl TrackOutput {
    pub fn status(&self) -> TrackStatus {
        match self {
            TrackOutput::Tracked(report) if report.detected => TrackStatus::Detecting,
            TrackOutput::Tracked(_) => TrackStatus::Coasting,
            TrackOutput::Searching | TrackOutput::Lost => TrackStatus::Lost,
        }
    }

    pub fn report(&self) -> Option<&TrackReport> {
        match self {
            TrackOutput::Tracked(report) => Some(report),
            _ => None,
        }
    }
}

pub struct Tracker<D: DetectionSource> {
    source: D,
    associator: FeatureAssociator,
    region: RegionPredictor,
    thresholds: ThresholdAdapter,
    acquisition: AcquisitionConfig,
    max_untracked_frames: u32,
    state: TrackingState,
    n_ticks: u64,
}

impl<D: DetectionSource> Tracker<D> {
    /// Create a tracker in the SEARCHING state
    ///
    /// `thresholds` is the baseline bound set per target class.
    pub fn new(source: D, thresholds: Vec<Thresholds>, config: TrackerConfig) -> Result<Self> {
        config.validate()?;
        let (width, height) = source.frame_size();
        let frame = Rect::new(0.0, 0.0, width as f32, height as f32);
        log::info!(
            "Creating tracker {} on {} ({}x{}): max_untracked_frames={}, feature_dist_threshold={:.1}, window_size={}",
            config.target_id,
            source.name(),
            width,
            height,
            config.max_untracked_frames,
            config.associator.feature_dist_threshold,
            config.associator.window_size
        );

        Ok(Self {
            associator: FeatureAssociator::new(config.target_id, config.associator),
            region: RegionPredictor::new(frame, config.roi),
            thresholds: ThresholdAdapter::new(thresholds, config.adaptation)?,
            acquisition: config.acquisition,
            max_untracked_frames: config.max_untracked_frames,
            state: TrackingState::Searching,
            n_ticks: 0,
            source,
        })
    }

    pub fn state(&self) -> TrackingState {
        self.state
    }

    pub fn associator(&self) -> &FeatureAssociator {
        &self.associator
    }

    pub fn region(&self) -> &RegionPredictor {
        &self.region
    }

    pub fn thresholds(&self) -> &ThresholdAdapter {
        &self.thresholds
    }

    pub fn source(&self) -> &D {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut D {
        &mut self.source
    }

    pub fn into_source(self) -> D {
        self.source
    }

    pub fn tick_count(&self) -> u64 {
        self.n_ticks
    }

    /// Run one frame of the loop
    ///
    /// While searching this is a single acquisition attempt; the caller's
    /// frame loop provides the pacing. A tick that returns an error leaves the
    /// association, search window and thresholds as they were.
    pub fn tick(&mut self) -> Result<TrackOutput> {
        self.n_ticks += 1;
        match self.state {
            TrackingState::Searching => {
                if self.try_acquire()? {
                    Ok(TrackOutput::Tracked(self.report(true)))
                } else {
                    Ok(TrackOutput::Searching)
                }
            }
            TrackingState::Tracking => self.track(),
        }
    }

    /// Block until a target is acquired
    pub fn acquire(&mut self) -> Result<TrackReport> {
        while !self.try_acquire()? {
            log::trace!("No qualifying candidate, retrying acquisition");
        }
        Ok(self.report(true))
    }

    /// One acquisition attempt: full frame, baseline thresholds, shape filter
    fn try_acquire(&mut self) -> Result<bool> {
        let request = DetectionRequest {
            thresholds: self.thresholds.baseline(),
            roi: None,
            phase: DetectionPhase::Acquisition,
        };
        let candidates = self.source.detect(&request)?;
        let best = match select_reference(candidates, &self.acquisition) {
            Some(best) => best,
            None => return Ok(false),
        };

        // Fallible steps first so a failed attempt leaves the tracker searching
        let stats = self.source.region_statistics(best.rect.to_pixels())?;
        let rect = best.rect;
        let code = best.code;
        self.thresholds
            .update(ThresholdUpdate::Fresh { stats: &stats, code })?;
        self.associator.reinit(best);
        self.region.update(Some(&rect));
        self.state = TrackingState::Tracking;

        log::info!(
            "Target {} acquired at {} (code {:#b}), search window {:?}",
            self.associator.id,
            rect,
            code,
            self.region.get_roi()
        );
        Ok(true)
    }

    fn track(&mut self) -> Result<TrackOutput> {
        let request = DetectionRequest {
            thresholds: self.thresholds.current(),
            roi: Some(self.region.get_roi()),
            phase: DetectionPhase::Tracking,
        };
        let candidates = self.source.detect(&request)?;
        log::debug!(
            "Tick {}: {} candidates in {:?}",
            self.n_ticks,
            candidates.len(),
            request.roi
        );

        let previous = self.associator.clone();
        match self.associator.update(&candidates) {
            Some(rect) => {
                let code = self
                    .associator
                    .target()
                    .track()
                    .map(|track| track.code)
                    .unwrap_or(0);
                if let Err(e) = self.adapt_thresholds(rect, code) {
                    self.associator = previous;
                    return Err(e);
                }
                self.region.update(Some(&rect));
                Ok(TrackOutput::Tracked(self.report(true)))
            }
            None if self.associator.untracked_frames() < self.max_untracked_frames => {
                self.region.update(None);
                self.thresholds.update(ThresholdUpdate::Recall)?;
                Ok(TrackOutput::Tracked(self.report(false)))
            }
            None => {
                log::info!(
                    "Target {} lost after {} untracked frames",
                    self.associator.id,
                    self.associator.untracked_frames()
                );
                self.associator.reset();
                self.thresholds.update(ThresholdUpdate::Reset)?;
                self.state = TrackingState::Searching;
                Ok(TrackOutput::Lost)
            }
        }
    }

    /// Pull thresholds toward the statistics of the matched region
    ///
    /// Either fails without touching the adapter or applies the update.
    fn adapt_thresholds(&mut self, rect: Rect, code: u32) -> Result<()> {
        let stats = self.source.region_statistics(rect.to_pixels())?;
        self.thresholds
            .update(ThresholdUpdate::Fresh { stats: &stats, code })?;
        Ok(())
    }

    fn report(&self, detected: bool) -> TrackReport {
        TrackReport {
            features: self
                .associator
                .feature_vector()
                .copied()
                .unwrap_or_else(FeatureVector::zeros),
            roi: self.region.get_roi(),
            detected,
            untracked_frames: self.associator.untracked_frames(),
        }
    }
}

/// Largest candidate passing the acquisition shape filter
pub fn select_reference(
    candidates: Vec<DetectionCandidate>,
    filter: &AcquisitionConfig,
) -> Option<DetectionCandidate> {
    candidates
        .into_iter()
        .filter(|c| c.density > filter.min_density && c.roundness > filter.min_roundness)
        .fold(None, |best: Option<DetectionCandidate>, c| match best {
            Some(b) if b.area >= c.area => Some(b),
            _ => Some(c),
        })
}

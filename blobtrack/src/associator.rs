//! Identity-locked association of one target across frames
//!
//! The associator keeps a short history of matched candidates and a moving
//! average of their feature vectors. Each tick the candidate closest to that
//! average (and of the same colour code) is accepted if it is close enough.

use crate::candidate::{DetectionCandidate, FeatureVector};
use crate::config::{AssociatorConfig, Norm};
use crate::geometry::Rect;
use std::collections::VecDeque;

/// Distance reported for candidates that can never match
pub const MAX_FEATURE_DISTANCE: f32 = 32767.0;

/// State of a target that is currently locked
#[derive(Debug, Clone)]
pub struct Track {
    /// Moving average of the matched feature vectors
    pub feature_vector: FeatureVector,
    /// Matched candidates, oldest first
    history: VecDeque<DetectionCandidate>,
    /// Colour code of the candidate the track was acquired on
    pub code: u32,
}

impl Track {
    fn seeded(candidate: DetectionCandidate, window_size: usize) -> Self {
        let mut history = VecDeque::with_capacity(window_size);
        let feature_vector = candidate.feature();
        let code = candidate.code;
        history.push_back(candidate);
        Self {
            feature_vector,
            history,
            code,
        }
    }

    pub fn history(&self) -> impl Iterator<Item = &DetectionCandidate> {
        self.history.iter()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }
}

/// Cleared-but-not-destroyed tracked target
#[derive(Debug, Clone, Default)]
pub enum TrackedTarget {
    #[default]
    Empty,
    Populated(Track),
}

impl TrackedTarget {
    pub fn is_empty(&self) -> bool {
        matches!(self, TrackedTarget::Empty)
    }

    pub fn track(&self) -> Option<&Track> {
        match self {
            TrackedTarget::Empty => None,
            TrackedTarget::Populated(track) => Some(track),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FeatureAssociator {
    /// Identity tag, kept across resets
    pub id: u32,
    config: AssociatorConfig,
    target: TrackedTarget,
    /// Consecutive failed associations
    untracked_frames: u32,
}

impl FeatureAssociator {
    pub fn new(id: u32, config: AssociatorConfig) -> Self {
        Self {
            id,
            config,
            target: TrackedTarget::Empty,
            untracked_frames: 0,
        }
    }

    pub fn config(&self) -> &AssociatorConfig {
        &self.config
    }

    pub fn target(&self) -> &TrackedTarget {
        &self.target
    }

    pub fn feature_vector(&self) -> Option<&FeatureVector> {
        self.target.track().map(|track| &track.feature_vector)
    }

    pub fn untracked_frames(&self) -> u32 {
        self.untracked_frames
    }

    /// Feature distance between the tracked target and `candidate`
    pub fn compare(&self, candidate: &DetectionCandidate) -> f32 {
        let track = match &self.target {
            TrackedTarget::Populated(track) if track.code == candidate.code => track,
            _ => return MAX_FEATURE_DISTANCE,
        };

        let diff = candidate.feature() - track.feature_vector;
        match self.config.norm {
            Norm::L1 => diff.lp_norm(1),
            Norm::L2 => diff.norm(),
        }
    }

    /// Associate this frame's candidates with the target
    ///
    /// Returns the matched candidate's rectangle, or `None` on a miss.
    pub fn update(&mut self, candidates: &[DetectionCandidate]) -> Option<Rect> {
        if candidates.is_empty() || self.target.is_empty() {
            self.untracked_frames += 1;
            return None;
        }

        let mut min_dist = MAX_FEATURE_DISTANCE;
        let mut best: Option<&DetectionCandidate> = None;
        for candidate in candidates {
            let dist = self.compare(candidate);
            if dist < min_dist {
                min_dist = dist;
                best = Some(candidate);
            }
        }

        let candidate = match best {
            Some(candidate) if min_dist < self.config.feature_dist_threshold => candidate.clone(),
            _ => {
                self.untracked_frames += 1;
                log::debug!(
                    "Target {} not associated (best distance {:.1}, {} misses)",
                    self.id,
                    min_dist,
                    self.untracked_frames
                );
                return None;
            }
        };

        self.untracked_frames = 0;
        let window = self.config.window_size;
        let rect = candidate.rect;
        if let TrackedTarget::Populated(track) = &mut self.target {
            let new = candidate.feature();
            let n = track.history.len();
            if n < window {
                track.feature_vector = (track.feature_vector * n as f32 + new) / (n as f32 + 1.0);
                track.history.push_back(candidate);
            } else {
                let oldest = track
                    .history
                    .pop_front()
                    .map(|c| c.feature())
                    .unwrap_or(track.feature_vector);
                track.feature_vector =
                    (track.feature_vector * window as f32 + new - oldest) / window as f32;
                track.history.push_back(candidate);
            }
            log::debug!(
                "Target {} associated at distance {:.1}: {:?}",
                self.id,
                min_dist,
                track.feature_vector.as_slice()
            );
        }
        Some(rect)
    }

    /// Re-seed the target from a freshly acquired candidate
    pub fn reinit(&mut self, candidate: DetectionCandidate) {
        self.target = TrackedTarget::Populated(Track::seeded(candidate, self.config.window_size));
        self.untracked_frames = 0;
    }

    /// Clear the target; identity and configuration are kept
    pub fn reset(&mut self) {
        self.target = TrackedTarget::Empty;
        self.untracked_frames = 0;
    }
}

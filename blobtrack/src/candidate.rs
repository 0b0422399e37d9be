//! Per-frame detection candidates and the feature vector derived from them

use crate::geometry::Rect;
use nalgebra::SVector;
use serde::{Deserialize, Serialize};

/// Smoothed track state: `[x, y, w, h, rotation_deg]`
pub type FeatureVector = SVector<f32, 5>;

/// Blob produced by a detection source for the current frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionCandidate {
    /// Bounding box (top-left anchored)
    pub rect: Rect,
    /// Major axis angle in degrees, 0 when the source has no orientation
    pub rotation_deg: f32,
    /// Class bitmask: bit `i` set when the blob matched threshold set `i`
    pub code: u32,
    /// Pixels / bounding box area
    pub density: f32,
    /// Minor / major second moment ratio, 1.0 for a disc
    pub roundness: f32,
    /// Bounding box area
    pub area: f32,
    /// Number of member pixels
    pub pixels: u32,
}

impl DetectionCandidate {
    pub fn new(rect: Rect, rotation_deg: f32, code: u32) -> Self {
        Self {
            rect,
            rotation_deg,
            code,
            density: 1.0,
            roundness: 1.0,
            area: rect.area(),
            pixels: rect.area().max(0.0) as u32,
        }
    }

    pub fn with_shape(mut self, density: f32, roundness: f32) -> Self {
        self.density = density;
        self.roundness = roundness;
        self
    }

    pub fn feature(&self) -> FeatureVector {
        FeatureVector::new(
            self.rect.x,
            self.rect.y,
            self.rect.w,
            self.rect.h,
            self.rotation_deg,
        )
    }
}

/// Mean and standard deviation of one image channel
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ChannelStats {
    pub mean: f32,
    pub stdev: f32,
}

/// Per-channel statistics over a frame region
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RegionStatistics {
    pub channels: Vec<ChannelStats>,
}

impl RegionStatistics {
    pub fn new(channels: Vec<ChannelStats>) -> Self {
        Self { channels }
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

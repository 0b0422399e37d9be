//! Predictive region of interest
//!
//! The window is pulled toward each new detection (inflated by a margin) and
//! relaxes back toward the full frame while the target is not seen. Both moves
//! are exponential blends of center and size, so a single noisy detection only
//! nudges the window.

use crate::config::{ForgettingFactors, RoiConfig};
use crate::geometry::{PixelRect, Rect};

#[derive(Debug, Clone)]
pub struct RegionPredictor {
    rect: Rect,
    frame_bounds: Rect,
    config: RoiConfig,
}

impl RegionPredictor {
    /// Start with a full-frame window
    pub fn new(frame_bounds: Rect, config: RoiConfig) -> Self {
        Self {
            rect: frame_bounds,
            frame_bounds,
            config,
        }
    }

    pub fn rect(&self) -> &Rect {
        &self.rect
    }

    pub fn frame_bounds(&self) -> &Rect {
        &self.frame_bounds
    }

    pub fn update(&mut self, detection: Option<&Rect>) {
        let (target, factors) = match detection {
            Some(rect) => (
                rect.inflate(self.config.inflate_scale, self.config.inflate_offset),
                self.config.fuse,
            ),
            None => (self.frame_bounds, self.config.decay),
        };
        self.rect = self.blend(&target, factors).clamp_to(&self.frame_bounds);
    }

    fn blend(&self, target: &Rect, factors: ForgettingFactors) -> Rect {
        self.rect
            .blend_toward(target, factors.position, factors.size)
    }

    pub fn reset(&mut self) {
        self.rect = self.frame_bounds;
    }

    /// Integer search window for the detection primitive
    pub fn get_roi(&self) -> PixelRect {
        let frame = self.frame_bounds.to_pixels();
        let mut roi = self.rect.to_pixels();
        // Rounding may push the far edge one pixel past the frame
        roi.w = roi.w.min((frame.right() - roi.x).max(0) as u32);
        roi.h = roi.h.min((frame.bottom() - roi.y).max(0) as u32);
        roi
    }
}

//! Active-illumination differencing for retroreflective targets
//!
//! Two frames are taken back to back, the first with the light off and the
//! second with it on. Anything that is bright in both (sun glints, lamps)
//! cancels in the difference; a retroreflector returns the light straight to
//! the lens and survives. The difference is negated so the target reads dark,
//! matching the grayscale threshold profile.
//!
//! The sensor needs `settle` after a light transition before a capture is
//! fully exposed under the new state. Both waits only cover the part of the
//! budget not already spent on other work.

use crate::blobs::find_blobs;
use crate::camera::{settle, Camera, Clock, IlluminationSource};
use crate::error::VisionError;
use crate::statistics::region_statistics;
use crate::types::{Frame, PhaseBlobParams};
use blobtrack::{
    DetectionCandidate, DetectionPhase, DetectionRequest, DetectionSource, PixelRect,
    RegionStatistics,
};
use image::GrayImage;
use imageproc::distance_transform::Norm;
use std::time::{Duration, Instant};

/// Canny hysteresis thresholds and dilation for the edge mask
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeParams {
    pub low: f32,
    pub high: f32,
    /// Chessboard dilation radius; 3 grows every edge pixel to a 7x7 square
    pub dilate_radius: u8,
}

impl Default for EdgeParams {
    fn default() -> Self {
        Self {
            low: 20.0,
            high: 60.0,
            dilate_radius: 3,
        }
    }
}

pub struct ActiveIlluminationDetector<C: Camera, L: IlluminationSource, K: Clock> {
    camera: C,
    light: L,
    clock: K,
    settle: Duration,
    params: PhaseBlobParams,
    edges: Option<EdgeParams>,
    difference: Option<Frame>,
}

impl<C: Camera, L: IlluminationSource, K: Clock> ActiveIlluminationDetector<C, L, K> {
    pub fn new(camera: C, light: L, clock: K, settle: Duration, params: PhaseBlobParams) -> Self {
        if settle < Duration::from_millis(1) {
            log::warn!(
                "Illumination settle time {:?} is likely below the sensor readout time",
                settle
            );
        }
        Self {
            camera,
            light,
            clock,
            settle,
            params,
            edges: Some(EdgeParams::default()),
            difference: None,
        }
    }

    /// Mask ambient edges while tracking; `None` disables edge removal
    pub fn with_edge_removal(mut self, edges: Option<EdgeParams>) -> Self {
        self.edges = edges;
        self
    }

    pub fn settle_time(&self) -> Duration {
        self.settle
    }

    /// Negated difference image of the last detection call
    pub fn last_difference(&self) -> Option<&Frame> {
        self.difference.as_ref()
    }

    pub fn into_parts(self) -> (C, L, K) {
        (self.camera, self.light, self.clock)
    }

    /// Capture the off/on pair and the instant the light went off
    ///
    /// The light is off again whatever happens. On failure the closing settle
    /// runs here; on success it is left to the caller.
    fn capture_pair(&mut self) -> crate::error::Result<(Frame, Frame, Instant)> {
        let ambient = self.camera.capture()?;

        self.light.set(true)?;
        let lit_at = self.clock.now();
        settle(&self.clock, lit_at, self.settle);
        let lit = self.camera.capture();
        let off = self.light.set(false);
        let off_at = self.clock.now();
        match (lit, off) {
            (Ok(lit), Ok(())) => Ok((ambient, lit, off_at)),
            (Err(e), _) | (_, Err(e)) => {
                log::warn!("Illuminated capture failed: {}", e);
                settle(&self.clock, off_at, self.settle);
                Err(e)
            }
        }
    }

    fn extract(
        &mut self,
        ambient: Frame,
        lit: Frame,
        request: &DetectionRequest<'_>,
    ) -> anyhow::Result<Vec<DetectionCandidate>> {
        let mut difference = lit.saturating_sub(&ambient).ok_or_else(|| {
            VisionError::camera(format!(
                "frame pair differs: {:?} {:?} vs {:?} {:?}",
                ambient.format(),
                ambient.dimensions(),
                lit.format(),
                lit.dimensions()
            ))
        })?;
        let mask = match (request.phase, self.edges) {
            (DetectionPhase::Tracking, Some(edges)) => Some(edge_mask(&ambient, edges)),
            _ => None,
        };
        difference.invert();

        let blobs = find_blobs(
            &difference,
            request.thresholds,
            request.roi,
            mask.as_ref(),
            self.params.for_phase(request.phase),
        )?;
        log::debug!(
            "{} differential blobs ({:?}, edge mask {})",
            blobs.len(),
            request.phase,
            mask.is_some()
        );
        self.difference = Some(difference);
        Ok(blobs.iter().map(|b| b.to_candidate()).collect())
    }
}

/// Inverted, dilated edge map of `frame`: zero near edges, 255 elsewhere
pub fn edge_mask(frame: &Frame, params: EdgeParams) -> GrayImage {
    let luma = frame.to_luma();
    let edges = imageproc::edges::canny(&luma, params.low, params.high);
    let mut mask = imageproc::morphology::dilate(&edges, Norm::LInf, params.dilate_radius);
    image::imageops::invert(&mut mask);
    mask
}

impl<C: Camera, L: IlluminationSource, K: Clock> DetectionSource
    for ActiveIlluminationDetector<C, L, K>
{
    fn detect(&mut self, request: &DetectionRequest<'_>) -> anyhow::Result<Vec<DetectionCandidate>> {
        let (ambient, lit, off_at) = self.capture_pair()?;
        let result = self.extract(ambient, lit, request);
        // Processing since the light went off counts toward the settle budget
        let slept = settle(&self.clock, off_at, self.settle);
        log::trace!("Closing settle slept {:?}", slept);
        result
    }

    fn region_statistics(&self, rect: PixelRect) -> anyhow::Result<RegionStatistics> {
        let difference = self
            .difference
            .as_ref()
            .ok_or_else(|| VisionError::region("no difference image yet"))?;
        Ok(region_statistics(difference, rect)?)
    }

    fn frame_size(&self) -> (u32, u32) {
        self.camera.frame_size()
    }

    fn name(&self) -> &str {
        "active-illumination"
    }
}

//! Static colour-threshold detection on the raw frame

use crate::blobs::find_blobs;
use crate::camera::Camera;
use crate::error::VisionError;
use crate::statistics::region_statistics;
use crate::types::{Frame, PhaseBlobParams};
use blobtrack::{DetectionCandidate, DetectionRequest, DetectionSource, PixelRect, RegionStatistics};

/// Segments every captured frame with the requested thresholds
pub struct ColorThresholdDetector<C: Camera> {
    camera: C,
    params: PhaseBlobParams,
    frame: Option<Frame>,
}

impl<C: Camera> ColorThresholdDetector<C> {
    pub fn new(camera: C, params: PhaseBlobParams) -> Self {
        Self {
            camera,
            params,
            frame: None,
        }
    }

    pub fn camera_mut(&mut self) -> &mut C {
        &mut self.camera
    }

    /// Frame of the last detection call
    pub fn last_frame(&self) -> Option<&Frame> {
        self.frame.as_ref()
    }

    pub fn into_camera(self) -> C {
        self.camera
    }
}

impl<C: Camera> DetectionSource for ColorThresholdDetector<C> {
    fn detect(&mut self, request: &DetectionRequest<'_>) -> anyhow::Result<Vec<DetectionCandidate>> {
        let frame = self.camera.capture()?;
        let blobs = find_blobs(
            &frame,
            request.thresholds,
            request.roi,
            None,
            self.params.for_phase(request.phase),
        )?;
        self.frame = Some(frame);
        Ok(blobs.iter().map(|b| b.to_candidate()).collect())
    }

    fn region_statistics(&self, rect: PixelRect) -> anyhow::Result<RegionStatistics> {
        let frame = self
            .frame
            .as_ref()
            .ok_or_else(|| VisionError::region("no frame captured yet"))?;
        Ok(region_statistics(frame, rect)?)
    }

    fn frame_size(&self) -> (u32, u32) {
        self.camera.frame_size()
    }

    fn name(&self) -> &str {
        "color-threshold"
    }
}

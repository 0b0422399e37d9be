/// Detection capability consumed by the tracker
///
/// Implementations own frame capture and blob extraction; the tracker only
/// sees candidates and region statistics of the frame last detected on.
use crate::candidate::{DetectionCandidate, RegionStatistics};
use crate::geometry::PixelRect;
use crate::threshold::Thresholds;

/// Why the tracker is asking for detections
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionPhase {
    /// Looking for a target to lock onto
    Acquisition,
    /// Following a locked target
    Tracking,
}

/// Parameters of one detection call
#[derive(Debug, Clone, Copy)]
pub struct DetectionRequest<'a> {
    /// One bound set per target class; candidate codes index into this list
    pub thresholds: &'a [Thresholds],
    /// Search window, `None` for the full frame
    pub roi: Option<PixelRect>,
    pub phase: DetectionPhase,
}

/// Common interface for detection front ends
pub trait DetectionSource {
    /// Capture a frame and return the candidates found in it
    ///
    /// An empty list is a normal outcome; errors are reserved for capture
    /// or hardware failures.
    fn detect(&mut self, request: &DetectionRequest<'_>) -> anyhow::Result<Vec<DetectionCandidate>>;

    /// Per-channel statistics of `rect` in the frame of the last `detect`
    fn region_statistics(&self, rect: PixelRect) -> anyhow::Result<RegionStatistics>;

    /// Frame size in pixels (width, height)
    fn frame_size(&self) -> (u32, u32);

    /// Detector name (for logging/debugging)
    fn name(&self) -> &str;
}

impl<D: DetectionSource + ?Sized> DetectionSource for Box<D> {
    fn detect(&mut self, request: &DetectionRequest<'_>) -> anyhow::Result<Vec<DetectionCandidate>> {
        (**self).detect(request)
    }

    fn region_statistics(&self, rect: PixelRect) -> anyhow::Result<RegionStatistics> {
        (**self).region_statistics(rect)
    }

    fn frame_size(&self) -> (u32, u32) {
        (**self).frame_size()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

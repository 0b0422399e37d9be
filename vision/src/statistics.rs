//! Per-channel region statistics

use crate::error::{Result, VisionError};
use crate::types::Frame;
use blobtrack::{ChannelStats, PixelRect, RegionStatistics};

/// Mean and population standard deviation of every channel inside `rect`
///
/// The rectangle is clipped to the frame; nothing left after clipping is an
/// error.
pub fn region_statistics(frame: &Frame, rect: PixelRect) -> Result<RegionStatistics> {
    let (width, height) = frame.dimensions();
    let region = rect
        .clip(width, height)
        .ok_or_else(|| VisionError::region(format!("{:?} in {}x{}", rect, width, height)))?;

    let channels = frame.channels();
    let mut sum = vec![0f64; channels];
    let mut sum_sq = vec![0f64; channels];
    for y in region.y as u32..region.bottom() as u32 {
        for x in region.x as u32..region.right() as u32 {
            for (c, &value) in frame.pixel(x, y).iter().enumerate() {
                let value = value as f64;
                sum[c] += value;
                sum_sq[c] += value * value;
            }
        }
    }

    let n = (region.w as f64) * (region.h as f64);
    Ok(RegionStatistics::new(
        sum.iter()
            .zip(&sum_sq)
            .map(|(&s, &sq)| {
                let mean = s / n;
                ChannelStats {
                    mean: mean as f32,
                    stdev: (sq / n - mean * mean).max(0.0).sqrt() as f32,
                }
            })
            .collect(),
    ))
}

//! Threshold segmentation and connected-component blob extraction
//!
//! For every threshold set a binary image of matching pixels is built inside
//! the search window, labelled with 8-connectivity, and each component is
//! summarised by its bounding box and raw image moments. Moments are additive,
//! so merged blobs keep exact orientation and roundness.

use crate::error::{Result, VisionError};
use crate::types::{BlobParams, Frame};
use blobtrack::{DetectionCandidate, PixelRect, Rect, Thresholds};
use image::{GrayImage, Luma};
use imageproc::region_labelling::{connected_components, Connectivity};
use std::collections::BTreeMap;

/// Raw moments up to second order, in frame coordinates
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Moments {
    m00: f64,
    m10: f64,
    m01: f64,
    m20: f64,
    m02: f64,
    m11: f64,
}

impl Moments {
    fn add_pixel(&mut self, x: f64, y: f64) {
        self.m00 += 1.0;
        self.m10 += x;
        self.m01 += y;
        self.m20 += x * x;
        self.m02 += y * y;
        self.m11 += x * y;
    }

    fn merge(&mut self, other: &Moments) {
        self.m00 += other.m00;
        self.m10 += other.m10;
        self.m01 += other.m01;
        self.m20 += other.m20;
        self.m02 += other.m02;
        self.m11 += other.m11;
    }

    /// Central second moments (mu20, mu02, mu11), normalised by the pixel count
    fn central(&self) -> (f64, f64, f64) {
        if self.m00 == 0.0 {
            return (0.0, 0.0, 0.0);
        }
        let cx = self.m10 / self.m00;
        let cy = self.m01 / self.m00;
        (
            self.m20 / self.m00 - cx * cx,
            self.m02 / self.m00 - cy * cy,
            self.m11 / self.m00 - cx * cy,
        )
    }
}

/// A connected group of pixels matching at least one threshold set
#[derive(Debug, Clone, PartialEq)]
pub struct Blob {
    pub rect: PixelRect,
    pub pixels: u32,
    /// Bit `i` set when the blob matched threshold set `i`
    pub code: u32,
    moments: Moments,
}

impl Blob {
    fn seed(x: u32, y: u32, code: u32) -> Self {
        Self {
            rect: PixelRect::new(x as i32, y as i32, 1, 1),
            pixels: 0,
            code,
            moments: Moments::default(),
        }
    }

    fn add_pixel(&mut self, x: u32, y: u32) {
        let (x0, y0) = (self.rect.x.min(x as i32), self.rect.y.min(y as i32));
        let right = self.rect.right().max(x as i32 + 1);
        let bottom = self.rect.bottom().max(y as i32 + 1);
        self.rect = PixelRect::new(x0, y0, (right - x0) as u32, (bottom - y0) as u32);
        self.pixels += 1;
        self.moments.add_pixel(x as f64, y as f64);
    }

    fn absorb(&mut self, other: Blob) {
        let x0 = self.rect.x.min(other.rect.x);
        let y0 = self.rect.y.min(other.rect.y);
        let right = self.rect.right().max(other.rect.right());
        let bottom = self.rect.bottom().max(other.rect.bottom());
        self.rect = PixelRect::new(x0, y0, (right - x0) as u32, (bottom - y0) as u32);
        self.pixels += other.pixels;
        self.code |= other.code;
        self.moments.merge(&other.moments);
    }

    pub fn area(&self) -> u32 {
        self.rect.w * self.rect.h
    }

    pub fn centroid(&self) -> (f32, f32) {
        let m = &self.moments;
        if m.m00 == 0.0 {
            let (cx, cy) = self.rect.to_rect().center();
            return (cx, cy);
        }
        ((m.m10 / m.m00) as f32, (m.m01 / m.m00) as f32)
    }

    /// Major axis angle in degrees, within [0, 180)
    pub fn rotation_deg(&self) -> f32 {
        let (mu20, mu02, mu11) = self.moments.central();
        let angle = (0.5 * (2.0 * mu11).atan2(mu20 - mu02)).to_degrees();
        let angle = angle.rem_euclid(180.0) as f32;
        if angle >= 180.0 {
            0.0
        } else {
            angle
        }
    }

    /// Minor / major eigenvalue ratio of the second moments, 1.0 for a disc
    pub fn roundness(&self) -> f32 {
        let (mu20, mu02, mu11) = self.moments.central();
        let common = (4.0 * mu11 * mu11 + (mu20 - mu02).powi(2)).sqrt();
        let major = (mu20 + mu02 + common) / 2.0;
        let minor = (mu20 + mu02 - common) / 2.0;
        if major <= f64::EPSILON {
            return 1.0;
        }
        (minor / major).clamp(0.0, 1.0) as f32
    }

    /// Member pixels over bounding box area
    pub fn density(&self) -> f32 {
        match self.area() {
            0 => 0.0,
            area => self.pixels as f32 / area as f32,
        }
    }

    pub fn to_candidate(&self) -> DetectionCandidate {
        let rect = Rect::new(
            self.rect.x as f32,
            self.rect.y as f32,
            self.rect.w as f32,
            self.rect.h as f32,
        );
        let mut candidate = DetectionCandidate::new(rect, self.rotation_deg(), self.code)
            .with_shape(self.density(), self.roundness());
        candidate.pixels = self.pixels;
        candidate
    }

    fn grown_overlaps(&self, other: &Blob, margin: u32) -> bool {
        let m = margin as i32;
        self.rect.x - m < other.rect.right()
            && other.rect.x < self.rect.right() + m
            && self.rect.y - m < other.rect.bottom()
            && other.rect.y < self.rect.bottom() + m
    }
}

/// Find blobs matching any of `thresholds` inside `roi`
///
/// Pixels where `mask` is zero are ignored. An ROI that does not intersect the
/// frame yields no blobs.
pub fn find_blobs(
    frame: &Frame,
    thresholds: &[Thresholds],
    roi: Option<PixelRect>,
    mask: Option<&GrayImage>,
    params: &BlobParams,
) -> Result<Vec<Blob>> {
    let (width, height) = frame.dimensions();
    if let Some(mask) = mask {
        if mask.dimensions() != (width, height) {
            return Err(VisionError::config(format!(
                "mask is {:?}, frame is {:?}",
                mask.dimensions(),
                (width, height)
            )));
        }
    }
    let window = match roi.unwrap_or_else(|| PixelRect::frame(width, height)).clip(width, height) {
        Some(window) => window,
        None => return Ok(Vec::new()),
    };

    let mut blobs = Vec::new();
    for (class, set) in thresholds.iter().enumerate().take(32) {
        if set.len() != frame.channels() {
            return Err(VisionError::ChannelMismatch {
                expected: frame.channels(),
                actual: set.len(),
            });
        }
        blobs.extend(label_class(frame, set, 1 << class, window, mask, params));
    }

    if params.merge {
        blobs = merge_blobs(blobs, params.margin);
    }
    log::trace!("{} blobs in {:?}", blobs.len(), window);
    Ok(blobs)
}

fn label_class(
    frame: &Frame,
    thresholds: &Thresholds,
    code: u32,
    window: PixelRect,
    mask: Option<&GrayImage>,
    params: &BlobParams,
) -> Vec<Blob> {
    let (ox, oy) = (window.x as u32, window.y as u32);
    let binary = GrayImage::from_fn(window.w, window.h, |x, y| {
        let (fx, fy) = (ox + x, oy + y);
        let unmasked = mask.map_or(true, |m| m.get_pixel(fx, fy)[0] != 0);
        if unmasked && thresholds.matches(frame.pixel(fx, fy)) {
            Luma([255u8])
        } else {
            Luma([0u8])
        }
    });

    let labels = connected_components(&binary, Connectivity::Eight, Luma([0u8]));
    let mut components: BTreeMap<u32, Blob> = BTreeMap::new();
    for (x, y, label) in labels.enumerate_pixels() {
        let label = label[0];
        if label == 0 {
            continue;
        }
        let (fx, fy) = (ox + x, oy + y);
        components
            .entry(label)
            .or_insert_with(|| Blob::seed(fx, fy, code))
            .add_pixel(fx, fy);
    }

    components
        .into_values()
        .filter(|b| b.pixels >= params.pixels_threshold && b.area() >= params.area_threshold)
        .collect()
}

/// Merge blobs whose margin-grown boxes overlap, until no pair does
fn merge_blobs(mut blobs: Vec<Blob>, margin: u32) -> Vec<Blob> {
    loop {
        let mut merged = false;
        let mut i = 0;
        while i < blobs.len() {
            let mut j = i + 1;
            while j < blobs.len() {
                if blobs[i].grown_overlaps(&blobs[j], margin) {
                    let other = blobs.swap_remove(j);
                    blobs[i].absorb(other);
                    merged = true;
                } else {
                    j += 1;
                }
            }
            i += 1;
        }
        if !merged {
            return blobs;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use image::{Rgb, RgbImage};

    fn gray_frame(width: u32, height: u32, spots: &[(u32, u32, u32, u32)]) -> Frame {
        let mut img = GrayImage::from_pixel(width, height, Luma([200]));
        for &(x, y, w, h) in spots {
            for yy in y..y + h {
                for xx in x..x + w {
                    img.put_pixel(xx, yy, Luma([5]));
                }
            }
        }
        Frame::Gray(img)
    }

    fn dark() -> Vec<Thresholds> {
        vec![Thresholds::from_pairs(&[(0.0, 20.0)])]
    }

    fn unmerged() -> BlobParams {
        BlobParams {
            pixels_threshold: 1,
            area_threshold: 1,
            merge: false,
            margin: 0,
        }
    }

    #[test]
    fn test_separate_components() {
        let frame = gray_frame(100, 80, &[(10, 10, 10, 10), (60, 40, 20, 5)]);
        let mut blobs = find_blobs(&frame, &dark(), None, None, &unmerged()).unwrap();
        blobs.sort_by_key(|b| b.rect.x);

        assert_eq!(blobs.len(), 2);
        assert_eq!(blobs[0].rect, PixelRect::new(10, 10, 10, 10));
        assert_eq!(blobs[0].pixels, 100);
        assert_abs_diff_eq!(blobs[0].density(), 1.0);
        assert_abs_diff_eq!(blobs[0].roundness(), 1.0, epsilon = 1e-4);
        assert_eq!(blobs[0].code, 1);

        // Wide bar: horizontal major axis, far from round
        assert_eq!(blobs[1].rect, PixelRect::new(60, 40, 20, 5));
        assert_abs_diff_eq!(blobs[1].rotation_deg(), 0.0, epsilon = 1e-3);
        assert!(blobs[1].roundness() < 0.1);
    }

    #[test]
    fn test_diagonal_pixels_are_connected() {
        let mut img = GrayImage::from_pixel(20, 20, Luma([200]));
        for i in 2..12 {
            img.put_pixel(i, i, Luma([0]));
        }
        let blobs = find_blobs(&Frame::Gray(img), &dark(), None, None, &unmerged()).unwrap();
        assert_eq!(blobs.len(), 1);
        assert_eq!(blobs[0].rect, PixelRect::new(2, 2, 10, 10));
        assert_abs_diff_eq!(blobs[0].rotation_deg(), 45.0, epsilon = 1e-3);
        assert_abs_diff_eq!(blobs[0].density(), 0.1, epsilon = 1e-6);
    }

    #[test]
    fn test_size_filters() {
        let frame = gray_frame(100, 80, &[(10, 10, 2, 2), (50, 50, 10, 10)]);
        let params = BlobParams {
            pixels_threshold: 30,
            area_threshold: 50,
            merge: false,
            margin: 0,
        };
        let blobs = find_blobs(&frame, &dark(), None, None, &params).unwrap();
        assert_eq!(blobs.len(), 1);
        assert_eq!(blobs[0].rect.x, 50);
    }

    #[test]
    fn test_merge_with_margin() {
        let frame = gray_frame(100, 80, &[(10, 10, 10, 10), (25, 10, 10, 10), (70, 60, 5, 5)]);
        let params = BlobParams {
            pixels_threshold: 1,
            area_threshold: 1,
            merge: true,
            margin: 6,
        };
        let mut blobs = find_blobs(&frame, &dark(), None, None, &params).unwrap();
        blobs.sort_by_key(|b| b.rect.x);
        assert_eq!(blobs.len(), 2);
        assert_eq!(blobs[0].rect, PixelRect::new(10, 10, 25, 10));
        assert_eq!(blobs[0].pixels, 200);
        assert_abs_diff_eq!(blobs[0].density(), 0.8, epsilon = 1e-6);
        assert_eq!(blobs[1].rect, PixelRect::new(70, 60, 5, 5));
    }

    #[test]
    fn test_merge_ors_class_codes() {
        let mut img = RgbImage::from_pixel(60, 40, Rgb([0, 0, 0]));
        for y in 10..20 {
            for x in 10..20 {
                img.put_pixel(x, y, Rgb([250, 0, 0]));
            }
            for x in 20..30 {
                img.put_pixel(x, y, Rgb([0, 250, 0]));
            }
        }
        let thresholds = vec![
            Thresholds::from_pairs(&[(200.0, 255.0), (0.0, 50.0), (0.0, 50.0)]),
            Thresholds::from_pairs(&[(0.0, 50.0), (200.0, 255.0), (0.0, 50.0)]),
        ];
        let params = BlobParams {
            pixels_threshold: 1,
            area_threshold: 1,
            merge: true,
            margin: 1,
        };
        let blobs = find_blobs(&Frame::Rgb(img), &thresholds, None, None, &params).unwrap();
        assert_eq!(blobs.len(), 1);
        assert_eq!(blobs[0].code, 0b11);
        assert_eq!(blobs[0].rect, PixelRect::new(10, 10, 20, 10));
    }

    #[test]
    fn test_roi_restricts_search() {
        let frame = gray_frame(100, 80, &[(10, 10, 10, 10), (60, 40, 10, 10)]);
        let roi = PixelRect::new(50, 30, 40, 40);
        let blobs = find_blobs(&frame, &dark(), Some(roi), None, &unmerged()).unwrap();
        assert_eq!(blobs.len(), 1);
        assert_eq!(blobs[0].rect, PixelRect::new(60, 40, 10, 10));

        // Partially visible blob is cut at the window edge
        let roi = PixelRect::new(65, 0, 35, 80);
        let blobs = find_blobs(&frame, &dark(), Some(roi), None, &unmerged()).unwrap();
        assert_eq!(blobs[0].rect, PixelRect::new(65, 40, 5, 10));

        let outside = PixelRect::new(200, 200, 10, 10);
        assert!(find_blobs(&frame, &dark(), Some(outside), None, &unmerged())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_mask_hides_pixels() {
        let frame = gray_frame(100, 80, &[(10, 10, 10, 10), (60, 40, 10, 10)]);
        let mut mask = GrayImage::from_pixel(100, 80, Luma([255]));
        for y in 0..40 {
            for x in 0..50 {
                mask.put_pixel(x, y, Luma([0]));
            }
        }
        let blobs = find_blobs(&frame, &dark(), None, Some(&mask), &unmerged()).unwrap();
        assert_eq!(blobs.len(), 1);
        assert_eq!(blobs[0].rect.x, 60);

        let wrong = GrayImage::new(10, 10);
        assert!(find_blobs(&frame, &dark(), None, Some(&wrong), &unmerged()).is_err());
    }

    #[test]
    fn test_channel_mismatch() {
        let frame = gray_frame(10, 10, &[]);
        let rgb = vec![Thresholds::from_pairs(&[(0.0, 1.0); 3])];
        let err = find_blobs(&frame, &rgb, None, None, &unmerged()).unwrap_err();
        assert!(matches!(
            err,
            VisionError::ChannelMismatch {
                expected: 1,
                actual: 3
            }
        ));
    }

    #[test]
    fn test_candidate_conversion() {
        let frame = gray_frame(100, 80, &[(10, 20, 8, 6)]);
        let blobs = find_blobs(&frame, &dark(), None, None, &unmerged()).unwrap();
        let candidate = blobs[0].to_candidate();
        assert_eq!(candidate.rect, Rect::new(10.0, 20.0, 8.0, 6.0));
        assert_eq!(candidate.pixels, 48);
        assert_eq!(candidate.area, 48.0);
        assert_eq!(candidate.code, 1);
    }
}

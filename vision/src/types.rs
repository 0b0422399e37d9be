//! Frame and detection parameter types

use image::{DynamicImage, GrayImage, ImageBuffer, Pixel, RgbImage};
use serde::{Deserialize, Serialize};

/// Sensor pixel format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelFormat {
    /// Single luma channel
    Grayscale,
    /// R, G, B channels
    #[default]
    Rgb,
}

impl PixelFormat {
    pub fn channels(&self) -> usize {
        match self {
            PixelFormat::Grayscale => 1,
            PixelFormat::Rgb => 3,
        }
    }
}

/// One captured image
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Gray(GrayImage),
    Rgb(RgbImage),
}

impl Frame {
    /// Convert a decoded image into the requested format
    pub fn from_dynamic(image: DynamicImage, format: PixelFormat) -> Self {
        match format {
            PixelFormat::Grayscale => Frame::Gray(image.to_luma8()),
            PixelFormat::Rgb => Frame::Rgb(image.to_rgb8()),
        }
    }

    pub fn width(&self) -> u32 {
        match self {
            Frame::Gray(img) => img.width(),
            Frame::Rgb(img) => img.width(),
        }
    }

    pub fn height(&self) -> u32 {
        match self {
            Frame::Gray(img) => img.height(),
            Frame::Rgb(img) => img.height(),
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width(), self.height())
    }

    pub fn format(&self) -> PixelFormat {
        match self {
            Frame::Gray(_) => PixelFormat::Grayscale,
            Frame::Rgb(_) => PixelFormat::Rgb,
        }
    }

    pub fn channels(&self) -> usize {
        self.format().channels()
    }

    /// Channel values at `(x, y)`; caller guarantees the coordinate is in frame
    pub fn pixel(&self, x: u32, y: u32) -> &[u8] {
        match self {
            Frame::Gray(img) => img.get_pixel(x, y).channels(),
            Frame::Rgb(img) => img.get_pixel(x, y).channels(),
        }
    }

    pub fn to_luma(&self) -> GrayImage {
        match self {
            Frame::Gray(img) => img.clone(),
            Frame::Rgb(img) => image::imageops::grayscale(img),
        }
    }

    /// Per-channel saturating `self - other`; `None` when the frames differ in shape
    pub fn saturating_sub(&self, other: &Frame) -> Option<Frame> {
        if self.dimensions() != other.dimensions() {
            return None;
        }
        match (self, other) {
            (Frame::Gray(a), Frame::Gray(b)) => Some(Frame::Gray(ImageBuffer::from_fn(
                a.width(),
                a.height(),
                |x, y| a.get_pixel(x, y).map2(b.get_pixel(x, y), u8::saturating_sub),
            ))),
            (Frame::Rgb(a), Frame::Rgb(b)) => Some(Frame::Rgb(ImageBuffer::from_fn(
                a.width(),
                a.height(),
                |x, y| a.get_pixel(x, y).map2(b.get_pixel(x, y), u8::saturating_sub),
            ))),
            _ => None,
        }
    }

    /// Negate every channel in place
    pub fn invert(&mut self) {
        match self {
            Frame::Gray(img) => image::imageops::invert(img),
            Frame::Rgb(img) => image::imageops::invert(img),
        }
    }
}

/// Parameters of the blob extraction primitive
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BlobParams {
    /// Minimum member pixels per blob
    pub pixels_threshold: u32,
    /// Minimum bounding box area per blob
    pub area_threshold: u32,
    /// Merge blobs whose grown bounding boxes overlap
    pub merge: bool,
    /// Growth applied to bounding boxes before the merge test
    pub margin: u32,
}

impl Default for BlobParams {
    fn default() -> Self {
        Self {
            pixels_threshold: 30,
            area_threshold: 50,
            merge: true,
            margin: 20,
        }
    }
}

impl BlobParams {
    pub fn new(pixels_threshold: u32, area_threshold: u32, margin: u32) -> Self {
        Self {
            pixels_threshold,
            area_threshold,
            merge: true,
            margin,
        }
    }
}

/// Extraction parameters per detection phase
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PhaseBlobParams {
    pub acquisition: BlobParams,
    pub tracking: BlobParams,
}

impl Default for PhaseBlobParams {
    fn default() -> Self {
        Self::target()
    }
}

impl PhaseBlobParams {
    /// Steady colour target: small blobs allowed while searching
    pub fn target() -> Self {
        Self {
            acquisition: BlobParams::new(30, 50, 20),
            tracking: BlobParams::new(75, 100, 20),
        }
    }

    /// Retroreflective goal seen through the difference image
    pub fn goal() -> Self {
        Self {
            acquisition: BlobParams::new(20, 40, 10),
            tracking: BlobParams::new(20, 40, 10),
        }
    }

    pub fn for_phase(&self, phase: blobtrack::DetectionPhase) -> &BlobParams {
        match phase {
            blobtrack::DetectionPhase::Acquisition => &self.acquisition,
            blobtrack::DetectionPhase::Tracking => &self.tracking,
        }
    }
}

//! Rectangle operations shared by the associator and the ROI predictor

use crate::error::{Result, TrackError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Axis-aligned rectangle in pixel units, anchored at its top-left corner
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    /// Build a rectangle from a `[x, y, w, h]` slice
    pub fn from_slice(values: &[f32]) -> Result<Self> {
        match values {
            [x, y, w, h] => Ok(Self::new(*x, *y, *w, *h)),
            _ => Err(TrackError::InvalidRect(values.len())),
        }
    }

    /// Build a rectangle around a center point
    pub fn from_center(cx: f32, cy: f32, w: f32, h: f32) -> Self {
        Self {
            x: cx - w / 2.0,
            y: cy - h / 2.0,
            w,
            h,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }

    pub fn area(&self) -> f32 {
        self.w * self.h
    }

    pub fn center(&self) -> (f32, f32) {
        (self.x + self.w / 2.0, self.y + self.h / 2.0)
    }

    pub fn to_array(&self) -> [f32; 4] {
        [self.x, self.y, self.w, self.h]
    }

    /// Grow the size by `scale` and shift the top-left corner by `offset`
    /// times the original size (scale 1.3 with offset -0.15 keeps it centred)
    pub fn inflate(&self, scale: f32, offset: f32) -> Self {
        Self {
            x: self.x + offset * self.w,
            y: self.y + offset * self.h,
            w: self.w * scale,
            h: self.h * scale,
        }
    }

    /// Move `self` toward `target`: centers by `position`, sizes by `size`
    pub fn blend_toward(&self, target: &Rect, position: f32, size: f32) -> Self {
        let (cx, cy) = self.center();
        let (tx, ty) = target.center();

        let new_cx = cx + position * (tx - cx);
        let new_cy = cy + position * (ty - cy);
        let new_w = self.w + size * (target.w - self.w);
        let new_h = self.h + size * (target.h - self.h);

        Self::from_center(new_cx, new_cy, new_w, new_h)
    }

    /// Clamp into `bounds`: top-left inside the bounds, bottom-right capped
    pub fn clamp_to(&self, bounds: &Rect) -> Self {
        let x = self.x.max(bounds.x).min(bounds.right());
        let y = self.y.max(bounds.y).min(bounds.bottom());
        let w = self.w.min(bounds.right() - x).max(0.0);
        let h = self.h.min(bounds.bottom() - y).max(0.0);
        Self { x, y, w, h }
    }

    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    /// Round each coordinate to the nearest integer
    pub fn to_pixels(&self) -> PixelRect {
        PixelRect {
            x: self.x.round() as i32,
            y: self.y.round() as i32,
            w: self.w.round().max(0.0) as u32,
            h: self.h.round().max(0.0) as u32,
        }
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Rect({:.1}, {:.1}, {:.1}, {:.1})",
            self.x, self.y, self.w, self.h
        )
    }
}

/// Integer pixel window handed to detection primitives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: i32,
    pub y: i32,
    pub w: u32,
    pub h: u32,
}

impl PixelRect {
    pub fn new(x: i32, y: i32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }

    /// Full frame window
    pub fn frame(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    pub fn right(&self) -> i32 {
        self.x + self.w as i32
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.h as i32
    }

    pub fn center(&self) -> (i32, i32) {
        (self.x + self.w as i32 / 2, self.y + self.h as i32 / 2)
    }

    pub fn is_empty(&self) -> bool {
        self.w == 0 || self.h == 0
    }

    /// Intersection with a `width` x `height` image, `None` when nothing is left
    pub fn clip(&self, width: u32, height: u32) -> Option<PixelRect> {
        let x0 = self.x.max(0);
        let y0 = self.y.max(0);
        let x1 = self.right().min(width as i32);
        let y1 = self.bottom().min(height as i32);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(PixelRect::new(x0, y0, (x1 - x0) as u32, (y1 - y0) as u32))
    }

    pub fn to_rect(&self) -> Rect {
        Rect::new(self.x as f32, self.y as f32, self.w as f32, self.h as f32)
    }
}

impl From<Rect> for PixelRect {
    fn from(rect: Rect) -> Self {
        rect.to_pixels()
    }
}

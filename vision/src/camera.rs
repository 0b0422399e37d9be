//! Hardware abstraction: camera, illumination source and clock
//!
//! The tracking loop never touches hardware directly. A flight build wires
//! these traits to the sensor and GPIO drivers; the replay build uses
//! `ImageSequenceCamera` and `NullIllumination`.

use crate::error::{Result, VisionError};
use crate::types::{Frame, PixelFormat};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Frame source
pub trait Camera {
    /// Switch the sensor to `format`; later captures use it
    fn configure(&mut self, format: PixelFormat) -> Result<()>;

    /// Capture the next frame
    fn capture(&mut self) -> Result<Frame>;

    /// Frame size in pixels (width, height)
    fn frame_size(&self) -> (u32, u32);
}

/// Switchable light, e.g. an infrared LED next to the lens
pub trait IlluminationSource {
    fn set(&mut self, on: bool) -> Result<()>;
}

/// Monotonic time and sleeping
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration);
}

impl<C: Clock + ?Sized> Clock for Rc<C> {
    fn now(&self) -> Instant {
        (**self).now()
    }

    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration)
    }
}

/// Wall clock that sleeps coarsely and spins the final stretch
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    spin: Duration,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self {
            spin: Duration::from_micros(200),
        }
    }
}

impl SystemClock {
    /// `spin` is the tail of every sleep that is busy-waited
    pub fn new(spin: Duration) -> Self {
        Self { spin }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        let deadline = Instant::now() + duration;
        if duration > self.spin {
            std::thread::sleep(duration - self.spin);
        }
        while Instant::now() < deadline {
            std::hint::spin_loop();
        }
    }
}

/// Sleep for whatever is left of `budget` since `since`
///
/// Returns the time slept; nothing when the budget is already spent.
pub fn settle<K: Clock + ?Sized>(clock: &K, since: Instant, budget: Duration) -> Duration {
    let elapsed = clock.now().saturating_duration_since(since);
    let remaining = budget.saturating_sub(elapsed);
    if !remaining.is_zero() {
        clock.sleep(remaining);
    }
    remaining
}

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp"];

/// Replays recorded images from a directory in file name order
#[derive(Debug)]
pub struct ImageSequenceCamera {
    paths: Vec<PathBuf>,
    next: usize,
    format: PixelFormat,
    size: (u32, u32),
}

impl ImageSequenceCamera {
    pub fn open<P: AsRef<Path>>(dir: P, format: PixelFormat) -> Result<Self> {
        let dir = dir.as_ref();
        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                    .unwrap_or(false)
            })
            .collect();
        paths.sort();

        let first = paths
            .first()
            .ok_or_else(|| VisionError::camera(format!("no images in {}", dir.display())))?;
        let size = image::image_dimensions(first)?;
        log::info!(
            "Replaying {} frames of {}x{} from {}",
            paths.len(),
            size.0,
            size.1,
            dir.display()
        );

        Ok(Self {
            paths,
            next: 0,
            format,
            size,
        })
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Frames not yet captured
    pub fn remaining(&self) -> usize {
        self.paths.len() - self.next
    }
}

impl Camera for ImageSequenceCamera {
    fn configure(&mut self, format: PixelFormat) -> Result<()> {
        log::debug!("Replay camera switched to {:?}", format);
        self.format = format;
        Ok(())
    }

    fn capture(&mut self) -> Result<Frame> {
        let path = self
            .paths
            .get(self.next)
            .ok_or(VisionError::EndOfSequence(self.paths.len()))?;
        let frame = Frame::from_dynamic(image::open(path)?, self.format);
        if frame.dimensions() != self.size {
            return Err(VisionError::camera(format!(
                "{} is {:?}, sequence is {:?}",
                path.display(),
                frame.dimensions(),
                self.size
            )));
        }
        self.next += 1;
        Ok(frame)
    }

    fn frame_size(&self) -> (u32, u32) {
        self.size
    }
}

/// Illumination stand-in that only logs transitions
#[derive(Debug, Default)]
pub struct NullIllumination {
    on: bool,
}

impl NullIllumination {
    pub fn is_on(&self) -> bool {
        self.on
    }
}

impl IlluminationSource for NullIllumination {
    fn set(&mut self, on: bool) -> Result<()> {
        if on != self.on {
            log::trace!("Illumination {}", if on { "on" } else { "off" });
        }
        self.on = on;
        Ok(())
    }
}

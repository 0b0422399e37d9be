//! Deterministic fakes shared by the unit tests

use crate::camera::{Camera, Clock, IlluminationSource};
use crate::error::{Result, VisionError};
use crate::types::{Frame, PixelFormat};
use image::{DynamicImage, Rgb, RgbImage};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Clock that only moves when told to; sleeps advance it and are recorded
#[derive(Debug)]
pub struct ManualClock {
    base: Instant,
    offset: Cell<Duration>,
    sleeps: RefCell<Vec<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset: Cell::new(Duration::ZERO),
            sleeps: RefCell::new(Vec::new()),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.offset.set(self.offset.get() + by);
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.borrow().clone()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + self.offset.get()
    }

    fn sleep(&self, duration: Duration) {
        self.sleeps.borrow_mut().push(duration);
        self.advance(duration);
    }
}

/// Real time that skips its sleeps: work costs what it really costs, sleeps
/// are recorded and added to the reading instead of blocking
#[derive(Debug, Default)]
pub struct RecordingClock {
    skipped: Cell<Duration>,
    sleeps: RefCell<Vec<Duration>>,
}

impl RecordingClock {
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.borrow().clone()
    }
}

impl Clock for RecordingClock {
    fn now(&self) -> Instant {
        Instant::now() + self.skipped.get()
    }

    fn sleep(&self, duration: Duration) {
        self.sleeps.borrow_mut().push(duration);
        self.skipped.set(self.skipped.get() + duration);
    }
}

/// Hardware interaction, in call order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Capture { lit: bool },
    Light(bool),
    Configure(PixelFormat),
}

pub type EventLog = Rc<RefCell<Vec<Event>>>;

/// Camera looking at a fixed scene that changes when the light is on
pub struct SceneCamera {
    ambient: RgbImage,
    lit: RgbImage,
    light: Rc<Cell<bool>>,
    events: EventLog,
    format: PixelFormat,
    /// Capture cost charged to the clock, if any
    pub clock: Option<(Rc<ManualClock>, Duration)>,
    /// Fail every capture taken with the light on
    pub fail_lit: bool,
}

impl Camera for SceneCamera {
    fn configure(&mut self, format: PixelFormat) -> Result<()> {
        self.events.borrow_mut().push(Event::Configure(format));
        self.format = format;
        Ok(())
    }

    fn capture(&mut self) -> Result<Frame> {
        let lit = self.light.get();
        self.events.borrow_mut().push(Event::Capture { lit });
        if let Some((clock, cost)) = &self.clock {
            clock.advance(*cost);
        }
        if lit && self.fail_lit {
            return Err(VisionError::camera("sensor timeout"));
        }
        let scene = if lit { &self.lit } else { &self.ambient };
        Ok(Frame::from_dynamic(
            DynamicImage::ImageRgb8(scene.clone()),
            self.format,
        ))
    }

    fn frame_size(&self) -> (u32, u32) {
        self.ambient.dimensions()
    }
}

/// Light whose state the paired `SceneCamera` observes
pub struct SceneLight {
    state: Rc<Cell<bool>>,
    events: EventLog,
}

impl IlluminationSource for SceneLight {
    fn set(&mut self, on: bool) -> Result<()> {
        self.events.borrow_mut().push(Event::Light(on));
        self.state.set(on);
        Ok(())
    }
}

pub fn rig(ambient: RgbImage, lit: RgbImage, format: PixelFormat) -> (SceneCamera, SceneLight, EventLog) {
    let events = EventLog::default();
    let state = Rc::new(Cell::new(false));
    let camera = SceneCamera {
        ambient,
        lit,
        light: state.clone(),
        events: events.clone(),
        format,
        clock: None,
        fail_lit: false,
    };
    let light = SceneLight {
        state,
        events: events.clone(),
    };
    (camera, light, events)
}

/// Uniform grey scene with square spots of the given brightness
pub fn scene(width: u32, height: u32, background: u8, spots: &[(u32, u32, u32, u8)]) -> RgbImage {
    let mut img = RgbImage::from_pixel(width, height, Rgb([background; 3]));
    for &(x, y, size, value) in spots {
        for yy in y..(y + size).min(height) {
            for xx in x..(x + size).min(width) {
                img.put_pixel(xx, yy, Rgb([value; 3]));
            }
        }
    }
    img
}

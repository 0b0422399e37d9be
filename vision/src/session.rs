//! Mode-switching session around the tracking engine
//!
//! The session owns the hardware and exactly one tracker. A mode switch
//! tears the tracker down, reconfigures the camera and builds a fresh tracker
//! in SEARCHING for the new target type.

use crate::active_illumination::{ActiveIlluminationDetector, EdgeParams};
use crate::camera::{Camera, Clock, IlluminationSource};
use crate::color_detector::ColorThresholdDetector;
use crate::config::{TrackingMode, VisionConfig};
use crate::telemetry::{track_payload, ModeCommand};
use anyhow::{anyhow, Result};
use blobtrack::{TrackOutput, Tracker, TrackingState};

enum Engine<C: Camera, L: IlluminationSource, K: Clock> {
    Target {
        tracker: Tracker<ColorThresholdDetector<C>>,
        // Parked until the goal mode needs them again
        light: L,
        clock: K,
    },
    Goal(Tracker<ActiveIlluminationDetector<C, L, K>>),
}

impl<C: Camera, L: IlluminationSource, K: Clock> Engine<C, L, K> {
    fn build(
        mode: TrackingMode,
        mut camera: C,
        light: L,
        clock: K,
        config: &VisionConfig,
    ) -> Result<Self> {
        camera.configure(mode.pixel_format())?;
        let mode_config = config.mode(mode);
        let engine = match mode {
            TrackingMode::Target => Engine::Target {
                tracker: Tracker::new(
                    ColorThresholdDetector::new(camera, mode_config.blobs.clone()),
                    mode_config.thresholds.clone(),
                    mode_config.tracker.clone(),
                )?,
                light,
                clock,
            },
            TrackingMode::Goal => {
                let detector = ActiveIlluminationDetector::new(
                    camera,
                    light,
                    clock,
                    config.settle(),
                    mode_config.blobs.clone(),
                )
                .with_edge_removal(config.edge_removal.then(EdgeParams::default));
                Engine::Goal(Tracker::new(
                    detector,
                    mode_config.thresholds.clone(),
                    mode_config.tracker.clone(),
                )?)
            }
        };
        Ok(engine)
    }

    fn into_parts(self) -> (C, L, K) {
        match self {
            Engine::Target {
                tracker,
                light,
                clock,
            } => (tracker.into_source().into_camera(), light, clock),
            Engine::Goal(tracker) => tracker.into_source().into_parts(),
        }
    }

    fn mode(&self) -> TrackingMode {
        match self {
            Engine::Target { .. } => TrackingMode::Target,
            Engine::Goal(_) => TrackingMode::Goal,
        }
    }
}

pub struct Session<C: Camera, L: IlluminationSource, K: Clock> {
    config: VisionConfig,
    // Only empty if a mode switch failed half way
    engine: Option<Engine<C, L, K>>,
    n_ticks: u64,
}

impl<C: Camera, L: IlluminationSource, K: Clock> Session<C, L, K> {
    pub fn new(camera: C, light: L, clock: K, config: VisionConfig) -> Result<Self> {
        config.validate()?;
        if camera.frame_size() != config.frame_size {
            log::warn!(
                "Camera delivers {:?} frames, configuration expects {:?}",
                camera.frame_size(),
                config.frame_size
            );
        }
        let engine = Engine::build(config.initial_mode, camera, light, clock, &config)?;
        log::info!("Session started in {:?} mode", config.initial_mode);
        Ok(Self {
            config,
            engine: Some(engine),
            n_ticks: 0,
        })
    }

    fn engine(&mut self) -> Result<&mut Engine<C, L, K>> {
        self.engine
            .as_mut()
            .ok_or_else(|| anyhow!("session lost its tracker in a failed mode switch"))
    }

    pub fn mode(&self) -> Option<TrackingMode> {
        self.engine.as_ref().map(Engine::mode)
    }

    pub fn tracking_state(&self) -> Option<TrackingState> {
        self.engine.as_ref().map(|engine| match engine {
            Engine::Target { tracker, .. } => tracker.state(),
            Engine::Goal(tracker) => tracker.state(),
        })
    }

    pub fn tick_count(&self) -> u64 {
        self.n_ticks
    }

    /// Act on an inbound command; returns whether the mode changed
    pub fn apply(&mut self, command: ModeCommand) -> Result<bool> {
        match command {
            ModeCommand::Target => self.switch(TrackingMode::Target),
            ModeCommand::Goal => self.switch(TrackingMode::Goal),
            ModeCommand::Unrecognized => {
                log::debug!("Ignoring unrecognized command");
                Ok(false)
            }
        }
    }

    pub fn switch(&mut self, mode: TrackingMode) -> Result<bool> {
        if self.mode() == Some(mode) {
            log::info!("Already in {:?} mode", mode);
            return Ok(false);
        }
        let engine = self
            .engine
            .take()
            .ok_or_else(|| anyhow!("session lost its tracker in a failed mode switch"))?;
        let from = engine.mode();
        let (camera, light, clock) = engine.into_parts();
        self.engine = Some(Engine::build(mode, camera, light, clock, &self.config)?);
        log::info!("Switched from {:?} to {:?} mode", from, mode);
        Ok(true)
    }

    /// Run one tracking tick in the current mode
    pub fn tick(&mut self) -> Result<TrackOutput> {
        self.n_ticks += 1;
        match self.engine()? {
            Engine::Target { tracker, .. } => tracker.tick(),
            Engine::Goal(tracker) => tracker.tick(),
        }
    }

    /// Outbound telemetry words for a tick's output
    pub fn telemetry_words(&self, output: &TrackOutput) -> [i16; 5] {
        track_payload(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{rig, scene, Event, EventLog, ManualClock, SceneCamera, SceneLight};
    use crate::types::PixelFormat;
    use blobtrack::TrackStatus;
    use image::{Rgb, RgbImage};
    use std::rc::Rc;

    type TestSession = Session<SceneCamera, SceneLight, Rc<ManualClock>>;

    /// Green balloon at (20, 20) in daylight, reflector at (80, 40) only when lit
    fn scenes() -> (RgbImage, RgbImage) {
        let mut ambient = scene(120, 80, 10, &[]);
        for y in 20..36 {
            for x in 20..36 {
                ambient.put_pixel(x, y, Rgb([20, 200, 20]));
            }
        }
        let mut lit = ambient.clone();
        for y in 40..50 {
            for x in 80..90 {
                lit.put_pixel(x, y, Rgb([255, 255, 255]));
            }
        }
        (ambient, lit)
    }

    fn session(mode: TrackingMode) -> (TestSession, EventLog, Rc<ManualClock>) {
        let (ambient, lit) = scenes();
        let (camera, light, events) = rig(ambient, lit, PixelFormat::Rgb);
        let clock = Rc::new(ManualClock::new());
        let config = VisionConfig {
            initial_mode: mode,
            frame_size: (120, 80),
            ..VisionConfig::default()
        };
        let session = Session::new(camera, light, clock.clone(), config).unwrap();
        (session, events, clock)
    }

    #[test]
    fn test_target_mode_tracks_balloon() {
        let (mut session, events, clock) = session(TrackingMode::Target);
        assert_eq!(events.borrow()[0], Event::Configure(PixelFormat::Rgb));

        let out = session.tick().unwrap();
        assert_eq!(out.status(), TrackStatus::Detecting);
        let words = session.telemetry_words(&out);
        assert_eq!(words[0], 1);
        assert_eq!(&words[3..], &[16, 16]);

        assert_eq!(session.tick().unwrap().status(), TrackStatus::Detecting);
        assert_eq!(session.tracking_state(), Some(TrackingState::Tracking));
        // Colour mode never touches the light or the clock
        assert!(!events.borrow().iter().any(|e| matches!(e, Event::Light(_))));
        assert!(clock.sleeps().is_empty());
    }

    #[test]
    fn test_goal_mode_tracks_reflector() {
        let (mut session, events, clock) = session(TrackingMode::Goal);
        assert_eq!(events.borrow()[0], Event::Configure(PixelFormat::Grayscale));

        let out = session.tick().unwrap();
        let report = out.report().unwrap();
        assert_eq!(&report.features.as_slice()[..4], &[80.0, 40.0, 10.0, 10.0]);
        assert_eq!(session.tick().unwrap().status(), TrackStatus::Detecting);
        assert_eq!(clock.sleeps().len(), 4);
    }

    #[test]
    fn test_unrecognized_command_keeps_mode() {
        let (mut session, events, _clock) = session(TrackingMode::Target);
        session.tick().unwrap();
        let before = events.borrow().len();

        assert!(!session.apply(ModeCommand::Unrecognized).unwrap());
        assert_eq!(session.mode(), Some(TrackingMode::Target));
        assert_eq!(session.tracking_state(), Some(TrackingState::Tracking));
        assert_eq!(events.borrow().len(), before);
    }

    #[test]
    fn test_switching_rebuilds_tracker() {
        let (mut session, events, _clock) = session(TrackingMode::Target);
        session.tick().unwrap();

        assert!(session.apply(ModeCommand::Goal).unwrap());
        assert_eq!(session.mode(), Some(TrackingMode::Goal));
        assert_eq!(session.tracking_state(), Some(TrackingState::Searching));
        assert_eq!(
            events.borrow().last(),
            Some(&Event::Configure(PixelFormat::Grayscale))
        );

        // Same command again is a no-op
        let before = events.borrow().len();
        assert!(!session.apply(ModeCommand::Goal).unwrap());
        assert_eq!(events.borrow().len(), before);

        let out = session.tick().unwrap();
        assert_eq!(out.report().unwrap().features[0], 80.0);

        assert!(session.apply(ModeCommand::Target).unwrap());
        let out = session.tick().unwrap();
        assert_eq!(out.report().unwrap().features[0], 20.0);
        assert_eq!(session.tick_count(), 3);
    }
}

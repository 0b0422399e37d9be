//! Replay recorded frames through the onboard tracker
//!
//! Telemetry frames go to `--telemetry` (a serial device or a plain file);
//! inbound mode commands are read from `--commands`, one 32-byte frame per tick.

use anyhow::{Context, Result};
use clap::Parser;
use onboard_vision::{
    Camera, ImageSequenceCamera, LogIndicator, NullIllumination, Session, StatusIndicator,
    SystemClock, TelemetryLink, VisionConfig, VisionError,
};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "onboard-tracker")]
#[command(about = "Track a blob target through a recorded frame sequence")]
#[command(version)]
struct Cli {
    /// JSON configuration; built-in defaults when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory of recorded frames, replayed in file name order
    #[arg(long)]
    frames: PathBuf,

    /// Where to write outbound telemetry frames
    #[arg(long)]
    telemetry: Option<PathBuf>,

    /// Inbound command frames, consumed one per tick
    #[arg(long)]
    commands: Option<PathBuf>,

    /// Stop after this many ticks
    #[arg(long)]
    max_ticks: Option<u64>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => VisionConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => VisionConfig::default(),
    };

    let camera = ImageSequenceCamera::open(&cli.frames, config.initial_mode.pixel_format())
        .with_context(|| format!("Failed to open frames in {}", cli.frames.display()))?;
    let (width, height) = camera.frame_size();
    log::info!(
        "onboard-tracker {}: {} frames of {}x{}",
        onboard_vision::version(),
        camera.len(),
        width,
        height
    );

    let tx: Box<dyn Write> = match &cli.telemetry {
        Some(path) => Box::new(
            OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(path)
                .with_context(|| format!("Failed to open telemetry output {}", path.display()))?,
        ),
        None => Box::new(std::io::sink()),
    };
    let rx = match &cli.commands {
        Some(path) => Some(
            File::open(path)
                .with_context(|| format!("Failed to open command input {}", path.display()))?,
        ),
        None => None,
    };
    let mut link = TelemetryLink::new(tx, rx);

    let mut session = Session::new(camera, NullIllumination::default(), SystemClock::default(), config)?;
    let mut indicator = LogIndicator::default();
    let mut detected = 0u64;
    let mut coasting = 0u64;

    loop {
        if cli.max_ticks.is_some_and(|max| session.tick_count() >= max) {
            break;
        }
        if let Some(command) = link.receive()? {
            session.apply(command)?;
        }

        let output = match session.tick() {
            Ok(output) => output,
            Err(e) if matches!(
                e.downcast_ref::<VisionError>(),
                Some(VisionError::EndOfSequence(_))
            ) =>
            {
                log::info!("End of frame sequence");
                break;
            }
            Err(e) => return Err(e),
        };

        match output.report() {
            Some(report) if report.detected => detected += 1,
            Some(_) => coasting += 1,
            None => {}
        }
        indicator.show(output.status())?;
        let words = session.telemetry_words(&output);
        log::debug!("Tick {}: {:?} -> {:?}", session.tick_count(), output.status(), words);
        link.send(&words)?;
    }

    log::info!(
        "Processed {} ticks: {} detected, {} coasting, {} telemetry frames, {} status changes",
        session.tick_count(),
        detected,
        coasting,
        link.frames_sent(),
        indicator.changes()
    );
    Ok(())
}

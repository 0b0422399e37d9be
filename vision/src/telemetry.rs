//! Serial telemetry frames exchanged with the flight controller
//!
//! Every frame is 32 bytes:
//!
//! | bytes  | content                                              |
//! |--------|------------------------------------------------------|
//! | 0..2   | header `0x20 0x40`                                   |
//! | 2..30  | 14 little-endian `i16` words, zero padded            |
//! | 30..32 | XOR of bytes 2..30, as a 16-bit value (low, high)    |

use crate::error::{Result, VisionError};
use blobtrack::{TrackOutput, TrackStatus};
use std::io::{ErrorKind, Read, Write};

pub const FRAME_LEN: usize = 32;
pub const HEADER: [u8; 2] = [0x20, 0x40];
pub const MAX_WORDS: usize = 14;

/// Single-word payloads the controller sends to select a mode
pub const TARGET_MODE_FLAG: i16 = 0x11;
pub const GOAL_MODE_FLAG: i16 = 0x22;

pub type TelemetryFrame = [u8; FRAME_LEN];

/// Running XOR of `bytes` in a 16-bit accumulator
pub fn checksum(bytes: &[u8]) -> u16 {
    bytes.iter().fold(0u16, |acc, &b| acc ^ b as u16)
}

pub fn encode(words: &[i16]) -> Result<TelemetryFrame> {
    if words.len() > MAX_WORDS {
        return Err(VisionError::PayloadTooLong(words.len()));
    }
    let mut frame = [0u8; FRAME_LEN];
    frame[..2].copy_from_slice(&HEADER);
    for (i, word) in words.iter().enumerate() {
        frame[2 + 2 * i..4 + 2 * i].copy_from_slice(&word.to_le_bytes());
    }
    let sum = checksum(&frame[2..30]);
    frame[30..].copy_from_slice(&sum.to_le_bytes());
    Ok(frame)
}

pub fn decode(frame: &[u8]) -> Result<[i16; MAX_WORDS]> {
    if frame.len() != FRAME_LEN {
        return Err(VisionError::decode(format!(
            "expected {} bytes, got {}",
            FRAME_LEN,
            frame.len()
        )));
    }
    if frame[..2] != HEADER {
        return Err(VisionError::decode(format!(
            "bad header {:#04x} {:#04x}",
            frame[0], frame[1]
        )));
    }
    let expected = checksum(&frame[2..30]);
    let actual = u16::from_le_bytes([frame[30], frame[31]]);
    if expected != actual {
        return Err(VisionError::decode(format!(
            "checksum {:#06x}, computed {:#06x}",
            actual, expected
        )));
    }

    let mut words = [0i16; MAX_WORDS];
    for (i, word) in words.iter_mut().enumerate() {
        *word = i16::from_le_bytes([frame[2 + 2 * i], frame[3 + 2 * i]]);
    }
    Ok(words)
}

/// Mode request carried by an inbound frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeCommand {
    Target,
    Goal,
    /// Anything that is not one of the two mode frames
    Unrecognized,
}

/// Match an inbound frame against the two mode sentinels
pub fn classify(frame: &[u8]) -> ModeCommand {
    let sentinel = |flag: i16| encode(&[flag]).map(|s| s[..] == *frame).unwrap_or(false);
    if sentinel(TARGET_MODE_FLAG) {
        ModeCommand::Target
    } else if sentinel(GOAL_MODE_FLAG) {
        ModeCommand::Goal
    } else {
        ModeCommand::Unrecognized
    }
}

/// Outbound words for one tick: `[status, x, y, w, h]`
///
/// Status is 0 without a track, 1 when detected and 2 when coasting. `x, y`
/// is the centre of the search window and `w, h` the truncated target size.
pub fn track_payload(output: &TrackOutput) -> [i16; 5] {
    let report = match output.report() {
        Some(report) => report,
        None => return [0; 5],
    };
    let status = match output.status() {
        TrackStatus::Detecting => 1,
        TrackStatus::Coasting => 2,
        TrackStatus::Lost => 0,
    };
    let (cx, cy) = report.roi.center();
    [
        status,
        saturate(cx),
        saturate(cy),
        report.features[2] as i16,
        report.features[3] as i16,
    ]
}

fn saturate(value: i32) -> i16 {
    value.clamp(i16::MIN as i32, i16::MAX as i32) as i16
}

/// Bidirectional telemetry over any byte streams (UART device, file, socket)
pub struct TelemetryLink<W: Write, R: Read> {
    tx: W,
    rx: Option<R>,
    /// Inbound bytes of a frame still being received
    pending: [u8; FRAME_LEN],
    filled: usize,
    sent: u64,
}

impl<W: Write, R: Read> TelemetryLink<W, R> {
    pub fn new(tx: W, rx: Option<R>) -> Self {
        Self {
            tx,
            rx,
            pending: [0; FRAME_LEN],
            filled: 0,
            sent: 0,
        }
    }

    pub fn send(&mut self, words: &[i16]) -> Result<()> {
        let frame = encode(words)?;
        self.tx.write_all(&frame)?;
        self.tx.flush()?;
        self.sent += 1;
        Ok(())
    }

    /// Read one inbound frame, if a whole one has arrived
    ///
    /// Bytes of a frame cut short by `WouldBlock` are kept for the next call.
    /// A short frame at end of stream classifies as `Unrecognized`.
    pub fn receive(&mut self) -> Result<Option<ModeCommand>> {
        let rx = match self.rx.as_mut() {
            Some(rx) => rx,
            None => return Ok(None),
        };
        let mut at_end = false;
        while self.filled < FRAME_LEN {
            match rx.read(&mut self.pending[self.filled..]) {
                Ok(0) => {
                    at_end = true;
                    break;
                }
                Ok(n) => self.filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) => return Err(e.into()),
            }
        }
        if self.filled == 0 || (self.filled < FRAME_LEN && !at_end) {
            return Ok(None);
        }

        let command = classify(&self.pending[..self.filled]);
        if command == ModeCommand::Unrecognized {
            log::warn!("Unrecognized inbound frame ({} bytes)", self.filled);
        }
        self.filled = 0;
        Ok(Some(command))
    }

    /// Bytes of an incomplete inbound frame held back so far
    pub fn pending_len(&self) -> usize {
        self.filled
    }

    pub fn frames_sent(&self) -> u64 {
        self.sent
    }

    pub fn into_writer(self) -> W {
        self.tx
    }
}

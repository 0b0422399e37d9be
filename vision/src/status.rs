//! Status LED patterns

use crate::error::Result;
use blobtrack::TrackStatus;
use serde::{Deserialize, Serialize};

/// On/off state of the three status LEDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LedPattern {
    pub red: bool,
    pub green: bool,
    pub blue: bool,
}

impl LedPattern {
    pub const OFF: LedPattern = LedPattern {
        red: false,
        green: false,
        blue: false,
    };
}

impl From<TrackStatus> for LedPattern {
    fn from(status: TrackStatus) -> Self {
        match status {
            TrackStatus::Detecting => LedPattern {
                blue: true,
                ..LedPattern::OFF
            },
            TrackStatus::Coasting => LedPattern {
                red: true,
                blue: true,
                ..LedPattern::OFF
            },
            TrackStatus::Lost => LedPattern {
                green: true,
                ..LedPattern::OFF
            },
        }
    }
}

/// Something that can show the tracking status
pub trait StatusIndicator {
    fn show(&mut self, status: TrackStatus) -> Result<()>;
}

/// Indicator that logs pattern changes
#[derive(Debug, Default)]
pub struct LogIndicator {
    current: Option<LedPattern>,
    changes: usize,
}

impl LogIndicator {
    pub fn pattern(&self) -> Option<LedPattern> {
        self.current
    }

    pub fn changes(&self) -> usize {
        self.changes
    }
}

impl StatusIndicator for LogIndicator {
    fn show(&mut self, status: TrackStatus) -> Result<()> {
        let pattern = LedPattern::from(status);
        if self.current != Some(pattern) {
            log::info!("Status {:?}: {:?}", status, pattern);
            self.current = Some(pattern);
            self.changes += 1;
        }
        Ok(())
    }
}

//! Segmentation threshold adaptation
//!
//! Each target class has a baseline bound set (fixed at construction) and a
//! current one. Fresh region statistics pull the current bounds toward
//! `mean +/- k * stdev`; misses pull them back toward the baseline.

use crate::candidate::RegionStatistics;
use crate::config::AdaptationConfig;
use crate::error::{Result, TrackError};
use serde::{Deserialize, Serialize};

/// Inclusive bounds of one channel
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelBounds {
    pub min: f32,
    pub max: f32,
}

impl ChannelBounds {
    pub fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f32) -> bool {
        value >= self.min && value <= self.max
    }

    fn blend(&self, target: &ChannelBounds, rate: f32) -> ChannelBounds {
        ChannelBounds {
            min: rate * target.min + (1.0 - rate) * self.min,
            max: rate * target.max + (1.0 - rate) * self.max,
        }
    }
}

/// Bounds for every channel of one target class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Thresholds {
    pub channels: Vec<ChannelBounds>,
}

impl Thresholds {
    pub fn new(channels: Vec<ChannelBounds>) -> Self {
        Self { channels }
    }

    /// Build from flat `(min, max)` pairs, e.g. `[(0.0, 20.0)]` for grayscale
    pub fn from_pairs(pairs: &[(f32, f32)]) -> Self {
        Self {
            channels: pairs
                .iter()
                .map(|&(min, max)| ChannelBounds::new(min, max))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// True when every channel value lies within its bounds
    pub fn matches(&self, pixel: &[u8]) -> bool {
        self.channels.len() == pixel.len()
            && self
                .channels
                .iter()
                .zip(pixel)
                .all(|(bounds, &value)| bounds.contains(value as f32))
    }

    /// `mean +/- multiplier * stdev` for every channel
    pub fn from_statistics(stats: &RegionStatistics, multiplier: f32) -> Self {
        Self {
            channels: stats
                .channels
                .iter()
                .map(|c| {
                    ChannelBounds::new(c.mean - multiplier * c.stdev, c.mean + multiplier * c.stdev)
                })
                .collect(),
        }
    }

    fn blend(&self, target: &Thresholds, rate: f32) -> Thresholds {
        Thresholds {
            channels: self
                .channels
                .iter()
                .zip(&target.channels)
                .map(|(current, target)| current.blend(target, rate))
                .collect(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.channels.is_empty() {
            return Err(TrackError::config("threshold set has no channels"));
        }
        for (i, bounds) in self.channels.iter().enumerate() {
            if !(bounds.min <= bounds.max) {
                return Err(TrackError::config(format!(
                    "channel {} has min {} above max {}",
                    i, bounds.min, bounds.max
                )));
            }
        }
        Ok(())
    }
}

/// What happened this tick, from the adapter's point of view
#[derive(Debug, Clone, Copy)]
pub enum ThresholdUpdate<'a> {
    /// Statistics of the region just matched, and the match's colour code
    Fresh {
        stats: &'a RegionStatistics,
        code: u32,
    },
    /// No detection this tick
    Recall,
    /// Track dropped
    Reset,
}

#[derive(Debug, Clone)]
pub struct ThresholdAdapter {
    baseline: Vec<Thresholds>,
    current: Vec<Thresholds>,
    config: AdaptationConfig,
}

impl ThresholdAdapter {
    pub fn new(baseline: Vec<Thresholds>, config: AdaptationConfig) -> Result<Self> {
        if baseline.is_empty() {
            return Err(TrackError::config("at least one threshold set is required"));
        }
        for thresholds in &baseline {
            thresholds.validate()?;
        }
        let channels = baseline[0].len();
        if baseline.iter().any(|t| t.len() != channels) {
            return Err(TrackError::config(
                "all threshold sets must have the same channel count",
            ));
        }
        Ok(Self {
            current: baseline.clone(),
            baseline,
            config,
        })
    }

    pub fn baseline(&self) -> &[Thresholds] {
        &self.baseline
    }

    pub fn current(&self) -> &[Thresholds] {
        &self.current
    }

    pub fn channels(&self) -> usize {
        self.baseline[0].len()
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn update(&mut self, update: ThresholdUpdate<'_>) -> Result<()> {
        if !self.config.enabled {
            return Ok(());
        }
        let rate = self.config.rate;
        match update {
            ThresholdUpdate::Reset => {
                self.current = self.baseline.clone();
            }
            ThresholdUpdate::Recall => {
                for (current, baseline) in self.current.iter_mut().zip(&self.baseline) {
                    *current = current.blend(baseline, rate);
                }
            }
            ThresholdUpdate::Fresh { stats, code } => {
                if stats.len() != self.channels() {
                    return Err(TrackError::ChannelMismatch {
                        expected: self.channels(),
                        actual: stats.len(),
                    });
                }
                let target = Thresholds::from_statistics(stats, self.config.stdev_multiplier);
                let selected = self.classes_for(code);
                for (i, current) in self.current.iter_mut().enumerate() {
                    if selected.is_empty() || selected.contains(&i) {
                        *current = current.blend(&target, rate);
                    }
                }
                log::debug!("Thresholds adapted toward {:?}", target.channels);
            }
        }
        Ok(())
    }

    fn classes_for(&self, code: u32) -> Vec<usize> {
        (0..self.current.len().min(32))
            .filter(|i| code & (1 << i) != 0)
            .collect()
    }
}

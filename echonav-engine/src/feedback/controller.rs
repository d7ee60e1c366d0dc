//! Feedback mode controller
//!
//! Maps each distance sample to a warning level, a feedback mode for the
//! audio node, presentation text, and a one-shot haptic decision.
//!
//! The controller only returns a `Classification`; pushing the mode to the
//! audio node, firing the haptic and publishing text is the caller's job.
//! Its own state (the near latch and last level) is mutated only through
//! `classify`, so the edge-triggered haptic depends solely on the sequence of
//! classify calls.

use super::mapping::{map_frequency, map_interval};
use crate::config::EngineConfig;
use echonav_common::{FeedbackMode, StatusText, WarningLevel};
use tracing::{debug, trace};

/// Placeholder shown when no distance is available
pub const NO_DISTANCE_TEXT: &str = "—";

/// One raycast result: meters to the nearest surface, or no target.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DistanceSample(Option<f32>);

impl DistanceSample {
    pub fn at(meters: f32) -> Self {
        Self(Some(meters))
    }

    pub fn no_target() -> Self {
        Self(None)
    }

    pub fn meters(&self) -> Option<f32> {
        self.0
    }

    /// Distance usable for classification: `None` when absent, non-finite or
    /// beyond `max_sense`, otherwise clamped to `[0, max_sense]`.
    pub fn within(&self, max_sense: f32) -> Option<f32> {
        match self.0 {
            Some(d) if d.is_finite() && d <= max_sense => Some(d.max(0.0)),
            _ => None,
        }
    }
}

impl From<Option<f32>> for DistanceSample {
    fn from(value: Option<f32>) -> Self {
        Self(value)
    }
}

/// Result of classifying one sample
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub level: WarningLevel,
    pub mode: FeedbackMode,
    pub status: StatusText,
    /// `"{:.2} m"` of the clamped distance, or the placeholder
    pub distance_text: String,
    /// Fire the haptic pulse for this sample
    pub haptic_pulse: bool,
    /// Clamped distance that drove the classification
    pub distance: Option<f32>,
}

/// Threshold classifier with edge-triggered near latch
#[derive(Debug, Clone)]
pub struct FeedbackController {
    near_threshold: f32,
    mid_threshold: f32,
    max_sense: f32,
    low_beep_interval: f64,
    low_beep_frequency: f64,

    /// Set on entering High, cleared on leaving it
    near_latched: bool,
    last_level: WarningLevel,
}

impl FeedbackController {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            near_threshold: config.near_threshold,
            mid_threshold: config.mid_threshold,
            max_sense: config.max_sense,
            low_beep_interval: config.low_beep_interval_secs,
            low_beep_frequency: config.low_beep_frequency_hz,
            near_latched: false,
            last_level: WarningLevel::None,
        }
    }

    /// Classify a sample and advance the haptic latch.
    pub fn classify(&mut self, sample: DistanceSample, audio_enabled: bool) -> Classification {
        let Some(distance) = sample.within(self.max_sense) else {
            if self.last_level != WarningLevel::None {
                debug!("Target lost ({:?} -> none)", self.last_level);
            }
            self.near_latched = false;
            self.last_level = WarningLevel::None;
            return Classification {
                level: WarningLevel::None,
                mode: FeedbackMode::Silent,
                status: StatusText::Scanning,
                distance_text: NO_DISTANCE_TEXT.to_string(),
                haptic_pulse: false,
                distance: None,
            };
        };

        let level = self.level_for(distance);
        let mode = if audio_enabled {
            self.mode_for(level, distance)
        } else {
            FeedbackMode::Silent
        };

        let haptic_pulse = if level == WarningLevel::High {
            let fire = !self.near_latched;
            self.near_latched = true;
            fire
        } else {
            self.near_latched = false;
            false
        };

        if level != self.last_level {
            debug!(
                "Warning level {:?} -> {:?} at {:.2} m ({})",
                self.last_level, level, distance, mode
            );
        }
        trace!("Classified {:.3} m as {:?}", distance, level);
        self.last_level = level;

        Classification {
            level,
            mode,
            status: level.status(),
            distance_text: format!("{:.2} m", distance),
            haptic_pulse,
            distance: Some(distance),
        }
    }

    /// Level for an in-range, clamped distance
    pub fn level_for(&self, distance: f32) -> WarningLevel {
        if distance < self.near_threshold {
            WarningLevel::High
        } else if distance < self.mid_threshold {
            WarningLevel::Medium
        } else if distance <= self.max_sense {
            WarningLevel::Low
        } else {
            WarningLevel::None
        }
    }

    /// Audible mode for a level (audio enabled)
    pub fn mode_for(&self, level: WarningLevel, distance: f32) -> FeedbackMode {
        match level {
            WarningLevel::High => FeedbackMode::Continuous {
                frequency: map_frequency(distance),
            },
            WarningLevel::Medium => FeedbackMode::Beep {
                interval: map_interval(distance),
                frequency: map_frequency(distance),
            },
            WarningLevel::Low => FeedbackMode::Beep {
                interval: self.low_beep_interval,
                frequency: self.low_beep_frequency,
            },
            WarningLevel::None => FeedbackMode::Silent,
        }
    }

    pub fn last_level(&self) -> WarningLevel {
        self.last_level
    }

    pub fn is_near_latched(&self) -> bool {
        self.near_latched
    }
}

//! Sample-rate loop driver
//!
//! Frames arrive at whatever rate the sensor delivers them. The driver admits
//! them at the configured sampling rate, and only admitted frames cost a
//! raycast and a classification.

use crate::config::EngineConfig;
use crate::feedback::{Classification, DistanceSample, FeedbackController};
use crate::sensing::Cadence;

#[derive(Debug, Clone)]
pub struct SamplingDriver {
    cadence: Cadence,
    controller: FeedbackController,
    last_sample: Option<DistanceSample>,
}

impl SamplingDriver {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            cadence: Cadence::new(1.0 / config.sampling_rate_hz),
            controller: FeedbackController::new(config),
            last_sample: None,
        }
    }

    /// Whether the frame at `timestamp` should be sampled
    pub fn poll(&mut self, timestamp: f64) -> bool {
        self.cadence.admit(timestamp)
    }

    /// Classify a fresh sample and remember it
    pub fn sample(&mut self, sample: DistanceSample, audio_enabled: bool) -> Classification {
        self.last_sample = Some(sample);
        self.controller.classify(sample, audio_enabled)
    }

    /// Classify the last sample again, e.g. after the audio toggle changed.
    ///
    /// The level cannot change, so neither can the haptic latch.
    pub fn reclassify(&mut self, audio_enabled: bool) -> Option<Classification> {
        let sample = self.last_sample?;
        Some(self.controller.classify(sample, audio_enabled))
    }

    pub fn last_sample(&self) -> Option<DistanceSample> {
        self.last_sample
    }

    pub fn controller(&self) -> &FeedbackController {
        &self.controller
    }

    /// Drop the cadence, last sample and latch state
    pub fn reset(&mut self, config: &EngineConfig) {
        *self = Self::new(config);
    }
}

//! Proximity engine
//!
//! Wires the sensing collaborator to the feedback controller, the audio node,
//! the haptic emitter and the detection pipeline, and publishes the result
//! through `SharedState`.
//!
//! All methods take `&self`; share the engine behind an `Arc`. Frame handling
//! and the audio toggle are serialised on the sampling lock, so mode changes
//! reach the audio node in the order they were decided.

use crate::audio::{cpal_opener, DeviceOpener, FeedbackAudio};
use crate::config::EngineConfig;
use crate::detection::{DetectionPipeline, DetectionThrottler};
use crate::error::{Error, Result};
use crate::feedback::{Classification, DistanceSample};
use crate::sampling::SamplingDriver;
use crate::sensing::{HapticEmitter, HapticSeverity, Recognizer, SceneFrame, SensingSource};
use crate::state::SharedState;
use echonav_common::{EngineRunState, FeedbackMode, ProximityEvent, StatusText};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tracing::{debug, error, info, trace, warn};

/// What happened to one scene frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameReport {
    /// Frame was accepted (engine running and frame newer than the last)
    pub applied: bool,
    /// Frame was dropped for not being newer than the last applied one
    pub stale: bool,
    /// A recognition pass was started for this frame
    pub detection_started: bool,
    /// Set when the frame was due for a distance sample
    pub classification: Option<Classification>,
}

pub struct ProximityEngine {
    config: EngineConfig,
    sensing: Arc<dyn SensingSource>,
    haptics: Arc<dyn HapticEmitter>,
    audio: FeedbackAudio,
    detection: DetectionPipeline,
    sampling: tokio::sync::Mutex<SamplingDriver>,
    /// Timestamp of the last applied frame
    last_frame: Mutex<Option<f64>>,
    state: Arc<SharedState>,
}

impl ProximityEngine {
    /// Build an idle engine. Must be called inside a tokio runtime.
    ///
    /// `recognizer` is `None` when no recognition model could be loaded; the
    /// engine then runs without object recognition.
    pub fn new(
        config: EngineConfig,
        sensing: Arc<dyn SensingSource>,
        haptics: Arc<dyn HapticEmitter>,
        recognizer: Option<Arc<dyn Recognizer>>,
    ) -> Result<Self> {
        Self::with_device_opener(config, sensing, haptics, recognizer, cpal_opener())
    }

    /// Like `new`, with the audio device stream opened by `opener`
    pub fn with_device_opener(
        config: EngineConfig,
        sensing: Arc<dyn SensingSource>,
        haptics: Arc<dyn HapticEmitter>,
        recognizer: Option<Arc<dyn Recognizer>>,
        opener: DeviceOpener,
    ) -> Result<Self> {
        config.validate()?;

        let state = Arc::new(SharedState::new());
        let audio = FeedbackAudio::with_opener(&config, opener)?;
        let detection = DetectionPipeline::new(
            DetectionThrottler::new(&config),
            recognizer,
            Arc::clone(&state),
        );
        let sampling = tokio::sync::Mutex::new(SamplingDriver::new(&config));

        Ok(Self {
            config,
            sensing,
            haptics,
            audio,
            detection,
            sampling,
            last_frame: Mutex::new(None),
            state,
        })
    }

    /// Start sensing and feedback.
    ///
    /// Fails with `SensingUnavailable` when the device cannot reconstruct the
    /// scene; the engine then stays where it was. An audio device that
    /// cannot be opened does not fail the start: the engine runs Degraded.
    pub async fn start(&self) -> Result<()> {
        let current = self.state.get_run_state().await;
        if current.is_active() {
            debug!("Engine already {:?}", current);
            return Ok(());
        }

        if !self.sensing.supports_scene_reconstruction() {
            error!("Scene reconstruction not supported on this device");
            return Err(Error::SensingUnavailable(
                "scene reconstruction not supported".to_string(),
            ));
        }

        info!("Starting proximity engine");
        self.state.set_status(StatusText::Scanning).await;
        self.haptics.prepare();

        if !self.detection.has_recognizer() {
            warn!("No recognizer installed; object recognition disabled");
        }

        self.sampling.lock().await.reset(&self.config);
        self.detection.reset();
        *self.last_frame.lock().unwrap_or_else(|p| p.into_inner()) = None;

        let run_state = match self.audio.start_engine().await {
            Ok(_) => EngineRunState::Running,
            Err(e) => {
                warn!("Audio output unavailable, continuing without sound: {}", e);
                self.state.broadcast_event(ProximityEvent::AudioUnavailable {
                    message: e.to_string(),
                    timestamp: chrono::Utc::now(),
                });
                EngineRunState::Degraded
            }
        };

        self.state.transition(run_state).await;
        info!("Proximity engine {:?}", run_state);
        Ok(())
    }

    /// Handle one scene update from the sensing collaborator.
    ///
    /// Runs the detection throttler and the sampling driver, each on its own
    /// cadence. Frames not newer than the last applied one are dropped.
    pub async fn on_scene_update(&self, frame: &SceneFrame) -> FrameReport {
        let mut report = FrameReport::default();

        // Run state is read under the sampling lock so a frame queued behind
        // stop() sees Stopped
        let mut sampling = self.sampling.lock().await;
        if !self.state.get_run_state().await.is_active() {
            trace!("Engine not running; frame at {:.3} ignored", frame.timestamp);
            return report;
        }

        {
            let mut last = self.last_frame.lock().unwrap_or_else(|p| p.into_inner());
            let fresh = frame.timestamp.is_finite()
                && last.map_or(true, |previous| frame.timestamp > previous);
            if !fresh {
                trace!(
                    "Stale frame at {:.3} (last applied {:?})",
                    frame.timestamp,
                    *last
                );
                self.state.increment_stale_frames();
                report.stale = true;
                return report;
            }
            *last = Some(frame.timestamp);
        }
        report.applied = true;

        report.detection_started = self.detection.on_frame(frame);

        if sampling.poll(frame.timestamp) {
            let distance = DistanceSample::from(self.sensing.raycast_from_center(frame));
            let audio_enabled = self.state.is_audio_enabled().await;
            let classification = sampling.sample(distance, audio_enabled);
            self.apply(&classification).await;
            report.classification = Some(classification);
        }

        report
    }

    /// Turn audible feedback on or off.
    ///
    /// Off silences immediately. On restores the mode for the last sample
    /// without waiting for the next one.
    pub async fn set_audio_enabled(&self, enabled: bool) -> Result<()> {
        let mut sampling = self.sampling.lock().await;

        let previous = self.state.set_audio_enabled(enabled).await;
        if previous == enabled {
            return Ok(());
        }
        info!("Audio feedback {}", if enabled { "enabled" } else { "disabled" });
        self.state.broadcast_event(ProximityEvent::AudioEnabledChanged {
            enabled,
            timestamp: chrono::Utc::now(),
        });

        if !enabled {
            return self.audio.set_mode(FeedbackMode::Silent);
        }

        if self.state.get_run_state().await.is_active() {
            if let Some(classification) = sampling.reclassify(true) {
                self.apply(&classification).await;
            }
        }
        Ok(())
    }

    /// Stop feedback and release the audio device. Safe to call repeatedly.
    pub async fn stop(&self) -> Result<()> {
        let _sampling = self.sampling.lock().await;
        if self.state.get_run_state().await == EngineRunState::Stopped {
            debug!("Engine already stopped");
            return Ok(());
        }

        info!("Stopping proximity engine");

        self.detection.reset();
        self.audio.stop_engine().await;
        self.state.transition(EngineRunState::Stopped).await;

        info!("Proximity engine stopped");
        Ok(())
    }

    pub fn state(&self) -> Arc<SharedState> {
        Arc::clone(&self.state)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProximityEvent> {
        self.state.subscribe_events()
    }

    pub fn audio(&self) -> &FeedbackAudio {
        &self.audio
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Recognition passes started since the engine was created
    pub fn recognition_passes(&self) -> u64 {
        self.detection.passes_started()
    }

    async fn apply(&self, classification: &Classification) {
        if classification.haptic_pulse {
            debug!("Haptic pulse");
            self.haptics.fire_pulse(HapticSeverity::Warning);
        }
        if let Err(e) = self.audio.set_mode(classification.mode) {
            warn!("Feedback mode rejected: {}", e);
        }
        self.state.apply_classification(classification).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensing::NoHaptics;
    use echonav_common::WarningLevel;

    struct FixedDistance {
        supported: bool,
        distance: Option<f32>,
    }

    impl SensingSource for FixedDistance {
        fn supports_scene_reconstruction(&self) -> bool {
            self.supported
        }

        fn raycast_from_center(&self, _frame: &SceneFrame) -> Option<f32> {
            self.distance
        }
    }

    fn engine(supported: bool, distance: Option<f32>) -> ProximityEngine {
        let mut config = EngineConfig::default();
        config.audio.output_enabled = false;
        ProximityEngine::new(
            config,
            Arc::new(FixedDistance {
                supported,
                distance,
            }),
            Arc::new(NoHaptics),
            None,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_start_requires_scene_reconstruction() {
        let engine = engine(false, Some(1.0));
        let result = engine.start().await;
        assert!(matches!(result, Err(Error::SensingUnavailable(_))));
        assert_eq!(engine.state().get_run_state().await, EngineRunState::Idle);
    }

    #[tokio::test]
    async fn test_frames_ignored_before_start() {
        let engine = engine(true, Some(1.0));
        let report = engine.on_scene_update(&SceneFrame::empty(0.0)).await;
        assert!(!report.applied);
        assert!(report.classification.is_none());
    }

    #[tokio::test]
    async fn test_start_sets_scanning_and_running() {
        let engine = engine(true, None);
        engine.start().await.unwrap();

        let state = engine.state();
        assert_eq!(state.get_status().await, StatusText::Scanning);
        assert_eq!(state.get_run_state().await, EngineRunState::Running);

        let report = engine.on_scene_update(&SceneFrame::empty(0.0)).await;
        let classification = report.classification.unwrap();
        assert_eq!(classification.level, WarningLevel::None);
        assert_eq!(state.get_status().await, StatusText::Scanning);
    }

    #[tokio::test]
    async fn test_invalid_config_rejected() {
        let mut config = EngineConfig::default();
        config.near_threshold = 2.0;
        let result = ProximityEngine::new(
            config,
            Arc::new(FixedDistance {
                supported: true,
                distance: None,
            }),
            Arc::new(NoHaptics),
            None,
        );
        assert!(matches!(result, Err(Error::Config(_))));
    }
}

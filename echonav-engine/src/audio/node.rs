//! Feedback audio node
//!
//! Owns everything the render path reads (tone cell, beep gate), the beep
//! scheduler, and the optional device stream. The sensing domain talks to it
//! only through `set_mode`.

use super::beep::BeepScheduler;
use super::output::{cpal_opener, DeviceOpener, OutputHandle, OutputInfo};
use super::params::{BeepGate, ToneCell, ToneParams};
use super::synth::WaveformSynthesizer;
use crate::config::{AudioConfig, EngineConfig};
use crate::error::{Error, Result};
use echonav_common::FeedbackMode;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info, warn};

pub struct FeedbackAudio {
    tone: Arc<ToneCell>,
    gate: Arc<BeepGate>,
    scheduler: BeepScheduler,
    current: Mutex<FeedbackMode>,
    output: tokio::sync::Mutex<Option<OutputHandle>>,
    opener: DeviceOpener,

    audio_config: AudioConfig,
    sample_rate: u32,
    amplitude: f32,
    beep_on_duration: Duration,
    reschedule_tolerance: f64,
}

impl FeedbackAudio {
    /// Create a silent node. Must be called inside a tokio runtime.
    pub fn new(config: &EngineConfig) -> Result<Self> {
        Self::with_opener(config, cpal_opener())
    }

    /// Create a silent node whose device stream is opened by `opener`
    pub fn with_opener(config: &EngineConfig, opener: DeviceOpener) -> Result<Self> {
        let tone = Arc::new(ToneCell::new());
        let gate = Arc::new(BeepGate::new());
        let scheduler = BeepScheduler::new(Arc::clone(&gate))?;

        Ok(Self {
            tone,
            gate,
            scheduler,
            current: Mutex::new(FeedbackMode::Silent),
            output: tokio::sync::Mutex::new(None),
            opener,
            audio_config: config.audio.clone(),
            sample_rate: config.audio_sample_rate,
            amplitude: config.amplitude,
            beep_on_duration: config.beep_on_duration(),
            reschedule_tolerance: config.reschedule_tolerance_secs,
        })
    }

    /// Switch the audible behaviour.
    ///
    /// Beep is published before its schedule starts; any other mode stops
    /// the schedule before it is published, so the render path never sees a
    /// stale gate with the new mode. A Beep whose interval is within the
    /// reschedule tolerance of the running one only updates the pitch and
    /// keeps the running interval.
    pub fn set_mode(&self, mode: FeedbackMode) -> Result<()> {
        let mut current = self.current.lock().unwrap_or_else(|p| p.into_inner());
        if *current == mode {
            return Ok(());
        }

        let mut effective = mode;
        match mode {
            FeedbackMode::Beep {
                interval,
                frequency,
            } => {
                let period = Duration::try_from_secs_f64(interval)
                    .ok()
                    .filter(|d| !d.is_zero())
                    .ok_or_else(|| {
                        Error::InvalidState(format!("Invalid beep interval: {}", interval))
                    })?;

                self.tone.publish(ToneParams::from(&mode));

                match self.scheduler.current_interval() {
                    Some(running)
                        if (running.as_secs_f64() - interval).abs()
                            <= self.reschedule_tolerance =>
                    {
                        effective = FeedbackMode::Beep {
                            interval: running.as_secs_f64(),
                            frequency,
                        };
                    }
                    _ => self.scheduler.start(period, self.beep_on_duration),
                }
            }
            FeedbackMode::Continuous { .. } | FeedbackMode::Silent => {
                self.scheduler.stop();
                self.tone.publish(ToneParams::from(&mode));
            }
        }

        debug!("Feedback mode {} -> {}", *current, effective);
        *current = effective;
        Ok(())
    }

    /// Mode being played. A Beep reports the interval actually scheduled.
    pub fn current_mode(&self) -> FeedbackMode {
        *self.current.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Open the output device and start rendering.
    ///
    /// Returns `None` when device output is disabled in configuration.
    /// Calling it again while a stream is open returns the open stream.
    pub async fn start_engine(&self) -> Result<Option<OutputInfo>> {
        if !self.audio_config.output_enabled {
            info!("Audio device output disabled; rendering nowhere");
            return Ok(None);
        }

        let mut output = self.output.lock().await;
        if let Some(handle) = output.as_ref() {
            return Ok(Some(handle.info().clone()));
        }

        let handle = OutputHandle::spawn(
            &self.audio_config,
            self.synthesizer(),
            Arc::clone(&self.opener),
        )
        .await?;
        let info = handle.info().clone();
        info!(
            "Audio output running on '{}' ({} Hz, {} ch)",
            info.device_name, info.sample_rate, info.channels
        );
        *output = Some(handle);
        Ok(Some(info))
    }

    /// Cancel the beep schedule, silence the render path, release the device.
    pub async fn stop_engine(&self) {
        self.set_silent();

        let handle = self.output.lock().await.take();
        if let Some(mut handle) = handle {
            if handle.has_error() {
                warn!("Audio stream reported errors before shutdown");
            }
            if tokio::task::spawn_blocking(move || handle.shutdown())
                .await
                .is_err()
            {
                warn!("Audio output shutdown task failed");
            }
            info!("Audio output released");
        }
    }

    /// Whether a device stream is currently open
    pub async fn is_output_active(&self) -> bool {
        self.output.lock().await.is_some()
    }

    /// A new synthesizer reading this node's parameters
    pub fn synthesizer(&self) -> WaveformSynthesizer {
        WaveformSynthesizer::new(
            Arc::clone(&self.tone),
            Arc::clone(&self.gate),
            self.sample_rate,
            self.amplitude,
        )
    }

    /// Parameters the render path currently sees
    pub fn tone_params(&self) -> ToneParams {
        self.tone.snapshot()
    }

    pub fn is_beep_audible(&self) -> bool {
        self.gate.is_audible()
    }

    pub fn beep_count(&self) -> u64 {
        self.gate.epoch()
    }

    pub fn beep_interval(&self) -> Option<Duration> {
        self.scheduler.current_interval()
    }

    fn set_silent(&self) {
        let mut current = self.current.lock().unwrap_or_else(|p| p.into_inner());
        self.scheduler.stop();
        self.tone.publish(ToneParams::SILENT);
        *current = FeedbackMode::Silent;
    }
}

//! Configuration for the proximity feedback engine
//!
//! Every setting has a built-in default (the reference tuning). An optional
//! TOML file may override any subset of them:
//!
//! ```toml
//! near_threshold = 0.5
//! sampling_rate_hz = 15.0
//!
//! [audio]
//! output_enabled = true
//! device = "USB Headset"
//!
//! [logging]
//! level = "debug"
//! ```
//!
//! Distances are in meters, durations in seconds, frequencies in Hz.

use crate::error::{Error, Result};
use echonav_common::config::{load_toml, resolve_config_path, LoggingConfig, CONFIG_ENV_VAR};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Engine configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Below this distance the level is High
    pub near_threshold: f32,
    /// Below this distance the level is Medium
    pub mid_threshold: f32,
    /// Maximum sensing range; anything beyond is "no target"
    pub max_sense: f32,

    /// Distance sampling cadence
    pub sampling_rate_hz: f64,
    /// Minimum spacing between recognition passes
    pub detection_interval_secs: f64,
    /// Recognition results at or below this confidence are discarded
    pub confidence_cutoff: f32,

    /// How long each beep stays audible
    pub beep_on_duration_secs: f64,
    /// Beep cadence used in the Low zone
    pub low_beep_interval_secs: f64,
    /// Beep pitch used in the Low zone
    pub low_beep_frequency_hz: f64,
    /// Interval changes smaller than this do not restart the beep schedule
    pub reschedule_tolerance_secs: f64,

    /// Synthesis sample rate
    pub audio_sample_rate: u32,
    /// Peak amplitude of the synthesized tone (fraction of full scale)
    pub amplitude: f32,

    pub audio: AudioConfig,
    pub logging: LoggingConfig,
}

/// Audio device settings
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AudioConfig {
    /// Open a hardware output stream on start (false = run silent, degraded)
    pub output_enabled: bool,
    /// Output device name (None = system default)
    pub device: Option<String>,
    /// Requested buffer size in frames (None = device default)
    pub buffer_size: Option<u32>,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            output_enabled: true,
            device: None,
            buffer_size: None,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            near_threshold: 0.6,
            mid_threshold: 1.2,
            max_sense: 4.0,
            sampling_rate_hz: 10.0,
            detection_interval_secs: 1.0,
            confidence_cutoff: 0.4,
            beep_on_duration_secs: 0.08,
            low_beep_interval_secs: 1.0,
            low_beep_frequency_hz: 600.0,
            reschedule_tolerance_secs: 0.05,
            audio_sample_rate: 44_100,
            amplitude: 0.1,
            audio: AudioConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Parse a TOML document; unspecified fields keep their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| Error::Common(echonav_common::Error::TomlParse(e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let config: Self = load_toml(path)?;
        config.validate()?;
        info!("Engine configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load from the resolved config file, or fall back to built-in defaults
    pub fn load_or_default() -> Result<Self> {
        match resolve_config_path(CONFIG_ENV_VAR)? {
            Some(path) => Self::load(&path),
            None => {
                info!("Using built-in engine configuration");
                Ok(Self::default())
            }
        }
    }

    /// Check internal consistency
    pub fn validate(&self) -> Result<()> {
        let finite = [self.near_threshold, self.mid_threshold, self.max_sense]
            .iter()
            .all(|v| v.is_finite());
        if !finite || self.near_threshold <= 0.0 {
            return Err(Error::Config(
                "Distance thresholds must be finite and positive".to_string(),
            ));
        }
        if !(self.near_threshold < self.mid_threshold && self.mid_threshold < self.max_sense) {
            return Err(Error::Config(format!(
                "Thresholds must satisfy near < mid < max_sense (got {} / {} / {})",
                self.near_threshold, self.mid_threshold, self.max_sense
            )));
        }

        for (name, value) in [
            ("sampling_rate_hz", self.sampling_rate_hz),
            ("detection_interval_secs", self.detection_interval_secs),
            ("beep_on_duration_secs", self.beep_on_duration_secs),
            ("low_beep_interval_secs", self.low_beep_interval_secs),
            ("low_beep_frequency_hz", self.low_beep_frequency_hz),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(Error::Config(format!("{} must be positive (got {})", name, value)));
            }
        }

        if !(self.reschedule_tolerance_secs.is_finite() && self.reschedule_tolerance_secs >= 0.0) {
            return Err(Error::Config(format!(
                "reschedule_tolerance_secs must be >= 0 (got {})",
                self.reschedule_tolerance_secs
            )));
        }
        if !(0.0..=1.0).contains(&self.confidence_cutoff) {
            return Err(Error::Config(format!(
                "confidence_cutoff must be within [0, 1] (got {})",
                self.confidence_cutoff
            )));
        }
        if self.audio_sample_rate == 0 {
            return Err(Error::Config("audio_sample_rate must be non-zero".to_string()));
        }
        if !(self.amplitude > 0.0 && self.amplitude <= 1.0) {
            return Err(Error::Config(format!(
                "amplitude must be within (0, 1] (got {})",
                self.amplitude
            )));
        }
        Ok(())
    }

    /// Spacing between distance samples
    pub fn sampling_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.sampling_rate_hz)
    }

    pub fn detection_interval(&self) -> Duration {
        Duration::from_secs_f64(self.detection_interval_secs)
    }

    pub fn beep_on_duration(&self) -> Duration {
        Duration::from_secs_f64(self.beep_on_duration_secs)
    }
}

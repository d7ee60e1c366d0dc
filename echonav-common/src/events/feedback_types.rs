//! Feedback-related type definitions
//!
//! Warning levels, feedback modes and the fixed status strings shown by the
//! presentation layer.

use serde::{Deserialize, Serialize};

/// Discrete severity classification of obstacle proximity.
///
/// Ordered by severity: `None < Low < Medium < High`.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum WarningLevel {
    /// No target within sensing range
    #[default]
    None,
    /// Target between the mid threshold and maximum range
    Low,
    /// Target between the near and mid thresholds
    Medium,
    /// Target closer than the near threshold
    High,
}

impl WarningLevel {
    /// Status text shown for this level
    pub fn status(self) -> StatusText {
        match self {
            WarningLevel::None => StatusText::Scanning,
            WarningLevel::Low => StatusText::Clear,
            WarningLevel::Medium => StatusText::Attention,
            WarningLevel::High => StatusText::Danger,
        }
    }
}

impl std::fmt::Display for WarningLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WarningLevel::None => write!(f, "none"),
            WarningLevel::Low => write!(f, "low"),
            WarningLevel::Medium => write!(f, "medium"),
            WarningLevel::High => write!(f, "high"),
        }
    }
}

/// Audio behavior currently requested from the synthesizer.
///
/// Intervals are in seconds, frequencies in Hz; both are positive for the
/// tone-producing variants.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum FeedbackMode {
    /// No output
    #[default]
    Silent,
    /// Periodic beep at `interval` seconds
    Beep { interval: f64, frequency: f64 },
    /// Uninterrupted tone
    Continuous { frequency: f64 },
}

impl FeedbackMode {
    /// Tone frequency, if this mode produces sound
    pub fn frequency(&self) -> Option<f64> {
        match self {
            FeedbackMode::Silent => None,
            FeedbackMode::Beep { frequency, .. } | FeedbackMode::Continuous { frequency } => {
                Some(*frequency)
            }
        }
    }

    /// Beep interval, if this is a beep mode
    pub fn beep_interval(&self) -> Option<f64> {
        match self {
            FeedbackMode::Beep { interval, .. } => Some(*interval),
            _ => None,
        }
    }

    pub fn is_silent(&self) -> bool {
        matches!(self, FeedbackMode::Silent)
    }
}

impl std::fmt::Display for FeedbackMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeedbackMode::Silent => write!(f, "silent"),
            FeedbackMode::Beep {
                interval,
                frequency,
            } => write!(f, "beep every {:.2}s at {:.0}Hz", interval, frequency),
            FeedbackMode::Continuous { frequency } => write!(f, "continuous at {:.0}Hz", frequency),
        }
    }
}

/// Fixed set of human-readable status strings
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StatusText {
    /// Engine created but not started
    #[default]
    Initializing,
    /// Running, no target in range
    Scanning,
    /// Target far enough away
    Clear,
    /// Target approaching
    Attention,
    /// Target very close
    Danger,
}

impl StatusText {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusText::Initializing => "Initializing",
            StatusText::Scanning => "Scanning",
            StatusText::Clear => "Clear",
            StatusText::Attention => "Attention",
            StatusText::Danger => "DANGER",
        }
    }
}

impl std::fmt::Display for StatusText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Engine lifecycle state
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum EngineRunState {
    /// Created, not yet started
    #[default]
    Idle,
    /// Running with audio output
    Running,
    /// Running without audio output (device unavailable)
    Degraded,
    /// Stopped; audio released
    Stopped,
}

impl EngineRunState {
    pub fn is_active(self) -> bool {
        matches!(self, EngineRunState::Running | EngineRunState::Degraded)
    }
}

impl std::fmt::Display for EngineRunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineRunState::Idle => write!(f, "idle"),
            EngineRunState::Running => write!(f, "running"),
            EngineRunState::Degraded => write!(f, "degraded"),
            EngineRunState::Stopped => write!(f, "stopped"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warning_level_ordering() {
        assert!(WarningLevel::None < WarningLevel::Low);
        assert!(WarningLevel::Low < WarningLevel::Medium);
        assert!(WarningLevel::Medium < WarningLevel::High);
        assert_eq!(
            [WarningLevel::High, WarningLevel::None, WarningLevel::Medium]
                .iter()
                .max(),
            Some(&WarningLevel::High)
        );
    }

    #[test]
    fn test_level_status_mapping() {
        assert_eq!(WarningLevel::None.status(), StatusText::Scanning);
        assert_eq!(WarningLevel::Low.status(), StatusText::Clear);
        assert_eq!(WarningLevel::Medium.status(), StatusText::Attention);
        assert_eq!(WarningLevel::High.status(), StatusText::Danger);
        assert_eq!(StatusText::Danger.to_string(), "DANGER");
    }

    #[test]
    fn test_feedback_mode_accessors() {
        let beep = FeedbackMode::Beep {
            interval: 0.5,
            frequency: 900.0,
        };
        assert_eq!(beep.frequency(), Some(900.0));
        assert_eq!(beep.beep_interval(), Some(0.5));
        assert!(!beep.is_silent());

        let tone = FeedbackMode::Continuous { frequency: 1050.0 };
        assert_eq!(tone.frequency(), Some(1050.0));
        assert_eq!(tone.beep_interval(), None);

        assert!(FeedbackMode::Silent.is_silent());
        assert_eq!(FeedbackMode::Silent.frequency(), None);
    }

    #[test]
    fn test_feedback_mode_serialization_tag() {
        let json = serde_json::to_value(FeedbackMode::Continuous { frequency: 1050.0 }).unwrap();
        assert_eq!(json["mode"], "continuous");
        assert_eq!(json["frequency"], 1050.0);
    }
}

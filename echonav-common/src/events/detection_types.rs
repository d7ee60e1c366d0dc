//! Recognized-object records published to the presentation layer

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Label used when the recognizer returns an object without any label
pub const UNKNOWN_LABEL: &str = "?";

/// One recognized object
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Detection {
    /// List identity (fresh on every recognition pass)
    pub id: Uuid,
    /// Top label reported by the recognizer
    pub label: String,
    /// Confidence in [0, 1]
    pub confidence: f32,
}

impl Detection {
    pub fn new(label: impl Into<String>, confidence: f32) -> Self {
        Self {
            id: Uuid::new_v4(),
            label: label.into(),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    /// Confidence as a truncated integer percentage, e.g. `"87%"`
    pub fn confidence_percent(&self) -> String {
        format!("{}%", (self.confidence * 100.0) as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_percent_truncates() {
        assert_eq!(Detection::new("chair", 0.879).confidence_percent(), "87%");
        assert_eq!(Detection::new("door", 1.0).confidence_percent(), "100%");
    }

    #[test]
    fn test_confidence_clamped() {
        assert_eq!(Detection::new("table", 1.7).confidence, 1.0);
        assert_eq!(Detection::new("table", -0.2).confidence, 0.0);
    }

    #[test]
    fn test_ids_are_unique() {
        let a = Detection::new("person", 0.9);
        let b = Detection::new("person", 0.9);
        assert_ne!(a.id, b.id);
    }
}

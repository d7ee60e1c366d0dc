//! Event types for the EchoNav event system
//!
//! The presentation layer never polls engine internals directly: every
//! user-visible change is published as a `ProximityEvent` on the `EventBus`.
//! Slow or absent subscribers never block the engine (broadcast channel,
//! oldest events dropped on overflow).

mod detection_types;
mod feedback_types;

pub use detection_types::{Detection, UNKNOWN_LABEL};
pub use feedback_types::{EngineRunState, FeedbackMode, StatusText, WarningLevel};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// EchoNav event types
///
/// Serializable so a presentation layer in another process can consume the
/// same stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ProximityEvent {
    /// Engine lifecycle changed
    EngineStateChanged {
        old_state: EngineRunState,
        new_state: EngineRunState,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A distance sample was classified
    ///
    /// Emitted at the sampling cadence (10 Hz by default), including when the
    /// level did not change.
    FeedbackUpdated {
        /// Formatted distance (`"1.23 m"` or the placeholder)
        distance_text: String,
        status: StatusText,
        warning_level: WarningLevel,
        mode: FeedbackMode,
        /// True when this sample fired the one-shot haptic pulse
        haptic_pulse: bool,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Detection list replaced after a successful recognition pass
    DetectionsUpdated {
        detections: Vec<Detection>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Recognition pass failed; previous list retained
    RecognitionFailed {
        message: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Audio toggle changed by the presentation layer
    AudioEnabledChanged {
        enabled: bool,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Audio output could not be acquired; running without sound
    AudioUnavailable {
        message: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

/// Central event distribution bus
///
/// Thin wrapper over `tokio::sync::broadcast`.
pub struct EventBus {
    tx: broadcast::Sender<ProximityEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<ProximityEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: ProximityEvent,
    ) -> Result<usize, broadcast::error::SendError<ProximityEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: ProximityEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

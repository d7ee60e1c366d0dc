//! Shared presentation state
//!
//! Snapshot of everything the presentation layer shows, plus the event bus
//! that announces changes to it. Written by the sampling driver, the
//! detection pipeline and the engine lifecycle; read by anyone.

use crate::feedback::{Classification, NO_DISTANCE_TEXT};
use echonav_common::{
    Detection, EngineRunState, EventBus, ProximityEvent, StatusText, WarningLevel,
};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{broadcast, RwLock};

/// Events buffered per subscriber before the oldest are dropped
const EVENT_CAPACITY: usize = 256;

/// Shared state accessible by all components
pub struct SharedState {
    /// `"{:.2} m"` or the placeholder
    pub distance_text: RwLock<String>,
    pub status: RwLock<StatusText>,
    pub warning_level: RwLock<WarningLevel>,
    /// Replaced wholesale after each successful recognition pass
    pub detections: RwLock<Vec<Detection>>,
    pub audio_enabled: RwLock<bool>,
    pub run_state: RwLock<EngineRunState>,

    events: EventBus,

    /// Haptic pulses fired since start
    haptic_pulses_total: AtomicU64,
    /// Frames dropped for not being newer than the last applied one
    stale_frames_total: AtomicU64,
}

impl SharedState {
    pub fn new() -> Self {
        Self {
            distance_text: RwLock::new(NO_DISTANCE_TEXT.to_string()),
            status: RwLock::new(StatusText::Initializing),
            warning_level: RwLock::new(WarningLevel::None),
            detections: RwLock::new(Vec::new()),
            audio_enabled: RwLock::new(true),
            run_state: RwLock::new(EngineRunState::Idle),
            events: EventBus::new(EVENT_CAPACITY),
            haptic_pulses_total: AtomicU64::new(0),
            stale_frames_total: AtomicU64::new(0),
        }
    }

    /// Broadcast an event (no receivers is fine)
    pub fn broadcast_event(&self, event: ProximityEvent) {
        self.events.emit_lossy(event);
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ProximityEvent> {
        self.events.subscribe()
    }

    pub async fn get_distance_text(&self) -> String {
        self.distance_text.read().await.clone()
    }

    pub async fn get_status(&self) -> StatusText {
        *self.status.read().await
    }

    pub async fn set_status(&self, status: StatusText) {
        *self.status.write().await = status;
    }

    pub async fn get_warning_level(&self) -> WarningLevel {
        *self.warning_level.read().await
    }

    /// Publish one classified sample and announce it
    pub async fn apply_classification(&self, classification: &Classification) {
        *self.distance_text.write().await = classification.distance_text.clone();
        *self.status.write().await = classification.status;
        *self.warning_level.write().await = classification.level;

        if classification.haptic_pulse {
            self.haptic_pulses_total.fetch_add(1, Ordering::Relaxed);
        }

        self.broadcast_event(ProximityEvent::FeedbackUpdated {
            distance_text: classification.distance_text.clone(),
            status: classification.status,
            warning_level: classification.level,
            mode: classification.mode,
            haptic_pulse: classification.haptic_pulse,
            timestamp: chrono::Utc::now(),
        });
    }

    pub async fn get_detections(&self) -> Vec<Detection> {
        self.detections.read().await.clone()
    }

    /// Replace the detection list and announce it
    pub async fn set_detections(&self, detections: Vec<Detection>) {
        *self.detections.write().await = detections.clone();
        self.broadcast_event(ProximityEvent::DetectionsUpdated {
            detections,
            timestamp: chrono::Utc::now(),
        });
    }

    pub async fn is_audio_enabled(&self) -> bool {
        *self.audio_enabled.read().await
    }

    /// Store the toggle; returns the previous value
    pub async fn set_audio_enabled(&self, enabled: bool) -> bool {
        let mut current = self.audio_enabled.write().await;
        std::mem::replace(&mut *current, enabled)
    }

    pub async fn get_run_state(&self) -> EngineRunState {
        *self.run_state.read().await
    }

    /// Move to `new_state`, announcing the transition if it changed anything
    pub async fn transition(&self, new_state: EngineRunState) -> EngineRunState {
        let old_state = {
            let mut current = self.run_state.write().await;
            std::mem::replace(&mut *current, new_state)
        };
        if old_state != new_state {
            self.broadcast_event(ProximityEvent::EngineStateChanged {
                old_state,
                new_state,
                timestamp: chrono::Utc::now(),
            });
        }
        old_state
    }

    pub fn haptic_pulses(&self) -> u64 {
        self.haptic_pulses_total.load(Ordering::Relaxed)
    }

    pub fn increment_stale_frames(&self) {
        self.stale_frames_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn stale_frames(&self) -> u64 {
        self.stale_frames_total.load(Ordering::Relaxed)
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}

//! Collaborator interfaces: environment sensing, recognition, haptics
//!
//! The engine never implements these. Platform glue (depth sensor, vision
//! model, vibration motor) plugs in behind the traits; tests plug in mocks.

pub mod cadence;

pub use cadence::Cadence;

use crate::error::Result;
use std::sync::Arc;

/// Raw camera image attached to a scene frame
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageBuffer {
    pub width: u32,
    pub height: u32,
    /// Pixel data in whatever layout the recognizer expects
    pub data: Vec<u8>,
}

impl ImageBuffer {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            data,
        }
    }
}

/// One scene update from the sensing collaborator
#[derive(Debug, Clone)]
pub struct SceneFrame {
    /// Seconds, monotonically increasing
    pub timestamp: f64,
    /// Shared so a recognition worker can hold it past the frame callback
    pub image: Arc<ImageBuffer>,
}

impl SceneFrame {
    pub fn new(timestamp: f64, image: Arc<ImageBuffer>) -> Self {
        Self { timestamp, image }
    }

    /// Frame without image content
    pub fn empty(timestamp: f64) -> Self {
        Self::new(timestamp, Arc::new(ImageBuffer::default()))
    }
}

/// Environment sensing / raycasting
pub trait SensingSource: Send + Sync {
    /// Whether the device can reconstruct scene geometry at all
    fn supports_scene_reconstruction(&self) -> bool;

    /// Distance in meters from the camera to the first surface hit by a ray
    /// through the view centre, or `None` when nothing was hit.
    fn raycast_from_center(&self, frame: &SceneFrame) -> Option<f32>;
}

/// One object returned by the recognizer
#[derive(Debug, Clone, PartialEq)]
pub struct RecognizedObject {
    /// Top label, if the model produced one
    pub label: Option<String>,
    pub confidence: f32,
}

impl RecognizedObject {
    pub fn new(label: Option<&str>, confidence: f32) -> Self {
        Self {
            label: label.map(str::to_string),
            confidence,
        }
    }
}

/// Object recognition on a single image.
///
/// Called from a blocking worker thread, never from the frame callback.
pub trait Recognizer: Send + Sync {
    fn recognize(&self, image: &ImageBuffer) -> Result<Vec<RecognizedObject>>;
}

/// Severity of a haptic pulse
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HapticSeverity {
    Warning,
}

/// Fire-and-forget haptic output
pub trait HapticEmitter: Send + Sync {
    /// Warm up the actuator ahead of the first pulse
    fn prepare(&self) {}

    fn fire_pulse(&self, severity: HapticSeverity);
}

/// Haptic emitter for devices without an actuator
#[derive(Debug, Default, Clone, Copy)]
pub struct NoHaptics;

impl HapticEmitter for NoHaptics {
    fn fire_pulse(&self, _severity: HapticSeverity) {}
}

//! Test helpers for echonav-engine integration tests
//!
//! Mock collaborators:
//! - ScriptedSensing: distance set by the test before each frame
//! - RecordingHaptics: counts pulses and prepare calls
//! - BlockingSensing: raycast blocks until the test releases it
//! - GatedRecognizer: blocks each pass until the test releases it
//! - failing_opener: audio device that never opens

#![allow(dead_code)]

use echonav_common::ProximityEvent;
use echonav_engine::audio::{DeviceOpener, WaveformSynthesizer};
use echonav_engine::config::AudioConfig;
use echonav_engine::sensing::{
    HapticEmitter, HapticSeverity, ImageBuffer, RecognizedObject, Recognizer, SceneFrame,
    SensingSource,
};
use echonav_engine::{EngineConfig, Error, ProximityEngine, Result};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, Notify};

/// Upper bound on any wait in these tests
pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Default configuration without a hardware output stream
pub fn test_config() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.audio.output_enabled = false;
    config
}

pub struct ScriptedSensing {
    supported: bool,
    distance: Mutex<Option<f32>>,
    raycasts: AtomicUsize,
}

impl ScriptedSensing {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            supported: true,
            distance: Mutex::new(None),
            raycasts: AtomicUsize::new(0),
        })
    }

    /// Device without scene reconstruction
    pub fn unsupported() -> Arc<Self> {
        Arc::new(Self {
            supported: false,
            distance: Mutex::new(None),
            raycasts: AtomicUsize::new(0),
        })
    }

    pub fn set_distance(&self, distance: Option<f32>) {
        *self.distance.lock().unwrap() = distance;
    }

    pub fn raycasts(&self) -> usize {
        self.raycasts.load(Ordering::SeqCst)
    }
}

impl SensingSource for ScriptedSensing {
    fn supports_scene_reconstruction(&self) -> bool {
        self.supported
    }

    fn raycast_from_center(&self, _frame: &SceneFrame) -> Option<f32> {
        self.raycasts.fetch_add(1, Ordering::SeqCst);
        *self.distance.lock().unwrap()
    }
}

/// Sensing whose raycast holds the caller until `release` is called
pub struct BlockingSensing {
    distance: Option<f32>,
    entered: Notify,
    release_tx: Mutex<mpsc::Sender<()>>,
    release_rx: Mutex<mpsc::Receiver<()>>,
    raycasts: AtomicUsize,
}

impl BlockingSensing {
    pub fn new(distance: Option<f32>) -> Arc<Self> {
        let (tx, rx) = mpsc::channel();
        Arc::new(Self {
            distance,
            entered: Notify::new(),
            release_tx: Mutex::new(tx),
            release_rx: Mutex::new(rx),
            raycasts: AtomicUsize::new(0),
        })
    }

    /// Resolves once a raycast is blocked
    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    pub fn release(&self) {
        let _ = self.release_tx.lock().unwrap().send(());
    }

    pub fn raycasts(&self) -> usize {
        self.raycasts.load(Ordering::SeqCst)
    }
}

impl SensingSource for BlockingSensing {
    fn supports_scene_reconstruction(&self) -> bool {
        true
    }

    fn raycast_from_center(&self, _frame: &SceneFrame) -> Option<f32> {
        self.raycasts.fetch_add(1, Ordering::SeqCst);
        self.entered.notify_one();
        let _ = self.release_rx.lock().unwrap().recv_timeout(TEST_TIMEOUT);
        self.distance
    }
}

#[derive(Default)]
pub struct RecordingHaptics {
    prepared: AtomicBool,
    pulses: AtomicUsize,
}

impl RecordingHaptics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn pulses(&self) -> usize {
        self.pulses.load(Ordering::SeqCst)
    }

    pub fn was_prepared(&self) -> bool {
        self.prepared.load(Ordering::SeqCst)
    }
}

impl HapticEmitter for RecordingHaptics {
    fn prepare(&self) {
        self.prepared.store(true, Ordering::SeqCst);
    }

    fn fire_pulse(&self, severity: HapticSeverity) {
        assert_eq!(severity, HapticSeverity::Warning);
        self.pulses.fetch_add(1, Ordering::SeqCst);
    }
}

/// Recognizer whose passes block until `release` is called
pub struct GatedRecognizer {
    objects: Vec<RecognizedObject>,
    release_tx: Mutex<mpsc::Sender<()>>,
    release_rx: Mutex<mpsc::Receiver<()>>,
    calls: AtomicUsize,
}

impl GatedRecognizer {
    pub fn new(objects: Vec<RecognizedObject>) -> Arc<Self> {
        let (tx, rx) = mpsc::channel();
        Arc::new(Self {
            objects,
            release_tx: Mutex::new(tx),
            release_rx: Mutex::new(rx),
            calls: AtomicUsize::new(0),
        })
    }

    /// Let one blocked (or the next) pass finish
    pub fn release(&self) {
        let _ = self.release_tx.lock().unwrap().send(());
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Recognizer for GatedRecognizer {
    fn recognize(&self, _image: &ImageBuffer) -> Result<Vec<RecognizedObject>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.release_rx
            .lock()
            .unwrap()
            .recv_timeout(TEST_TIMEOUT)
            .map_err(|_| Error::Recognition("test never released the pass".to_string()))?;
        Ok(self.objects.clone())
    }
}

/// Recognizer that always fails
pub struct BrokenRecognizer;

impl Recognizer for BrokenRecognizer {
    fn recognize(&self, _image: &ImageBuffer) -> Result<Vec<RecognizedObject>> {
        Err(Error::Recognition("model not loaded".to_string()))
    }
}

/// Device opener that always fails, as with no sound hardware
pub fn failing_opener() -> DeviceOpener {
    Arc::new(|_: &AudioConfig, _: WaveformSynthesizer| {
        Err(Error::AudioOutput("no output device".to_string()))
    })
}

pub fn build_engine(
    sensing: Arc<ScriptedSensing>,
    haptics: Arc<RecordingHaptics>,
    recognizer: Option<Arc<dyn Recognizer>>,
) -> ProximityEngine {
    ProximityEngine::new(test_config(), sensing, haptics, recognizer).unwrap()
}

/// Wait for the first event matching `pred`, skipping others
pub async fn wait_for_event<F>(
    rx: &mut broadcast::Receiver<ProximityEvent>,
    mut pred: F,
) -> ProximityEvent
where
    F: FnMut(&ProximityEvent) -> bool,
{
    tokio::time::timeout(TEST_TIMEOUT, async {
        loop {
            match rx.recv().await {
                Ok(event) if pred(&event) => return event,
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => panic!("event bus closed"),
            }
        }
    })
    .await
    .expect("timed out waiting for event")
}

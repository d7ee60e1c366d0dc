//! Recognition dispatch
//!
//! Runs admitted recognition passes on the blocking pool and applies the
//! result to the shared state from an async task. The frame callback only
//! polls the throttler and never waits on recognition.

use super::throttler::DetectionThrottler;
use crate::error::{Error, Result};
use crate::sensing::{RecognizedObject, Recognizer, SceneFrame};
use crate::state::SharedState;
use echonav_common::{Detection, ProximityEvent};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub struct DetectionPipeline {
    throttler: Arc<Mutex<DetectionThrottler>>,
    recognizer: Option<Arc<dyn Recognizer>>,
    state: Arc<SharedState>,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl DetectionPipeline {
    pub fn new(
        throttler: DetectionThrottler,
        recognizer: Option<Arc<dyn Recognizer>>,
        state: Arc<SharedState>,
    ) -> Self {
        Self {
            throttler: Arc::new(Mutex::new(throttler)),
            recognizer,
            state,
            pending: Mutex::new(None),
        }
    }

    pub fn has_recognizer(&self) -> bool {
        self.recognizer.is_some()
    }

    /// Start a recognition pass for `frame` if the throttler admits one.
    ///
    /// Must be called from within a tokio runtime. Returns whether a pass
    /// was started.
    pub fn on_frame(&self, frame: &SceneFrame) -> bool {
        let Some(recognizer) = self.recognizer.as_ref() else {
            return false;
        };
        let session = {
            let mut throttler = lock(&self.throttler);
            if !throttler.poll(frame.timestamp) {
                return false;
            }
            throttler.session()
        };

        let recognizer = Arc::clone(recognizer);
        let image = Arc::clone(&frame.image);
        let throttler = Arc::clone(&self.throttler);
        let state = Arc::clone(&self.state);

        let task = tokio::spawn(async move {
            let outcome = tokio::task::spawn_blocking(move || recognizer.recognize(&image))
                .await
                .unwrap_or_else(|e| {
                    Err(Error::Recognition(format!("Recognition worker failed: {}", e)))
                });

            match complete_pass(&throttler, session, outcome) {
                None => debug!("Discarding recognition pass from session {}", session),
                Some(Ok(detections)) => state.set_detections(detections).await,
                Some(Err(e)) => {
                    warn!("Recognition pass failed: {}", e);
                    state.broadcast_event(ProximityEvent::RecognitionFailed {
                        message: e.to_string(),
                        timestamp: chrono::Utc::now(),
                    });
                }
            }
        });

        *lock(&self.pending) = Some(task);
        true
    }

    pub fn is_in_flight(&self) -> bool {
        lock(&self.throttler).is_in_flight()
    }

    pub fn passes_started(&self) -> u64 {
        lock(&self.throttler).passes_started()
    }

    /// Abandon any outstanding pass and restart the cadence.
    ///
    /// A recognizer call already running on the blocking pool finishes, but
    /// its result is never published.
    pub fn reset(&self) {
        if let Some(task) = lock(&self.pending).take() {
            if !task.is_finished() {
                debug!("Abandoning outstanding recognition pass");
            }
            task.abort();
        }
        lock(&self.throttler).reset();
    }
}

/// Complete a pass started in `session`, or `None` if the throttler was reset
/// since. Checked under the throttler lock so a stale pass cannot clear the
/// in-flight guard of a newer one.
fn complete_pass(
    throttler: &Mutex<DetectionThrottler>,
    session: u64,
    outcome: Result<Vec<RecognizedObject>>,
) -> Option<Result<Vec<Detection>>> {
    let mut throttler = lock(throttler);
    if throttler.session() != session {
        return None;
    }
    Some(throttler.complete(outcome))
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

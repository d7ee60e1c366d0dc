//! Detection throttler
//!
//! Decides when a recognition pass may start and turns raw recognizer output
//! into the published detection list. Pure state; dispatching the pass is the
//! pipeline's job.

use crate::config::EngineConfig;
use crate::error::Result;
use crate::sensing::{Cadence, RecognizedObject};
use echonav_common::events::UNKNOWN_LABEL;
use echonav_common::Detection;
use tracing::{debug, trace};

#[derive(Debug, Clone)]
pub struct DetectionThrottler {
    cadence: Cadence,
    confidence_cutoff: f32,
    /// A pass has been started and not yet completed
    in_flight: bool,
    passes_started: u64,
    /// Bumped by `reset`; passes from an earlier session are discarded
    session: u64,
}

impl DetectionThrottler {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            cadence: Cadence::new(config.detection_interval_secs),
            confidence_cutoff: config.confidence_cutoff,
            in_flight: false,
            passes_started: 0,
            session: 0,
        }
    }

    /// Whether a pass should start for a frame at `timestamp`.
    ///
    /// Returning true marks the pass in flight and advances the cadence.
    pub fn poll(&mut self, timestamp: f64) -> bool {
        if self.in_flight {
            trace!("Recognition pass still running; skipping frame at {:.3}", timestamp);
            return false;
        }
        if !self.cadence.admit(timestamp) {
            return false;
        }
        self.in_flight = true;
        self.passes_started += 1;
        debug!("Recognition pass #{} at {:.3}", self.passes_started, timestamp);
        true
    }

    /// Finish the running pass.
    ///
    /// Clears the in-flight guard whatever the outcome. On success returns
    /// the filtered list that replaces the published one.
    pub fn complete(&mut self, outcome: Result<Vec<RecognizedObject>>) -> Result<Vec<Detection>> {
        self.in_flight = false;
        let objects = outcome?;
        let total = objects.len();
        let detections = self.filter(objects);
        debug!("Recognition kept {} of {} objects", detections.len(), total);
        Ok(detections)
    }

    /// Keep objects strictly above the cutoff, in recognizer order
    pub fn filter(&self, objects: Vec<RecognizedObject>) -> Vec<Detection> {
        objects
            .into_iter()
            .filter(|object| object.confidence > self.confidence_cutoff)
            .map(|object| {
                let label = object.label.unwrap_or_else(|| UNKNOWN_LABEL.to_string());
                Detection::new(label, object.confidence)
            })
            .collect()
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn passes_started(&self) -> u64 {
        self.passes_started
    }

    pub fn session(&self) -> u64 {
        self.session
    }

    /// Forget the cadence and any outstanding pass
    pub fn reset(&mut self) {
        self.cadence.reset();
        self.in_flight = false;
        self.session += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn throttler() -> DetectionThrottler {
        DetectionThrottler::new(&EngineConfig::default())
    }

    #[test]
    fn test_burst_yields_single_pass() {
        let mut t = throttler();
        let started = (0..20)
            .map(|i| i as f64 * 0.025)
            .filter(|ts| t.poll(*ts))
            .count();
        assert_eq!(started, 1);
    }

    #[test]
    fn test_no_pass_while_in_flight() {
        let mut t = throttler();
        assert!(t.poll(0.0));
        assert!(!t.poll(1.5), "interval elapsed but pass outstanding");
        assert!(!t.poll(3.0));

        t.complete(Ok(vec![])).unwrap();
        assert!(t.poll(3.1));
        assert_eq!(t.passes_started(), 2);
    }

    #[test]
    fn test_cadence_only_advances_on_trigger() {
        let mut t = throttler();
        assert!(t.poll(0.0));
        // Blocked by in-flight at 1.2; must still be admitted at 1.3
        assert!(!t.poll(1.2));
        t.complete(Ok(vec![])).unwrap();
        assert!(t.poll(1.3));
    }

    #[test]
    fn test_filter_and_label_fallback() {
        let t = throttler();
        let detections = t.filter(vec![
            RecognizedObject::new(Some("chair"), 0.91),
            RecognizedObject::new(Some("cup"), 0.4),
            RecognizedObject::new(None, 0.55),
            RecognizedObject::new(Some("plant"), 0.12),
        ]);

        let labels: Vec<&str> = detections.iter().map(|d| d.label.as_str()).collect();
        assert_eq!(labels, vec!["chair", "?"]);
        assert_eq!(detections[0].confidence_percent(), "91%");
    }

    #[test]
    fn test_failure_clears_in_flight() {
        let mut t = throttler();
        assert!(t.poll(0.0));

        let result = t.complete(Err(Error::Recognition("model crashed".to_string())));
        assert!(matches!(result, Err(Error::Recognition(_))));
        assert!(!t.is_in_flight());
        assert!(t.poll(1.0));
    }
}

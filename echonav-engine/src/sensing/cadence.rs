//! Fixed-cadence throttle over frame timestamps

/// Tolerance for float timestamp comparisons (seconds)
const EPSILON: f64 = 1e-6;

/// Admits at most one event per `period` seconds of frame time.
///
/// Only admitted events move the reference timestamp, so a burst of rejected
/// calls never delays the next admission.
#[derive(Debug, Clone)]
pub struct Cadence {
    period: f64,
    last: Option<f64>,
}

impl Cadence {
    pub fn new(period: f64) -> Self {
        Self { period, last: None }
    }

    /// Seconds between admitted events
    pub fn period(&self) -> f64 {
        self.period
    }

    /// Timestamp of the last admitted event
    pub fn last(&self) -> Option<f64> {
        self.last
    }

    /// Whether an event at `timestamp` would be admitted
    pub fn is_due(&self, timestamp: f64) -> bool {
        match self.last {
            None => true,
            Some(last) => timestamp - last + EPSILON >= self.period,
        }
    }

    /// Admit and record `timestamp` if due
    pub fn admit(&mut self, timestamp: f64) -> bool {
        if self.is_due(timestamp) {
            self.last = Some(timestamp);
            true
        } else {
            false
        }
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}

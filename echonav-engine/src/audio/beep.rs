//! Beep scheduler
//!
//! Opens the `BeepGate` on a fixed cadence and closes it after a fixed
//! on-duration. Runs as a tokio task, independent of the audio callback.
//!
//! Every schedule gets a generation number. `stop()` and each gate mutation
//! by the timer task are serialised through the same liveness lock, so a
//! cancelled timer whose callback is already in flight cannot reopen the
//! gate after `stop()` returns. The render thread never touches that lock.

use super::params::BeepGate;
use crate::error::{Error, Result};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, trace};

/// Shortest gap kept silent between two beeps
const MIN_OFF_TIME: Duration = Duration::from_millis(1);

struct ActiveSchedule {
    generation: u64,
    interval: Duration,
    task: JoinHandle<()>,
}

pub struct BeepScheduler {
    gate: Arc<BeepGate>,
    /// Generation of the schedule allowed to touch the gate
    live_generation: Arc<Mutex<u64>>,
    active: Mutex<Option<ActiveSchedule>>,
    runtime: Handle,
}

impl BeepScheduler {
    /// Create a scheduler bound to the current tokio runtime
    pub fn new(gate: Arc<BeepGate>) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|e| {
            Error::InvalidState(format!("Beep scheduler requires a tokio runtime: {}", e))
        })?;
        Ok(Self {
            gate,
            live_generation: Arc::new(Mutex::new(0)),
            active: Mutex::new(None),
            runtime,
        })
    }

    /// Beep now and every `interval` thereafter, each lasting `on_duration`.
    ///
    /// Replaces any running schedule (cancel, then reschedule from now).
    pub fn start(&self, interval: Duration, on_duration: Duration) {
        let mut active = lock(&self.active);
        let generation = self.cancel_locked(&mut active);

        let on_duration = effective_on_duration(interval, on_duration);
        let gate = Arc::clone(&self.gate);
        let live = Arc::clone(&self.live_generation);

        debug!(
            "Beep schedule #{}: every {:?}, on for {:?}",
            generation, interval, on_duration
        );

        let task = self.runtime.spawn(async move {
            let mut ticker = time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                {
                    let current = lock(&live);
                    if *current != generation {
                        break;
                    }
                    gate.open();
                }
                trace!("Beep #{} on", generation);

                time::sleep(on_duration).await;
                {
                    let current = lock(&live);
                    if *current != generation {
                        break;
                    }
                    gate.close();
                }
            }
        });

        *active = Some(ActiveSchedule {
            generation,
            interval,
            task,
        });
    }

    /// Cancel future beeps and silence the gate. Safe to call repeatedly.
    pub fn stop(&self) {
        let mut active = lock(&self.active);
        if active.is_some() {
            debug!("Beep schedule stopped");
        }
        self.cancel_locked(&mut active);
    }

    /// Interval of the running schedule, if any
    pub fn current_interval(&self) -> Option<Duration> {
        lock(&self.active).as_ref().map(|s| s.interval)
    }

    pub fn is_running(&self) -> bool {
        lock(&self.active).is_some()
    }

    /// Retire the current generation, close the gate, and return the next
    /// generation number.
    fn cancel_locked(&self, active: &mut Option<ActiveSchedule>) -> u64 {
        let next = {
            let mut live = lock(&self.live_generation);
            *live += 1;
            self.gate.close();
            *live
        };
        if let Some(previous) = active.take() {
            previous.task.abort();
            trace!("Beep schedule #{} cancelled", previous.generation);
        }
        next
    }
}

impl Drop for BeepScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Keep at least `MIN_OFF_TIME` of silence between consecutive beeps
fn effective_on_duration(interval: Duration, on_duration: Duration) -> Duration {
    on_duration.min(interval.saturating_sub(MIN_OFF_TIME))
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

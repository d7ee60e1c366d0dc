//! Lock-free parameter exchange with the audio render thread
//!
//! Two writers (sensing domain, beep timer) and one real-time reader. The
//! reader never takes a lock:
//!
//! - `ToneCell`: tone kind + frequency packed into one `AtomicU64`, so a
//!   snapshot can never mix the kind of one mode with the frequency of
//!   another.
//! - `BeepGate`: "audible now" flag plus a beep epoch counter. Each beep
//!   bumps the epoch *before* raising the flag; the reader loads the flag
//!   first, so observing a new beep implies observing its epoch.

use echonav_common::FeedbackMode;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

const KIND_SHIFT: u32 = 32;
const FREQUENCY_MASK: u64 = 0xFFFF_FFFF;

/// What the render path should produce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToneKind {
    /// Idle output
    Silent,
    /// Tone on every sample
    Continuous,
    /// Tone only while the beep gate is open
    Gated,
}

impl ToneKind {
    fn to_bits(self) -> u64 {
        match self {
            ToneKind::Silent => 0,
            ToneKind::Continuous => 1,
            ToneKind::Gated => 2,
        }
    }

    fn from_bits(bits: u64) -> Self {
        match bits {
            1 => ToneKind::Continuous,
            2 => ToneKind::Gated,
            _ => ToneKind::Silent,
        }
    }
}

/// Immutable snapshot of the render parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToneParams {
    pub kind: ToneKind,
    pub frequency: f32,
}

impl ToneParams {
    pub const SILENT: ToneParams = ToneParams {
        kind: ToneKind::Silent,
        frequency: 0.0,
    };

    fn pack(self) -> u64 {
        (self.kind.to_bits() << KIND_SHIFT) | u64::from(self.frequency.to_bits())
    }

    fn unpack(packed: u64) -> Self {
        Self {
            kind: ToneKind::from_bits(packed >> KIND_SHIFT),
            frequency: f32::from_bits((packed & FREQUENCY_MASK) as u32),
        }
    }
}

impl From<&FeedbackMode> for ToneParams {
    fn from(mode: &FeedbackMode) -> Self {
        match *mode {
            FeedbackMode::Silent => ToneParams::SILENT,
            FeedbackMode::Continuous { frequency } => ToneParams {
                kind: ToneKind::Continuous,
                frequency: frequency as f32,
            },
            FeedbackMode::Beep { frequency, .. } => ToneParams {
                kind: ToneKind::Gated,
                frequency: frequency as f32,
            },
        }
    }
}

/// Single-word cell holding the latest published `ToneParams`
#[derive(Debug)]
pub struct ToneCell {
    packed: AtomicU64,
}

impl ToneCell {
    pub fn new() -> Self {
        Self {
            packed: AtomicU64::new(ToneParams::SILENT.pack()),
        }
    }

    /// Replace the current parameters (whole value, one store)
    pub fn publish(&self, params: ToneParams) {
        self.packed.store(params.pack(), Ordering::Release);
    }

    /// **REAL-TIME SAFE**: single atomic load
    pub fn snapshot(&self) -> ToneParams {
        ToneParams::unpack(self.packed.load(Ordering::Acquire))
    }
}

impl Default for ToneCell {
    fn default() -> Self {
        Self::new()
    }
}

/// Beep envelope state written by the beep scheduler
#[derive(Debug, Default)]
pub struct BeepGate {
    audible: AtomicBool,
    epoch: AtomicU64,
}

impl BeepGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a beep: new epoch (phase restarts at zero), then audible
    pub fn open(&self) {
        self.epoch.fetch_add(1, Ordering::AcqRel);
        self.audible.store(true, Ordering::Release);
    }

    /// End the current beep
    pub fn close(&self) {
        self.audible.store(false, Ordering::Release);
    }

    /// **REAL-TIME SAFE**: load this before `epoch()`
    pub fn is_audible(&self) -> bool {
        self.audible.load(Ordering::Acquire)
    }

    /// Number of beeps started so far
    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_mode_to_params() {
        assert_eq!(ToneParams::from(&FeedbackMode::Silent), ToneParams::SILENT);
        assert_eq!(
            ToneParams::from(&FeedbackMode::Continuous { frequency: 1050.0 }),
            ToneParams {
                kind: ToneKind::Continuous,
                frequency: 1050.0
            }
        );
        assert_eq!(
            ToneParams::from(&FeedbackMode::Beep {
                interval: 0.4,
                frequency: 900.0
            }),
            ToneParams {
                kind: ToneKind::Gated,
                frequency: 900.0
            }
        );
    }

    #[test]
    fn test_publish_snapshot() {
        let cell = ToneCell::new();
        assert_eq!(cell.snapshot(), ToneParams::SILENT);

        let params = ToneParams {
            kind: ToneKind::Gated,
            frequency: 612.5,
        };
        cell.publish(params);
        assert_eq!(cell.snapshot(), params);
    }

    #[test]
    fn test_snapshots_never_torn() {
        // Writer alternates two fully distinct parameter sets; every reader
        // snapshot must equal one of them exactly.
        let cell = Arc::new(ToneCell::new());
        let a = ToneParams {
            kind: ToneKind::Continuous,
            frequency: 1200.0,
        };
        let b = ToneParams {
            kind: ToneKind::Gated,
            frequency: 300.0,
        };
        cell.publish(a);

        let writer_cell = Arc::clone(&cell);
        let writer = thread::spawn(move || {
            for i in 0..50_000 {
                writer_cell.publish(if i % 2 == 0 { b } else { a });
            }
        });

        for _ in 0..50_000 {
            let snap = cell.snapshot();
            assert!(snap == a || snap == b, "torn snapshot: {:?}", snap);
        }
        writer.join().unwrap();
    }

    #[test]
    fn test_gate_epoch_advances_per_beep() {
        let gate = BeepGate::new();
        assert!(!gate.is_audible());
        assert_eq!(gate.epoch(), 0);

        gate.open();
        assert!(gate.is_audible());
        assert_eq!(gate.epoch(), 1);

        gate.close();
        assert!(!gate.is_audible());

        gate.open();
        assert_eq!(gate.epoch(), 2);
    }
}

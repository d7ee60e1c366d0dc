//! Waveform synthesizer
//!
//! Produces mono f32 samples for the current tone parameters. Runs inside
//! the audio device callback:
//!
//! **REAL-TIME SAFE**: no allocation, no locks, no logging. Parameters are
//! read once per `render` call; the phase accumulator is owned here and is
//! never touched by other threads.

use super::params::{BeepGate, ToneCell, ToneKind};
use std::f64::consts::TAU;
use std::sync::Arc;

/// Output value while nothing is sounding
pub const IDLE_SAMPLE: f32 = 0.0;

pub struct WaveformSynthesizer {
    tone: Arc<ToneCell>,
    gate: Arc<BeepGate>,
    sample_rate: f64,
    amplitude: f32,
    /// Radians, kept within [0, 2π)
    phase: f64,
    /// Last beep epoch seen; a change restarts the phase at zero
    seen_epoch: u64,
}

impl WaveformSynthesizer {
    pub fn new(tone: Arc<ToneCell>, gate: Arc<BeepGate>, sample_rate: u32, amplitude: f32) -> Self {
        let seen_epoch = gate.epoch();
        Self {
            tone,
            gate,
            sample_rate: sample_rate as f64,
            amplitude,
            phase: 0.0,
            seen_epoch,
        }
    }

    /// Switch to the rate the output device actually runs at
    pub fn set_sample_rate(&mut self, sample_rate: u32) {
        self.sample_rate = sample_rate as f64;
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate as u32
    }

    pub fn phase(&self) -> f64 {
        self.phase
    }

    /// Fill `out` with the next `out.len()` samples.
    pub fn render(&mut self, out: &mut [f32]) {
        let params = self.tone.snapshot();
        let audible = self.gate.is_audible();
        let epoch = self.gate.epoch();

        if epoch != self.seen_epoch {
            self.seen_epoch = epoch;
            self.phase = 0.0;
        }

        let sounding = match params.kind {
            ToneKind::Silent => false,
            ToneKind::Continuous => true,
            ToneKind::Gated => audible,
        };

        if !sounding || params.frequency <= 0.0 {
            out.fill(IDLE_SAMPLE);
            return;
        }

        let step = TAU * params.frequency as f64 / self.sample_rate;
        for sample in out.iter_mut() {
            *sample = self.phase.sin() as f32 * self.amplitude;
            self.phase += step;
            if self.phase >= TAU {
                self.phase = self.phase.rem_euclid(TAU);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::params::ToneParams;

    const RATE: u32 = 44_100;

    fn synth() -> (WaveformSynthesizer, Arc<ToneCell>, Arc<BeepGate>) {
        let tone = Arc::new(ToneCell::new());
        let gate = Arc::new(BeepGate::new());
        let synth = WaveformSynthesizer::new(Arc::clone(&tone), Arc::clone(&gate), RATE, 0.1);
        (synth, tone, gate)
    }

    #[test]
    fn test_silent_outputs_idle() {
        let (mut synth, _tone, _gate) = synth();
        let mut buf = [1.0f32; 256];
        synth.render(&mut buf);
        assert!(buf.iter().all(|s| *s == IDLE_SAMPLE));
    }

    #[test]
    fn test_continuous_is_bounded_sine() {
        let (mut synth, tone, _gate) = synth();
        tone.publish(ToneParams {
            kind: ToneKind::Continuous,
            frequency: 1000.0,
        });

        let mut buf = vec![0.0f32; RATE as usize / 10];
        synth.render(&mut buf);

        let peak = buf.iter().fold(0.0f32, |m, s| m.max(s.abs()));
        assert!(peak <= 0.1 + 1e-6);
        assert!(peak > 0.099);
        assert_eq!(buf[0], 0.0, "tone starts at zero crossing");
        assert!((0.0..TAU).contains(&synth.phase()));
    }

    #[test]
    fn test_phase_continuous_across_buffers() {
        let (mut split, tone, _gate) = synth();
        tone.publish(ToneParams {
            kind: ToneKind::Continuous,
            frequency: 733.0,
        });
        let (mut whole, whole_tone, _g) = synth();
        whole_tone.publish(tone.snapshot());

        let mut a = vec![0.0f32; 300];
        let mut b = vec![0.0f32; 212];
        split.render(&mut a);
        split.render(&mut b);

        let mut reference = vec![0.0f32; 512];
        whole.render(&mut reference);

        for (i, (x, y)) in a.iter().chain(b.iter()).zip(reference.iter()).enumerate() {
            assert!((x - y).abs() < 1e-6, "discontinuity at sample {}", i);
        }
    }

    #[test]
    fn test_gated_follows_beep_gate() {
        let (mut synth, tone, gate) = synth();
        tone.publish(ToneParams {
            kind: ToneKind::Gated,
            frequency: 600.0,
        });

        let mut buf = [0.0f32; 128];
        synth.render(&mut buf);
        assert!(buf.iter().all(|s| *s == IDLE_SAMPLE), "closed gate is silent");

        gate.open();
        synth.render(&mut buf);
        assert!(buf.iter().any(|s| s.abs() > 0.01), "open gate sounds");

        gate.close();
        synth.render(&mut buf);
        assert!(buf.iter().all(|s| *s == IDLE_SAMPLE));
    }

    #[test]
    fn test_each_beep_restarts_phase() {
        let (mut synth, tone, gate) = synth();
        tone.publish(ToneParams {
            kind: ToneKind::Gated,
            frequency: 600.0,
        });

        gate.open();
        let mut first = [0.0f32; 100];
        synth.render(&mut first);
        assert!(synth.phase() > 0.0);
        gate.close();

        gate.open();
        let mut second = [0.0f32; 100];
        synth.render(&mut second);

        assert_eq!(second[0], 0.0);
        assert_eq!(first, second, "every beep renders identically");
    }
}

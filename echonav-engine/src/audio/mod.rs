//! Audio feedback: tone synthesis, beep envelope, device output

pub mod beep;
pub mod node;
pub mod output;
pub mod params;
pub mod synth;

pub use beep::BeepScheduler;
pub use node::FeedbackAudio;
pub use output::{cpal_opener, AudioOutput, DeviceOpener, OutputHandle, OutputInfo};
pub use params::{BeepGate, ToneCell, ToneKind, ToneParams};
pub use synth::{WaveformSynthesizer, IDLE_SAMPLE};

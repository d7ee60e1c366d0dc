//! # EchoNav Proximity Engine (echonav-engine)
//!
//! Turns a stream of center-ray distance measurements into audio and haptic
//! obstacle feedback, and throttles object recognition into a stable list.
//!
//! **Architecture:** three timing domains. Scene frames drive sampling and
//! recognition; a tokio timer drives the beep envelope; the cpal callback
//! renders the tone from lock-free parameters.

pub mod audio;
pub mod config;
pub mod detection;
pub mod engine;
pub mod error;
pub mod feedback;
pub mod sampling;
pub mod sensing;
pub mod state;

pub use config::EngineConfig;
pub use engine::{FrameReport, ProximityEngine};
pub use error::{Error, Result};
pub use state::SharedState;

//! # EchoNav Common Library
//!
//! Shared code for the EchoNav proximity feedback workspace:
//! - Event types (`ProximityEvent`) and the `EventBus`
//! - Feedback data model (warning levels, feedback modes, status text)
//! - Detection records published to the presentation layer
//! - Configuration file resolution and logging setup

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
pub use events::{
    Detection, EngineRunState, EventBus, FeedbackMode, ProximityEvent, StatusText, WarningLevel,
};

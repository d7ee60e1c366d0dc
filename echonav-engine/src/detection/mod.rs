//! Throttled object recognition

pub mod pipeline;
pub mod throttler;

pub use pipeline::DetectionPipeline;
pub use throttler::DetectionThrottler;

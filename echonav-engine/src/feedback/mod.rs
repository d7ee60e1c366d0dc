//! Distance classification and feedback parameter derivation

pub mod controller;
pub mod mapping;

pub use controller::{Classification, DistanceSample, FeedbackController, NO_DISTANCE_TEXT};
pub use mapping::{map_frequency, map_interval};

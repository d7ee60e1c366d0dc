//! Distance → audio parameter curves
//!
//! Closer obstacles produce a higher pitch and a faster beep cadence.

/// Pitch at zero distance (Hz)
pub const MAX_FREQUENCY_HZ: f64 = 1200.0;
/// Pitch floor (Hz)
pub const MIN_FREQUENCY_HZ: f64 = 300.0;
/// Pitch drop per meter (Hz/m)
pub const FREQUENCY_SLOPE_HZ_PER_M: f64 = 300.0;

/// Fastest beep cadence (s)
pub const MIN_INTERVAL_SECS: f64 = 0.15;
/// Slowest beep cadence (s)
pub const MAX_INTERVAL_SECS: f64 = 1.2;
/// Meters of distance per second of interval
pub const INTERVAL_DIVISOR: f64 = 1.5;

/// `clamp(1200 - 300 d, 300, 1200)` Hz
pub fn map_frequency(distance: f32) -> f64 {
    (MAX_FREQUENCY_HZ - FREQUENCY_SLOPE_HZ_PER_M * distance as f64)
        .clamp(MIN_FREQUENCY_HZ, MAX_FREQUENCY_HZ)
}

/// `clamp(d / 1.5, 0.15, 1.2)` seconds
pub fn map_interval(distance: f32) -> f64 {
    (distance as f64 / INTERVAL_DIVISOR).clamp(MIN_INTERVAL_SECS, MAX_INTERVAL_SECS)
}

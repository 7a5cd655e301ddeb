//! Chain Response Curve
//!
//! Magnitude of a coefficient snapshot sampled once per horizontal display
//! unit across a log frequency axis, and its mapping onto the ±24 dB overlay
//! scale the spectrum is drawn against. Pure functions; UI context only.

use crate::design::ChainCoefficients;
use crate::path::{jmap, map_to_log10, PathBounds, SpectrumPath};
use crate::params::{MAX_FREQUENCY, MIN_FREQUENCY};

/// Range of the response overlay (dB), symmetric around 0
pub const RESPONSE_RANGE_DB: f32 = 24.0;

/// Floor used when converting the chain magnitude to dB
pub const RESPONSE_FLOOR_DB: f64 = -100.0;

/// Frequency (Hz) sampled at column `x` of a `width`-wide area
#[inline]
pub fn column_frequency(x: usize, width: usize) -> f32 {
    map_to_log10(x as f32 / width as f32, MIN_FREQUENCY, MAX_FREQUENCY)
}

/// Chain magnitude in dB at `width` log-spaced frequencies from 20 Hz upward
pub fn response_db(coeffs: &ChainCoefficients, sample_rate: f32, width: usize) -> Vec<f32> {
    (0..width)
        .map(|x| {
            let freq = column_frequency(x, width) as f64;
            let mag = coeffs.magnitude_for_frequency(freq, sample_rate as f64);
            if mag > 0.0 {
                (20.0 * mag.log10()).max(RESPONSE_FLOOR_DB) as f32
            } else {
                RESPONSE_FLOOR_DB as f32
            }
        })
        .collect()
}

/// Response curve as a polyline: one vertex per column, +24 dB at the top
/// edge and -24 dB at the bottom edge
pub fn response_path(coeffs: &ChainCoefficients, sample_rate: f32, bounds: PathBounds) -> SpectrumPath {
    let width = bounds.width.max(0.0) as usize;
    let vertices = response_db(coeffs, sample_rate, width)
        .into_iter()
        .enumerate()
        .map(|(x, db)| {
            let y = jmap(db, -RESPONSE_RANGE_DB, RESPONSE_RANGE_DB, bounds.height, 0.0);
            (x as f32, y)
        })
        .collect();
    SpectrumPath::from_vertices(vertices)
}

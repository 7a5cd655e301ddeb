//! Engine Configuration

use serde::{Deserialize, Serialize};

use contour_dsp::{FftOrder, PathBounds, DEFAULT_NOISE_FLOOR_DB};

use crate::error::{EngineError, EngineResult};

/// Overall engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Sample rate in Hz (e.g., 44100, 48000, 96000), known before the first block
    pub sample_rate: f32,

    /// Length of the analysis blocks the sample taps produce
    pub block_size: usize,

    /// Initial FFT size for both analyzer channels
    pub fft_order: FftOrder,

    /// Blocks each sample queue holds before overwriting the oldest
    pub sample_queue_capacity: usize,

    /// Frames (and paths) held inside each spectrum pipeline
    pub frame_queue_capacity: usize,

    /// Analyzer tick cadence in Hz
    pub tick_hz: f32,

    /// dB value silence and anything quieter maps to
    pub noise_floor_db: f32,

    /// Size of the analysis area the spectrum path is laid out in
    pub path_bounds: PathBounds,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000.0,
            block_size: 512,
            fft_order: FftOrder::Order2048,
            // ~340ms of audio at 48kHz
            sample_queue_capacity: 32,
            frame_queue_capacity: 8,
            tick_hz: 60.0,
            noise_floor_db: DEFAULT_NOISE_FLOOR_DB,
            path_bounds: PathBounds::default(),
        }
    }
}

impl EngineConfig {
    /// Create config optimized for responsiveness
    pub fn low_latency() -> Self {
        Self {
            block_size: 256,
            fft_order: FftOrder::Order2048,
            sample_queue_capacity: 64,
            ..Default::default()
        }
    }

    /// Create config optimized for frequency resolution
    pub fn high_resolution() -> Self {
        Self {
            block_size: 1024,
            fft_order: FftOrder::Order8192,
            sample_queue_capacity: 32,
            frame_queue_capacity: 4,
            tick_hz: 30.0,
            ..Default::default()
        }
    }

    /// Analyzer tick period
    pub fn tick_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f32(1.0 / self.tick_hz)
    }

    /// Audio time covered by one analysis block, in milliseconds
    pub fn block_ms(&self) -> f32 {
        (self.block_size as f32 / self.sample_rate) * 1000.0
    }

    /// Validate configuration
    pub fn validate(&self) -> EngineResult<()> {
        let invalid = |msg: String| Err(EngineError::InvalidConfig(msg));

        if !self.sample_rate.is_finite() || self.sample_rate < 8000.0 || self.sample_rate > 384_000.0 {
            return invalid(format!("Invalid sample rate: {}", self.sample_rate));
        }
        if self.block_size == 0 || self.block_size > self.fft_order.size() {
            return invalid(format!(
                "Invalid block size: {} (must be 1..={})",
                self.block_size,
                self.fft_order.size()
            ));
        }
        if self.sample_queue_capacity == 0 {
            return invalid("Sample queue capacity must be at least 1".into());
        }
        if self.frame_queue_capacity == 0 {
            return invalid("Frame queue capacity must be at least 1".into());
        }
        if !self.tick_hz.is_finite() || self.tick_hz <= 0.0 || self.tick_hz > 1000.0 {
            return invalid(format!("Invalid tick rate: {}", self.tick_hz));
        }
        if !self.noise_floor_db.is_finite() || self.noise_floor_db >= 0.0 {
            return invalid(format!("Noise floor must be below 0 dB: {}", self.noise_floor_db));
        }
        if !self.path_bounds.is_valid() {
            return invalid(format!("Invalid path bounds: {:?}", self.path_bounds));
        }
        Ok(())
    }
}

//! Contour DSP - Signal Path and Analysis Primitives
//!
//! This crate provides everything that touches samples:
//! - Three-stage filter chain (Butterworth low/high cut, RBJ peak)
//! - Coefficient design from user-facing parameters
//! - Lock-free bounded queue for cross-thread handoff
//! - Sample tap, FFT frame generation and spectrum path generation
//! - Chain response curve for the static overlay
//!
//! # Architecture
//!
//! The audio side follows a strict "no allocation in audio callback" rule.
//! Coefficients are designed off the audio thread as `Copy` snapshots and
//! applied between blocks. Nothing here spawns threads or logs; the wiring
//! lives in `contour_core`.

mod chain;
mod design;
mod error;
mod fft;
mod params;
mod path;
mod pipeline;
mod processor;
mod queue;
mod response;
mod tap;

pub use chain::FilterChain;
pub use design::{
    butterworth_q, design_chain, design_high_cut, design_low_cut, design_peak,
    passthrough_section, section_magnitude, ChainCoefficients, ChainPosition, StageCoefficients,
    MAX_SECTIONS,
};
pub use error::{DspError, DspResult};
pub use fft::{
    gain_to_db, BlackmanHarrisWindow, FftFrame, FftFrameGenerator, FftOrder,
    DEFAULT_NOISE_FLOOR_DB,
};
pub use params::{
    FilterParameters, Slope, MAX_FREQUENCY, MAX_PEAK_GAIN_DB, MAX_PEAK_QUALITY, MIN_FREQUENCY,
    MIN_PEAK_QUALITY,
};
pub use path::{
    jmap, map_from_log10, map_to_log10, PathBounds, PathGenerator, SpectrumPath, PATH_RESOLUTION,
};
pub use pipeline::{PipelineConfig, PipelineReport, SpectrumPipeline};
pub use processor::{AudioProcessor, ProcessContext};
pub use queue::{bounded_queue, QueueConsumer, QueueProducer};
pub use response::{column_frequency, response_db, response_path, RESPONSE_RANGE_DB};
pub use tap::{sample_tap, AudioBlock, SampleTap, MAX_BLOCK_SIZE};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crate_exports() {
        // Verify all public types are accessible
        let params = FilterParameters::default();
        let coeffs = design_chain(&params, 48000.0, 0).unwrap();
        let _chain = FilterChain::new(&coeffs);
        let (_tap, rx) = sample_tap(512, 4).unwrap();
        let _pipeline = SpectrumPipeline::new(
            rx,
            PipelineConfig {
                order: FftOrder::default(),
                sample_rate: 48000.0,
                block_size: 512,
                bounds: PathBounds::default(),
                floor_db: DEFAULT_NOISE_FLOOR_DB,
                frame_capacity: 4,
            },
        )
        .unwrap();
    }
}

//! DSP Error Types

use thiserror::Error;

/// Errors that can occur while constructing DSP components
///
/// Nothing on the audio path returns these; they surface only at
/// construction or reconfiguration time.
#[derive(Error, Debug)]
pub enum DspError {
    #[error("Sample rate must be positive and finite, got {0}")]
    InvalidSampleRate(f32),

    #[error("Queue capacity must be at least 1, got {0}")]
    InvalidCapacity(usize),

    #[error("Block size must be between 1 and {max}, got {got}")]
    InvalidBlockSize { got: usize, max: usize },

    #[error("Unsupported FFT order: {0} (expected 11, 12 or 13)")]
    InvalidFftOrder(u32),

    #[error("Invalid filter coefficients for frequency {frequency}Hz at sample rate {sample_rate}Hz")]
    InvalidCoefficients { frequency: f32, sample_rate: f32 },
}

/// Result type alias for DSP construction
pub type DspResult<T> = Result<T, DspError>;

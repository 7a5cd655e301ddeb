//! Engine Error Types

use thiserror::Error;

/// Errors that can occur while building or driving the engine
///
/// None of these are produced on the audio thread.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid engine configuration: {0}")]
    InvalidConfig(String),

    #[error("DSP error: {0}")]
    DspError(#[from] contour_dsp::DspError),

    #[error("Failed to spawn analyzer timer thread: {0}")]
    TimerSpawn(#[source] std::io::Error),

    #[error("Analyzer timer already stopped")]
    TimerStopped,
}

/// Result type alias for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EngineError::InvalidConfig("tick_hz must be positive".into());
        assert!(err.to_string().contains("tick_hz"));

        let err = EngineError::TimerSpawn(std::io::Error::new(std::io::ErrorKind::Other, "no threads"));
        assert!(err.to_string().contains("no threads"));
    }

    #[test]
    fn test_error_from_dsp() {
        let dsp_err = contour_dsp::DspError::InvalidFftOrder(9);
        let engine_err: EngineError = dsp_err.into();
        assert!(matches!(engine_err, EngineError::DspError(_)));
    }
}

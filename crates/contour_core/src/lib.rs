//! Contour Core - Engine Wiring
//!
//! This crate connects the signal path to the analyzer:
//! - Stereo EQ processor for the audio callback
//! - Parameter store with change observers
//! - Coefficient hand-off from the UI context to the audio thread
//! - Analyzer coordinator and its periodic tick driver
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   UI / Analysis Thread                      │
//! │  ParameterStore ──dirty flag──▶ AnalyzerCoordinator ──▶ UI  │
//! └─────────────────────────────────────────────────────────────┘
//!         coefficients │ rtrb            ▲ bounded_queue
//!                      ▼                 │ audio blocks
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Audio Thread                           │
//! │      host buffer ──▶ EqProcessor ──▶ SampleTap (L/R)        │
//! │              (Zero allocation in this path)                 │
//! └─────────────────────────────────────────────────────────────┘
//! ```

mod coefficients;
mod config;
mod coordinator;
mod engine;
mod error;
mod message;
mod params;
mod processor;
mod timer;

pub use coefficients::{coefficient_channel, CoefficientReceiver, CoefficientUpdater};
pub use config::EngineConfig;
pub use coordinator::{AnalyzerCoordinator, AnalyzerState, RedrawListener, SnapshotReader, TickReport};
pub use engine::Engine;
pub use error::{EngineError, EngineResult};
pub use message::{Channel, Command, Event};
pub use params::{ChangeFlag, ParameterObserver, ParameterStore};
pub use processor::EqProcessor;
pub use timer::{AnalyzerTimer, PeriodicTask};

// Re-export DSP types for convenience
pub use contour_dsp::{
    ChainCoefficients, ChainPosition, FftOrder, FilterParameters, PathBounds, Slope, SpectrumPath,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crate_exports() {
        // Verify public API is accessible
        let _config = EngineConfig::default();
        let _store = ParameterStore::default();
        let _flag = ChangeFlag::default();
    }
}

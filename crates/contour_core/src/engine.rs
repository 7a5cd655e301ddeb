//! Engine - Main Entry Point
//!
//! Wires the audio and analysis contexts together and hands each side its
//! half.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────── Audio Thread ────────────────────────────┐
//! │  host buffer ─▶ EqProcessor ─▶ FilterChain (L/R, in place)           │
//! │                     │   ▲                                            │
//! │             SampleTap   │ CoefficientReceiver                        │
//! └─────────────────────┼───┼────────────────────────────────────────────┘
//!        bounded_queue  │   │  rtrb (Copy snapshots)
//! ┌─────────────────────▼───┼──── Analysis Thread (timer) ───────────────┐
//! │  AnalyzerCoordinator ─▶ SpectrumPipeline (L/R) ─▶ SnapshotReader     │
//! │          │                                                           │
//! │          └─ ChangeFlag ◀── ParameterStore ◀── UI / host              │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing crossing the boundary is locked or allocated on the audio side.

use std::sync::Arc;

use tracing::info;

use contour_dsp::{sample_tap, PipelineConfig, SpectrumPipeline};

use crate::coefficients::coefficient_channel;
use crate::config::EngineConfig;
use crate::coordinator::{AnalyzerCoordinator, RedrawListener};
use crate::error::EngineResult;
use crate::params::{ChangeFlag, ParameterStore};
use crate::processor::EqProcessor;

/// The two halves of a running EQ
pub struct Engine {
    /// Move to the audio callback
    pub processor: EqProcessor,
    /// Tick from the UI/analysis context (directly or via `AnalyzerTimer`)
    pub coordinator: AnalyzerCoordinator,
}

impl Engine {
    /// Build both halves from a validated configuration
    ///
    /// The initial coefficients are designed from the store's current
    /// parameters, so audio is filtered correctly from the first block.
    pub fn build(
        config: EngineConfig,
        params: Arc<ParameterStore>,
        listener: Box<dyn RedrawListener>,
    ) -> EngineResult<Self> {
        config.validate()?;

        // Subscribe before the snapshot so no change slips between the two
        let dirty = Arc::new(ChangeFlag::default());
        params.subscribe(dirty.clone());

        let (updater, receiver) = coefficient_channel(&params.snapshot(), config.sample_rate)?;

        let (left_tap, left_rx) = sample_tap(config.block_size, config.sample_queue_capacity)?;
        let (right_tap, right_rx) = sample_tap(config.block_size, config.sample_queue_capacity)?;

        let pipeline_config = PipelineConfig {
            order: config.fft_order,
            sample_rate: config.sample_rate,
            block_size: config.block_size,
            bounds: config.path_bounds,
            floor_db: config.noise_floor_db,
            frame_capacity: config.frame_queue_capacity,
        };
        let pipelines = [
            SpectrumPipeline::new(left_rx, pipeline_config)?,
            SpectrumPipeline::new(right_rx, pipeline_config)?,
        ];

        let processor = EqProcessor::new(
            updater.latest(),
            [left_tap, right_tap],
            receiver,
            config.sample_rate,
        );
        let coordinator = AnalyzerCoordinator::new(params, dirty, updater, pipelines, listener);

        info!(
            "Engine built: {} Hz, {}-sample blocks, FFT {}",
            config.sample_rate,
            config.block_size,
            config.fft_order.size()
        );

        Ok(Self {
            processor,
            coordinator,
        })
    }
}

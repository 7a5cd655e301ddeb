//! Spectrum Pipeline
//!
//! Per-channel analysis chain run on the UI/analysis context:
//!
//! ```text
//! sample queue -> sliding window -> FftFrameGenerator -> frame queue
//!              -> PathGenerator -> path queue -> latest path
//! ```
//!
//! Each incoming block is appended at the tail of an FFT-sized window and the
//! window shifted left by the block length. Frames are produced only once the
//! window has been filled completely.

use crate::error::{DspError, DspResult};
use crate::fft::{FftFrame, FftFrameGenerator, FftOrder};
use crate::path::{PathBounds, PathGenerator, SpectrumPath, PATH_RESOLUTION};
use crate::queue::QueueConsumer;
use crate::tap::AudioBlock;

/// Construction parameters for a [`SpectrumPipeline`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineConfig {
    pub order: FftOrder,
    pub sample_rate: f32,
    pub block_size: usize,
    pub bounds: PathBounds,
    pub floor_db: f32,
    /// Capacity of the internal frame and path queues
    pub frame_capacity: usize,
}

/// Work done by one [`SpectrumPipeline::process`] call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineReport {
    pub blocks: usize,
    pub frames: usize,
    pub paths: usize,
}

impl PipelineReport {
    pub fn merge(self, other: Self) -> Self {
        Self {
            blocks: self.blocks + other.blocks,
            frames: self.frames + other.frames,
            paths: self.paths + other.paths,
        }
    }
}

pub struct SpectrumPipeline {
    config: PipelineConfig,
    samples: QueueConsumer<AudioBlock>,
    block: AudioBlock,
    window: Vec<f32>,
    /// Samples received since construction, saturating at the window length
    accumulated: usize,
    generator: FftFrameGenerator,
    frames: QueueConsumer<FftFrame>,
    frame: FftFrame,
    paths: PathGenerator,
    path_queue: QueueConsumer<SpectrumPath>,
    latest: SpectrumPath,
}

impl SpectrumPipeline {
    pub fn new(samples: QueueConsumer<AudioBlock>, config: PipelineConfig) -> DspResult<Self> {
        if !config.sample_rate.is_finite() || config.sample_rate <= 0.0 {
            return Err(DspError::InvalidSampleRate(config.sample_rate));
        }

        let fft_size = config.order.size();
        if config.block_size == 0 || config.block_size > fft_size {
            return Err(DspError::InvalidBlockSize {
                got: config.block_size,
                max: fft_size,
            });
        }

        let (generator, frames) = FftFrameGenerator::new(config.order, config.frame_capacity)?;
        let max_vertices = config.order.num_bins() / PATH_RESOLUTION + 1;
        let (paths, path_queue) = PathGenerator::new(config.frame_capacity, max_vertices)?;

        Ok(Self {
            config,
            samples,
            block: vec![0.0; config.block_size],
            window: vec![0.0; fft_size],
            accumulated: 0,
            generator,
            frames,
            frame: vec![config.floor_db; config.order.num_bins()],
            paths,
            path_queue,
            latest: SpectrumPath::with_capacity(max_vertices),
        })
    }

    /// Tear down and reconstruct for a new FFT order, keeping the sample queue
    ///
    /// The window starts empty again, so no frame is produced until it has
    /// refilled at the new size.
    pub fn rebuild(self, order: FftOrder) -> DspResult<Self> {
        let config = PipelineConfig { order, ..self.config };
        Self::new(self.samples, config)
    }

    /// Drain available blocks, produce ready frames and generate their paths
    ///
    /// Each stage drains at most what its queue held when the stage began, so
    /// a producer running concurrently cannot keep this loop alive.
    pub fn process(&mut self) -> PipelineReport {
        let mut report = PipelineReport::default();
        let fft_size = self.window.len();

        for _ in 0..self.samples.len() {
            if !self.samples.try_pop(&mut self.block) {
                break;
            }
            report.blocks += 1;
            self.append_block();

            if self.accumulated >= fft_size {
                self.generator.produce(&self.window, self.config.floor_db);
                report.frames += 1;
            }
        }

        let bin_width = self.bin_width();
        for _ in 0..self.frames.len() {
            if !self.frames.try_pop(&mut self.frame) {
                break;
            }
            self.paths.generate(
                &self.frame,
                self.config.bounds,
                fft_size,
                bin_width,
                self.config.floor_db,
            );
        }

        for _ in 0..self.path_queue.len() {
            if !self.path_queue.try_pop(&mut self.latest) {
                break;
            }
            report.paths += 1;
        }

        report
    }

    fn append_block(&mut self) {
        let size = self.block.len();
        let fft_size = self.window.len();

        if size >= fft_size {
            self.window.copy_from_slice(&self.block[size - fft_size..]);
        } else {
            self.window.copy_within(size.., 0);
            self.window[fft_size - size..].copy_from_slice(&self.block);
        }
        self.accumulated = (self.accumulated + size).min(fft_size);
    }

    /// Most recent path; empty until the first frame has been analysed
    pub fn latest_path(&self) -> &SpectrumPath {
        &self.latest
    }

    /// Takes effect for paths generated from the next frame on
    pub fn set_bounds(&mut self, bounds: PathBounds) {
        self.config.bounds = bounds;
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn order(&self) -> FftOrder {
        self.config.order
    }

    pub fn fft_size(&self) -> usize {
        self.window.len()
    }

    /// Frequency spacing between bins (Hz)
    pub fn bin_width(&self) -> f32 {
        self.config.sample_rate / self.fft_size() as f32
    }

    /// Blocks overwritten in the sample queue before they could be drained
    pub fn dropped_blocks(&self) -> u64 {
        self.samples.dropped()
    }

    /// Frames and paths overwritten inside the pipeline
    pub fn dropped_frames(&self) -> u64 {
        self.generator.dropped() + self.paths.dropped()
    }
}

//! Stereo EQ Processor
//!
//! The audio-context entry point. Owns one [`FilterChain`] and one
//! [`SampleTap`] per channel plus the audio end of the coefficient hand-off.
//! Each call:
//!
//! 1. adopts the newest coefficient generation, if one arrived
//! 2. filters the block in place
//! 3. copies the filtered samples into the analyzer taps

use contour_dsp::{AudioProcessor, ChainCoefficients, FilterChain, ProcessContext, SampleTap};

use crate::coefficients::CoefficientReceiver;
use crate::message::Channel;

/// Frames deinterleaved per pass in [`AudioProcessor::process`]
const SCRATCH_FRAMES: usize = 1024;

pub struct EqProcessor {
    chains: [FilterChain; 2],
    taps: [SampleTap; 2],
    coefficients: CoefficientReceiver,
    sample_rate: f32,
    scratch: [Vec<f32>; 2],
}

impl EqProcessor {
    pub(crate) fn new(
        initial: &ChainCoefficients,
        taps: [SampleTap; 2],
        coefficients: CoefficientReceiver,
        sample_rate: f32,
    ) -> Self {
        Self {
            chains: [FilterChain::new(initial), FilterChain::new(initial)],
            taps,
            coefficients,
            sample_rate,
            scratch: [vec![0.0; SCRATCH_FRAMES], vec![0.0; SCRATCH_FRAMES]],
        }
    }

    /// Adopt the newest published snapshot on both channels at once
    #[inline]
    fn sync_coefficients(&mut self) {
        if let Some(coeffs) = self.coefficients.receive() {
            for chain in &mut self.chains {
                chain.apply(&coeffs);
            }
        }
    }

    /// Process separate left/right buffers in place
    ///
    /// # Real-time Safety
    /// No allocations, no locks, no logging.
    #[inline]
    pub fn process_planar(&mut self, left: &mut [f32], right: &mut [f32]) {
        debug_assert_eq!(left.len(), right.len(), "Channel buffers differ in length");
        self.sync_coefficients();

        self.chains[0].process(left);
        self.chains[1].process(right);
        self.taps[0].push_samples(left);
        self.taps[1].push_samples(right);
    }

    /// Process a mono buffer in place; both analyzer channels see it
    #[inline]
    pub fn process_mono(&mut self, buffer: &mut [f32]) {
        self.sync_coefficients();

        self.chains[0].process(buffer);
        self.taps[0].push_samples(buffer);
        self.taps[1].push_samples(buffer);
    }

    /// Coefficient generation currently running on the audio thread
    pub fn generation(&self) -> u64 {
        self.chains[0].generation()
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Blocks the analyzer lost on `channel` because it fell behind
    pub fn dropped_blocks(&self, channel: Channel) -> u64 {
        self.taps[channel.index()].dropped()
    }
}

impl AudioProcessor for EqProcessor {
    /// Interleaved buffers with one or two channels; extra channels pass through
    fn process(&mut self, buffer: &mut [f32], context: &ProcessContext) {
        debug_assert!(
            (context.sample_rate - self.sample_rate).abs() < f32::EPSILON,
            "Processor prepared for {} Hz, called at {} Hz",
            self.sample_rate,
            context.sample_rate
        );
        debug_assert!(context.channels > 0, "Process called before channel layout is known");

        let channels = context.channels.max(1);
        if channels == 1 {
            self.process_mono(buffer);
            return;
        }

        // Once per host block; every chunk below runs the same generation
        self.sync_coefficients();

        for chunk in buffer.chunks_mut(SCRATCH_FRAMES * channels) {
            let frames = chunk.len() / channels;
            let [left, right] = &mut self.scratch;
            let (left, right) = (&mut left[..frames], &mut right[..frames]);

            for (i, frame) in chunk.chunks_exact(channels).enumerate() {
                left[i] = frame[0];
                right[i] = frame[1];
            }

            self.chains[0].process(left);
            self.chains[1].process(right);
            self.taps[0].push_samples(left);
            self.taps[1].push_samples(right);

            for (i, frame) in chunk.chunks_exact_mut(channels).enumerate() {
                frame[0] = left[i];
                frame[1] = right[i];
            }
        }
    }

    fn reset(&mut self) {
        for chain in &mut self.chains {
            chain.reset();
        }
        for tap in &mut self.taps {
            tap.reset();
        }
    }

    fn name(&self) -> &'static str {
        "Contour EQ"
    }
}

//! Audio Processor Trait
//!
//! The entry-point contract a host callback drives. Implemented by the mono
//! [`FilterChain`] here and by the stereo processor in `contour_core`.

use crate::chain::FilterChain;

/// Context passed to processors containing stream metadata
#[derive(Debug, Clone, Copy)]
pub struct ProcessContext {
    pub sample_rate: f32,
    pub channels: usize,
    pub buffer_size: usize,
}

impl ProcessContext {
    pub fn new(sample_rate: f32, channels: usize, buffer_size: usize) -> Self {
        Self {
            sample_rate,
            channels,
            buffer_size,
        }
    }

    /// Frames (samples per channel) in an interleaved buffer of `len` samples
    pub fn frames(&self, len: usize) -> usize {
        len / self.channels.max(1)
    }
}

/// Trait for audio processors driven from the audio callback
///
/// # Real-time Safety Contract
///
/// Implementors MUST follow these rules in `process()`:
/// - NO heap allocations (no Vec::push, no Box::new, no String)
/// - NO syscalls (no file I/O, no network, no mutex locks)
/// - NO unbounded loops
/// - Constant or O(n) time complexity where n = buffer size
///
/// Violating these rules causes audio dropouts ("glitches").
pub trait AudioProcessor: Send {
    /// Process audio buffer in-place
    ///
    /// Buffer format is interleaved: [L0, R0, L1, R1, ...]
    fn process(&mut self, buffer: &mut [f32], context: &ProcessContext);

    /// Reset internal state (delay lines, partially filled blocks)
    fn reset(&mut self);

    /// Human-readable name for debugging/UI
    fn name(&self) -> &'static str;

    /// Whether this processor is currently enabled
    fn is_enabled(&self) -> bool {
        true
    }
}

impl AudioProcessor for FilterChain {
    /// Mono only: `context.channels` must be 1
    fn process(&mut self, buffer: &mut [f32], context: &ProcessContext) {
        debug_assert_eq!(context.channels, 1, "FilterChain processes mono buffers");
        FilterChain::process(self, buffer);
    }

    fn reset(&mut self) {
        FilterChain::reset(self);
    }

    fn name(&self) -> &'static str {
        "Filter Chain"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::design::{design_chain, ChainCoefficients};
    use crate::params::FilterParameters;

    /// Test processor that just inverts audio
    struct InvertProcessor;

    impl AudioProcessor for InvertProcessor {
        fn process(&mut self, buffer: &mut [f32], _context: &ProcessContext) {
            for sample in buffer.iter_mut() {
                *sample = -*sample;
            }
        }

        fn reset(&mut self) {}

        fn name(&self) -> &'static str {
            "Inverter"
        }
    }

    fn run(processor: &mut dyn AudioProcessor, buffer: &mut [f32], ctx: &ProcessContext) {
        if processor.is_enabled() {
            processor.process(buffer, ctx);
        }
    }

    #[test]
    fn test_trait_object_dispatch() {
        let ctx = ProcessContext::new(48000.0, 1, 2);
        let mut buffer = vec![0.5, -0.5];
        run(&mut InvertProcessor, &mut buffer, &ctx);
        assert_eq!(buffer, vec![-0.5, 0.5]);
    }

    #[test]
    fn test_filter_chain_as_processor() {
        let ctx = ProcessContext::new(48000.0, 1, 256);
        let mut chain = FilterChain::new(&ChainCoefficients::passthrough());
        assert_eq!(AudioProcessor::name(&chain), "Filter Chain");
        assert!(chain.is_enabled());

        let input: Vec<f32> = (0..256).map(|i| (i as f32 * 0.01).sin()).collect();
        let mut buffer = input.clone();
        run(&mut chain, &mut buffer, &ctx);
        assert_eq!(buffer, input);
    }

    #[test]
    fn test_filter_chain_reset_through_trait() {
        let params = FilterParameters {
            peak_gain_db: 18.0,
            ..Default::default()
        };
        let ctx = ProcessContext::new(48000.0, 1, 128);
        let mut chain = FilterChain::new(&design_chain(&params, 48000.0, 1).unwrap());

        let mut buffer = vec![0.9; 128];
        AudioProcessor::process(&mut chain, &mut buffer, &ctx);
        AudioProcessor::reset(&mut chain);

        let mut silence = vec![0.0; 64];
        AudioProcessor::process(&mut chain, &mut silence, &ctx);
        assert!(silence.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_process_context() {
        let ctx = ProcessContext::new(48000.0, 2, 512);
        assert_eq!(ctx.sample_rate, 48000.0);
        assert_eq!(ctx.channels, 2);
        assert_eq!(ctx.buffer_size, 512);
        assert_eq!(ctx.frames(1024), 512);
    }
}

//! Sample Tap
//!
//! Siphons a copy of one channel's processed audio off the audio thread.
//! Host callbacks arrive in arbitrary lengths; the tap regroups them into
//! fixed-size blocks inside a preallocated buffer and pushes every completed
//! block into a [`bounded_queue`].

use crate::error::{DspError, DspResult};
use crate::queue::{bounded_queue, QueueConsumer, QueueProducer};

/// Largest supported block (matches the largest FFT size)
pub const MAX_BLOCK_SIZE: usize = 8192;

/// One fixed-length chunk of mono samples
pub type AudioBlock = Vec<f32>;

/// Audio-thread end of a channel's sample queue
pub struct SampleTap {
    block: AudioBlock,
    filled: usize,
    producer: QueueProducer<AudioBlock>,
}

/// Create a tap producing `block_size` blocks into a queue of `capacity` blocks
pub fn sample_tap(
    block_size: usize,
    capacity: usize,
) -> DspResult<(SampleTap, QueueConsumer<AudioBlock>)> {
    if block_size == 0 || block_size > MAX_BLOCK_SIZE {
        return Err(DspError::InvalidBlockSize {
            got: block_size,
            max: MAX_BLOCK_SIZE,
        });
    }

    let block = vec![0.0_f32; block_size];
    let (producer, consumer) = bounded_queue(capacity, &block)?;

    Ok((
        SampleTap {
            block,
            filled: 0,
            producer,
        },
        consumer,
    ))
}

impl SampleTap {
    /// Append samples, publishing each block as soon as it fills up
    ///
    /// # Real-time Safety
    /// No allocations, no locks. O(n) where n = samples.len().
    #[inline]
    pub fn push_samples(&mut self, mut samples: &[f32]) {
        while !samples.is_empty() {
            let room = self.block.len() - self.filled;
            let take = room.min(samples.len());
            self.block[self.filled..self.filled + take].copy_from_slice(&samples[..take]);
            self.filled += take;
            samples = &samples[take..];

            if self.filled == self.block.len() {
                self.producer.push(&self.block);
                self.filled = 0;
            }
        }
    }

    pub fn block_size(&self) -> usize {
        self.block.len()
    }

    /// Samples waiting in the partially filled block
    pub fn pending(&self) -> usize {
        self.filled
    }

    /// Blocks discarded because the consumer fell behind
    pub fn dropped(&self) -> u64 {
        self.producer.dropped()
    }

    /// Discard the partially filled block
    pub fn reset(&mut self) {
        self.filled = 0;
    }
}

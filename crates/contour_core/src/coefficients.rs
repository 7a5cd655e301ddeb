//! Coefficient Hand-off
//!
//! Moves freshly designed [`ChainCoefficients`] from the UI/analysis context
//! to the audio thread.
//!
//! ```text
//! ParameterStore ──snapshot──▶ CoefficientUpdater ──rtrb──▶ CoefficientReceiver
//!   (any thread)                 (coordinator tick)           (audio callback)
//! ```
//!
//! Snapshots are `Copy` values, so the audio thread never frees anything and
//! always adopts a complete generation at a block boundary.

use rtrb::{Consumer, Producer, PushError, RingBuffer};
use tracing::{debug, warn};

use contour_dsp::{design_chain, ChainCoefficients, FilterParameters};

use crate::error::EngineResult;

/// Snapshots in flight between the two contexts
const HANDOFF_CAPACITY: usize = 4;

/// UI-side end: designs, numbers and publishes coefficient generations
pub struct CoefficientUpdater {
    sample_rate: f32,
    generation: u64,
    producer: Producer<ChainCoefficients>,
    /// Designed but not yet accepted by the ring
    pending: Option<ChainCoefficients>,
    latest: ChainCoefficients,
    /// Parameters `latest` was designed from
    source: FilterParameters,
}

/// Audio-side end: adopts the newest published generation
pub struct CoefficientReceiver {
    consumer: Consumer<ChainCoefficients>,
}

/// Design the initial generation (0) and create both ends of the hand-off
pub fn coefficient_channel(
    params: &FilterParameters,
    sample_rate: f32,
) -> EngineResult<(CoefficientUpdater, CoefficientReceiver)> {
    let initial = design_chain(params, sample_rate, 0)?;
    let (producer, consumer) = RingBuffer::new(HANDOFF_CAPACITY);

    Ok((
        CoefficientUpdater {
            sample_rate,
            generation: 0,
            producer,
            pending: None,
            latest: initial,
            source: *params,
        },
        CoefficientReceiver { consumer },
    ))
}

impl CoefficientUpdater {
    /// Design a new generation from `params` and publish it
    ///
    /// Returns the new generation number. `None` when no filter field differs
    /// from the live generation (only a pending publish is retried), or when
    /// the design fails and the previous generation stays live.
    pub fn update(&mut self, params: &FilterParameters) -> Option<u64> {
        if params.same_filter(&self.source) {
            self.flush();
            return None;
        }

        let generation = self.generation + 1;
        match design_chain(params, self.sample_rate, generation) {
            Ok(coeffs) => {
                self.generation = generation;
                self.latest = coeffs;
                self.source = *params;
                // A newer design supersedes anything still waiting
                self.pending = Some(coeffs);
                self.flush();
                Some(generation)
            }
            Err(e) => {
                warn!("Coefficient design failed, keeping generation {}: {}", self.generation, e);
                None
            }
        }
    }

    /// Retry a publish that previously found the ring full
    ///
    /// Returns true when nothing is left pending.
    pub fn flush(&mut self) -> bool {
        let Some(coeffs) = self.pending.take() else {
            return true;
        };

        match self.producer.push(coeffs) {
            Ok(()) => {
                debug!("Published coefficient generation {}", coeffs.generation);
                true
            }
            Err(PushError::Full(coeffs)) => {
                debug!(
                    "Coefficient ring full, generation {} deferred to next tick",
                    coeffs.generation
                );
                self.pending = Some(coeffs);
                false
            }
        }
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Most recently designed generation (published or pending)
    pub fn latest(&self) -> &ChainCoefficients {
        &self.latest
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }
}

impl CoefficientReceiver {
    /// Drain the ring and return the newest snapshot, if any arrived
    ///
    /// # Real-time Safety
    /// No allocations, no locks. Bounded by the ring capacity.
    #[inline]
    pub fn receive(&mut self) -> Option<ChainCoefficients> {
        let mut newest = None;
        for _ in 0..self.consumer.slots() {
            match self.consumer.pop() {
                Ok(coeffs) => newest = Some(coeffs),
                Err(_) => break,
            }
        }
        newest
    }
}

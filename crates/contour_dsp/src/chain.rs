//! Filter Chain
//!
//! Low-cut -> peak -> high-cut, applied in place to a mono buffer.
//! One instance per audio channel; it lives on the audio thread and is only
//! reconfigured between blocks.

use biquad::{Biquad, DirectForm2Transposed};

use crate::design::{ChainCoefficients, ChainPosition, StageCoefficients, MAX_SECTIONS};

/// Filter state for one stage (up to four cascaded biquads)
struct Stage {
    // DirectForm2Transposed: better numerical stability than DF1
    filters: [DirectForm2Transposed<f32>; MAX_SECTIONS],
    active: [bool; MAX_SECTIONS],
}

impl Stage {
    fn new(coeffs: &StageCoefficients) -> Self {
        Self {
            filters: core::array::from_fn(|i| DirectForm2Transposed::<f32>::new(*coeffs.section(i))),
            active: core::array::from_fn(|i| coeffs.is_section_active(i)),
        }
    }

    /// Swap coefficients while keeping the delay lines, so a parameter
    /// change does not click
    fn update(&mut self, coeffs: &StageCoefficients) {
        for i in 0..MAX_SECTIONS {
            let active = coeffs.is_section_active(i);
            self.filters[i].update_coefficients(*coeffs.section(i));
            if active && !self.active[i] {
                // A section coming back online must not replay stale state
                self.filters[i].reset_state();
            }
            self.active[i] = active;
        }
    }

    #[inline]
    fn run(&mut self, mut sample: f32) -> f32 {
        for (filter, &active) in self.filters.iter_mut().zip(self.active.iter()) {
            if active {
                sample = filter.run(sample);
            }
        }
        sample
    }

    #[inline]
    fn process(&mut self, buffer: &mut [f32]) {
        for (filter, &active) in self.filters.iter_mut().zip(self.active.iter()) {
            if active {
                for sample in buffer.iter_mut() {
                    *sample = filter.run(*sample);
                }
            }
        }
    }

    fn reset(&mut self) {
        for filter in &mut self.filters {
            filter.reset_state();
        }
    }
}

/// Three-stage mono filter chain
///
/// # Real-time Safety
/// `process()`, `process_sample()`, `apply()`, `update_coefficients()` and
/// `set_bypassed()` perform no allocations, locks or syscalls.
pub struct FilterChain {
    stages: [Stage; 3],
    bypassed: [bool; 3],
    generation: u64,
}

impl FilterChain {
    pub fn new(coeffs: &ChainCoefficients) -> Self {
        Self {
            stages: core::array::from_fn(|i| Stage::new(coeffs.stage(ChainPosition::ALL[i]))),
            bypassed: core::array::from_fn(|i| coeffs.is_bypassed(ChainPosition::ALL[i])),
            generation: coeffs.generation,
        }
    }

    /// Process a buffer in place
    ///
    /// Cascading section by section over the whole block gives the same
    /// output as running each sample through the full chain.
    #[inline]
    pub fn process(&mut self, buffer: &mut [f32]) {
        for (stage, &bypassed) in self.stages.iter_mut().zip(self.bypassed.iter()) {
            if !bypassed {
                stage.process(buffer);
            }
        }
    }

    /// Process a single sample through the chain
    #[inline]
    pub fn process_sample(&mut self, mut sample: f32) -> f32 {
        for (stage, &bypassed) in self.stages.iter_mut().zip(self.bypassed.iter()) {
            if !bypassed {
                sample = stage.run(sample);
            }
        }
        sample
    }

    /// Bypass a stage; takes effect from the next processed block
    pub fn set_bypassed(&mut self, position: ChainPosition, bypassed: bool) {
        self.bypassed[position.index()] = bypassed;
    }

    pub fn is_bypassed(&self, position: ChainPosition) -> bool {
        self.bypassed[position.index()]
    }

    /// Replace the coefficients of one stage
    pub fn update_coefficients(&mut self, position: ChainPosition, coeffs: &StageCoefficients) {
        self.stages[position.index()].update(coeffs);
    }

    /// Adopt a complete snapshot: all stages, bypass flags and generation at once
    pub fn apply(&mut self, coeffs: &ChainCoefficients) {
        for position in ChainPosition::ALL {
            self.update_coefficients(position, coeffs.stage(position));
            self.set_bypassed(position, coeffs.is_bypassed(position));
        }
        self.generation = coeffs.generation;
    }

    /// Generation of the last applied snapshot
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Clear filter state (delay lines)
    ///
    /// Call when the audio stream restarts to prevent filter ringing
    pub fn reset(&mut self) {
        for stage in &mut self.stages {
            stage.reset();
        }
    }
}

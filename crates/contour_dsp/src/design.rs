//! Filter Design
//!
//! Turns [`FilterParameters`] into immutable coefficient snapshots.
//! Based on the RBJ (Robert Bristow-Johnson) Audio EQ Cookbook:
//! - Peak stage: one peaking-EQ biquad
//! - Cut stages: a Butterworth high/low-pass of order 2-8, realised as 1-4
//!   cascaded biquads, each section with its own pole-pair Q
//!
//! Everything here is pure and allocation-free, but it is meant to run off the
//! audio thread; the audio thread only ever receives finished snapshots.

use biquad::{Coefficients, ToHertz, Type};

use crate::error::{DspError, DspResult};
use crate::params::{FilterParameters, Slope, MIN_PEAK_QUALITY};

/// Maximum cascaded sections per stage (48 dB/oct)
pub const MAX_SECTIONS: usize = 4;

/// Design frequencies are clamped to this fraction of the sample rate
const MAX_NYQUIST_RATIO: f32 = 0.49;

/// Lowest design frequency (Hz)
const MIN_DESIGN_FREQUENCY: f32 = 1.0;

/// Position of a stage in the chain, in processing order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChainPosition {
    LowCut,
    Peak,
    HighCut,
}

impl ChainPosition {
    pub const ALL: [ChainPosition; 3] = [
        ChainPosition::LowCut,
        ChainPosition::Peak,
        ChainPosition::HighCut,
    ];

    #[inline]
    pub fn index(self) -> usize {
        match self {
            ChainPosition::LowCut => 0,
            ChainPosition::Peak => 1,
            ChainPosition::HighCut => 2,
        }
    }
}

/// Identity biquad: y[n] = x[n]
pub fn passthrough_section() -> Coefficients<f32> {
    Coefficients {
        a1: 0.0,
        a2: 0.0,
        b0: 1.0,
        b1: 0.0,
        b2: 0.0,
    }
}

/// Magnitude response |H(e^jw)| of one biquad section at `frequency`
///
/// Evaluated in f64 so that deep stop-band values stay meaningful.
pub fn section_magnitude(coeffs: &Coefficients<f32>, frequency: f64, sample_rate: f64) -> f64 {
    let w = 2.0 * std::f64::consts::PI * frequency / sample_rate;
    let (sin1, cos1) = w.sin_cos();
    let (sin2, cos2) = (2.0 * w).sin_cos();

    let (b0, b1, b2) = (coeffs.b0 as f64, coeffs.b1 as f64, coeffs.b2 as f64);
    let (a1, a2) = (coeffs.a1 as f64, coeffs.a2 as f64);

    let num_re = b0 + b1 * cos1 + b2 * cos2;
    let num_im = -(b1 * sin1 + b2 * sin2);
    let den_re = 1.0 + a1 * cos1 + a2 * cos2;
    let den_im = -(a1 * sin1 + a2 * sin2);

    let den = (den_re * den_re + den_im * den_im).max(1e-30);
    ((num_re * num_re + num_im * num_im) / den).sqrt()
}

/// Coefficients for one stage: up to four cascaded sections, each of which
/// can be switched off independently
#[derive(Debug, Clone, Copy)]
pub struct StageCoefficients {
    sections: [Coefficients<f32>; MAX_SECTIONS],
    active: [bool; MAX_SECTIONS],
}

impl StageCoefficients {
    /// A stage with no active sections
    pub fn passthrough() -> Self {
        Self {
            sections: [passthrough_section(); MAX_SECTIONS],
            active: [false; MAX_SECTIONS],
        }
    }

    /// A stage with exactly one active section
    pub fn single(coeffs: Coefficients<f32>) -> Self {
        Self::cascade(&[coeffs])
    }

    /// Activate the given sections in order; extras beyond [`MAX_SECTIONS`] are ignored
    pub fn cascade(sections: &[Coefficients<f32>]) -> Self {
        let mut stage = Self::passthrough();
        for (i, coeffs) in sections.iter().take(MAX_SECTIONS).enumerate() {
            stage.sections[i] = *coeffs;
            stage.active[i] = true;
        }
        stage
    }

    pub fn section(&self, index: usize) -> &Coefficients<f32> {
        &self.sections[index]
    }

    pub fn is_section_active(&self, index: usize) -> bool {
        self.active[index]
    }

    pub fn set_section_active(&mut self, index: usize, active: bool) {
        self.active[index] = active;
    }

    pub fn active_sections(&self) -> usize {
        self.active.iter().filter(|&&a| a).count()
    }

    /// Combined magnitude of all active sections. Pure; never used by `process()`.
    pub fn magnitude_for_frequency(&self, frequency: f64, sample_rate: f64) -> f64 {
        self.sections
            .iter()
            .zip(self.active.iter())
            .filter(|(_, &active)| active)
            .map(|(coeffs, _)| section_magnitude(coeffs, frequency, sample_rate))
            .product()
    }
}

/// Immutable coefficient snapshot for the whole chain
///
/// Built off the audio thread, then handed over whole; a reader never sees a
/// mixture of two generations.
#[derive(Debug, Clone, Copy)]
pub struct ChainCoefficients {
    /// Monotonic counter identifying this snapshot (0 = initial)
    pub generation: u64,
    stages: [StageCoefficients; 3],
    bypassed: [bool; 3],
}

impl ChainCoefficients {
    /// Flat response: every stage passes audio through unchanged
    pub fn passthrough() -> Self {
        Self {
            generation: 0,
            stages: [StageCoefficients::passthrough(); 3],
            bypassed: [false; 3],
        }
    }

    pub fn stage(&self, position: ChainPosition) -> &StageCoefficients {
        &self.stages[position.index()]
    }

    pub fn is_bypassed(&self, position: ChainPosition) -> bool {
        self.bypassed[position.index()]
    }

    pub fn with_stage(mut self, position: ChainPosition, stage: StageCoefficients) -> Self {
        self.stages[position.index()] = stage;
        self
    }

    pub fn with_bypassed(mut self, position: ChainPosition, bypassed: bool) -> Self {
        self.bypassed[position.index()] = bypassed;
        self
    }

    /// Magnitude contributed by one stage; a bypassed stage is exactly 1.0
    /// regardless of its stored coefficients
    pub fn stage_magnitude(&self, position: ChainPosition, frequency: f64, sample_rate: f64) -> f64 {
        if self.is_bypassed(position) {
            return 1.0;
        }
        self.stage(position)
            .magnitude_for_frequency(frequency, sample_rate)
    }

    /// Magnitude of the complete chain at `frequency`
    pub fn magnitude_for_frequency(&self, frequency: f64, sample_rate: f64) -> f64 {
        ChainPosition::ALL
            .iter()
            .map(|&position| self.stage_magnitude(position, frequency, sample_rate))
            .product()
    }
}

/// Q of the `section`-th pole pair of an even-order Butterworth filter
///
/// Q_k = 1 / (2 sin((2k + 1) π / 2N)). Order 2 gives 1/√2.
pub fn butterworth_q(order: usize, section: usize) -> f32 {
    let n = order as f64;
    let k = section as f64;
    let angle = (2.0 * k + 1.0) * std::f64::consts::PI / (2.0 * n);
    (1.0 / (2.0 * angle.sin())) as f32
}

fn validate_sample_rate(sample_rate: f32) -> DspResult<()> {
    if !(sample_rate.is_finite() && sample_rate > 0.0) {
        return Err(DspError::InvalidSampleRate(sample_rate));
    }
    Ok(())
}

/// Keep a design frequency strictly inside (0, Nyquist)
fn safe_frequency(frequency: f32, sample_rate: f32) -> f32 {
    frequency
        .max(MIN_DESIGN_FREQUENCY)
        .min(sample_rate * MAX_NYQUIST_RATIO)
}

/// Section prototypes used by the chain
#[derive(Debug, Clone, Copy)]
enum SectionKind {
    HighPass,
    LowPass,
    Peaking { gain_db: f32 },
}

fn design_section(
    kind: SectionKind,
    frequency: f32,
    q: f32,
    sample_rate: f32,
) -> DspResult<Coefficients<f32>> {
    let f0 = safe_frequency(frequency, sample_rate).hz();
    let fs = sample_rate.hz();
    let q = q.max(MIN_PEAK_QUALITY);

    let coeffs = match kind {
        SectionKind::HighPass => Coefficients::<f32>::from_params(Type::HighPass, fs, f0, q),
        SectionKind::LowPass => Coefficients::<f32>::from_params(Type::LowPass, fs, f0, q),
        SectionKind::Peaking { gain_db } => {
            Coefficients::<f32>::from_params(Type::PeakingEQ(gain_db), fs, f0, q)
        }
    };

    coeffs.map_err(|_| DspError::InvalidCoefficients {
        frequency,
        sample_rate,
    })
}

/// Peaking EQ section from the peak frequency, gain and quality
pub fn design_peak(params: &FilterParameters, sample_rate: f32) -> DspResult<StageCoefficients> {
    validate_sample_rate(sample_rate)?;
    let coeffs = design_section(
        SectionKind::Peaking {
            gain_db: params.peak_gain_db,
        },
        params.peak_freq,
        params.peak_quality,
        sample_rate,
    )?;
    Ok(StageCoefficients::single(coeffs))
}

fn design_cut(
    kind: SectionKind,
    frequency: f32,
    slope: Slope,
    sample_rate: f32,
) -> DspResult<StageCoefficients> {
    validate_sample_rate(sample_rate)?;
    let order = slope.order();
    let mut sections = [passthrough_section(); MAX_SECTIONS];
    for (k, section) in sections.iter_mut().enumerate().take(slope.sections()) {
        *section = design_section(kind, frequency, butterworth_q(order, k), sample_rate)?;
    }
    Ok(StageCoefficients::cascade(&sections[..slope.sections()]))
}

/// Butterworth high-pass cascade for the low-cut stage
pub fn design_low_cut(frequency: f32, slope: Slope, sample_rate: f32) -> DspResult<StageCoefficients> {
    design_cut(SectionKind::HighPass, frequency, slope, sample_rate)
}

/// Butterworth low-pass cascade for the high-cut stage
pub fn design_high_cut(frequency: f32, slope: Slope, sample_rate: f32) -> DspResult<StageCoefficients> {
    design_cut(SectionKind::LowPass, frequency, slope, sample_rate)
}

/// Design a full chain snapshot from a parameter snapshot
pub fn design_chain(
    params: &FilterParameters,
    sample_rate: f32,
    generation: u64,
) -> DspResult<ChainCoefficients> {
    let params = params.clamped();

    let low_cut = design_low_cut(params.low_cut_freq, params.low_cut_slope, sample_rate)?;
    let peak = design_peak(&params, sample_rate)?;
    let high_cut = design_high_cut(params.high_cut_freq, params.high_cut_slope, sample_rate)?;

    Ok(ChainCoefficients {
        generation,
        stages: [low_cut, peak, high_cut],
        bypassed: [
            params.low_cut_bypassed,
            params.peak_bypassed,
            params.high_cut_bypassed,
        ],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const SR: f32 = 48000.0;

    fn db(gain: f64) -> f64 {
        20.0 * gain.log10()
    }

    #[test]
    fn test_butterworth_q_values() {
        assert_abs_diff_eq!(butterworth_q(2, 0), std::f32::consts::FRAC_1_SQRT_2, epsilon = 1e-6);
        assert_abs_diff_eq!(butterworth_q(4, 0), 1.306_563, epsilon = 1e-5);
        assert_abs_diff_eq!(butterworth_q(4, 1), 0.541_196, epsilon = 1e-5);
    }

    #[test]
    fn test_butterworth_qs_multiply_to_half_power() {
        // |H(f0)| of each RBJ section is its Q, so the cascade must land on -3 dB
        for slope in Slope::ALL {
            let product: f64 = (0..slope.sections())
                .map(|k| butterworth_q(slope.order(), k) as f64)
                .product();
            assert_abs_diff_eq!(product, std::f64::consts::FRAC_1_SQRT_2, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_passthrough_is_unity() {
        let chain = ChainCoefficients::passthrough();
        for freq in [20.0, 440.0, 1000.0, 10_000.0, 20_000.0] {
            assert_abs_diff_eq!(chain.magnitude_for_frequency(freq, SR as f64), 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_cut_sections_follow_slope() {
        for slope in Slope::ALL {
            let stage = design_low_cut(1000.0, slope, SR).unwrap();
            assert_eq!(stage.active_sections(), slope.sections());
            for k in slope.sections()..MAX_SECTIONS {
                assert!(!stage.is_section_active(k));
            }
        }
    }

    #[test]
    fn test_cut_sections_are_distinct_pole_pairs() {
        let stage = design_low_cut(1000.0, Slope::Db48, SR).unwrap();
        let first = stage.section(0);
        let last = stage.section(3);
        assert!((first.a2 - last.a2).abs() > 1e-4, "Sections must not repeat one design");
    }

    #[test]
    fn test_low_cut_corner_is_minus_3db() {
        for slope in Slope::ALL {
            let stage = design_low_cut(1000.0, slope, SR).unwrap();
            let mag = stage.magnitude_for_frequency(1000.0, SR as f64);
            assert_abs_diff_eq!(db(mag), -3.01, epsilon = 0.1);
        }
    }

    #[test]
    fn test_high_cut_corner_is_minus_3db() {
        for slope in Slope::ALL {
            let stage = design_high_cut(5000.0, slope, SR).unwrap();
            let mag = stage.magnitude_for_frequency(5000.0, SR as f64);
            assert_abs_diff_eq!(db(mag), -3.01, epsilon = 0.1);
        }
    }

    #[test]
    fn test_cut_slope_one_octave_out() {
        // Butterworth: |H|^2 = 1 / (1 + (f0/f)^2N) for a high-pass
        for slope in Slope::ALL {
            let stage = design_low_cut(1000.0, slope, SR).unwrap();
            let measured = db(stage.magnitude_for_frequency(500.0, SR as f64));
            let expected = -10.0 * (1.0 + 2.0_f64.powi(2 * slope.order() as i32)).log10();
            assert_abs_diff_eq!(measured, expected, epsilon = 0.5);
        }

        let stage = design_high_cut(1000.0, Slope::Db24, SR).unwrap();
        let measured = db(stage.magnitude_for_frequency(2000.0, SR as f64));
        assert_abs_diff_eq!(measured, -24.1, epsilon = 0.5);
    }

    #[test]
    fn test_cut_passband_is_flat() {
        let stage = design_low_cut(100.0, Slope::Db48, SR).unwrap();
        let mag = stage.magnitude_for_frequency(5000.0, SR as f64);
        assert_abs_diff_eq!(db(mag), 0.0, epsilon = 0.05);
    }

    #[test]
    fn test_peak_gain_at_center() {
        let params = FilterParameters {
            peak_freq: 1000.0,
            peak_gain_db: 12.0,
            peak_quality: 1.0,
            ..Default::default()
        };
        let stage = design_peak(&params, SR).unwrap();
        assert_abs_diff_eq!(db(stage.magnitude_for_frequency(1000.0, SR as f64)), 12.0, epsilon = 0.05);
        // Far from the centre the peak has no effect
        assert_abs_diff_eq!(db(stage.magnitude_for_frequency(20.0, SR as f64)), 0.0, epsilon = 0.2);
    }

    #[test]
    fn test_flat_peak_is_unity() {
        let stage = design_peak(&FilterParameters::default(), SR).unwrap();
        for freq in [50.0, 750.0, 9000.0] {
            assert_abs_diff_eq!(stage.magnitude_for_frequency(freq, SR as f64), 1.0, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_bypassed_stage_is_unity() {
        let params = FilterParameters {
            low_cut_freq: 2000.0,
            low_cut_slope: Slope::Db48,
            low_cut_bypassed: true,
            ..Default::default()
        };
        let chain = design_chain(&params, SR, 1).unwrap();
        assert!(chain.is_bypassed(ChainPosition::LowCut));

        let mut freq = 20.0;
        while freq <= 20_000.0 {
            let mag = chain.stage_magnitude(ChainPosition::LowCut, freq, SR as f64);
            assert_eq!(mag, 1.0);
            freq *= 1.5;
        }

        // The stored coefficients are still the real design
        let stored = chain.stage(ChainPosition::LowCut).magnitude_for_frequency(100.0, SR as f64);
        assert!(db(stored) < -60.0);
    }

    #[test]
    fn test_frequency_above_nyquist_is_clamped() {
        // 20 kHz is above Nyquist at 32 kHz; design must still succeed
        let stage = design_high_cut(20_000.0, Slope::Db48, 32_000.0).unwrap();
        let mag = stage.magnitude_for_frequency(1000.0, 32_000.0);
        assert!(mag.is_finite());
        assert_abs_diff_eq!(db(mag), 0.0, epsilon = 0.1);
    }

    #[test]
    fn test_invalid_sample_rate() {
        assert!(matches!(
            design_low_cut(100.0, Slope::Db12, 0.0),
            Err(DspError::InvalidSampleRate(_))
        ));
        assert!(design_chain(&FilterParameters::default(), f32::NAN, 0).is_err());
    }

    #[test]
    fn test_design_chain_carries_generation() {
        let chain = design_chain(&FilterParameters::default(), SR, 42).unwrap();
        assert_eq!(chain.generation, 42);
        assert_eq!(chain.stage(ChainPosition::Peak).active_sections(), 1);
    }

    #[test]
    fn test_default_chain_is_nearly_flat_mid_band() {
        let chain = design_chain(&FilterParameters::default(), SR, 0).unwrap();
        let mag = chain.magnitude_for_frequency(1000.0, SR as f64);
        assert_abs_diff_eq!(db(mag), 0.0, epsilon = 0.1);
    }
}

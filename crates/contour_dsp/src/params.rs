//! Filter Parameters
//!
//! User-facing EQ settings. The host/UI owns the live values; DSP code only
//! ever sees an immutable snapshot of this struct.

use serde::{Deserialize, Serialize};

/// Lowest frequency any stage can be tuned to (Hz)
pub const MIN_FREQUENCY: f32 = 20.0;
/// Highest frequency any stage can be tuned to (Hz)
pub const MAX_FREQUENCY: f32 = 20_000.0;
/// Peak gain range (dB), symmetric around 0
pub const MAX_PEAK_GAIN_DB: f32 = 24.0;
pub const MIN_PEAK_QUALITY: f32 = 0.1;
pub const MAX_PEAK_QUALITY: f32 = 10.0;

/// Roll-off of a cut stage. Each 12 dB/oct step adds one 2-pole section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Slope {
    #[default]
    Db12,
    Db24,
    Db36,
    Db48,
}

impl Slope {
    pub const ALL: [Slope; 4] = [Slope::Db12, Slope::Db24, Slope::Db36, Slope::Db48];

    /// Number of cascaded biquad sections (1-4)
    pub fn sections(self) -> usize {
        match self {
            Slope::Db12 => 1,
            Slope::Db24 => 2,
            Slope::Db36 => 3,
            Slope::Db48 => 4,
        }
    }

    /// Butterworth filter order (2, 4, 6 or 8)
    pub fn order(self) -> usize {
        self.sections() * 2
    }

    pub fn db_per_octave(self) -> f32 {
        12.0 * self.sections() as f32
    }

    /// Map a choice index (0-3) to a slope, clamping out-of-range indices
    pub fn from_index(index: usize) -> Self {
        Self::ALL[index.min(Self::ALL.len() - 1)]
    }
}

/// Complete parameter snapshot for the three-stage chain
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterParameters {
    pub low_cut_freq: f32,
    pub low_cut_slope: Slope,
    pub low_cut_bypassed: bool,
    pub peak_freq: f32,
    pub peak_gain_db: f32,
    pub peak_quality: f32,
    pub peak_bypassed: bool,
    pub high_cut_freq: f32,
    pub high_cut_slope: Slope,
    pub high_cut_bypassed: bool,
    pub analyzer_enabled: bool,
}

impl Default for FilterParameters {
    fn default() -> Self {
        Self {
            low_cut_freq: MIN_FREQUENCY,
            low_cut_slope: Slope::Db12,
            low_cut_bypassed: false,
            peak_freq: 750.0,
            peak_gain_db: 0.0,
            peak_quality: 1.0,
            peak_bypassed: false,
            high_cut_freq: MAX_FREQUENCY,
            high_cut_slope: Slope::Db12,
            high_cut_bypassed: false,
            analyzer_enabled: true,
        }
    }
}

impl FilterParameters {
    /// Return a copy with every continuous value forced into its legal range.
    /// Non-finite values fall back to the default for that field.
    pub fn clamped(self) -> Self {
        let defaults = Self::default();
        let clamp = |value: f32, min: f32, max: f32, fallback: f32| {
            if value.is_finite() {
                value.clamp(min, max)
            } else {
                fallback
            }
        };

        Self {
            low_cut_freq: clamp(
                self.low_cut_freq,
                MIN_FREQUENCY,
                MAX_FREQUENCY,
                defaults.low_cut_freq,
            ),
            peak_freq: clamp(self.peak_freq, MIN_FREQUENCY, MAX_FREQUENCY, defaults.peak_freq),
            peak_gain_db: clamp(
                self.peak_gain_db,
                -MAX_PEAK_GAIN_DB,
                MAX_PEAK_GAIN_DB,
                defaults.peak_gain_db,
            ),
            peak_quality: clamp(
                self.peak_quality,
                MIN_PEAK_QUALITY,
                MAX_PEAK_QUALITY,
                defaults.peak_quality,
            ),
            high_cut_freq: clamp(
                self.high_cut_freq,
                MIN_FREQUENCY,
                MAX_FREQUENCY,
                defaults.high_cut_freq,
            ),
            ..self
        }
    }

    /// True when both sets design the same filter chain (`analyzer_enabled` ignored)
    pub fn same_filter(&self, other: &Self) -> bool {
        *self
            == Self {
                analyzer_enabled: self.analyzer_enabled,
                ..*other
            }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let params = FilterParameters::default();
        assert_eq!(params.low_cut_freq, 20.0);
        assert_eq!(params.high_cut_freq, 20_000.0);
        assert_eq!(params.peak_freq, 750.0);
        assert_eq!(params.peak_gain_db, 0.0);
        assert_eq!(params.peak_quality, 1.0);
        assert_eq!(params.low_cut_slope, Slope::Db12);
        assert!(params.analyzer_enabled);
        assert!(!params.low_cut_bypassed && !params.peak_bypassed && !params.high_cut_bypassed);
    }

    #[test]
    fn test_same_filter_ignores_analyzer_toggle() {
        let params = FilterParameters::default();
        let hidden = FilterParameters {
            analyzer_enabled: false,
            ..params
        };
        assert!(params.same_filter(&hidden));

        let boosted = FilterParameters {
            peak_gain_db: 3.0,
            ..hidden
        };
        assert!(!params.same_filter(&boosted));
    }

    #[test]
    fn test_slope_sections() {
        assert_eq!(Slope::Db12.sections(), 1);
        assert_eq!(Slope::Db48.sections(), 4);
        assert_eq!(Slope::Db36.order(), 6);
        assert_eq!(Slope::Db24.db_per_octave(), 24.0);
        assert_eq!(Slope::from_index(2), Slope::Db36);
        assert_eq!(Slope::from_index(99), Slope::Db48);
    }

    #[test]
    fn test_clamping() {
        let params = FilterParameters {
            low_cut_freq: 1.0,
            peak_gain_db: 100.0,
            peak_quality: 0.0,
            high_cut_freq: f32::NAN,
            ..Default::default()
        }
        .clamped();

        assert_eq!(params.low_cut_freq, MIN_FREQUENCY);
        assert_eq!(params.peak_gain_db, MAX_PEAK_GAIN_DB);
        assert_eq!(params.peak_quality, MIN_PEAK_QUALITY);
        assert_eq!(params.high_cut_freq, MAX_FREQUENCY);
    }

    #[test]
    fn test_serialization() {
        let params = FilterParameters {
            low_cut_slope: Slope::Db36,
            peak_gain_db: -6.5,
            ..Default::default()
        };
        let json = serde_json::to_string(&params).unwrap();
        let restored: FilterParameters = serde_json::from_str(&json).unwrap();
        assert_eq!(params, restored);
    }
}

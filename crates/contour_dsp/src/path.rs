//! Spectrum Path Generation
//!
//! Turns a dB magnitude frame into a polyline in display space: bin frequency
//! on a log axis (20 Hz to 20 kHz) for x, magnitude between the noise floor
//! and 0 dB for y (floor at the bottom edge, 0 dB at the top edge).

use serde::{Deserialize, Serialize};

use crate::error::DspResult;
use crate::params::{MAX_FREQUENCY, MIN_FREQUENCY};
use crate::queue::{bounded_queue, QueueConsumer, QueueProducer};

/// Bins advanced per vertex after the start vertex
pub const PATH_RESOLUTION: usize = 2;

/// Size of the analysis area in display units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PathBounds {
    pub width: f32,
    pub height: f32,
}

impl Default for PathBounds {
    fn default() -> Self {
        Self {
            width: 600.0,
            height: 300.0,
        }
    }
}

impl PathBounds {
    pub fn is_valid(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

/// Linearly remap `value` from `[src_lo, src_hi]` to `[dst_lo, dst_hi]`
#[inline]
pub fn jmap(value: f32, src_lo: f32, src_hi: f32, dst_lo: f32, dst_hi: f32) -> f32 {
    dst_lo + (value - src_lo) / (src_hi - src_lo) * (dst_hi - dst_lo)
}

/// Position of `value` on a log axis from `min` to `max` (0.0 at min, 1.0 at max)
#[inline]
pub fn map_from_log10(value: f32, min: f32, max: f32) -> f32 {
    (value / min).log10() / (max / min).log10()
}

/// Inverse of [`map_from_log10`]
#[inline]
pub fn map_to_log10(normalized: f32, min: f32, max: f32) -> f32 {
    min * (max / min).powf(normalized)
}

/// Immutable polyline of `(x, y)` vertices
#[derive(Debug, Default, PartialEq)]
pub struct SpectrumPath {
    vertices: Vec<(f32, f32)>,
}

// Hand-written so queue slots keep their vertex buffers
impl Clone for SpectrumPath {
    fn clone(&self) -> Self {
        Self {
            vertices: self.vertices.clone(),
        }
    }

    fn clone_from(&mut self, source: &Self) {
        self.vertices.clone_from(&source.vertices);
    }
}

impl SpectrumPath {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(capacity),
        }
    }

    pub fn from_vertices(vertices: Vec<(f32, f32)>) -> Self {
        Self { vertices }
    }

    pub fn vertices(&self) -> &[(f32, f32)] {
        &self.vertices
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn start(&self) -> Option<(f32, f32)> {
        self.vertices.first().copied()
    }
}

/// Builds paths from dB frames and queues them for the coordinator
pub struct PathGenerator {
    path: SpectrumPath,
    producer: QueueProducer<SpectrumPath>,
}

impl PathGenerator {
    /// `max_vertices` sizes the preallocated path buffers
    pub fn new(
        capacity: usize,
        max_vertices: usize,
    ) -> DspResult<(Self, QueueConsumer<SpectrumPath>)> {
        // Full-length prototype so every slot starts with room for a whole path
        let prototype = SpectrumPath::from_vertices(vec![(0.0, 0.0); max_vertices]);
        let (producer, consumer) = bounded_queue(capacity, &prototype)?;
        Ok((
            Self {
                path: SpectrumPath::with_capacity(max_vertices),
                producer,
            },
            consumer,
        ))
    }

    /// Build one path from `frame` and push it
    ///
    /// Points whose y is not finite are skipped. If bin 0 is not finite the
    /// path starts at the first finite point instead.
    pub fn generate(
        &mut self,
        frame: &[f32],
        bounds: PathBounds,
        fft_size: usize,
        bin_width: f32,
        floor_db: f32,
    ) {
        let num_bins = (fft_size / 2).min(frame.len());
        let map = |db: f32| jmap(db, floor_db, 0.0, bounds.height, 0.0);

        let vertices = &mut self.path.vertices;
        vertices.clear();

        if let Some(&first) = frame.first() {
            let y = map(first);
            if y.is_finite() {
                vertices.push((0.0, y));
            }
        }

        for bin in (1..num_bins).step_by(PATH_RESOLUTION) {
            let y = map(frame[bin]);
            if !y.is_finite() {
                continue;
            }
            let freq = bin as f32 * bin_width;
            let x = (map_from_log10(freq, MIN_FREQUENCY, MAX_FREQUENCY) * bounds.width).floor();
            vertices.push((x, y));
        }

        self.producer.push(&self.path);
    }

    /// Paths discarded because the coordinator fell behind
    pub fn dropped(&self) -> u64 {
        self.producer.dropped()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const BOUNDS: PathBounds = PathBounds {
        width: 1000.0,
        height: 200.0,
    };

    fn generate(frame: &[f32]) -> SpectrumPath {
        let (mut generator, mut rx) = PathGenerator::new(2, frame.len()).unwrap();
        generator.generate(frame, BOUNDS, frame.len() * 2, 48000.0 / (frame.len() * 2) as f32, -48.0);
        let mut path = SpectrumPath::default();
        assert!(rx.try_pop(&mut path));
        path
    }

    #[test]
    fn test_log_mapping() {
        assert_abs_diff_eq!(map_from_log10(20.0, 20.0, 20000.0), 0.0);
        assert_abs_diff_eq!(map_from_log10(20000.0, 20.0, 20000.0), 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(map_from_log10(632.456, 20.0, 20000.0), 0.5, epsilon = 1e-4);
        assert_abs_diff_eq!(map_to_log10(0.5, 20.0, 20000.0), 632.456, epsilon = 0.01);
        assert_abs_diff_eq!(jmap(-24.0, -48.0, 0.0, 200.0, 0.0), 100.0);
    }

    #[test]
    fn test_flat_noise_floor_path() {
        let path = generate(&vec![-48.0; 1024]);

        // Start vertex plus bins 1, 3, ..., 1023
        assert_eq!(path.len(), 1 + 512);
        assert_eq!(path.start(), Some((0.0, 200.0)));
        assert!(path.vertices().iter().all(|&(_, y)| y == 200.0));
    }

    #[test]
    fn test_x_is_monotonic() {
        let path = generate(&vec![-12.0; 1024]);
        let xs: Vec<f32> = path.vertices()[1..].iter().map(|&(x, _)| x).collect();
        assert!(xs.windows(2).all(|w| w[0] <= w[1]));
        assert!(xs.last().is_some_and(|&x| x <= BOUNDS.width * 1.1));
    }

    #[test]
    fn test_zero_db_maps_to_top() {
        let path = generate(&vec![0.0; 64]);
        assert!(path.vertices().iter().all(|&(_, y)| y == 0.0));
    }

    #[test]
    fn test_non_finite_bins_are_skipped() {
        let mut frame = vec![-24.0; 64];
        frame[3] = f32::NAN;
        frame[5] = f32::INFINITY;
        let path = generate(&frame);

        assert_eq!(path.len(), 1 + 32 - 2);
        assert!(path.vertices().iter().all(|&(x, y)| x.is_finite() && y.is_finite()));
    }

    #[test]
    fn test_non_finite_start_uses_first_finite_point() {
        let mut frame = vec![-24.0; 64];
        frame[0] = f32::NAN;
        let path = generate(&frame);

        assert_eq!(path.len(), 32);
        let (x, y) = path.start().unwrap();
        assert!(x > 0.0);
        assert_eq!(y, 100.0);
    }

    #[test]
    fn test_queued_paths_reuse_buffers() {
        let (mut generator, mut rx) = PathGenerator::new(2, 64).unwrap();
        let mut out = SpectrumPath::with_capacity(64);
        let ptr = out.vertices.as_ptr();

        for _ in 0..3 {
            generator.generate(&vec![-24.0; 64], BOUNDS, 128, 375.0, -48.0);
            assert!(rx.try_pop(&mut out));
            assert_eq!(out.vertices.as_ptr(), ptr, "clone_from should reuse the buffer");
            assert_eq!(out.len(), 1 + 32);
        }
    }

    #[test]
    fn test_bounds_validation() {
        assert!(PathBounds::default().is_valid());
        assert!(!PathBounds {
            width: 0.0,
            height: 10.0
        }
        .is_valid());
    }
}

//! FFT Frame Generation
//!
//! Windowed forward FFT of a mono sample window, reduced to per-bin
//! magnitudes in dB and pushed into a bounded frame queue.
//!
//! # Scaling
//!
//! The window is normalised to unit mean and bin magnitudes are divided by
//! N/2, so a full-scale sine centred on a bin reads 0 dB.

use std::sync::Arc;

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use serde::{Deserialize, Serialize};

use crate::error::{DspError, DspResult};
use crate::queue::{bounded_queue, QueueConsumer, QueueProducer};

/// Default noise floor for dB conversion
pub const DEFAULT_NOISE_FLOOR_DB: f32 = -48.0;

/// Magnitudes in dB for bins 0..N/2
pub type FftFrame = Vec<f32>;

/// FFT size as a power of two
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FftOrder {
    /// 2048 samples at 48kHz = ~42ms window, ~23Hz resolution
    #[default]
    Order2048,
    Order4096,
    Order8192,
}

impl FftOrder {
    pub fn exponent(self) -> u32 {
        match self {
            FftOrder::Order2048 => 11,
            FftOrder::Order4096 => 12,
            FftOrder::Order8192 => 13,
        }
    }

    pub fn from_exponent(exponent: u32) -> DspResult<Self> {
        match exponent {
            11 => Ok(FftOrder::Order2048),
            12 => Ok(FftOrder::Order4096),
            13 => Ok(FftOrder::Order8192),
            other => Err(DspError::InvalidFftOrder(other)),
        }
    }

    pub fn size(self) -> usize {
        1 << self.exponent()
    }

    pub fn num_bins(self) -> usize {
        self.size() / 2
    }
}

/// Convert linear gain to dB, never going below `floor_db`
///
/// Zero, negative and NaN gains map to the floor.
#[inline]
pub fn gain_to_db(gain: f32, floor_db: f32) -> f32 {
    if gain > 0.0 {
        (20.0 * gain.log10()).max(floor_db)
    } else {
        floor_db
    }
}

/// 4-term Blackman-Harris window value (symmetric)
fn blackman_harris(n: usize, size: usize) -> f32 {
    let x = 2.0 * std::f64::consts::PI * n as f64 / (size - 1) as f64;
    (0.35875 - 0.48829 * x.cos() + 0.14128 * (2.0 * x).cos() - 0.01168 * (3.0 * x).cos()) as f32
}

/// Pre-computed Blackman-Harris lookup table
///
/// Blackman-Harris keeps side lobes below -90 dB, far under the display floor.
pub struct BlackmanHarrisWindow {
    coeffs: Vec<f32>,
}

impl BlackmanHarrisWindow {
    /// Build a window of `size` points normalised to unit mean
    pub fn new(size: usize) -> Self {
        let mut coeffs: Vec<f32> = (0..size).map(|i| blackman_harris(i, size)).collect();
        let sum: f32 = coeffs.iter().sum();
        if sum > 0.0 {
            let scale = size as f32 / sum;
            coeffs.iter_mut().for_each(|c| *c *= scale);
        }
        Self { coeffs }
    }

    pub fn len(&self) -> usize {
        self.coeffs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coeffs.is_empty()
    }

    #[inline]
    pub fn apply(&self, sample: f32, index: usize) -> f32 {
        sample * self.coeffs[index]
    }
}

/// Computes dB magnitude frames and queues them for path generation
pub struct FftFrameGenerator {
    order: FftOrder,
    window: BlackmanHarrisWindow,
    /// FFT plan (reused for every frame)
    fft: Arc<dyn Fft<f32>>,
    buffer: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
    frame: FftFrame,
    producer: QueueProducer<FftFrame>,
}

impl FftFrameGenerator {
    /// Plan an FFT of the given order with a frame queue of `capacity` frames
    pub fn new(order: FftOrder, capacity: usize) -> DspResult<(Self, QueueConsumer<FftFrame>)> {
        let size = order.size();
        let frame = vec![DEFAULT_NOISE_FLOOR_DB; order.num_bins()];
        let (producer, consumer) = bounded_queue(capacity, &frame)?;

        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(size);
        let scratch = vec![Complex::new(0.0, 0.0); fft.get_inplace_scratch_len()];

        Ok((
            Self {
                order,
                window: BlackmanHarrisWindow::new(size),
                fft,
                buffer: vec![Complex::new(0.0, 0.0); size],
                scratch,
                frame,
                producer,
            },
            consumer,
        ))
    }

    pub fn order(&self) -> FftOrder {
        self.order
    }

    pub fn fft_size(&self) -> usize {
        self.order.size()
    }

    /// Window, transform and convert the first `fft_size` samples, then push
    /// the resulting frame. Shorter input is zero-padded.
    pub fn produce(&mut self, samples: &[f32], floor_db: f32) {
        debug_assert!(samples.len() >= self.fft_size(), "Sample window shorter than FFT");

        for (i, slot) in self.buffer.iter_mut().enumerate() {
            let sample = samples.get(i).copied().unwrap_or(0.0);
            *slot = Complex::new(self.window.apply(sample, i), 0.0);
        }

        self.fft.process_with_scratch(&mut self.buffer, &mut self.scratch);

        let num_bins = self.order.num_bins();
        let norm = 1.0 / num_bins as f32;
        for (db, bin) in self.frame.iter_mut().zip(self.buffer.iter()) {
            *db = gain_to_db(bin.norm() * norm, floor_db);
        }

        self.producer.push(&self.frame);
    }

    /// Frames discarded because the path generator fell behind
    pub fn dropped(&self) -> u64 {
        self.producer.dropped()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const SR: f32 = 48000.0;

    fn sine(freq: f32, amplitude: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / SR).sin() * amplitude)
            .collect()
    }

    fn argmax(frame: &[f32]) -> usize {
        frame
            .iter()
            .enumerate()
            .fold((0, f32::MIN), |(bi, bv), (i, &v)| if v > bv { (i, v) } else { (bi, bv) })
            .0
    }

    #[test]
    fn test_order_sizes() {
        assert_eq!(FftOrder::Order2048.size(), 2048);
        assert_eq!(FftOrder::Order4096.num_bins(), 2048);
        assert_eq!(FftOrder::Order8192.size(), 8192);
        assert_eq!(FftOrder::from_exponent(12).unwrap(), FftOrder::Order4096);
        assert!(FftOrder::from_exponent(10).is_err());
    }

    #[test]
    fn test_gain_to_db() {
        assert_eq!(gain_to_db(0.0, -48.0), -48.0);
        assert_eq!(gain_to_db(-1.0, -48.0), -48.0);
        assert_eq!(gain_to_db(f32::NAN, -48.0), -48.0);
        assert_eq!(gain_to_db(1e-9, -48.0), -48.0);
        assert_abs_diff_eq!(gain_to_db(0.5, -48.0), -6.0206, epsilon = 1e-3);
    }

    #[test]
    fn test_window_shape() {
        let w = BlackmanHarrisWindow::new(2048);
        assert_eq!(w.len(), 2048);
        assert!(w.apply(1.0, 0) < 0.01, "Window should be ~0 at start");
        assert!(w.apply(1.0, 2047) < 0.01, "Window should be ~0 at end");
        assert!(w.apply(1.0, 1024) > 2.5, "Normalised centre should be ~1/0.35875");

        let mean: f32 = (0..2048).map(|i| w.apply(1.0, i)).sum::<f32>() / 2048.0;
        assert_abs_diff_eq!(mean, 1.0, epsilon = 1e-4);
    }

    #[test]
    fn test_silence_is_noise_floor() {
        let (mut generator, mut rx) = FftFrameGenerator::new(FftOrder::Order2048, 4).unwrap();
        generator.produce(&vec![0.0; 2048], -48.0);

        let mut frame = Vec::new();
        assert!(rx.try_pop(&mut frame));
        assert_eq!(frame.len(), 1024);
        assert!(frame.iter().all(|&db| db == -48.0));
    }

    #[test]
    fn test_bin_centred_sine_level() {
        let (mut generator, mut rx) = FftFrameGenerator::new(FftOrder::Order2048, 4).unwrap();
        let bin = 43;
        let freq = bin as f32 * SR / 2048.0;
        generator.produce(&sine(freq, 0.5, 2048), -96.0);

        let mut frame = Vec::new();
        assert!(rx.try_pop(&mut frame));
        assert_eq!(argmax(&frame), bin);
        assert_abs_diff_eq!(frame[bin], 20.0 * 0.5_f32.log10(), epsilon = 0.5);
    }

    #[test]
    fn test_off_bin_sine_lands_on_nearest_bin() {
        let (mut generator, mut rx) = FftFrameGenerator::new(FftOrder::Order4096, 4).unwrap();
        let freq = 1000.0;
        generator.produce(&sine(freq, 0.25, 4096), -96.0);

        let mut frame = Vec::new();
        assert!(rx.try_pop(&mut frame));
        let expected_bin = (freq * 4096.0 / SR).round() as usize;
        let found = argmax(&frame);
        assert!(found.abs_diff(expected_bin) <= 1, "Peak at {} not {}", found, expected_bin);
        // Blackman-Harris scalloping loss is under 1 dB
        assert_abs_diff_eq!(frame[found], 20.0 * 0.25_f32.log10(), epsilon = 1.5);
    }

    #[test]
    fn test_frames_queue_drops_oldest() {
        let (mut generator, rx) = FftFrameGenerator::new(FftOrder::Order2048, 2).unwrap();
        let silence = vec![0.0; 2048];
        for _ in 0..5 {
            generator.produce(&silence, -48.0);
        }
        assert_eq!(rx.len(), 2);
        assert_eq!(generator.dropped(), 3);
    }
}

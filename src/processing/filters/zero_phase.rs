// src/processing/filters/zero_phase.rs
//! Forward-reverse (zero-phase) filtering of whole buffers

use super::{BandType, ButterworthCascade, FilterError};
use tracing::debug;

/// Zero-phase band-pass built from a Butterworth highpass and lowpass pair
#[derive(Debug, Clone)]
pub struct ZeroPhaseBandPass {
    highpass: ButterworthCascade,
    lowpass: ButterworthCascade,
    low_hz: f32,
    high_hz: f32,
}

impl ZeroPhaseBandPass {
    /// Band-pass from `low_hz` to `high_hz` with `order` per edge
    pub fn new(low_hz: f32, high_hz: f32, order: usize, sample_rate: f32) -> Result<Self, FilterError> {
        if low_hz >= high_hz {
            return Err(FilterError::InvalidParameters(
                "Low cutoff must be less than high cutoff".to_string(),
            ));
        }

        Ok(Self {
            highpass: ButterworthCascade::design(order, low_hz, sample_rate, BandType::Highpass)?,
            lowpass: ButterworthCascade::design(order, high_hz, sample_rate, BandType::Lowpass)?,
            low_hz,
            high_hz,
        })
    }

    /// Filter the buffer in place, once forward and once reversed
    pub fn apply(&mut self, samples: &mut [f32]) {
        if samples.is_empty() {
            return;
        }
        debug!(
            low_hz = self.low_hz,
            high_hz = self.high_hz,
            samples = samples.len(),
            "zero-phase band-pass"
        );

        let n = samples.len();
        let pad = self.padding_len(n);
        let mut work = odd_extension(samples, pad);

        self.run_pass(&mut work);
        work.reverse();
        self.run_pass(&mut work);
        work.reverse();

        for (out, value) in samples.iter_mut().zip(&work[pad..pad + n]) {
            *out = *value as f32;
        }
    }

    fn run_pass(&mut self, work: &mut [f64]) {
        self.highpass.reset();
        self.lowpass.reset();
        for value in work.iter_mut() {
            *value = self.lowpass.process_sample(self.highpass.process_sample(*value));
        }
    }

    fn padding_len(&self, len: usize) -> usize {
        let taps = 2 * (self.highpass.order() + self.lowpass.order()) + 1;
        (3 * taps).min(len.saturating_sub(1))
    }
}

/// Odd reflection about both end points, as used for filtfilt edge handling
fn odd_extension(samples: &[f32], pad: usize) -> Vec<f64> {
    let n = samples.len();
    let first = samples[0] as f64;
    let last = samples[n - 1] as f64;

    let mut out = Vec::with_capacity(n + 2 * pad);
    out.extend((1..=pad).rev().map(|i| 2.0 * first - samples[i] as f64));
    out.extend(samples.iter().map(|&s| s as f64));
    out.extend((1..=pad).map(|i| 2.0 * last - samples[n - 1 - i] as f64));
    out
}

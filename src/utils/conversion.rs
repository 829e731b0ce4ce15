//! Conversion utilities for the simulator
//!
//! Time-base, byte-offset and level conversions shared by the MUP object and
//! the assembly driver. Constants come from [`crate::config::constants`].

use crate::config::constants::{format, generator, signal};
use std::borrow::Cow;

/// EMG buffer index of a firing time given in the finer firing-time base
pub fn firing_time_to_index(firing_time: u64, resolution: u32) -> u64 {
    firing_time / resolution.max(1) as u64
}

/// Seconds from run start of a (possibly fractional) sample position
pub fn samples_to_seconds(sample: f64, sample_rate_hz: u32) -> f64 {
    sample / sample_rate_hz as f64
}

/// Byte position of a sample inside the EMG output file
pub fn sample_to_byte_offset(sample: usize) -> u64 {
    format::EMG_FILE_HEADER_BYTES + format::SAMPLE_BYTES * sample as u64
}

/// Number of whole samples stored in an EMG file of `bytes` length
pub fn bytes_to_samples(bytes: u64) -> u64 {
    bytes.saturating_sub(format::EMG_FILE_HEADER_BYTES) / format::SAMPLE_BYTES
}

/// Little-endian bytes of a sample payload, borrowed on little-endian hosts
#[cfg(target_endian = "little")]
pub fn samples_as_le_bytes(samples: &[f32]) -> Cow<'_, [u8]> {
    Cow::Borrowed(bytemuck::cast_slice(samples))
}

/// Little-endian bytes of a sample payload
#[cfg(not(target_endian = "little"))]
pub fn samples_as_le_bytes(samples: &[f32]) -> Cow<'_, [u8]> {
    Cow::Owned(samples.iter().flat_map(|s| s.to_le_bytes()).collect())
}

/// Decode a little-endian sample payload; `bytes.len()` must be a multiple of 4
pub fn samples_from_le_bytes(bytes: &[u8]) -> Vec<f32> {
    let mut samples = vec![0.0f32; bytes.len() / format::SAMPLE_BYTES as usize];
    let raw: &mut [u8] = bytemuck::cast_slice_mut(&mut samples);
    raw.copy_from_slice(&bytes[..raw.len()]);
    if cfg!(target_endian = "big") {
        for sample in samples.iter_mut() {
            *sample = f32::from_bits(u32::from_le(sample.to_bits()));
        }
    }
    samples
}

/// Amplitude ratio of a level in decibels
pub fn db_to_amplitude_ratio(db: f64) -> f64 {
    10f64.powf(db / 20.0)
}

/// Conduction velocity in mm/ms of a fibre of `diameter_mm`
pub fn conduction_velocity(diameter_mm: f64) -> f64 {
    let diameter_um = diameter_mm * generator::MICROMETRES_PER_MILLIMETRE;
    generator::VELOCITY_BASE_MM_PER_MS
        + generator::VELOCITY_SLOPE * (diameter_um - generator::VELOCITY_REFERENCE_DIAMETER_UM)
}

/// Sample interval in ms of a sample rate
pub fn sample_interval_ms(sample_rate_hz: u32) -> f64 {
    signal::MILLISECONDS_PER_SECOND / sample_rate_hz as f64
}

/// Root mean square, accumulated in f64
pub fn rms(samples: &[f32]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let energy: f64 = samples.iter().map(|&s| s as f64 * s as f64).sum();
    (energy / samples.len() as f64).sqrt()
}

/// Peak-to-peak amplitude
pub fn peak_to_peak(samples: &[f32]) -> f32 {
    let (min, max) = samples
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &s| (lo.min(s), hi.max(s)));
    if samples.is_empty() {
        0.0
    } else {
        max - min
    }
}

/// Forward difference divided by `dt`; the final sample is zero
pub fn forward_difference(samples: &[f32], dt: f64) -> Vec<f32> {
    let mut out = Vec::with_capacity(samples.len());
    out.extend(
        samples
            .windows(2)
            .map(|w| ((w[1] as f64 - w[0] as f64) / dt) as f32),
    );
    if !samples.is_empty() {
        out.push(0.0);
    }
    out
}

/// Largest absolute second difference divided by `dt^2`
pub fn peak_acceleration(samples: &[f32], dt: f64) -> f64 {
    samples
        .windows(3)
        .map(|w| (w[2] as f64 - 2.0 * w[1] as f64 + w[0] as f64).abs())
        .fold(0.0, f64::max)
        / (dt * dt)
}

/// Index of the steepest step (largest |x[i+1] - x[i]|); first wins on ties
pub fn max_slope_index(samples: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, w) in samples.windows(2).enumerate() {
        let step = (w[1] - w[0]).abs();
        if best.map_or(true, |(_, b)| step > b) {
            best = Some((i, step));
        }
    }
    best.map(|(i, _)| i)
}

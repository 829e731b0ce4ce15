// src/assembly/emg_file.rs
//! EMG output buffer and file
//!
//! File layout: f32 start time (0.0), f32 finish time in seconds, then one
//! little-endian f32 per sample.

use crate::error::{EmgErrorBuilder, EmgResult, FileFormat, IoResultExt};
use crate::utils::{bytes_to_samples, rms, samples_as_le_bytes, samples_from_le_bytes};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

const COMPONENT: &str = "emg_file";

/// One accumulator per base-rate tick of the run
#[derive(Debug, Clone)]
pub struct EmgBuffer {
    samples: Vec<f32>,
    sample_rate_hz: u32,
}

impl EmgBuffer {
    /// Zeroed buffer of `total_samples`
    pub fn new(total_samples: usize, sample_rate_hz: u32) -> Self {
        Self {
            samples: vec![0.0; total_samples],
            sample_rate_hz,
        }
    }

    /// Sample count
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// No samples
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Sample rate
    pub fn sample_rate_hz(&self) -> u32 {
        self.sample_rate_hz
    }

    /// Accumulated samples
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Mutable samples for noise and filtering
    pub fn samples_mut(&mut self) -> &mut [f32] {
        &mut self.samples
    }

    /// Add `waveform` starting at `start`; samples past the end are
    /// discarded. Returns how many were added.
    pub fn overlay(&mut self, start: usize, waveform: &[f32]) -> usize {
        let Some(tail) = self.samples.get_mut(start..) else {
            return 0;
        };
        let mut added = 0;
        for (out, &s) in tail.iter_mut().zip(waveform) {
            *out += s;
            added += 1;
        }
        added
    }

    /// RMS over the whole buffer
    pub fn rms(&self) -> f64 {
        rms(&self.samples)
    }

    /// Seconds covered by the buffer
    pub fn finish_time_s(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate_hz as f64
    }
}

/// Contents of an EMG file
#[derive(Debug, Clone, PartialEq)]
pub struct EmgFileContents {
    /// Start time, always 0
    pub start_s: f32,
    /// Finish time in seconds
    pub finish_s: f32,
    /// Every sample in order
    pub samples: Vec<f32>,
}

/// Write start, finish and every sample of `samples`
pub fn write_emg_file(path: &Path, samples: &[f32], finish_s: f64) -> EmgResult<()> {
    let file = File::create(path).io_err(COMPONENT, "create", path)?;
    let mut out = BufWriter::new(file);

    out.write_all(&0.0f32.to_le_bytes()).io_err(COMPONENT, "write", path)?;
    out.write_all(&(finish_s as f32).to_le_bytes()).io_err(COMPONENT, "write", path)?;
    out.write_all(&samples_as_le_bytes(samples)).io_err(COMPONENT, "write", path)?;
    out.flush().io_err(COMPONENT, "flush", path)
}

/// Read an EMG file written by [`write_emg_file`]
pub fn read_emg_file(path: &Path) -> EmgResult<EmgFileContents> {
    let file = File::open(path).io_err(COMPONENT, "open", path)?;
    let mut bytes = Vec::new();
    BufReader::new(file).read_to_end(&mut bytes).io_err(COMPONENT, "read", path)?;

    if bytes.len() < 8 || (bytes.len() - 8) % 4 != 0 {
        return Err(EmgErrorBuilder::new(COMPONENT, "read").format(
            FileFormat::EmgFile,
            path,
            format!("{} bytes is not a header plus whole samples", bytes.len()),
        ));
    }

    let floats = samples_from_le_bytes(&bytes);
    debug_assert_eq!(floats.len() as u64 - 2, bytes_to_samples(bytes.len() as u64));

    Ok(EmgFileContents {
        start_s: floats[0],
        finish_s: floats[1],
        samples: floats[2..].to_vec(),
    })
}

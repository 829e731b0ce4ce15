// src/config/mod.rs
//! Run-wide simulation configuration
//!
//! One [`SimulationConfig`] is built per run (usually through
//! [`ConfigLoader`]) and passed by reference into the generator, the MUP
//! objects and the assembly driver.

pub mod constants;
pub mod loader;
pub mod mup_config;

pub use constants::*;
pub use loader::{ConfigError, ConfigLoader};
pub use mup_config::*;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Complete simulation configuration
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct SimulationConfig {
    /// Sampling and run length
    #[serde(default)]
    pub signal: SignalSettings,
    /// Fibre-potential generator physics
    #[serde(default)]
    pub generator: GeneratorSettings,
    /// Fibre classification and time expansion
    #[serde(default)]
    pub mup: MupSettings,
    /// Jitter draws
    #[serde(default)]
    pub jitter: JitterSettings,
    /// Electrode geometry and reference setup
    #[serde(default)]
    pub electrode: ElectrodeSettings,
    /// Output conditioning
    #[serde(default)]
    pub output: OutputSettings,
    /// File locations
    #[serde(default)]
    pub paths: PathSettings,
}

/// Sampling and run length
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SignalSettings {
    /// Base sample rate of MUPs and the EMG buffer
    #[serde(default = "defaults::sample_rate_hz")]
    pub sample_rate_hz: u32,

    /// Samples per base-rate MUP
    #[serde(default = "defaults::mup_sample_count")]
    pub mup_sample_count: usize,

    /// Run length in seconds
    #[serde(default = "defaults::duration_s")]
    pub duration_s: f64,

    /// Firing-time units per EMG buffer sample
    #[serde(default = "defaults::firing_time_resolution")]
    pub firing_time_resolution: u32,
}

/// Output conditioning and ground-truth export
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct OutputSettings {
    /// Target SNR in dB; no noise is injected when absent
    #[serde(default)]
    pub snr_db: Option<f32>,

    /// Apply the zero-phase band-pass after assembly
    #[serde(default = "defaults::band_pass")]
    pub band_pass: bool,

    /// Band-pass lower cutoff
    #[serde(default = "defaults::band_pass_low_hz")]
    pub band_pass_low_hz: f32,

    /// Band-pass upper cutoff
    #[serde(default = "defaults::band_pass_high_hz")]
    pub band_pass_high_hz: f32,

    /// Butterworth order of each band edge
    #[serde(default = "defaults::filter_order")]
    pub filter_order: usize,

    /// Ground-truth records kept before dropping
    #[serde(default = "defaults::max_train_records")]
    pub max_train_records: usize,

    /// Written to every ground-truth row
    #[serde(default = "defaults::user_id")]
    pub user_id: i32,

    /// Write the JSON run summary next to the outputs
    #[serde(default = "defaults::write_summary")]
    pub write_summary: bool,
}

/// Input and output locations
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PathSettings {
    /// Directory holding saved MUP files
    #[serde(default = "defaults::mup_dir")]
    pub mup_dir: PathBuf,

    /// Directory holding firing-time files
    #[serde(default = "defaults::firing_dir")]
    pub firing_dir: PathBuf,

    /// Directory for EMG, ground-truth and summary files
    #[serde(default = "defaults::output_dir")]
    pub output_dir: PathBuf,

    /// File name pattern; `{unit}` expands to the zero-padded unit number
    #[serde(default = "defaults::mup_file_pattern")]
    pub mup_file_pattern: String,

    /// Firing-time file name pattern, same placeholder as MUP files
    #[serde(default = "defaults::firing_file_pattern")]
    pub firing_file_pattern: String,

    /// EMG output file name
    #[serde(default = "defaults::emg_file")]
    pub emg_file: String,

    /// Ground-truth CSV file name
    #[serde(default = "defaults::gst_file")]
    pub gst_file: String,

    /// JSON run summary file name
    #[serde(default = "defaults::summary_file")]
    pub summary_file: String,

    /// Gold-standard templates are written here when set
    #[serde(default)]
    pub template_dir: Option<PathBuf>,
}

/// Default value providers using constants
mod defaults {
    use crate::config::constants::*;
    use std::path::PathBuf;

    pub fn sample_rate_hz() -> u32 { signal::DEFAULT_SAMPLE_RATE_HZ }
    pub fn mup_sample_count() -> usize { signal::DEFAULT_MUP_SAMPLE_COUNT }
    pub fn duration_s() -> f64 { signal::DEFAULT_DURATION_S }
    pub fn firing_time_resolution() -> u32 { signal::DEFAULT_FIRING_TIME_RESOLUTION }

    pub fn band_pass() -> bool { true }
    pub fn band_pass_low_hz() -> f32 { filters::DEFAULT_BANDPASS_LOW_HZ }
    pub fn band_pass_high_hz() -> f32 { filters::DEFAULT_BANDPASS_HIGH_HZ }
    pub fn filter_order() -> usize { filters::DEFAULT_FILTER_ORDER }
    pub fn max_train_records() -> usize { ground_truth::DEFAULT_MAX_RECORDS }
    pub fn user_id() -> i32 { ground_truth::DEFAULT_USER_ID }
    pub fn write_summary() -> bool { true }

    pub fn mup_dir() -> PathBuf { PathBuf::from(paths::DEFAULT_MUP_DIR) }
    pub fn firing_dir() -> PathBuf { PathBuf::from(paths::DEFAULT_FIRING_DIR) }
    pub fn output_dir() -> PathBuf { PathBuf::from(paths::DEFAULT_OUTPUT_DIR) }
    pub fn mup_file_pattern() -> String { paths::DEFAULT_MUP_FILE_PATTERN.to_string() }
    pub fn firing_file_pattern() -> String { paths::DEFAULT_FIRING_FILE_PATTERN.to_string() }
    pub fn emg_file() -> String { paths::DEFAULT_EMG_FILE.to_string() }
    pub fn gst_file() -> String { paths::DEFAULT_GST_FILE.to_string() }
    pub fn summary_file() -> String { paths::DEFAULT_SUMMARY_FILE.to_string() }
}

impl Default for SignalSettings {
    fn default() -> Self {
        Self {
            sample_rate_hz: defaults::sample_rate_hz(),
            mup_sample_count: defaults::mup_sample_count(),
            duration_s: defaults::duration_s(),
            firing_time_resolution: defaults::firing_time_resolution(),
        }
    }
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            snr_db: None,
            band_pass: defaults::band_pass(),
            band_pass_low_hz: defaults::band_pass_low_hz(),
            band_pass_high_hz: defaults::band_pass_high_hz(),
            filter_order: defaults::filter_order(),
            max_train_records: defaults::max_train_records(),
            user_id: defaults::user_id(),
            write_summary: defaults::write_summary(),
        }
    }
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            mup_dir: defaults::mup_dir(),
            firing_dir: defaults::firing_dir(),
            output_dir: defaults::output_dir(),
            mup_file_pattern: defaults::mup_file_pattern(),
            firing_file_pattern: defaults::firing_file_pattern(),
            emg_file: defaults::emg_file(),
            gst_file: defaults::gst_file(),
            summary_file: defaults::summary_file(),
            template_dir: None,
        }
    }
}

impl SignalSettings {
    /// Base sample interval in milliseconds
    pub fn sample_interval_ms(&self) -> f64 {
        crate::utils::conversion::sample_interval_ms(self.sample_rate_hz)
    }

    /// Number of EMG buffer samples covering the whole run
    pub fn total_samples(&self) -> usize {
        (self.duration_s * self.sample_rate_hz as f64).round() as usize
    }

    /// Time of the last sample boundary in seconds
    pub fn finish_time_s(&self) -> f64 {
        self.total_samples() as f64 / self.sample_rate_hz as f64
    }
}

/// Configuration utility functions
impl SimulationConfig {
    /// Validate configuration consistency
    pub fn validate_consistency(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        let rate = self.signal.sample_rate_hz;
        if !(signal::MIN_SAMPLE_RATE_HZ..=signal::MAX_SAMPLE_RATE_HZ).contains(&rate) {
            errors.push(format!(
                "Sample rate {} Hz outside [{}, {}]",
                rate, signal::MIN_SAMPLE_RATE_HZ, signal::MAX_SAMPLE_RATE_HZ
            ));
        }

        let min_mup = 2 * (generator::EDGE_RAMP_SAMPLES + 1);
        if self.signal.mup_sample_count <= min_mup {
            errors.push(format!(
                "MUP sample count {} must exceed {} to fit both edge ramps",
                self.signal.mup_sample_count, min_mup
            ));
        }

        if !(self.signal.duration_s > 0.0) {
            errors.push(format!("Duration must be positive, got {}", self.signal.duration_s));
        }

        if self.signal.firing_time_resolution == 0 {
            errors.push("Firing time resolution must be at least 1".to_string());
        }

        if self.mup.expansion_factor == 0 || self.mup.expansion_factor > mup::MAX_EXPANSION_FACTOR {
            errors.push(format!(
                "Expansion factor {} outside [1, {}]",
                self.mup.expansion_factor, mup::MAX_EXPANSION_FACTOR
            ));
        }

        if !(self.mup.acceleration_threshold >= 0.0) {
            errors.push(format!(
                "Acceleration threshold must be non-negative, got {}",
                self.mup.acceleration_threshold
            ));
        }

        if !(0.0..=jitter::MAX_JITTER_VARIANCE_SAMPLES).contains(&self.jitter.variance_samples) {
            errors.push(format!(
                "Jitter variance {} samples outside [0, {}]",
                self.jitter.variance_samples, jitter::MAX_JITTER_VARIANCE_SAMPLES
            ));
        }

        if !(self.generator.anisotropy_ratio > 0.0) {
            errors.push("Anisotropy ratio must be positive".to_string());
        }

        if !(0.0..1.0).contains(&self.generator.lead_in_fraction) {
            errors.push(format!(
                "Lead-in fraction {} outside [0, 1)",
                self.generator.lead_in_fraction
            ));
        }

        if self.output.band_pass {
            let nyquist = rate as f32 / 2.0;
            if self.output.band_pass_high_hz >= nyquist {
                errors.push(format!(
                    "Band-pass high cutoff ({} Hz) must be less than Nyquist frequency ({} Hz)",
                    self.output.band_pass_high_hz, nyquist
                ));
            }
            if self.output.band_pass_low_hz <= 0.0
                || self.output.band_pass_low_hz >= self.output.band_pass_high_hz
            {
                errors.push(format!(
                    "Band-pass low cutoff ({} Hz) must be in (0, {})",
                    self.output.band_pass_low_hz, self.output.band_pass_high_hz
                ));
            }
            if !(filters::MIN_FILTER_ORDER..=filters::MAX_FILTER_ORDER).contains(&self.output.filter_order) {
                errors.push(format!("Filter order {} outside [1, 8]", self.output.filter_order));
            }
        }

        if self.output.max_train_records == 0 {
            errors.push("Ground-truth record cap must be at least 1".to_string());
        }

        for (name, pattern) in [
            ("mup_file_pattern", &self.paths.mup_file_pattern),
            ("firing_file_pattern", &self.paths.firing_file_pattern),
        ] {
            if !pattern.contains(paths::UNIT_PLACEHOLDER) {
                errors.push(format!("{} '{}' lacks {}", name, pattern, paths::UNIT_PLACEHOLDER));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// MUP file of a motor unit
    pub fn mup_path(&self, unit: u32) -> PathBuf {
        self.paths.mup_dir.join(expand_unit_pattern(&self.paths.mup_file_pattern, unit))
    }

    /// Firing-time file of a motor unit
    pub fn firing_path(&self, unit: u32) -> PathBuf {
        self.paths.firing_dir.join(expand_unit_pattern(&self.paths.firing_file_pattern, unit))
    }

    /// EMG output file
    pub fn emg_path(&self) -> PathBuf {
        self.paths.output_dir.join(&self.paths.emg_file)
    }

    /// Ground-truth CSV file
    pub fn gst_path(&self) -> PathBuf {
        self.paths.output_dir.join(&self.paths.gst_file)
    }

    /// JSON run summary file
    pub fn summary_path(&self) -> PathBuf {
        self.paths.output_dir.join(&self.paths.summary_file)
    }

    /// Get configuration summary
    pub fn get_summary(&self) -> ConfigSummary {
        ConfigSummary {
            sample_rate_hz: self.signal.sample_rate_hz,
            mup_sample_count: self.signal.mup_sample_count,
            total_samples: self.signal.total_samples(),
            expansion_factor: self.mup.expansion_factor,
            jitter_enabled: self.jitter.enabled,
            reference: self.electrode.reference,
            noise_snr_db: self.output.snr_db,
            band_pass: self.output.band_pass,
        }
    }
}

fn expand_unit_pattern(pattern: &str, unit: u32) -> String {
    pattern.replace(paths::UNIT_PLACEHOLDER, &format!("{:04}", unit))
}

/// Configuration summary for display/logging
#[derive(Debug, Clone, Serialize)]
pub struct ConfigSummary {
    /// Base sample rate
    pub sample_rate_hz: u32,
    /// Samples per MUP
    pub mup_sample_count: usize,
    /// EMG buffer length
    pub total_samples: usize,
    /// Time expansion of jitterable buffers
    pub expansion_factor: usize,
    /// Whether firings are jittered
    pub jitter_enabled: bool,
    /// Recording reference
    pub reference: ReferenceSetup,
    /// Target SNR, if noise is added
    pub noise_snr_db: Option<f32>,
    /// Whether the band-pass runs
    pub band_pass: bool,
}

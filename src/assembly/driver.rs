// src/assembly/driver.rs
//! EMG assembly driver
//!
//! Units are processed strictly in order. Each unit's MUP is opened header
//! first, synthesized once per in-window firing, overlaid into the shared
//! [`EmgBuffer`] and unloaded before the next unit is touched. Noise,
//! band-pass filtering and the output files follow once every unit is done.

use super::emg_file::{write_emg_file, EmgBuffer};
use super::firing_times::FiringTimes;
use super::ground_truth::GroundTruthLog;
use super::noise::NoiseInjector;
use crate::config::SimulationConfig;
use crate::error::{EmgErrorBuilder, EmgResult, IoResultExt};
use crate::processing::ZeroPhaseBandPass;
use crate::simulation::mup_file::{write_mup, MupImage};
use crate::simulation::{FibreBuffer, GaussianJitter, JitterMode, JitterSource, Mup, SynthesisOptions};
use crate::utils::firing_time_to_index;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

const COMPONENT: &str = "assembly_driver";

/// Input files of one motor unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MotorUnitSource {
    /// 1-based motor unit number
    pub unit: u32,
    /// Saved MUP; a missing file means the unit is not detected
    pub mup_path: PathBuf,
    /// Firing-time list
    pub firing_path: PathBuf,
}

impl MotorUnitSource {
    /// Paths from the configured directories and name patterns
    pub fn from_config(config: &SimulationConfig, unit: u32) -> Self {
        Self {
            unit,
            mup_path: config.mup_path(unit),
            firing_path: config.firing_path(unit),
        }
    }
}

/// Per-unit outcome of a run
#[derive(Debug, Clone, Serialize)]
pub struct UnitSummary {
    /// Motor unit number
    pub unit: u32,
    /// Firings listed in the file
    pub firings_total: usize,
    /// Firings whose MUP was added to the buffer
    pub firings_overlaid: usize,
    /// Firings not processed because the run ended first
    pub firings_past_end: usize,
    /// Overlaid firings whose alignment point fell outside the run
    pub alignments_outside_run: usize,
    /// At least one firing produced a ground-truth position
    pub aligned: bool,
    /// Jitterable buffers of the MUP
    pub jitterable_fibres: usize,
    /// Written template file, when a template directory is set
    pub template_path: Option<PathBuf>,
    /// Gold-standard waveform in Template mode
    #[serde(skip_serializing)]
    pub template: Option<Vec<f32>>,
}

/// Outcome of a whole run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Units with a MUP file
    pub units_processed: usize,
    /// Units without a MUP file, outside the detection region
    pub units_skipped: Vec<u32>,
    /// Firings overlaid across all units
    pub firings_overlaid: usize,
    /// Firings past the run end across all units
    pub firings_past_end: usize,
    /// Records in the ground-truth log
    pub ground_truth_records: usize,
    /// Records dropped at the log capacity
    pub dropped_records: usize,
    /// Alignment points before the start or past the end of the run
    pub records_outside_run: usize,
    /// EMG buffer length
    pub total_samples: usize,
    /// Standard deviation of the injected noise
    pub noise_std: Option<f64>,
    /// The band-pass ran
    pub band_pass_applied: bool,
    /// EMG file written
    pub emg_path: PathBuf,
    /// Ground-truth CSV written
    pub gst_path: PathBuf,
    /// Wall time of the run
    pub elapsed_ms: u64,
    /// Per-unit outcomes in processing order
    pub units: Vec<UnitSummary>,
}

impl RunSummary {
    /// Outcome of one unit
    pub fn unit(&self, unit: u32) -> Option<&UnitSummary> {
        self.units.iter().find(|u| u.unit == unit)
    }
}

/// Owns the output buffer, the ground-truth log and the jitter stream of a run
pub struct EmgAssemblyDriver<'a> {
    config: &'a SimulationConfig,
    buffer: EmgBuffer,
    log: GroundTruthLog,
    jitter: Box<dyn JitterSource>,
}

impl<'a> EmgAssemblyDriver<'a> {
    /// Validates `config` and allocates the output buffer
    pub fn new(config: &'a SimulationConfig) -> EmgResult<Self> {
        config.validate_consistency().map_err(|errors| {
            EmgErrorBuilder::new(COMPONENT, "new").configuration(errors.join("; "))
        })?;

        Ok(Self {
            config,
            buffer: EmgBuffer::new(config.signal.total_samples(), config.signal.sample_rate_hz),
            log: GroundTruthLog::new(config.output.max_train_records, config.signal.total_samples()),
            jitter: Box::new(GaussianJitter::from_config(config)),
        })
    }

    /// Replace the configured Gaussian stream
    pub fn with_jitter_source(mut self, source: Box<dyn JitterSource>) -> Self {
        self.jitter = source;
        self
    }

    /// Assembled samples
    pub fn buffer(&self) -> &EmgBuffer {
        &self.buffer
    }

    /// Ground-truth log of the run
    pub fn ground_truth(&self) -> &GroundTruthLog {
        &self.log
    }

    /// Assemble every unit, condition the buffer and write the outputs
    pub fn run(&mut self, sources: &[MotorUnitSource]) -> EmgResult<RunSummary> {
        let started = Instant::now();
        let config = self.config;
        info!(
            units = sources.len(),
            total_samples = self.buffer.len(),
            reference = ?config.electrode.reference,
            "starting EMG assembly"
        );

        let mut units = Vec::with_capacity(sources.len());
        let mut skipped = Vec::new();
        for source in sources {
            if !source.mup_path.exists() {
                debug!(unit = source.unit, path = %source.mup_path.display(), "no MUP file, unit not detected");
                skipped.push(source.unit);
                continue;
            }
            units.push(self.assemble_unit(source)?);
        }

        let noise_std = match config.output.snr_db {
            Some(snr_db) => {
                let mut injector = NoiseInjector::new(config.jitter.seed);
                let std_dev = injector.inject(self.buffer.samples_mut(), snr_db)?;
                info!(snr_db, std_dev, "noise added");
                Some(std_dev)
            }
            None => None,
        };

        if config.output.band_pass {
            let mut filter = ZeroPhaseBandPass::new(
                config.output.band_pass_low_hz,
                config.output.band_pass_high_hz,
                config.output.filter_order,
                config.signal.sample_rate_hz as f32,
            )?;
            filter.apply(self.buffer.samples_mut());
            debug!(
                low_hz = config.output.band_pass_low_hz,
                high_hz = config.output.band_pass_high_hz,
                "band-pass applied"
            );
        }

        self.write_outputs()?;

        let summary = RunSummary {
            units_processed: units.len(),
            units_skipped: skipped,
            firings_overlaid: units.iter().map(|u| u.firings_overlaid).sum(),
            firings_past_end: units.iter().map(|u| u.firings_past_end).sum(),
            ground_truth_records: self.log.len(),
            dropped_records: self.log.dropped(),
            records_outside_run: self.log.outside_run(),
            total_samples: self.buffer.len(),
            noise_std,
            band_pass_applied: config.output.band_pass,
            emg_path: config.emg_path(),
            gst_path: config.gst_path(),
            elapsed_ms: started.elapsed().as_millis() as u64,
            units,
        };

        if config.output.write_summary {
            write_summary(&config.summary_path(), &summary)?;
        }

        info!(
            units = summary.units_processed,
            firings = summary.firings_overlaid,
            records = summary.ground_truth_records,
            dropped = summary.dropped_records,
            elapsed_ms = summary.elapsed_ms,
            "EMG assembly complete"
        );
        Ok(summary)
    }

    fn assemble_unit(&mut self, source: &MotorUnitSource) -> EmgResult<UnitSummary> {
        let config = self.config;
        let firings = FiringTimes::load(&source.firing_path)?;
        let mut mup = Mup::open(source.unit, &source.mup_path, config)?;
        mup.reset_jitter_accounting();

        let total = self.buffer.len() as u64;
        let options = SynthesisOptions::from_config(config, JitterMode::Individual);
        let mut in_window = 0;
        let mut overlaid = 0;
        let mut outside_run = 0;
        let mut aligned = false;

        for firing in firings.iter() {
            let index = firing_time_to_index(firing, config.signal.firing_time_resolution);
            if index >= total {
                break;
            }
            in_window += 1;
            if !mup.calc_jittered_mup(&options, self.jitter.as_mut())? {
                continue;
            }

            let start = index as usize;
            if let Some(waveform) = mup.current_mup() {
                self.buffer.overlay(start, waveform);
            }
            overlaid += 1;

            if let Some(point) = mup.alignment_point() {
                aligned = true;
                let before = self.log.outside_run();
                self.log.push_firing(source.unit, start as f64 + point);
                outside_run += self.log.outside_run() - before;
            }
        }

        let past_end = firings.len() - in_window;
        if past_end > 0 {
            debug!(unit = source.unit, past_end, "firings not overlaid");
        }

        let template_options = options.with_mode(JitterMode::Template);
        let template = if mup.calc_jittered_mup(&template_options, self.jitter.as_mut())? {
            mup.current_mup().map(<[f32]>::to_vec)
        } else {
            None
        };

        let template_path = match (&config.paths.template_dir, &template) {
            (Some(dir), Some(samples)) => Some(write_template(dir, source.unit, samples)?),
            _ => None,
        };

        let jitterable_fibres = mup.jitterable_count();
        mup.unload();

        if !aligned && overlaid > 0 {
            warn!(unit = source.unit, "unit has no alignment fibre, excluded from ground truth");
        }
        info!(
            unit = source.unit,
            firings = firings.len(),
            overlaid,
            jitterable_fibres,
            "motor unit assembled"
        );

        Ok(UnitSummary {
            unit: source.unit,
            firings_total: firings.len(),
            firings_overlaid: overlaid,
            firings_past_end: past_end,
            alignments_outside_run: outside_run,
            aligned,
            jitterable_fibres,
            template_path,
            template,
        })
    }

    fn write_outputs(&self) -> EmgResult<()> {
        let config = self.config;
        let output_dir = &config.paths.output_dir;
        std::fs::create_dir_all(output_dir).io_err(COMPONENT, "create_dir", output_dir)?;

        write_emg_file(&config.emg_path(), self.buffer.samples(), self.buffer.finish_time_s())?;
        self.log
            .write_csv(&config.gst_path(), config.signal.sample_rate_hz, config.output.user_id)?;

        debug!(
            emg = %config.emg_path().display(),
            gst = %config.gst_path().display(),
            "outputs written"
        );
        Ok(())
    }
}

/// Template waveform as a single composite buffer MUP file
fn write_template(dir: &Path, unit: u32, samples: &[f32]) -> EmgResult<PathBuf> {
    std::fs::create_dir_all(dir).io_err(COMPONENT, "create_dir", dir)?;
    let path = dir.join(format!("template{:04}.dat", unit));
    let slots = [Some(FibreBuffer::new(0, samples.to_vec(), 1))];
    write_mup(
        &path,
        MupImage {
            unit_id: unit,
            base_sample_count: samples.len(),
            alignment: None,
            slots: &slots,
            cannula: None,
        },
    )?;
    Ok(path)
}

fn write_summary(path: &Path, summary: &RunSummary) -> EmgResult<()> {
    let json = serde_json::to_string_pretty(summary).map_err(|e| {
        EmgErrorBuilder::new(COMPONENT, "write_summary").invalid_data("run summary", e.to_string())
    })?;
    std::fs::write(path, json).io_err(COMPONENT, "write_summary", path)
}

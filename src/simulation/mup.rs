// src/simulation/mup.rs
//! Motor unit potential: fibre buffers, jittered synthesis and persistence
//!
//! Lifecycle is tracked on two axes. [`BuildState`] follows generation
//! (`Empty -> Building -> Saved`); [`LoadState`] follows persistence
//! (`Unloaded -> HeaderLoaded -> FullyLoaded`). Buffers of a saved MUP are
//! read on first access.

use super::buffer_pool::{FibreBuffer, FibrePool};
use super::jitter::{draw_offset, JitterAccount, JitterMode, JitterSource, SynthesisOptions};
use super::mup_file::{self, MupHeader, MupImage};
use crate::config::{ReferenceSetup, SimulationConfig};
use crate::error::{EmgErrorBuilder, EmgResult, FileFormat};
use crate::processing::time_expand;
use crate::utils::{forward_difference, peak_acceleration};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const COMPONENT: &str = "mup";

/// Construction progress of a MUP
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildState {
    /// No fibre added yet
    Empty,
    /// Fibres added since creation or the last save
    Building,
    /// Backing file matches the buffers
    Saved,
}

/// How much of a saved MUP is in memory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    /// Nothing read; the next access reopens the file
    Unloaded,
    /// Header and offset table only
    HeaderLoaded,
    /// Every buffer resident
    FullyLoaded,
}

/// Where [`Mup::add_mfp`] stored a fibre
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FibreClass {
    /// Summed into the composite buffer in slot 0
    Composite,
    /// Kept time-expanded in its own slot
    Jitterable {
        /// 1-based slot index
        slot: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Alignment {
    slot: usize,
    /// Expanded-rate index of the alignment fibre's steepest step
    offset: i64,
}

/// All fibre contributions of one motor unit
#[derive(Debug)]
pub struct Mup {
    id: u32,
    path: PathBuf,
    base_sample_count: usize,
    expansion_factor: usize,
    acceleration_threshold: f64,
    dt_ms: f64,

    pool: FibrePool,
    alignment: Option<Alignment>,
    header: Option<MupHeader>,

    jitter_offsets: Vec<i64>,
    accounts: Vec<JitterAccount>,

    result: Option<Vec<f32>>,
    slope: Option<Vec<f32>>,
    acceleration: Option<Vec<f32>>,
    alignment_point: Option<f64>,

    build_state: BuildState,
    load_state: LoadState,
}

impl Mup {
    /// Empty in-memory MUP backed by `path` once saved
    pub fn new(id: u32, path: impl Into<PathBuf>, config: &SimulationConfig) -> Self {
        Self {
            id,
            path: path.into(),
            base_sample_count: config.signal.mup_sample_count,
            expansion_factor: config.mup.expansion_factor.max(1),
            acceleration_threshold: config.mup.acceleration_threshold as f64,
            dt_ms: config.signal.sample_interval_ms(),
            pool: FibrePool::new(),
            alignment: None,
            header: None,
            jitter_offsets: Vec::new(),
            accounts: Vec::new(),
            result: None,
            slope: None,
            acceleration: None,
            alignment_point: None,
            build_state: BuildState::Empty,
            load_state: LoadState::FullyLoaded,
        }
    }

    /// Open a saved MUP, reading only its header
    pub fn open(id: u32, path: impl Into<PathBuf>, config: &SimulationConfig) -> EmgResult<Self> {
        let mut mup = Self::new(id, path, config);
        mup.load()?;
        Ok(mup)
    }

    /// Motor unit number
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Samples per synthesized MUP
    pub fn base_sample_count(&self) -> usize {
        self.base_sample_count
    }

    /// Time expansion of the jitterable buffers
    pub fn expansion_factor(&self) -> usize {
        self.expansion_factor
    }

    /// Construction progress
    pub fn build_state(&self) -> BuildState {
        self.build_state
    }

    /// Residency of the saved buffers
    pub fn load_state(&self) -> LoadState {
        self.load_state
    }

    /// Alignment slot and its expanded-rate offset
    pub fn alignment(&self) -> Option<(usize, i64)> {
        self.alignment.map(|a| (a.slot, a.offset))
    }

    /// Number of buffer slots, composite included
    pub fn n_mfps(&self) -> usize {
        match (&self.header, self.load_state) {
            (Some(header), LoadState::HeaderLoaded) => header.buffer_count,
            _ => self.pool.len(),
        }
    }

    /// Number of jitterable buffers; answered from the header when possible
    pub fn jitterable_count(&self) -> usize {
        match (&self.header, self.load_state) {
            (Some(header), LoadState::HeaderLoaded) => {
                header.buffer_offsets.iter().skip(1).filter(|&&o| o != 0).count()
            }
            _ => self.pool.jitterable_count(),
        }
    }

    /// Jitter offsets (expanded units) used by the last synthesis, per slot
    pub fn jitter_offsets(&self) -> &[i64] {
        &self.jitter_offsets
    }

    /// Add one fibre potential sampled at the base rate
    pub fn add_mfp(&mut self, samples: &[f32], fibre_id: i32) -> EmgResult<FibreClass> {
        self.ensure_loaded()?;
        self.check_length(samples, "add_mfp")?;

        let acceleration = peak_acceleration(samples, self.dt_ms);
        let class = if acceleration < self.acceleration_threshold {
            self.pool.add_to_composite(samples)?;
            FibreClass::Composite
        } else {
            let expanded = time_expand(samples, self.expansion_factor)?;
            let buffer = FibreBuffer::new(fibre_id, expanded, self.expansion_factor);
            let steepest = buffer.max_slope_index();
            let slot = self.pool.push_jitterable(buffer);

            if let Some(index) = steepest {
                // every jitterable buffer shares the factor, so expanded
                // offsets order the same way as base-rate times
                let offset = index as i64;
                if self.alignment.map_or(true, |a| offset < a.offset) {
                    self.alignment = Some(Alignment { slot, offset });
                }
            }
            FibreClass::Jitterable { slot }
        };

        debug!(unit = self.id, fibre = fibre_id, acceleration, class = ?class, "fibre added");
        self.accounts.resize(self.pool.len(), JitterAccount::default());
        self.build_state = BuildState::Building;
        self.invalidate_result();
        Ok(class)
    }

    /// Accumulate a cannula pickup; never jittered
    pub fn add_cannula_mfp(&mut self, samples: &[f32]) -> EmgResult<()> {
        self.ensure_loaded()?;
        self.check_length(samples, "add_cannula_mfp")?;
        self.pool.add_to_cannula(samples)?;
        self.build_state = BuildState::Building;
        self.invalidate_result();
        Ok(())
    }

    /// Synthesize one jittered MUP; `false` when nothing contributes
    pub fn calc_jittered_mup(
        &mut self,
        options: &SynthesisOptions,
        source: &mut dyn JitterSource,
    ) -> EmgResult<bool> {
        self.ensure_loaded()?;
        self.invalidate_result();

        let use_tip = options.reference.uses_tip() && self.pool.has_tip_data();
        let use_cannula = options.reference.uses_cannula() && self.pool.cannula().is_some();
        if !use_tip && !use_cannula {
            return Ok(false);
        }

        self.jitter_offsets.clear();
        self.jitter_offsets.resize(self.pool.len(), 0);
        self.accounts.resize(self.pool.len(), JitterAccount::default());

        if options.do_jitter {
            for (slot, buffer) in self.pool.jitterable() {
                self.jitter_offsets[slot] = match options.mode {
                    JitterMode::Individual => {
                        let offset = draw_offset(source, options.jitter_variance_samples, buffer.expansion_factor());
                        self.accounts[slot].record(offset);
                        offset
                    }
                    JitterMode::Template => self.accounts[slot].mean_offset(),
                };
            }
        }

        let (fixup, alignment_point) = match self.alignment {
            Some(a) => {
                let factor = self.pool.get(a.slot).map_or(self.expansion_factor, FibreBuffer::expansion_factor) as i64;
                let shifted = a.offset + self.jitter_offsets[a.slot];
                (shifted.rem_euclid(factor), Some(shifted as f64 / factor as f64))
            }
            None => (0, None),
        };

        let mut result = vec![0.0f32; self.base_sample_count];

        if use_tip {
            if let Some(composite) = self.pool.composite() {
                for (out, &s) in result.iter_mut().zip(composite.samples()) {
                    *out += s;
                }
            }

            for (slot, buffer) in self.pool.jitterable() {
                let factor = buffer.expansion_factor() as i64;
                let shift = fixup - self.jitter_offsets[slot];
                let samples = buffer.samples();
                let len = samples.len() as i64;
                for (i, out) in result.iter_mut().enumerate() {
                    let src = i as i64 * factor + shift;
                    if (0..len).contains(&src) {
                        *out += samples[src as usize];
                    }
                }
            }
        }

        if use_cannula {
            let sign = match options.reference {
                ReferenceSetup::TipMinusCannula => -1.0,
                _ => 1.0,
            };
            if let Some(cannula) = self.pool.cannula() {
                for (out, &s) in result.iter_mut().zip(cannula.samples()) {
                    *out += sign * s;
                }
            }
        }

        self.result = Some(result);
        self.alignment_point = alignment_point;
        Ok(true)
    }

    /// Last synthesized waveform
    pub fn current_mup(&self) -> Option<&[f32]> {
        self.result.as_deref()
    }

    /// Base-rate index of the alignment fibre's steepest step in the last
    /// synthesis; `None` for composite-only MUPs
    pub fn alignment_point(&self) -> Option<f64> {
        self.alignment_point
    }

    /// First derivative of the last synthesis (per ms)
    pub fn current_slope(&mut self) -> Option<&[f32]> {
        if self.slope.is_none() {
            let result = self.result.as_ref()?;
            self.slope = Some(forward_difference(result, self.dt_ms));
        }
        self.slope.as_deref()
    }

    /// Second derivative of the last synthesis (per ms^2)
    pub fn current_acceleration(&mut self) -> Option<&[f32]> {
        if self.acceleration.is_none() {
            self.current_slope()?;
            let slope = self.slope.as_ref()?;
            self.acceleration = Some(forward_difference(slope, self.dt_ms));
        }
        self.acceleration.as_deref()
    }

    /// Zero the running jitter sums; once per unit before its firing loop
    pub fn reset_jitter_accounting(&mut self) {
        self.accounts.iter_mut().for_each(JitterAccount::reset);
    }

    /// Buffer in `index`, loading the file on first access
    pub fn mfp(&mut self, index: usize) -> EmgResult<Option<&FibreBuffer>> {
        self.ensure_loaded()?;
        Ok(self.pool.get(index))
    }

    /// Cannula buffer, loading the file when needed
    pub fn cannula(&mut self) -> EmgResult<Option<&FibreBuffer>> {
        self.ensure_loaded()?;
        Ok(self.pool.cannula())
    }

    /// Write full buffers and header to the backing file
    pub fn save(&mut self) -> EmgResult<()> {
        self.ensure_loaded()?;
        self.pool.check_invariants(self.base_sample_count)?;

        mup_file::write_mup(
            &self.path,
            MupImage {
                unit_id: self.id,
                base_sample_count: self.base_sample_count,
                alignment: self.alignment(),
                slots: self.pool.slots(),
                cannula: self.pool.cannula(),
            },
        )?;

        self.build_state = BuildState::Saved;
        self.header = None;
        debug!(unit = self.id, slots = self.pool.len(), "MUP saved");
        Ok(())
    }

    /// Read the header of the backing file, dropping in-memory buffers
    pub fn load(&mut self) -> EmgResult<()> {
        let header = mup_file::read_header(&self.path)?;
        if header.unit_id != self.id {
            warn!(expected = self.id, found = header.unit_id, path = %self.path.display(), "MUP file unit id differs");
        }

        self.pool.clear();
        self.invalidate_result();
        self.base_sample_count = header.base_sample_count;
        self.alignment = match (header.alignment_index, header.alignment_offset) {
            (Some(slot), Some(offset)) => Some(Alignment { slot, offset }),
            _ => None,
        };
        self.header = Some(header);
        self.build_state = BuildState::Saved;
        self.load_state = LoadState::HeaderLoaded;
        Ok(())
    }

    /// Free every buffer and cached vector
    pub fn unload(&mut self) {
        if self.build_state == BuildState::Building {
            warn!(unit = self.id, "unloading a MUP with unsaved fibres");
            self.build_state = BuildState::Empty;
        }
        self.pool = FibrePool::new();
        self.header = None;
        self.jitter_offsets = Vec::new();
        self.accounts = Vec::new();
        self.result = None;
        self.slope = None;
        self.acceleration = None;
        self.alignment_point = None;
        if self.build_state == BuildState::Empty {
            self.alignment = None;
        }
        self.load_state = LoadState::Unloaded;
    }

    fn ensure_loaded(&mut self) -> EmgResult<()> {
        match self.load_state {
            LoadState::FullyLoaded => Ok(()),
            LoadState::HeaderLoaded => self.load_buffers(),
            LoadState::Unloaded if self.build_state == BuildState::Saved => {
                self.load()?;
                self.load_buffers()
            }
            LoadState::Unloaded => {
                self.load_state = LoadState::FullyLoaded;
                Ok(())
            }
        }
    }

    fn load_buffers(&mut self) -> EmgResult<()> {
        let header = match self.header.take() {
            Some(header) => header,
            None => mup_file::read_header(&self.path)?,
        };
        let loaded = mup_file::read_buffers(&self.path, &header)?;
        let pool = FibrePool::from_parts(loaded.slots, loaded.cannula);

        let factors: Vec<usize> = pool.jitterable().map(|(_, b)| b.expansion_factor()).collect();
        if let Some(&first) = factors.first() {
            if factors.iter().any(|&f| f != first) {
                return Err(self.format_error("load_buffers", "jitterable buffers disagree on expansion factor"));
            }
            self.expansion_factor = first;
        }

        pool.check_invariants(header.base_sample_count)
            .map_err(|e| self.format_error("load_buffers", e.to_string()))?;

        if let Some(a) = self.alignment {
            let valid = pool.get(a.slot).map_or(false, |b| (a.offset as usize) < b.sample_count());
            if !valid {
                return Err(self.format_error(
                    "load_buffers",
                    format!("alignment slot {} offset {} has no buffer sample", a.slot, a.offset),
                ));
            }
        }

        debug!(
            unit = self.id,
            slots = pool.len(),
            jitterable = pool.jitterable_count(),
            skipped_extensions = header.skipped_extensions.len(),
            "MUP buffers loaded"
        );
        self.pool = pool;
        self.accounts.resize(self.pool.len(), JitterAccount::default());
        self.header = Some(header);
        self.load_state = LoadState::FullyLoaded;
        Ok(())
    }

    fn check_length(&self, samples: &[f32], operation: &str) -> EmgResult<()> {
        if samples.len() == self.base_sample_count {
            Ok(())
        } else {
            Err(EmgErrorBuilder::new(COMPONENT, operation).invalid_data(
                "fibre waveform",
                format!("{} samples, MUP base is {}", samples.len(), self.base_sample_count),
            ))
        }
    }

    fn format_error(&self, operation: &str, reason: impl Into<String>) -> crate::error::EmgError {
        EmgErrorBuilder::new(COMPONENT, operation).format(FileFormat::MupFile, &self.path, reason)
    }

    fn invalidate_result(&mut self) {
        self.result = None;
        self.slope = None;
        self.acceleration = None;
        self.alignment_point = None;
    }
}

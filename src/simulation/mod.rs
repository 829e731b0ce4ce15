// src/simulation/mod.rs
//! Fibre potentials and motor unit potentials

pub mod buffer_pool;
pub mod fibre_potential;
pub mod jitter;
pub mod mup;
pub mod mup_file;

pub use buffer_pool::{FibreBuffer, FibrePool};
pub use fibre_potential::{
    Electrode, Fibre, FibreContact, FibreExtent, FibrePotentialGenerator, ShaftSpan, WeightingFunction,
};
pub use jitter::{GaussianJitter, JitterMode, JitterSource, ScriptedJitter, SynthesisOptions};
pub use mup::{BuildState, FibreClass, LoadState, Mup};

use crate::config::ElectrodeSettings;
use crate::error::EmgResult;
use tracing::info;

/// One fibre of a motor unit together with its electrode geometry
#[derive(Debug, Clone, Copy)]
pub struct FibrePlacement {
    /// Fibre physics
    pub fibre: Fibre,
    /// Tip position relative to the fibre
    pub contact: FibreContact,
    /// Shaft geometry when a cannula pickup is recorded
    pub shaft: Option<ShaftSpan>,
}

/// Generates every fibre of a unit into a [`Mup`]; the first failure aborts
/// the build
pub struct MotorUnitBuilder<'a> {
    generator: &'a mut FibrePotentialGenerator,
    electrode: &'a ElectrodeSettings,
}

impl<'a> MotorUnitBuilder<'a> {
    /// Builder drawing on `generator` with the tip of `electrode`
    pub fn new(generator: &'a mut FibrePotentialGenerator, electrode: &'a ElectrodeSettings) -> Self {
        Self { generator, electrode }
    }

    /// Add all placements and save the MUP; returns the jitterable count
    pub fn build(&mut self, mup: &mut Mup, placements: &[FibrePlacement]) -> EmgResult<usize> {
        let mut jitterable = 0;
        for placement in placements {
            let tip = Electrode::tip(self.electrode, &placement.contact);
            let waveform = self.generator.generate(&placement.fibre, &tip)?;
            if let FibreClass::Jitterable { .. } = mup.add_mfp(&waveform, placement.fibre.id)? {
                jitterable += 1;
            }

            if let Some(shaft) = &placement.shaft {
                let waveform = self.generator.generate(&placement.fibre, &Electrode::cannula(shaft))?;
                mup.add_cannula_mfp(&waveform)?;
            }
        }
        mup.save()?;

        info!(
            unit = mup.id(),
            fibres = placements.len(),
            jitterable,
            path = %mup.path().display(),
            "motor unit built"
        );
        Ok(jitterable)
    }
}

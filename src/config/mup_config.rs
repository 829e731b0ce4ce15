// src/config/mup_config.rs
//! Fibre-potential, MUP assembly and jitter configuration structures

use crate::config::constants::{generator, jitter, mup};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Single-fibre generator configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GeneratorSettings {
    /// Axial over radial conductivity
    #[serde(default = "defaults::anisotropy_ratio")]
    pub anisotropy_ratio: f64,

    /// Amplitude scale of the transmembrane current
    #[serde(default = "defaults::current_scale")]
    pub current_scale: f64,

    /// Share of the window before the end-plate crossing
    #[serde(default = "defaults::lead_in_fraction")]
    pub lead_in_fraction: f64,

    /// Model initiation at the end-plate and extinction at the fibre ends
    #[serde(default)]
    pub with_initiation: bool,

    /// One peak-to-peak line is appended per generated waveform when set
    #[serde(default)]
    pub peak_to_peak_log: Option<PathBuf>,
}

/// MUP assembly configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct MupSettings {
    /// Time expansion of jitterable buffers
    #[serde(default = "defaults::expansion_factor")]
    pub expansion_factor: usize,

    /// Peak acceleration (kV/s^2) above which a fibre is kept jitterable
    #[serde(default = "defaults::acceleration_threshold")]
    pub acceleration_threshold: f32,
}

/// Jitter configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct JitterSettings {
    /// Jitter firings; off gives identical MUPs per firing
    #[serde(default = "defaults::jitter_enabled")]
    pub enabled: bool,

    /// Jitter variance in base-rate samples
    #[serde(default = "defaults::variance_samples")]
    pub variance_samples: f64,

    /// Seed of the jitter stream; entropy when absent
    #[serde(default)]
    pub seed: Option<u64>,
}

/// Recording electrode configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ElectrodeSettings {
    /// Electrode family
    #[serde(default = "defaults::electrode_kind")]
    pub kind: ElectrodeKind,

    /// Recording reference
    #[serde(default = "defaults::reference")]
    pub reference: ReferenceSetup,

    /// Axial length of a concentric core or monopolar tip
    #[serde(default)]
    pub core_length_mm: Option<f64>,

    /// Distance between bipolar contacts
    #[serde(default = "defaults::bipolar_separation_mm")]
    pub bipolar_separation_mm: f64,
}

impl ElectrodeSettings {
    /// Core length, falling back to the default of the electrode kind
    pub fn effective_core_length_mm(&self) -> f64 {
        self.core_length_mm.unwrap_or(match self.kind {
            ElectrodeKind::Monopolar => generator::DEFAULT_MONOPOLAR_TIP_LENGTH_MM,
            _ => generator::DEFAULT_CONCENTRIC_CORE_LENGTH_MM,
        })
    }
}

/// Electrode families the generator has a weighting model for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElectrodeKind {
    /// Point contact
    SingleFibre,
    /// Core averaged over its axial length
    Concentric,
    /// Exposed tip averaged over its length
    Monopolar,
    /// Difference of two point contacts
    Bipolar,
}

/// Which pickups contribute to the recorded signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceSetup {
    /// Tip contributions only
    TipOnly,
    /// Cannula shaft contribution only
    CannulaOnly,
    /// Tip minus cannula, a concentric needle referenced to its shaft
    TipMinusCannula,
}

impl ReferenceSetup {
    /// Tip buffers are summed
    pub fn uses_tip(self) -> bool {
        !matches!(self, ReferenceSetup::CannulaOnly)
    }

    /// The cannula buffer is summed
    pub fn uses_cannula(self) -> bool {
        !matches!(self, ReferenceSetup::TipOnly)
    }
}

mod defaults {
    use super::{generator, jitter, mup, ElectrodeKind, ReferenceSetup};

    pub fn anisotropy_ratio() -> f64 { generator::DEFAULT_ANISOTROPY_RATIO }
    pub fn current_scale() -> f64 { generator::DEFAULT_CURRENT_SCALE }
    pub fn lead_in_fraction() -> f64 { generator::DEFAULT_LEAD_IN_FRACTION }

    pub fn expansion_factor() -> usize { mup::DEFAULT_EXPANSION_FACTOR }
    pub fn acceleration_threshold() -> f32 { mup::DEFAULT_ACCELERATION_THRESHOLD }

    pub fn jitter_enabled() -> bool { true }
    pub fn variance_samples() -> f64 { jitter::DEFAULT_JITTER_VARIANCE_SAMPLES }

    pub fn electrode_kind() -> ElectrodeKind { ElectrodeKind::Concentric }
    pub fn reference() -> ReferenceSetup { ReferenceSetup::TipOnly }
    pub fn bipolar_separation_mm() -> f64 { generator::DEFAULT_BIPOLAR_SEPARATION_MM }
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            anisotropy_ratio: defaults::anisotropy_ratio(),
            current_scale: defaults::current_scale(),
            lead_in_fraction: defaults::lead_in_fraction(),
            with_initiation: false,
            peak_to_peak_log: None,
        }
    }
}

impl Default for MupSettings {
    fn default() -> Self {
        Self {
            expansion_factor: defaults::expansion_factor(),
            acceleration_threshold: defaults::acceleration_threshold(),
        }
    }
}

impl Default for JitterSettings {
    fn default() -> Self {
        Self {
            enabled: defaults::jitter_enabled(),
            variance_samples: defaults::variance_samples(),
            seed: None,
        }
    }
}

impl Default for ElectrodeSettings {
    fn default() -> Self {
        Self {
            kind: defaults::electrode_kind(),
            reference: defaults::reference(),
            core_length_mm: None,
            bipolar_separation_mm: defaults::bipolar_separation_mm(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_paths() {
        assert!(ReferenceSetup::TipOnly.uses_tip());
        assert!(!ReferenceSetup::TipOnly.uses_cannula());
        assert!(!ReferenceSetup::CannulaOnly.uses_tip());
        assert!(ReferenceSetup::TipMinusCannula.uses_tip());
        assert!(ReferenceSetup::TipMinusCannula.uses_cannula());
    }

    #[test]
    fn test_core_length_defaults_per_kind() {
        let mut settings = ElectrodeSettings::default();
        assert_eq!(settings.effective_core_length_mm(), generator::DEFAULT_CONCENTRIC_CORE_LENGTH_MM);

        settings.kind = ElectrodeKind::Monopolar;
        assert_eq!(settings.effective_core_length_mm(), generator::DEFAULT_MONOPOLAR_TIP_LENGTH_MM);

        settings.core_length_mm = Some(1.0);
        assert_eq!(settings.effective_core_length_mm(), 1.0);
    }

    #[test]
    fn test_reference_serde_names() {
        #[derive(Deserialize)]
        struct Wrapper {
            reference: ReferenceSetup,
            kind: ElectrodeKind,
        }

        let parsed: Wrapper =
            toml::from_str("reference = \"tip_minus_cannula\"\nkind = \"single_fibre\"").unwrap();
        assert_eq!(parsed.reference, ReferenceSetup::TipMinusCannula);
        assert_eq!(parsed.kind, ElectrodeKind::SingleFibre);
    }
}

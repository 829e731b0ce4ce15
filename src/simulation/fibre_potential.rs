// src/simulation/fibre_potential.rs
//! Single-fibre action potential generator
//!
//! A fibre potential is the spatial convolution of the transmembrane current
//! template with the electrode weighting function, sampled at
//! `dz = velocity * dt`:
//!
//! ```text
//! i(z) = -k z (1.5 - 3z + z^2) e^(-2z),   k = current_scale * d^2
//! ```
//!
//! Axial positions are millimetres from the end-plate, positive in the
//! direction of the electrode's recording surface. The first and last
//! [`EDGE_RAMP_SAMPLES`](crate::config::constants::generator::EDGE_RAMP_SAMPLES)
//! samples of every waveform are ramped to zero.

use crate::config::constants::generator::{CONCENTRIC_CORE_POINTS, CURRENT_SPAN_MM, EDGE_RAMP_SAMPLES};
use crate::config::{ElectrodeKind, ElectrodeSettings, SimulationConfig};
use crate::error::{EmgErrorBuilder, EmgResult, IoResultExt, ProcessingStage};
use crate::processing::FftConvolver;
use crate::utils::{conduction_velocity, peak_to_peak, validate_finite_samples};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

const COMPONENT: &str = "fibre_potential";

/// Potential seen by a recording surface from a unit point source
pub trait WeightingFunction {
    /// Weight of a source at axial position `z_mm`; `anisotropy` is the
    /// axial/radial conductivity ratio
    fn weight(&self, z_mm: f64, anisotropy: f64) -> f64;
}

/// Point recording surface
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointPickup {
    /// Axial position from the end-plate
    pub axial_mm: f64,
    /// Radial distance to the fibre
    pub radial_mm: f64,
}

impl WeightingFunction for PointPickup {
    fn weight(&self, z_mm: f64, anisotropy: f64) -> f64 {
        let dz = z_mm - self.axial_mm;
        1.0 / (anisotropy * self.radial_mm * self.radial_mm + dz * dz).sqrt()
    }
}

/// Concentric core or monopolar tip: chord-weighted average of point
/// pickups spread over `length_mm` around the centre
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoreIntegral {
    /// Middle of the surface
    pub centre: PointPickup,
    /// Axial extent of the surface
    pub length_mm: f64,
}

impl WeightingFunction for CoreIntegral {
    fn weight(&self, z_mm: f64, anisotropy: f64) -> f64 {
        let n = CONCENTRIC_CORE_POINTS;
        let mut total = 0.0;
        let mut norm = 0.0;
        for j in 0..n {
            let u = -1.0 + (2 * j + 1) as f64 / n as f64;
            let chord = (1.0 - u * u).sqrt();
            let point = PointPickup {
                axial_mm: self.centre.axial_mm + 0.5 * u * self.length_mm,
                radial_mm: self.centre.radial_mm,
            };
            total += chord * point.weight(z_mm, anisotropy);
            norm += chord;
        }
        total / norm
    }
}

/// Two point surfaces `separation_mm` apart along the fibre
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BipolarPair {
    /// Surface nearer the end-plate
    pub leading: PointPickup,
    /// Axial offset of the trailing surface
    pub separation_mm: f64,
}

impl WeightingFunction for BipolarPair {
    fn weight(&self, z_mm: f64, anisotropy: f64) -> f64 {
        let trailing = PointPickup {
            axial_mm: self.leading.axial_mm + self.separation_mm,
            ..self.leading
        };
        self.leading.weight(z_mm, anisotropy) - trailing.weight(z_mm, anisotropy)
    }
}

/// Cannula shaft between `start_mm` and `end_mm`, integrated in closed form
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShaftIntegral {
    /// Radial distance of the shaft
    pub radial_mm: f64,
    /// Shaft start, axial
    pub start_mm: f64,
    /// Shaft end, axial
    pub end_mm: f64,
}

impl WeightingFunction for ShaftIntegral {
    fn weight(&self, z_mm: f64, anisotropy: f64) -> f64 {
        let rho = anisotropy.sqrt() * self.radial_mm;
        let span = self.end_mm - self.start_mm;
        if span.abs() < f64::EPSILON {
            return 1.0 / (rho * rho + (z_mm - self.start_mm).powi(2)).sqrt();
        }
        (((z_mm - self.start_mm) / rho).asinh() - ((z_mm - self.end_mm) / rho).asinh()) / span
    }
}

/// Recording electrode model, chosen once per fibre
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Electrode {
    /// Single-fibre needle side port
    SingleFibre(PointPickup),
    /// Concentric core or monopolar tip
    Concentric(CoreIntegral),
    /// Bipolar pair
    Bipolar(BipolarPair),
    /// Cannula shaft
    Cannula(ShaftIntegral),
}

/// Electrode position relative to one fibre, supplied by the geometry layer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FibreContact {
    /// Radial distance from the fibre axis
    pub radial_distance_mm: f64,
    /// Axial distance from the end-plate to the recording surface
    pub axial_position_mm: f64,
}

/// Cannula shaft relative to one fibre
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShaftSpan {
    /// Radial distance from the fibre axis
    pub radial_distance_mm: f64,
    /// Axial start of the exposed shaft
    pub start_mm: f64,
    /// Axial end of the exposed shaft
    pub end_mm: f64,
}

impl Electrode {
    /// Tip pickup of the configured electrode kind
    pub fn tip(settings: &ElectrodeSettings, contact: &FibreContact) -> Self {
        let point = PointPickup {
            axial_mm: contact.axial_position_mm,
            radial_mm: contact.radial_distance_mm,
        };
        match settings.kind {
            ElectrodeKind::SingleFibre => Electrode::SingleFibre(point),
            ElectrodeKind::Concentric | ElectrodeKind::Monopolar => Electrode::Concentric(CoreIntegral {
                centre: point,
                length_mm: settings.effective_core_length_mm(),
            }),
            ElectrodeKind::Bipolar => Electrode::Bipolar(BipolarPair {
                leading: point,
                separation_mm: settings.bipolar_separation_mm,
            }),
        }
    }

    /// Shaft pickup
    pub fn cannula(shaft: &ShaftSpan) -> Self {
        Electrode::Cannula(ShaftIntegral {
            radial_mm: shaft.radial_distance_mm,
            start_mm: shaft.start_mm,
            end_mm: shaft.end_mm,
        })
    }

    /// Radial distance of the recording surface
    pub fn radial_distance_mm(&self) -> f64 {
        match self {
            Electrode::SingleFibre(p) => p.radial_mm,
            Electrode::Concentric(c) => c.centre.radial_mm,
            Electrode::Bipolar(b) => b.leading.radial_mm,
            Electrode::Cannula(s) => s.radial_mm,
        }
    }

    /// Copy with the radial distance raised to at least `min_mm`
    pub fn with_min_radial(mut self, min_mm: f64) -> Self {
        let radial = match &mut self {
            Electrode::SingleFibre(p) => &mut p.radial_mm,
            Electrode::Concentric(c) => &mut c.centre.radial_mm,
            Electrode::Bipolar(b) => &mut b.leading.radial_mm,
            Electrode::Cannula(s) => &mut s.radial_mm,
        };
        *radial = radial.max(min_mm);
        self
    }
}

impl WeightingFunction for Electrode {
    fn weight(&self, z_mm: f64, anisotropy: f64) -> f64 {
        match self {
            Electrode::SingleFibre(p) => p.weight(z_mm, anisotropy),
            Electrode::Concentric(c) => c.weight(z_mm, anisotropy),
            Electrode::Bipolar(b) => b.weight(z_mm, anisotropy),
            Electrode::Cannula(s) => s.weight(z_mm, anisotropy),
        }
    }
}

/// Fibre length and end-plate position, measured from one fibre end
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FibreExtent {
    /// Total fibre length
    pub length_mm: f64,
    /// End-plate position
    pub end_plate_mm: f64,
}

/// One muscle fibre
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fibre {
    /// Fibre id stored with its buffer
    pub id: i32,
    /// Fibre diameter; sets the conduction velocity
    pub diameter_mm: f64,
    /// Required by the with-initiation variant
    pub extent: Option<FibreExtent>,
}

/// Appends one peak-to-peak line per generated waveform
#[derive(Debug, Clone)]
pub struct PeakToPeakLog {
    path: PathBuf,
}

impl PeakToPeakLog {
    /// Log appending to `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Log file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one value, creating the file on first use
    pub fn append(&self, value: f32) -> EmgResult<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .io_err(COMPONENT, "open_peak_log", &self.path)?;
        writeln!(file, "{:.6}", value).io_err(COMPONENT, "append_peak_log", &self.path)
    }
}

/// Work buffers reused across fibres
#[derive(Debug, Default)]
struct ScratchPool {
    current: Vec<f64>,
    weighting: Vec<f64>,
    convolved: Vec<f64>,
    mirrored: Vec<f64>,
    mirrored_convolved: Vec<f64>,
}

impl ScratchPool {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            current: Vec::with_capacity(capacity),
            weighting: Vec::with_capacity(capacity),
            convolved: Vec::with_capacity(2 * capacity),
            mirrored: Vec::with_capacity(capacity),
            mirrored_convolved: Vec::with_capacity(2 * capacity),
        }
    }

    fn reset(&mut self) {
        self.current.clear();
        self.weighting.clear();
        self.convolved.clear();
        self.mirrored.clear();
        self.mirrored_convolved.clear();
    }
}

/// Generates fibre potentials of a fixed length at the base sample rate
pub struct FibrePotentialGenerator {
    sample_count: usize,
    dt_ms: f64,
    anisotropy: f64,
    current_scale: f64,
    lead_in: usize,
    with_initiation: bool,
    scratch: ScratchPool,
    convolver: FftConvolver,
    peak_log: Option<PeakToPeakLog>,
    generated: u64,
}

impl FibrePotentialGenerator {
    /// Generator for the configured window; fails when the window cannot hold both edge ramps
    pub fn new(config: &SimulationConfig) -> EmgResult<Self> {
        let sample_count = config.signal.mup_sample_count;
        if sample_count <= 2 * (EDGE_RAMP_SAMPLES + 1) {
            return Err(EmgErrorBuilder::new(COMPONENT, "new").configuration(format!(
                "{} samples cannot hold both {}-sample edge ramps",
                sample_count, EDGE_RAMP_SAMPLES
            )));
        }
        let settings = &config.generator;
        if !(settings.anisotropy_ratio > 0.0) || !(settings.current_scale.is_finite()) {
            return Err(EmgErrorBuilder::new(COMPONENT, "new")
                .configuration("anisotropy ratio must be positive and current scale finite"));
        }

        let dt_ms = config.signal.sample_interval_ms();
        // template length is largest for the slowest fibre
        let template_capacity = (CURRENT_SPAN_MM / (dt_ms * conduction_velocity(0.0))).ceil() as usize;

        Ok(Self {
            sample_count,
            dt_ms,
            anisotropy: settings.anisotropy_ratio,
            current_scale: settings.current_scale,
            lead_in: (settings.lead_in_fraction * sample_count as f64).round() as usize,
            with_initiation: settings.with_initiation,
            scratch: ScratchPool::with_capacity(sample_count + template_capacity),
            convolver: FftConvolver::new(),
            peak_log: settings.peak_to_peak_log.clone().map(PeakToPeakLog::new),
            generated: 0,
        })
    }

    /// Output length in samples
    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    /// Sample interval in ms
    pub fn sample_interval_ms(&self) -> f64 {
        self.dt_ms
    }

    /// Waveforms generated so far
    pub fn generated(&self) -> u64 {
        self.generated
    }

    /// Generate one fibre potential with the configured variant
    pub fn generate(&mut self, fibre: &Fibre, electrode: &Electrode) -> EmgResult<Vec<f32>> {
        if !(fibre.diameter_mm > 0.0) || !fibre.diameter_mm.is_finite() {
            return Err(EmgErrorBuilder::new(COMPONENT, "generate").invalid_data(
                "fibre diameter",
                format!("fibre {} has diameter {} mm", fibre.id, fibre.diameter_mm),
            ));
        }
        let velocity = conduction_velocity(fibre.diameter_mm);
        if !(velocity > 0.0) {
            return Err(EmgErrorBuilder::new(COMPONENT, "generate").processing(
                ProcessingStage::FibrePotential,
                format!("fibre {} has non-positive conduction velocity {}", fibre.id, velocity),
            ));
        }

        let electrode = electrode.with_min_radial(0.5 * fibre.diameter_mm);
        let dz = velocity * self.dt_ms;

        self.scratch.reset();
        self.fill_current_template(fibre.diameter_mm, dz);

        let mut waveform = if self.with_initiation {
            let extent = fibre.extent.ok_or_else(|| {
                EmgErrorBuilder::new(COMPONENT, "generate").invalid_data(
                    "fibre extent",
                    format!("fibre {} lacks length and end-plate for initiation", fibre.id),
                )
            })?;
            self.with_initiation_variant(&extent, &electrode, dz, velocity)?
        } else {
            self.propagating_variant(&electrode, dz)?
        };

        apply_edge_ramp(&mut waveform);

        validate_finite_samples(&waveform, COMPONENT).map_err(|e| {
            EmgErrorBuilder::new(COMPONENT, "generate").processing(ProcessingStage::FibrePotential, e.to_string())
        })?;

        self.generated += 1;
        debug!(
            fibre = fibre.id,
            velocity_mm_per_ms = velocity,
            radial_mm = electrode.radial_distance_mm(),
            "fibre potential generated"
        );

        if let Some(log) = &self.peak_log {
            log.append(peak_to_peak(&waveform))?;
        }
        Ok(waveform)
    }

    fn fill_current_template(&mut self, diameter_mm: f64, dz: f64) {
        let k = self.current_scale * diameter_mm * diameter_mm;
        let len = (CURRENT_SPAN_MM / dz).ceil() as usize + 1;
        self.scratch.current.extend((0..len).map(|j| {
            let z = j as f64 * dz;
            -k * z * (1.5 - 3.0 * z + z * z) * (-2.0 * z).exp()
        }));
    }

    /// Infinite fibre; the window opens `lead_in` samples before the
    /// end-plate crossing
    fn propagating_variant(&mut self, electrode: &Electrode, dz: f64) -> EmgResult<Vec<f32>> {
        let n = self.sample_count;
        let m = self.scratch.current.len();
        let z_start = -(self.lead_in as f64) * dz;

        let anisotropy = self.anisotropy;
        self.scratch.weighting.extend(
            (0..n + m - 1).map(|q| electrode.weight(z_start + (q as f64 - (m - 1) as f64) * dz, anisotropy)),
        );

        let scratch = &mut self.scratch;
        scratch.convolved.resize(m + scratch.weighting.len() - 1, 0.0);
        self.convolver
            .convolve_into(&scratch.current, &scratch.weighting, &mut scratch.convolved)?;

        Ok(scratch.convolved[m - 1..m - 1 + n]
            .iter()
            .map(|&c| (c * dz) as f32)
            .collect())
    }

    /// Initiation at the end-plate, one wave toward each fibre end,
    /// extinguished where the fibre ends
    fn with_initiation_variant(
        &mut self,
        extent: &FibreExtent,
        electrode: &Electrode,
        dz: f64,
        velocity: f64,
    ) -> EmgResult<Vec<f32>> {
        if !(extent.length_mm > 0.0) || !(0.0..=extent.length_mm).contains(&extent.end_plate_mm) {
            return Err(EmgErrorBuilder::new(COMPONENT, "with_initiation").invalid_data(
                "fibre extent",
                format!(
                    "end-plate at {} mm outside fibre of {} mm",
                    extent.end_plate_mm, extent.length_mm
                ),
            ));
        }

        let n = self.sample_count;
        let m = self.scratch.current.len();
        let right_len = extent.length_mm - extent.end_plate_mm;
        let left_len = extent.end_plate_mm;
        let right_samples = n.min((right_len / dz).floor() as usize + 1);
        let left_samples = n.min((left_len / dz).floor() as usize + 1);

        let anisotropy = self.anisotropy;
        let scratch = &mut self.scratch;
        scratch
            .weighting
            .extend((0..right_samples).map(|q| electrode.weight(q as f64 * dz, anisotropy)));
        scratch
            .mirrored
            .extend((0..left_samples).map(|q| electrode.weight(-(q as f64) * dz, anisotropy)));

        scratch.convolved.resize(m + right_samples - 1, 0.0);
        self.convolver
            .convolve_into(&scratch.current, &scratch.weighting, &mut scratch.convolved)?;
        scratch.mirrored_convolved.resize(m + left_samples - 1, 0.0);
        self.convolver
            .convolve_into(&scratch.current, &scratch.mirrored, &mut scratch.mirrored_convolved)?;

        let at_end_plate = electrode.weight(0.0, anisotropy);
        let scale = dz / velocity;
        let mut waveform = vec![0.0f32; n];
        for (out, k) in waveform[self.lead_in.min(n)..].iter_mut().zip(0usize..) {
            let right = scratch.convolved.get(k).copied().unwrap_or(0.0);
            let left = scratch.mirrored_convolved.get(k).copied().unwrap_or(0.0);
            // the end-plate source belongs to both waves
            let crossover = scratch.current.get(k).map_or(0.0, |i| i * at_end_plate);
            *out = ((right + left - crossover) * scale) as f32;
        }
        Ok(waveform)
    }
}

/// Ramp both edges linearly to zero, anchored on the sample next to each ramp
pub fn apply_edge_ramp(samples: &mut [f32]) {
    let ramp = EDGE_RAMP_SAMPLES;
    let n = samples.len();
    if n <= 2 * ramp + 1 {
        return;
    }

    let head = samples[ramp];
    for (j, s) in samples[..ramp].iter_mut().enumerate() {
        *s = head * j as f32 / ramp as f32;
    }

    let tail = samples[n - 1 - ramp];
    for j in 0..ramp {
        samples[n - 1 - j] = tail * j as f32 / ramp as f32;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use proptest::prelude::*;

    fn generator(with_initiation: bool) -> FibrePotentialGenerator {
        let mut config = SimulationConfig::default();
        config.generator.with_initiation = with_initiation;
        FibrePotentialGenerator::new(&config).unwrap()
    }

    fn single_fibre(radial_mm: f64, axial_mm: f64) -> Electrode {
        Electrode::SingleFibre(PointPickup { axial_mm, radial_mm })
    }

    fn fibre(id: i32) -> Fibre {
        Fibre {
            id,
            diameter_mm: 0.055,
            extent: Some(FibreExtent {
                length_mm: 60.0,
                end_plate_mm: 30.0,
            }),
        }
    }

    #[test]
    fn test_waveform_length_and_ramps() {
        let mut gen = generator(false);
        let wave = gen.generate(&fibre(1), &single_fibre(0.1, 5.0)).unwrap();
        assert_eq!(wave.len(), gen.sample_count());

        let anchor = wave[EDGE_RAMP_SAMPLES];
        for j in 0..EDGE_RAMP_SAMPLES {
            assert_abs_diff_eq!(wave[j], anchor * j as f32 / EDGE_RAMP_SAMPLES as f32, epsilon = 1e-6);
        }
        assert_eq!(wave[0], 0.0);
        assert_eq!(*wave.last().unwrap(), 0.0);
        assert!(peak_to_peak(&wave) > 0.0);
    }

    #[test]
    fn test_closer_fibre_is_larger() {
        let mut gen = generator(false);
        let near = gen.generate(&fibre(1), &single_fibre(0.05, 5.0)).unwrap();
        let far = gen.generate(&fibre(2), &single_fibre(0.5, 5.0)).unwrap();
        assert!(peak_to_peak(&near) > 2.0 * peak_to_peak(&far));
        assert_eq!(gen.generated(), 2);
    }

    #[test]
    fn test_electrode_kinds_all_generate() {
        let mut gen = generator(false);
        let contact = FibreContact {
            radial_distance_mm: 0.2,
            axial_position_mm: 5.0,
        };
        for kind in [
            ElectrodeKind::SingleFibre,
            ElectrodeKind::Concentric,
            ElectrodeKind::Monopolar,
            ElectrodeKind::Bipolar,
        ] {
            let settings = ElectrodeSettings {
                kind,
                ..ElectrodeSettings::default()
            };
            let wave = gen.generate(&fibre(3), &Electrode::tip(&settings, &contact)).unwrap();
            assert!(peak_to_peak(&wave) > 0.0, "{:?} produced a flat waveform", kind);
        }

        let shaft = ShaftSpan {
            radial_distance_mm: 0.3,
            start_mm: 5.5,
            end_mm: 20.0,
        };
        let wave = gen.generate(&fibre(3), &Electrode::cannula(&shaft)).unwrap();
        assert!(peak_to_peak(&wave) > 0.0);
    }

    #[test]
    fn test_shaft_integral_matches_point_average() {
        let shaft = ShaftIntegral {
            radial_mm: 0.3,
            start_mm: 1.0,
            end_mm: 3.0,
        };
        let steps = 2_000;
        let mean: f64 = (0..steps)
            .map(|s| {
                let axial_mm = 1.0 + 2.0 * (s as f64 + 0.5) / steps as f64;
                PointPickup { axial_mm, radial_mm: 0.3 }.weight(0.5, 5.0)
            })
            .sum::<f64>()
            / steps as f64;
        assert_abs_diff_eq!(shaft.weight(0.5, 5.0), mean, epsilon = 1e-6);
    }

    #[test]
    fn test_radial_distance_clamped_to_fibre_radius() {
        let electrode = single_fibre(0.0, 1.0).with_min_radial(0.0275);
        assert_eq!(electrode.radial_distance_mm(), 0.0275);
        assert!(electrode.weight(1.0, 5.0).is_finite());
    }

    #[test]
    fn test_initiation_variant() {
        let mut gen = generator(true);
        let wave = gen.generate(&fibre(4), &single_fibre(0.1, 5.0)).unwrap();
        assert_eq!(wave.len(), gen.sample_count());
        assert!(peak_to_peak(&wave) > 0.0);

        let mut no_extent = fibre(5);
        no_extent.extent = None;
        assert!(gen.generate(&no_extent, &single_fibre(0.1, 5.0)).is_err());

        let mut bad_extent = fibre(6);
        bad_extent.extent = Some(FibreExtent {
            length_mm: 10.0,
            end_plate_mm: 12.0,
        });
        assert!(gen.generate(&bad_extent, &single_fibre(0.1, 5.0)).is_err());
    }

    #[test]
    fn test_invalid_diameter_rejected() {
        let mut gen = generator(false);
        let mut thin = fibre(7);
        thin.diameter_mm = 0.0;
        assert!(gen.generate(&thin, &single_fibre(0.1, 5.0)).is_err());
    }

    #[test]
    fn test_short_window_rejected() {
        let mut config = SimulationConfig::default();
        config.signal.mup_sample_count = 2 * EDGE_RAMP_SAMPLES;
        assert!(FibrePotentialGenerator::new(&config).is_err());
    }

    #[test]
    fn test_peak_to_peak_log_appends() {
        let dir = tempfile::TempDir::new().unwrap();
        let log_path = dir.path().join("p2p.txt");
        let mut config = SimulationConfig::default();
        config.generator.peak_to_peak_log = Some(log_path.clone());

        let mut gen = FibrePotentialGenerator::new(&config).unwrap();
        let first = gen.generate(&fibre(1), &single_fibre(0.1, 5.0)).unwrap();
        gen.generate(&fibre(2), &single_fibre(0.2, 5.0)).unwrap();

        let text = std::fs::read_to_string(&log_path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], format!("{:.6}", peak_to_peak(&first)));
    }

    proptest! {
        #[test]
        fn prop_edge_ramp_is_linear(values in proptest::collection::vec(-5.0f32..5.0, 120..400)) {
            let mut samples = values.clone();
            apply_edge_ramp(&mut samples);
            let anchor = values[EDGE_RAMP_SAMPLES];
            for j in 0..EDGE_RAMP_SAMPLES {
                prop_assert!((samples[j] - anchor * j as f32 / EDGE_RAMP_SAMPLES as f32).abs() < 1e-5);
            }
            prop_assert_eq!(&samples[EDGE_RAMP_SAMPLES..values.len() - EDGE_RAMP_SAMPLES],
                            &values[EDGE_RAMP_SAMPLES..values.len() - EDGE_RAMP_SAMPLES]);
        }
    }
}

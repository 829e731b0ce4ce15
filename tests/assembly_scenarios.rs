// tests/assembly_scenarios.rs
//! End-to-end assembly runs over temporary MUP and firing-time files

use approx::assert_abs_diff_eq;
use needle_emg::assembly::{read_emg_file, EmgAssemblyDriver, GroundTruthLog, MotorUnitSource};
use needle_emg::config::{ReferenceSetup, SimulationConfig};
use needle_emg::simulation::{
    Fibre, FibreContact, FibrePlacement, FibrePotentialGenerator, MotorUnitBuilder, Mup, ScriptedJitter, ShaftSpan,
};
use std::path::Path;
use tempfile::TempDir;

fn config(dir: &Path) -> SimulationConfig {
    let mut config = SimulationConfig::default();
    config.signal.sample_rate_hz = 10_000;
    config.signal.mup_sample_count = 128;
    config.signal.duration_s = 0.1;
    config.mup.expansion_factor = 4;
    config.mup.acceleration_threshold = 0.0;
    config.output.band_pass = false;
    config.paths.mup_dir = dir.join("mups");
    config.paths.firing_dir = dir.join("firings");
    config.paths.output_dir = dir.join("out");
    std::fs::create_dir_all(&config.paths.mup_dir).unwrap();
    std::fs::create_dir_all(&config.paths.firing_dir).unwrap();
    config
}

fn pulse(len: usize, centre: f32) -> Vec<f32> {
    (0..len)
        .map(|i| {
            let x = (i as f32 - centre) / 3.0;
            -x * (-0.5 * x * x).exp()
        })
        .collect()
}

/// One jitterable fibre per unit; returns the saved alignment offset
fn write_unit(config: &SimulationConfig, unit: u32, firings: &[u64]) -> i64 {
    let mut mup = Mup::new(unit, config.mup_path(unit), config);
    mup.add_mfp(&pulse(config.signal.mup_sample_count, 40.0), unit as i32).unwrap();
    mup.save().unwrap();

    let mut text = format!("{}\n# generated\n", firings.len());
    for t in firings {
        text.push_str(&format!("{}\n", t));
    }
    std::fs::write(config.firing_path(unit), text).unwrap();
    mup.alignment().unwrap().1
}

fn sources(config: &SimulationConfig, units: &[u32]) -> Vec<MotorUnitSource> {
    units.iter().map(|&u| MotorUnitSource::from_config(config, u)).collect()
}

#[test]
fn test_two_units_one_firing_each() {
    let dir = TempDir::new().unwrap();
    let config = config(dir.path());
    let offset_1 = write_unit(&config, 1, &[2_000]);
    let offset_2 = write_unit(&config, 2, &[6_000]);

    let mut driver = EmgAssemblyDriver::new(&config)
        .unwrap()
        .with_jitter_source(Box::new(ScriptedJitter::new(vec![0.0])));
    let summary = driver.run(&sources(&config, &[1, 2])).unwrap();
    assert_eq!(summary.firings_overlaid, 2);

    let emg = read_emg_file(&config.emg_path()).unwrap();
    assert_eq!(emg.samples.len(), 1_000);
    assert_abs_diff_eq!(emg.finish_s, 0.1, epsilon = 1e-6);
    let energy = |range: std::ops::Range<usize>| emg.samples[range].iter().map(|s| s * s).sum::<f32>();
    assert!(energy(230..250) > 0.1);
    assert!(energy(630..650) > 0.1);

    let rows = GroundTruthLog::read_csv(&config.gst_path()).unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].unit, 0);
    assert_eq!(rows[1].unit, 1);
    assert_eq!(rows[2].unit, 2);

    let factor = config.mup.expansion_factor as f64;
    let expected_1 = 200.0 + offset_1 as f64 / factor;
    let expected_2 = 600.0 + offset_2 as f64 / factor;
    assert_abs_diff_eq!(rows[1].time_s, expected_1 / 10_000.0, epsilon = 1e-12);
    assert_abs_diff_eq!(rows[2].time_s, expected_2 / 10_000.0, epsilon = 1e-12);
    assert_eq!(rows[1].byte_offset, 8 + 4 * expected_1.floor() as u64);
}

#[test]
fn test_firing_at_run_end_stops_unit() {
    let dir = TempDir::new().unwrap();
    let config = config(dir.path());
    // 10_000 maps to sample 1_000, the first index past the buffer
    write_unit(&config, 1, &[3_000, 10_000, 4_000]);

    let mut driver = EmgAssemblyDriver::new(&config).unwrap();
    let summary = driver.run(&sources(&config, &[1])).unwrap();

    let unit = summary.unit(1).unwrap();
    assert_eq!(unit.firings_overlaid, 1);
    assert_eq!(unit.firings_past_end, 2);
    assert_eq!(driver.ground_truth().len(), 1);
    assert!(driver.buffer().samples()[400..].iter().all(|&s| s == 0.0));
}

#[test]
fn test_alignment_past_run_end_not_logged() {
    let dir = TempDir::new().unwrap();
    let config = config(dir.path());
    // index 999 of 1_000; the alignment point lands about 40 samples later
    write_unit(&config, 1, &[2_000, 9_990]);

    let mut driver = EmgAssemblyDriver::new(&config).unwrap();
    let summary = driver.run(&sources(&config, &[1])).unwrap();

    assert_eq!(summary.firings_overlaid, 2);
    assert_eq!(summary.ground_truth_records, 1);
    assert_eq!(summary.records_outside_run, 1);
    assert_eq!(summary.unit(1).unwrap().alignments_outside_run, 1);
    assert_eq!(summary.dropped_records, 0);

    let emg_bytes = std::fs::metadata(config.emg_path()).unwrap().len();
    let emg = read_emg_file(&config.emg_path()).unwrap();
    let rows = GroundTruthLog::read_csv(&config.gst_path()).unwrap();
    assert_eq!(rows.len(), 2);
    for row in &rows {
        assert!(row.byte_offset + 4 <= emg_bytes);
        assert!(row.time_s >= 0.0 && row.time_s < emg.finish_s as f64);
    }
}

#[test]
fn test_record_cap_drops_overflow() {
    let dir = TempDir::new().unwrap();
    let mut config = config(dir.path());
    config.output.max_train_records = 2;
    write_unit(&config, 1, &[500, 2_500, 4_500, 6_500]);

    let mut driver = EmgAssemblyDriver::new(&config).unwrap();
    let summary = driver.run(&sources(&config, &[1])).unwrap();

    assert_eq!(summary.firings_overlaid, 4);
    assert_eq!(summary.ground_truth_records, 2);
    assert_eq!(summary.dropped_records, 2);
    assert_eq!(GroundTruthLog::read_csv(&config.gst_path()).unwrap().len(), 3);
}

#[test]
fn test_template_written_and_noise_applied() {
    let dir = TempDir::new().unwrap();
    let mut config = config(dir.path());
    config.paths.template_dir = Some(dir.path().join("templates"));
    config.output.snr_db = Some(20.0);
    config.output.band_pass = true;
    config.output.band_pass_high_hz = 4_000.0;
    config.jitter.seed = Some(11);
    write_unit(&config, 1, &[1_000, 5_000]);

    let mut driver = EmgAssemblyDriver::new(&config).unwrap();
    let summary = driver.run(&sources(&config, &[1])).unwrap();

    let unit = summary.unit(1).unwrap();
    let template_path = unit.template_path.as_ref().unwrap();
    assert!(template_path.exists());
    assert_eq!(unit.template.as_ref().unwrap().len(), 128);
    assert!(summary.noise_std.unwrap() > 0.0);
    assert!(summary.band_pass_applied);

    let template = Mup::open(1, template_path, &config).unwrap();
    assert_eq!(template.n_mfps(), 1);
    assert_eq!(template.jitterable_count(), 0);

    let emg = read_emg_file(&config.emg_path()).unwrap();
    assert!(emg.samples.iter().all(|s| s.is_finite()));
}

#[test]
fn test_seeded_runs_are_reproducible() {
    let dir = TempDir::new().unwrap();
    let mut config = config(dir.path());
    config.jitter.seed = Some(2024);
    config.jitter.variance_samples = 2.0;
    write_unit(&config, 1, &[1_000, 3_000, 5_000, 7_000]);

    let run = || {
        let mut driver = EmgAssemblyDriver::new(&config).unwrap();
        driver.run(&sources(&config, &[1])).unwrap();
        driver.buffer().samples().to_vec()
    };
    assert_eq!(run(), run());
}

#[test]
fn test_generated_unit_assembles_with_cannula_reference() {
    let dir = TempDir::new().unwrap();
    let mut config = config(dir.path());
    config.signal.mup_sample_count = 256;
    config.mup.acceleration_threshold = 2.0;
    config.electrode.reference = ReferenceSetup::TipMinusCannula;

    let mut generator = FibrePotentialGenerator::new(&config).unwrap();
    let placements: Vec<FibrePlacement> = (0..6)
        .map(|i| FibrePlacement {
            fibre: Fibre {
                id: i + 1,
                diameter_mm: 0.045 + 0.002 * i as f64,
                extent: None,
            },
            contact: FibreContact {
                radial_distance_mm: 0.05 + 0.15 * i as f64,
                axial_position_mm: 4.0,
            },
            shaft: Some(ShaftSpan {
                radial_distance_mm: 0.4,
                start_mm: 5.0,
                end_mm: 25.0,
            }),
        })
        .collect();

    let mut mup = Mup::new(1, config.mup_path(1), &config);
    MotorUnitBuilder::new(&mut generator, &config.electrode)
        .build(&mut mup, &placements)
        .unwrap();
    assert_eq!(generator.generated(), 12);
    std::fs::write(config.firing_path(1), "2\n1000\n4000\n").unwrap();

    let mut driver = EmgAssemblyDriver::new(&config).unwrap();
    let summary = driver.run(&sources(&config, &[1])).unwrap();
    assert_eq!(summary.firings_overlaid, 2);
    assert!(driver.buffer().rms() > 0.0);
}

// tests/error_propagation_tests.rs
//! Error propagation from file readers up to the assembly driver
//!
//! Resource and format failures must surface unchanged through
//! `EmgAssemblyDriver::run`, keeping the path and operation that failed.

use needle_emg::assembly::{EmgAssemblyDriver, FiringTimes, MotorUnitSource};
use needle_emg::config::{ConfigError, SimulationConfig};
use needle_emg::error::{EmgError, EmgErrorBuilder, FileFormat, ProcessingStage};
use needle_emg::error_context;
use needle_emg::simulation::Mup;
use std::path::Path;
use tempfile::TempDir;

fn config(dir: &Path) -> SimulationConfig {
    let mut config = SimulationConfig::default();
    config.signal.sample_rate_hz = 10_000;
    config.signal.mup_sample_count = 128;
    config.signal.duration_s = 0.05;
    config.output.band_pass = false;
    config.paths.mup_dir = dir.join("mups");
    config.paths.firing_dir = dir.join("firings");
    config.paths.output_dir = dir.join("out");
    std::fs::create_dir_all(&config.paths.mup_dir).unwrap();
    std::fs::create_dir_all(&config.paths.firing_dir).unwrap();
    config
}

fn saved_unit(config: &SimulationConfig, unit: u32) {
    let mut mup = Mup::new(unit, config.mup_path(unit), config);
    mup.add_mfp(&vec![0.0; config.signal.mup_sample_count], 1).unwrap();
    mup.save().unwrap();
}

/// A corrupt MUP file aborts the run with a format error naming the file
#[test]
fn test_corrupt_mup_propagates_format_error() {
    let dir = TempDir::new().unwrap();
    let config = config(dir.path());
    std::fs::write(config.mup_path(1), b"MUP  000001; \x01\x00").unwrap();
    std::fs::write(config.firing_path(1), "1\n10\n").unwrap();

    let mut driver = EmgAssemblyDriver::new(&config).unwrap();
    match driver.run(&[MotorUnitSource::from_config(&config, 1)]) {
        Err(EmgError::Format { format, path, .. }) => {
            assert_eq!(format, FileFormat::MupFile);
            assert_eq!(path, config.mup_path(1));
        }
        other => panic!("expected MUP format error, got {:?}", other.map(|s| s.units_processed)),
    }
}

/// A malformed firing line is reported with its line number
#[test]
fn test_bad_firing_file_propagates() {
    let dir = TempDir::new().unwrap();
    let config = config(dir.path());
    saved_unit(&config, 1);
    std::fs::write(config.firing_path(1), "2\n10\nten\n").unwrap();

    let mut driver = EmgAssemblyDriver::new(&config).unwrap();
    let err = driver.run(&[MotorUnitSource::from_config(&config, 1)]).unwrap_err();
    assert!(err.is_format_error());
    assert!(err.to_string().contains("FIRING-TIMES"));
    assert!(err.to_string().contains("line 3"));
}

/// Outputs written before the failing unit are left in place
#[test]
fn test_partial_run_keeps_earlier_files() {
    let dir = TempDir::new().unwrap();
    let config = config(dir.path());
    saved_unit(&config, 1);
    std::fs::write(config.firing_path(1), "1\n10\n").unwrap();

    let sources = [MotorUnitSource::from_config(&config, 1)];
    EmgAssemblyDriver::new(&config).unwrap().run(&sources).unwrap();
    assert!(config.emg_path().exists());

    std::fs::remove_file(config.firing_path(1)).unwrap();
    let err = EmgAssemblyDriver::new(&config).unwrap().run(&sources).unwrap_err();
    assert!(err.is_resource_error());
    assert!(config.emg_path().exists());
}

#[test]
fn test_config_errors_convert() {
    let err: EmgError = ConfigError::ValidationError(vec!["a".into(), "b".into()]).into();
    match err {
        EmgError::Configuration { reason, .. } => assert!(reason.contains("a; b")),
        other => panic!("expected configuration error, got {:?}", other),
    }
}

#[test]
fn test_builder_and_context_macro() {
    let err = EmgErrorBuilder::new("generator", "generate")
        .processing(ProcessingStage::FibrePotential, "velocity not positive");
    assert!(err.to_string().contains("FibrePotential"));
    assert!(!err.is_resource_error());

    let context = error_context!("driver", "run");
    assert_eq!(context.component, "driver");
    assert!(context.file.unwrap().ends_with("error_propagation_tests.rs"));
    assert!(context.line.is_some());
}

#[test]
fn test_missing_firing_file_keeps_path() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("mu0009.txt");
    match FiringTimes::load(&missing) {
        Err(EmgError::Io { path, .. }) => assert_eq!(path, missing),
        other => panic!("expected I/O error, got {:?}", other),
    }
}

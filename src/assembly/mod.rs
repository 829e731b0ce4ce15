// src/assembly/mod.rs
//! EMG assembly from firing times and saved MUPs

pub mod driver;
pub mod emg_file;
pub mod firing_times;
pub mod ground_truth;
pub mod noise;

pub use driver::{EmgAssemblyDriver, MotorUnitSource, RunSummary, UnitSummary};
pub use emg_file::{read_emg_file, write_emg_file, EmgBuffer, EmgFileContents};
pub use firing_times::FiringTimes;
pub use ground_truth::{GroundTruthLog, GroundTruthRecord, GstRow};
pub use noise::NoiseInjector;

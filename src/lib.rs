//! Needle-EMG: synthetic needle-electrode EMG from motor-unit potentials
//!
//! The crate turns single-fibre action potentials into motor-unit potentials
//! (MUPs) with firing-to-firing jitter, and sums jittered MUPs driven by
//! firing-time lists into a full EMG trace with an exact ground-truth log.
//!
//! - Convolution-based single-fibre potentials for several electrode types
//! - MUP objects with time-expanded jitterable buffers and a random-access file format
//! - EMG assembly driver with noise injection and zero-phase band-pass output
//! - Layered TOML configuration
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use needle_emg::assembly::{EmgAssemblyDriver, MotorUnitSource};
//! use needle_emg::config::ConfigLoader;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConfigLoader::new().load()?;
//!     let sources: Vec<_> = (1..=20).map(|u| MotorUnitSource::from_config(&config, u)).collect();
//!
//!     let mut driver = EmgAssemblyDriver::new(&config)?;
//!     let summary = driver.run(&sources)?;
//!     println!("{} firings overlaid", summary.firings_overlaid);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_inception)]

pub mod assembly;
pub mod config;
pub mod error;
pub mod processing;
pub mod simulation;
pub mod utils;

// Re-export commonly used types for convenience
pub use assembly::{EmgAssemblyDriver, MotorUnitSource, RunSummary};
pub use config::{ConfigLoader, SimulationConfig};
pub use error::{EmgError, EmgResult};
pub use simulation::{
    Electrode, Fibre, FibrePotentialGenerator, JitterMode, Mup, MotorUnitBuilder, SynthesisOptions,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get library information
pub fn version_info() -> VersionInfo {
    VersionInfo {
        name: NAME.to_string(),
        version: VERSION.to_string(),
        description: "Needle-EMG simulation of fibre potentials, jittered MUPs and EMG traces".to_string(),
        features: vec![
            "Single-fibre potential generator".to_string(),
            "Jittered motor-unit potentials".to_string(),
            "Random-access MUP files".to_string(),
            "EMG assembly with ground truth".to_string(),
        ],
    }
}

/// Library version information
#[derive(Debug, Clone)]
pub struct VersionInfo {
    /// Library name
    pub name: String,
    /// Version string
    pub version: String,
    /// Description
    pub description: String,
    /// List of features
    pub features: Vec<String>,
}

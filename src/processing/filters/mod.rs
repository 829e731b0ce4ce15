// src/processing/filters/mod.rs
//! Digital filters for conditioning the assembled EMG buffer

pub mod iir;
pub mod zero_phase;

pub use iir::*;
pub use zero_phase::*;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Response of a single-edge filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BandType {
    /// Passes below the cutoff
    Lowpass,
    /// Passes above the cutoff
    Highpass,
}

/// Filter coefficients for one IIR section
#[derive(Debug, Clone)]
pub struct IirCoefficients {
    /// Numerator coefficients
    pub b: Vec<f64>,
    /// Denominator coefficients, `a[0]` non-zero
    pub a: Vec<f64>,
}

/// Common filter error types
#[derive(Debug, Error)]
pub enum FilterError {
    /// Order or cutoff out of range
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),
    /// Coefficients cannot form a filter
    #[error("Invalid coefficients: {0}")]
    InvalidCoefficients(String),
}

impl From<FilterError> for crate::error::EmgError {
    fn from(err: FilterError) -> Self {
        crate::error::EmgErrorBuilder::new("filters", "design")
            .processing(crate::error::ProcessingStage::Filtering, err.to_string())
    }
}

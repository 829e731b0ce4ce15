//! Common utility functions for the simulator
//!
//! - Time-base, byte-offset and level conversions
//! - Waveform derivatives and extrema
//! - CRC-32 and sample integrity checks
//!
//! Constants live in the config module.

pub mod conversion;
pub mod integrity;

pub use conversion::{
    bytes_to_samples,
    conduction_velocity,
    db_to_amplitude_ratio,
    firing_time_to_index,
    forward_difference,
    max_slope_index,
    peak_acceleration,
    peak_to_peak,
    rms,
    sample_to_byte_offset,
    samples_as_le_bytes,
    samples_from_le_bytes,
    samples_to_seconds,
};

pub use integrity::{
    calculate_crc32,
    validate_finite_samples,
    verify_crc32,
    IntegrityError,
    IntegrityResult,
    PayloadChecksum,
};

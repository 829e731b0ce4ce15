//! Data integrity helpers
//!
//! CRC-32 over MUP buffer records (`crc32fast`) and finiteness checks on
//! generated waveforms.

use std::fmt;

/// Data integrity error types
#[derive(Debug, Clone, PartialEq)]
pub enum IntegrityError {
    /// Stored and recomputed CRC differ
    CrcMismatch {
        expected: u32,
        actual: u32,
        context: String,
    },
    /// NaN or infinite sample
    NonFiniteSample {
        position: usize,
        value: f32,
        context: String,
    },
}

impl fmt::Display for IntegrityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntegrityError::CrcMismatch { expected, actual, context } => {
                write!(f, "CRC-32 mismatch in {}: expected 0x{:08X}, got 0x{:08X}", context, expected, actual)
            }
            IntegrityError::NonFiniteSample { position, value, context } => {
                write!(f, "Non-finite sample {} at position {} in {}", value, position, context)
            }
        }
    }
}

impl std::error::Error for IntegrityError {}

/// Result type for integrity operations
pub type IntegrityResult<T> = Result<T, IntegrityError>;

/// Streaming CRC-32 over serialised buffer records
#[derive(Default)]
pub struct PayloadChecksum {
    hasher: crc32fast::Hasher,
}

impl PayloadChecksum {
    /// Checksum over no bytes
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed more bytes
    pub fn update(&mut self, bytes: &[u8]) {
        self.hasher.update(bytes);
    }

    /// CRC-32 of everything fed
    pub fn finalize(self) -> u32 {
        self.hasher.finalize()
    }
}

/// CRC-32 of one contiguous byte slice
pub fn calculate_crc32(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}

/// Compare a stored checksum with a computed one; `context` names the data
pub fn verify_crc32(expected: u32, actual: u32, context: &str) -> IntegrityResult<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(IntegrityError::CrcMismatch {
            expected,
            actual,
            context: context.to_string(),
        })
    }
}

/// Reject NaN and infinite samples
pub fn validate_finite_samples(samples: &[f32], context: &str) -> IntegrityResult<()> {
    match samples.iter().position(|s| !s.is_finite()) {
        None => Ok(()),
        Some(position) => Err(IntegrityError::NonFiniteSample {
            position,
            value: samples[position],
            context: context.to_string(),
        }),
    }
}

// src/error.rs
//! Unified error handling for the needle-EMG simulator
//!
//! Every fallible routine in the crate returns [`EmgResult`]. Resource and
//! format failures are always fatal to the run; the assembly driver propagates
//! them unchanged so the binary can exit nonzero with the logged diagnostic.

use std::path::{Path, PathBuf};
use std::time::SystemTime;
use thiserror::Error;

/// Unified error type for the simulator
#[derive(Debug, Error)]
pub enum EmgError {
    /// Open/read/write/seek failure on a file
    #[error("[IO] {operation} failed for {}: {source} ({})", .path.display(), .context.component)]
    Io {
        /// Failed operation, e.g. `open` or `seek`
        operation: String,
        /// File involved
        path: PathBuf,
        /// Underlying OS error
        #[source]
        source: std::io::Error,
        /// Where the error was raised
        context: ErrorContext,
    },

    /// Malformed persisted data (bad magic, truncated header, bad record)
    #[error("[FORMAT] Invalid {format} data in {}: {reason} ({})", .path.display(), .context.operation)]
    Format {
        /// Format being parsed
        format: FileFormat,
        /// Offending file
        path: PathBuf,
        /// What was wrong
        reason: String,
        /// Where the error was raised
        context: ErrorContext,
    },

    /// Configuration and setup errors
    #[error("[CONFIG] Configuration error in {component}: {reason}")]
    Configuration {
        /// Component that rejected the setup
        component: String,
        /// Violations, joined
        reason: String,
        /// Where the error was raised
        context: ErrorContext,
    },

    /// Waveform generation or filtering failures
    #[error("[PROCESSING] {stage:?} stage error: {reason} ({})", .context.operation)]
    Processing {
        /// Failing stage
        stage: ProcessingStage,
        /// What went wrong
        reason: String,
        /// Where the error was raised
        context: ErrorContext,
    },

    /// Invalid caller-supplied data
    #[error("[DATA] Invalid {data_type}: {reason} ({})", .context.operation)]
    InvalidData {
        /// Kind of input rejected
        data_type: String,
        /// Why it was rejected
        reason: String,
        /// Where the error was raised
        context: ErrorContext,
    },
}

/// Persisted formats for error categorisation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// Binary MUP file
    MupFile,
    /// Firing-time text file
    FiringTimes,
    /// EMG output file
    EmgFile,
    /// Ground-truth CSV
    GroundTruth,
}

impl std::fmt::Display for FileFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileFormat::MupFile => write!(f, "MUP-FILE"),
            FileFormat::FiringTimes => write!(f, "FIRING-TIMES"),
            FileFormat::EmgFile => write!(f, "EMG-FILE"),
            FileFormat::GroundTruth => write!(f, "GROUND-TRUTH"),
        }
    }
}

/// Processing stages for error tracking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingStage {
    /// Single-fibre generation
    FibrePotential,
    /// FFT convolution
    Convolution,
    /// Time expansion
    Interpolation,
    /// Jittered MUP synthesis
    Synthesis,
    /// Band-pass filtering
    Filtering,
    /// Noise injection
    NoiseInjection,
}

/// Error context for debugging and analysis
#[derive(Debug, Clone)]
pub struct ErrorContext {
    /// When the context was created
    pub timestamp: SystemTime,
    /// Raising component
    pub component: String,
    /// Operation in progress
    pub operation: String,
    /// Source file, from [`error_context!`](crate::error_context)
    pub file: Option<&'static str>,
    /// Source line
    pub line: Option<u32>,
}

impl ErrorContext {
    /// Create a new error context
    pub fn new(component: &str, operation: &str) -> Self {
        Self {
            timestamp: SystemTime::now(),
            component: component.to_string(),
            operation: operation.to_string(),
            file: None,
            line: None,
        }
    }

    /// Create error context with file and line information
    pub fn with_location(component: &str, operation: &str, file: &'static str, line: u32) -> Self {
        let mut context = Self::new(component, operation);
        context.file = Some(file);
        context.line = Some(line);
        context
    }
}

/// Macro for creating error context with file and line info
#[macro_export]
macro_rules! error_context {
    ($component:expr, $operation:expr) => {
        $crate::error::ErrorContext::with_location($component, $operation, file!(), line!())
    };
}

/// Result type alias for simulator operations
pub type EmgResult<T> = Result<T, EmgError>;

/// Error builder for convenient error construction
pub struct EmgErrorBuilder {
    component: String,
    operation: String,
}

impl EmgErrorBuilder {
    /// Builder for errors raised by `operation` of `component`
    pub fn new(component: &str, operation: &str) -> Self {
        Self {
            component: component.to_string(),
            operation: operation.to_string(),
        }
    }

    fn context(&self) -> ErrorContext {
        ErrorContext::new(&self.component, &self.operation)
    }

    /// I/O failure on `path`
    pub fn io(self, path: &Path, source: std::io::Error) -> EmgError {
        EmgError::Io {
            operation: self.operation.clone(),
            path: path.to_path_buf(),
            source,
            context: self.context(),
        }
    }

    /// Malformed data in `path`
    pub fn format(self, format: FileFormat, path: &Path, reason: impl Into<String>) -> EmgError {
        EmgError::Format {
            format,
            path: path.to_path_buf(),
            reason: reason.into(),
            context: self.context(),
        }
    }

    /// Configuration rejected by the builder's component
    pub fn configuration(self, reason: impl Into<String>) -> EmgError {
        let context = self.context();
        EmgError::Configuration {
            component: self.component,
            reason: reason.into(),
            context,
        }
    }

    /// Failure in a processing stage
    pub fn processing(self, stage: ProcessingStage, reason: impl Into<String>) -> EmgError {
        EmgError::Processing {
            stage,
            reason: reason.into(),
            context: self.context(),
        }
    }

    /// Rejected caller input
    pub fn invalid_data(self, data_type: &str, reason: impl Into<String>) -> EmgError {
        EmgError::InvalidData {
            data_type: data_type.to_string(),
            reason: reason.into(),
            context: self.context(),
        }
    }
}

/// Attach a path and operation to raw I/O results
pub trait IoResultExt<T> {
    /// Map the I/O error into [`EmgError::Io`]
    fn io_err(self, component: &str, operation: &str, path: &Path) -> EmgResult<T>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn io_err(self, component: &str, operation: &str, path: &Path) -> EmgResult<T> {
        self.map_err(|source| EmgErrorBuilder::new(component, operation).io(path, source))
    }
}

impl EmgError {
    /// True for resource failures (open/read/write/seek)
    pub fn is_resource_error(&self) -> bool {
        matches!(self, EmgError::Io { .. })
    }

    /// True for malformed persisted data
    pub fn is_format_error(&self) -> bool {
        matches!(self, EmgError::Format { .. })
    }
}

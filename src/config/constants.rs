// src/config/constants.rs
//! System-wide configuration constants

/// Sampling and time-base constants
pub mod signal {
    /// Base rate of MUPs and of the EMG output buffer
    pub const DEFAULT_SAMPLE_RATE_HZ: u32 = 31_250;
    /// Lowest accepted base rate
    pub const MIN_SAMPLE_RATE_HZ: u32 = 1_000;
    /// Highest accepted base rate
    pub const MAX_SAMPLE_RATE_HZ: u32 = 200_000;

    /// Fixed length of every MFP and MUP at base rate
    pub const DEFAULT_MUP_SAMPLE_COUNT: usize = 512;
    /// Default run length
    pub const DEFAULT_DURATION_S: f64 = 10.0;

    /// Firing-time units per EMG buffer sample
    pub const DEFAULT_FIRING_TIME_RESOLUTION: u32 = 10;

    /// ms per s
    pub const MILLISECONDS_PER_SECOND: f64 = 1_000.0;
}

/// Single-fibre generator constants
pub mod generator {
    /// Velocity model `v = BASE + SLOPE * (diameter_um - REFERENCE)`
    pub const VELOCITY_BASE_MM_PER_MS: f64 = 2.2;
    /// mm/ms per um of diameter
    pub const VELOCITY_SLOPE: f64 = 0.05;
    /// Diameter at which the velocity equals the base
    pub const VELOCITY_REFERENCE_DIAMETER_UM: f64 = 25.0;

    /// Axial / radial conductivity ratio of muscle tissue
    pub const DEFAULT_ANISOTROPY_RATIO: f64 = 5.0;

    /// Spatial extent of the transmembrane current template
    pub const CURRENT_SPAN_MM: f64 = 10.0;
    /// Amplitude scale of the current template
    pub const DEFAULT_CURRENT_SCALE: f64 = 96.0;

    /// Samples ramped to zero at each edge; the ramp anchors on the next sample
    pub const EDGE_RAMP_SAMPLES: usize = 49;

    /// Share of the window before the end-plate crossing (propagating variant)
    pub const DEFAULT_LEAD_IN_FRACTION: f64 = 0.25;

    /// Points used to integrate a concentric core
    pub const CONCENTRIC_CORE_POINTS: usize = 9;

    /// Axial extent of the recording surfaces
    pub const DEFAULT_CONCENTRIC_CORE_LENGTH_MM: f64 = 0.58;
    /// Exposed tip of a monopolar needle
    pub const DEFAULT_MONOPOLAR_TIP_LENGTH_MM: f64 = 0.3;
    /// Distance between bipolar contacts
    pub const DEFAULT_BIPOLAR_SEPARATION_MM: f64 = 0.2;

    /// um per mm
    pub const MICROMETRES_PER_MILLIMETRE: f64 = 1_000.0;
}

/// MUP assembly constants
pub mod mup {
    /// Time expansion of jitterable buffers
    pub const DEFAULT_EXPANSION_FACTOR: usize = 30;
    /// Largest accepted expansion factor
    pub const MAX_EXPANSION_FACTOR: usize = 1_000;
    /// kV/s^2, with samples in mV and time in ms
    pub const DEFAULT_ACCELERATION_THRESHOLD: f32 = 2.0;
}

/// Jitter constants
pub mod jitter {
    /// Jitter variance in base-rate samples
    pub const DEFAULT_JITTER_VARIANCE_SAMPLES: f64 = 0.5;
    /// Largest accepted jitter variance
    pub const MAX_JITTER_VARIANCE_SAMPLES: f64 = 64.0;
    /// Mixed into the jitter seed to derive the noise stream
    pub const NOISE_SEED_MIX: u64 = 0x9E37_79B9_7F4A_7C15;
}

/// Output conditioning constants
pub mod filters {
    /// Band-pass lower cutoff
    pub const DEFAULT_BANDPASS_LOW_HZ: f32 = 10.0;
    /// Band-pass upper cutoff
    pub const DEFAULT_BANDPASS_HIGH_HZ: f32 = 10_000.0;
    /// Butterworth order per band edge
    pub const DEFAULT_FILTER_ORDER: usize = 2;
    /// Lowest Butterworth order
    pub const MIN_FILTER_ORDER: usize = 1;
    /// Highest Butterworth order
    pub const MAX_FILTER_ORDER: usize = 8;
}

/// Ground-truth log constants
pub mod ground_truth {
    /// Records kept before the log starts dropping
    pub const DEFAULT_MAX_RECORDS: usize = 100_000;
    /// Certainty of simulated firings
    pub const DEFAULT_CERTAINTY: f32 = 1.0;
    /// User id column default
    pub const DEFAULT_USER_ID: i32 = 0;
}

/// MUP file format constants
pub mod format {
    /// Magic of current MUP files
    pub const MUP_MAGIC: &[u8; 4] = b"MUP ";
    /// Magic still accepted on read
    pub const LEGACY_MUP_MAGIC: &[u8; 4] = b"MUAP";
    /// Digits of the unit id in the file prefix
    pub const UNIT_ID_WIDTH: usize = 6;
    /// Version written into the version extension
    pub const FORMAT_VERSION: i32 = 2;

    /// Header flag: a cannula record follows the offset table
    pub const FLAG_CANNULA: i32 = 0x1;

    /// Extension tag of the format version
    pub const EXT_TAG_VERSION: i32 = 1;
    /// Extension tag of the record CRC-32
    pub const EXT_TAG_PAYLOAD_CRC: i32 = 2;

    /// EMG file: start and finish time precede the samples
    pub const EMG_FILE_HEADER_BYTES: u64 = 8;
    /// Bytes per stored sample
    pub const SAMPLE_BYTES: u64 = 4;
}

/// Default file locations and naming
pub mod paths {
    /// Base configuration file
    pub const DEFAULT_CONFIG_FILE: &str = "needle-emg.toml";
    /// Optional local overrides
    pub const LOCAL_CONFIG_FILE: &str = "config/local.toml";
    /// Prefix of environment overrides
    pub const ENV_PREFIX: &str = "NEEDLE_EMG_";
    /// Separator between section and field in override names
    pub const ENV_SECTION_SEPARATOR: &str = "__";

    /// Default MUP directory
    pub const DEFAULT_MUP_DIR: &str = "mups";
    /// Default firing-time directory
    pub const DEFAULT_FIRING_DIR: &str = "firings";
    /// Default output directory
    pub const DEFAULT_OUTPUT_DIR: &str = "output";
    /// Default MUP file name pattern
    pub const DEFAULT_MUP_FILE_PATTERN: &str = "mup{unit}.dat";
    /// Default firing-time file name pattern
    pub const DEFAULT_FIRING_FILE_PATTERN: &str = "mu{unit}.txt";
    /// Default EMG file name
    pub const DEFAULT_EMG_FILE: &str = "emg.bin";
    /// Default ground-truth file name
    pub const DEFAULT_GST_FILE: &str = "emg.gst";
    /// Default summary file name
    pub const DEFAULT_SUMMARY_FILE: &str = "run_summary.json";
    /// Replaced by the zero-padded unit number
    pub const UNIT_PLACEHOLDER: &str = "{unit}";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_pass_defaults_below_nyquist() {
        let nyquist = signal::DEFAULT_SAMPLE_RATE_HZ as f32 / 2.0;
        assert!(filters::DEFAULT_BANDPASS_HIGH_HZ < nyquist);
        assert!(filters::DEFAULT_BANDPASS_LOW_HZ < filters::DEFAULT_BANDPASS_HIGH_HZ);
    }

    #[test]
    fn test_mup_window_fits_edge_ramps() {
        assert!(signal::DEFAULT_MUP_SAMPLE_COUNT > 2 * (generator::EDGE_RAMP_SAMPLES + 1));
    }

    #[test]
    fn test_magic_lengths() {
        assert_eq!(format::MUP_MAGIC.len(), 4);
        assert_eq!(format::LEGACY_MUP_MAGIC.len(), 4);
    }
}

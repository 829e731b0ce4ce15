// src/config/loader.rs
//! Layered configuration loader
//!
//! Defaults, then every existing TOML file in order, then environment
//! overrides of the form `NEEDLE_EMG_<SECTION>__<FIELD>=value`.

use crate::config::{constants::paths, SimulationConfig};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Configuration loader for a simulation run
pub struct ConfigLoader {
    config_paths: Vec<PathBuf>,
    apply_env: bool,
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A listed file does not exist
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),
    /// TOML syntax or type mismatch
    #[error("Configuration parse error: {0}")]
    ParseError(String),
    /// Every consistency violation found
    #[error("Configuration validation errors: {}", .0.join("; "))]
    ValidationError(Vec<String>),
    /// Read or write failure
    #[error("IO error: {0}")]
    IoError(String),
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::IoError(err.to_string())
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

impl From<ConfigError> for crate::error::EmgError {
    fn from(err: ConfigError) -> Self {
        crate::error::EmgErrorBuilder::new("config_loader", "load").configuration(err.to_string())
    }
}

impl ConfigLoader {
    /// Create loader over the default search paths
    pub fn new() -> Self {
        Self {
            config_paths: Self::discover_config_paths(),
            apply_env: true,
        }
    }

    /// Create loader with custom paths
    pub fn with_paths(paths: Vec<PathBuf>) -> Self {
        Self {
            config_paths: paths,
            apply_env: true,
        }
    }

    /// Ignore `NEEDLE_EMG_*` environment variables
    pub fn without_environment(mut self) -> Self {
        self.apply_env = false;
        self
    }

    /// Load, merge and validate the run configuration
    pub fn load(&self) -> Result<SimulationConfig, ConfigError> {
        let config = self.load_and_merge_configs()?;
        info!(
            sample_rate_hz = config.signal.sample_rate_hz,
            duration_s = config.signal.duration_s,
            expansion_factor = config.mup.expansion_factor,
            "configuration loaded"
        );
        Ok(config)
    }

    /// Validate a single configuration file on top of the defaults
    pub fn validate_config_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let mut layered = defaults_layer()?;
        overlay(&mut layered, read_layer(path.as_ref())?);
        into_config(layered)?
            .validate_consistency()
            .map_err(ConfigError::ValidationError)
    }

    /// Write the effective configuration as TOML
    pub fn export_config<P: AsRef<Path>>(
        &self,
        config: &SimulationConfig,
        path: P,
    ) -> Result<(), ConfigError> {
        let text = toml::to_string_pretty(config).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        std::fs::write(path, text)?;
        Ok(())
    }

    fn load_and_merge_configs(&self) -> Result<SimulationConfig, ConfigError> {
        let mut layered = defaults_layer()?;

        for file in self.config_paths.iter().filter(|p| p.exists()) {
            debug!(path = %file.display(), "merging configuration file");
            overlay(&mut layered, read_layer(file)?);
        }

        if self.apply_env {
            for (name, raw) in std::env::vars() {
                if let Some(key) = env_key(&name) {
                    debug!(variable = %name, "applying environment override");
                    set_path(&mut layered, &key, env_value(&raw));
                }
            }
        }

        let config = into_config(layered)?;
        config
            .validate_consistency()
            .map_err(ConfigError::ValidationError)?;
        Ok(config)
    }

    fn discover_config_paths() -> Vec<PathBuf> {
        vec![
            PathBuf::from(paths::DEFAULT_CONFIG_FILE),
            PathBuf::from(paths::LOCAL_CONFIG_FILE),
        ]
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn defaults_layer() -> Result<toml::Value, ConfigError> {
    toml::Value::try_from(SimulationConfig::default()).map_err(|e| ConfigError::ParseError(e.to_string()))
}

fn read_layer(path: &Path) -> Result<toml::Value, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }
    Ok(toml::from_str(&std::fs::read_to_string(path)?)?)
}

fn into_config(layered: toml::Value) -> Result<SimulationConfig, ConfigError> {
    layered
        .try_into()
        .map_err(|e: toml::de::Error| ConfigError::ParseError(format!("Failed to deserialize config: {}", e)))
}

/// Tables merge key by key; any other value replaces what is below it
fn overlay(base: &mut toml::Value, top: toml::Value) {
    match (base, top) {
        (toml::Value::Table(below), toml::Value::Table(above)) => {
            for (key, value) in above {
                match below.get_mut(&key) {
                    Some(existing) => overlay(existing, value),
                    None => {
                        below.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

/// `NEEDLE_EMG_JITTER__SEED` becomes `["jitter", "seed"]`
fn env_key(name: &str) -> Option<Vec<String>> {
    let key: Vec<String> = name
        .strip_prefix(paths::ENV_PREFIX)?
        .to_lowercase()
        .split(paths::ENV_SECTION_SEPARATOR)
        .map(str::to_string)
        .collect();
    (!key.iter().any(String::is_empty)).then_some(key)
}

fn env_value(raw: &str) -> toml::Value {
    raw.parse::<i64>()
        .map(toml::Value::Integer)
        .or_else(|_| raw.parse::<f64>().map(toml::Value::Float))
        .or_else(|_| raw.parse::<bool>().map(toml::Value::Boolean))
        .unwrap_or_else(|_| toml::Value::String(raw.to_string()))
}

fn set_path(root: &mut toml::Value, key: &[String], value: toml::Value) {
    let Some((last, sections)) = key.split_last() else {
        return;
    };
    let mut current = root;
    for section in sections {
        let toml::Value::Table(table) = current else {
            return;
        };
        current = table
            .entry(section.clone())
            .or_insert_with(|| toml::Value::Table(toml::value::Table::new()));
    }
    if let toml::Value::Table(table) = current {
        table.insert(last.clone(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_config_loader_creation() {
        let loader = ConfigLoader::new();
        assert!(!loader.config_paths.is_empty());
    }

    #[test]
    #[serial]
    fn test_load_default_config() {
        let loader = ConfigLoader::with_paths(vec![]).without_environment();
        let config = loader.load().unwrap();
        assert_eq!(config.signal.sample_rate_hz, SimulationConfig::default().signal.sample_rate_hz);
    }

    #[test]
    #[serial]
    fn test_files_merge_in_order() {
        let mut first = NamedTempFile::new().unwrap();
        writeln!(first, "[signal]\nduration_s = 3.0\nmup_sample_count = 400").unwrap();
        let mut second = NamedTempFile::new().unwrap();
        writeln!(second, "[signal]\nduration_s = 4.0").unwrap();

        let loader = ConfigLoader::with_paths(vec![
            first.path().to_path_buf(),
            second.path().to_path_buf(),
        ])
        .without_environment();
        let config = loader.load().unwrap();

        assert_eq!(config.signal.duration_s, 4.0);
        assert_eq!(config.signal.mup_sample_count, 400);
    }

    #[test]
    fn test_config_file_validation() {
        let loader = ConfigLoader::new();

        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[signal]
sample_rate_hz = 31250

[electrode]
reference = "tip_minus_cannula"
        "#
        )
        .unwrap();

        assert!(loader.validate_config_file(temp_file.path()).is_ok());
    }

    #[test]
    fn test_invalid_config_validation() {
        let loader = ConfigLoader::new();

        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[signal]
sample_rate_hz = 8000  # band-pass high cutoff above Nyquist
        "#
        )
        .unwrap();

        assert!(matches!(
            loader.validate_config_file(temp_file.path()),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    #[serial]
    fn test_environment_override() {
        unsafe {
            std::env::set_var("NEEDLE_EMG_JITTER__VARIANCE_SAMPLES", "1.5");
            std::env::set_var("NEEDLE_EMG_MUP__EXPANSION_FACTOR", "20");
        }

        let config = ConfigLoader::with_paths(vec![]).load().unwrap();
        assert_eq!(config.jitter.variance_samples, 1.5);
        assert_eq!(config.mup.expansion_factor, 20);

        unsafe {
            std::env::remove_var("NEEDLE_EMG_JITTER__VARIANCE_SAMPLES");
            std::env::remove_var("NEEDLE_EMG_MUP__EXPANSION_FACTOR");
        }
    }

    #[test]
    #[serial]
    fn test_config_export() {
        let loader = ConfigLoader::with_paths(vec![]).without_environment();
        let config = loader.load().unwrap();
        let temp_file = NamedTempFile::new().unwrap();

        assert!(loader.export_config(&config, temp_file.path()).is_ok());

        let content = std::fs::read_to_string(temp_file.path()).unwrap();
        assert!(content.contains("[signal]"));
        assert!(content.contains("[jitter]"));
    }

    #[test]
    fn test_env_key_parsing() {
        assert_eq!(
            env_key("NEEDLE_EMG_OUTPUT__SNR_DB"),
            Some(vec!["output".to_string(), "snr_db".to_string()])
        );
        assert_eq!(env_key("NEEDLE_EMG_OUTPUT____SNR"), None);
        assert_eq!(env_key("OTHER_OUTPUT__SNR_DB"), None);
        assert_eq!(env_value("true"), toml::Value::Boolean(true));
        assert_eq!(env_value("emg.bin"), toml::Value::String("emg.bin".into()));
    }
}

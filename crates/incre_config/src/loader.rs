//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::IncreConfig;
use std::path::Path;

/// Name of the configuration file at the project root.
pub const CONFIG_FILE: &str = "incre.toml";

/// Loads and validates an `incre.toml` configuration from a project directory.
///
/// Reads `<project_dir>/incre.toml`, parses it, and validates its values.
pub fn load_config(project_dir: &Path) -> Result<IncreConfig, ConfigError> {
    let config_path = project_dir.join(CONFIG_FILE);
    let content = std::fs::read_to_string(&config_path)?;
    load_config_from_str(&content)
}

/// Like [`load_config`], but returns the default configuration when the
/// project has no `incre.toml`.
pub fn load_config_or_default(project_dir: &Path) -> Result<IncreConfig, ConfigError> {
    match load_config(project_dir) {
        Err(ConfigError::IoError(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            Ok(IncreConfig::default())
        }
        other => other,
    }
}

/// Parses and validates an `incre.toml` configuration from a string.
pub fn load_config_from_str(content: &str) -> Result<IncreConfig, ConfigError> {
    let config: IncreConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Validates that configuration values are usable.
fn validate_config(config: &IncreConfig) -> Result<(), ConfigError> {
    if config.snapshot.state_dir.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "snapshot.state_dir must not be empty".to_string(),
        ));
    }
    if config.snapshot.extensions.iter().any(|e| e.trim_start_matches('.').is_empty()) {
        return Err(ConfigError::ValidationError(
            "snapshot.extensions must not contain empty entries".to_string(),
        ));
    }
    if config.merge.field_capacity == 0 {
        return Err(ConfigError::ValidationError(
            "merge.field_capacity must be greater than zero".to_string(),
        ));
    }
    if config.merge.method_capacity == 0 {
        return Err(ConfigError::ValidationError(
            "merge.method_capacity must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

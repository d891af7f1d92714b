use std::io::ErrorKind;
use std::path::Path;

use huddle_common::ConfigError;

use super::paths::{create_default_config, default_config_path};
use crate::schema::HuddleConfig;
use crate::validation;

/// Reads and parses one config file. Absent keys fall back to their
/// defaults. Validation problems are only logged here; use
/// [`validation::validate`] for a hard check.
pub fn load_from_path(path: &Path) -> Result<HuddleConfig, ConfigError> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(ConfigError::FileNotFound(path.to_path_buf()))
        }
        Err(e) => return Err(ConfigError::access(path, e)),
    };

    let config = toml::from_str::<HuddleConfig>(&raw)
        .map_err(|e| ConfigError::ParseError(format!("{}: {e}", path.display())))?;

    if let Err(problem) = validation::validate(&config) {
        tracing::warn!(path = %path.display(), %problem, "config loaded with problems");
    }
    tracing::debug!(path = %path.display(), "config loaded");
    Ok(config)
}

/// Loads the per-user config, writing a commented default file first
/// when none exists yet.
pub fn load_default() -> Result<HuddleConfig, ConfigError> {
    let path = default_config_path()?;
    match load_from_path(&path) {
        Err(ConfigError::FileNotFound(_)) => {
            tracing::info!(path = %path.display(), "no config yet");
            create_default_config(&path)?;
            Ok(HuddleConfig::default())
        }
        other => other,
    }
}

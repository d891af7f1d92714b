use std::path::{Path, PathBuf};

use huddle_common::ConfigError;

use super::template::default_config_toml;

const APP_DIR: &str = "huddle";
const FILE_NAME: &str = "config.toml";

/// `<platform config dir>/huddle/config.toml`.
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    match dirs::config_dir() {
        Some(base) => Ok(base.join(APP_DIR).join(FILE_NAME)),
        None => Err(ConfigError::ParseError(
            "no platform config directory for this user".into(),
        )),
    }
}

/// Writes the commented default config to `path`, creating parent
/// directories as needed. An existing file is overwritten.
pub fn create_default_config(path: &Path) -> Result<(), ConfigError> {
    let parent = path.parent().filter(|p| !p.as_os_str().is_empty());
    if let Some(dir) = parent {
        std::fs::create_dir_all(dir).map_err(|e| ConfigError::access(dir, e))?;
    }
    std::fs::write(path, default_config_toml()).map_err(|e| ConfigError::access(path, e))?;
    tracing::info!(path = %path.display(), "wrote default config");
    Ok(())
}

//! Settings for the channel manager and the `huddle` binary, read from a
//! TOML file. Each section falls back to defaults, so a config only needs
//! the keys it changes.
//!
//! ```rust,no_run
//! let config = huddle_config::load_config()?;
//! println!("{}", huddle_config::config_to_json(&config));
//! # Ok::<(), huddle_common::ConfigError>(())
//! ```

pub mod schema;
pub mod toml_loader;
pub mod validation;

pub use schema::{
    ChannelConfig, CredentialsConfig, HuddleConfig, LogLevel, LoggingConfig, PublishConfig,
    CONFIG_SCHEMA_VERSION,
};
pub use toml_loader::{load_default, load_from_path};

use huddle_common::ConfigError;

/// Per-user config, seeded with a default file on first use. Unlike
/// [`load_from_path`], out-of-range values are an error here.
pub fn load_config() -> Result<HuddleConfig, ConfigError> {
    let config = toml_loader::load_default()?;
    validation::validate(&config).map(|()| config)
}

/// Pretty JSON dump, used by `huddle --print-config`.
pub fn config_to_json(config: &HuddleConfig) -> String {
    match serde_json::to_string_pretty(config) {
        Ok(json) => json,
        Err(e) => format!("{{\"error\": \"{e}\"}}"),
    }
}

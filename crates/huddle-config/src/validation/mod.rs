//! Full configuration validation.
//!
//! Validates numeric ranges per section and collects every violation into a
//! single `ConfigError`.

mod channel;
mod helpers;
mod misc;


use crate::schema::HuddleConfig;
use huddle_common::ConfigError;

/// Run all validations on a config, collecting all errors.
pub fn validate(config: &HuddleConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    channel::validate_channel(&mut errors, config);
    channel::validate_publish(&mut errors, config);
    misc::validate_credentials(&mut errors, config);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors.join("; ")))
    }
}

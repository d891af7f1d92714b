//! Configuration schema types for Huddle.
//!
//! All structs use `serde(default)` so partial configs work correctly.

mod channel;
mod credentials;
mod logging;

pub use channel::*;
pub use credentials::*;
pub use logging::*;

use serde::{Deserialize, Serialize};

/// Current config schema version.
pub const CONFIG_SCHEMA_VERSION: u32 = 1;

/// Root configuration for Huddle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct HuddleConfig {
    pub channel: ChannelConfig,
    pub publish: PublishConfig,
    pub credentials: CredentialsConfig,
    pub logging: LoggingConfig,
}

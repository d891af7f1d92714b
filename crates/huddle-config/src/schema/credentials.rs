use serde::{Deserialize, Serialize};

/// Settings for the locally minted join credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialsConfig {
    /// Identity presented to the transport on join (the transport app id).
    pub transport_identity: String,
    /// Lifetime of issued tokens in seconds.
    pub token_ttl_secs: u64,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            transport_identity: "huddle-dev".into(),
            token_ttl_secs: 3600,
        }
    }
}

//! Join credential capability and a locally minting provider.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use huddle_common::new_correlation_id;

use crate::error::CredentialError;

/// Issues short-lived join credentials. Both calls are network calls in a
/// real deployment and any failure aborts the join.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn issue_token(&self, channel: &str, uid: u32) -> Result<String, CredentialError>;

    async fn transport_identity(&self) -> Result<String, CredentialError>;
}

/// Provider for local runs: a fixed transport identity and tokens minted in
/// process. The loopback transport accepts any token.
#[derive(Debug, Clone)]
pub struct StaticCredentialProvider {
    identity: String,
    ttl: Duration,
}

impl StaticCredentialProvider {
    pub fn new(identity: impl Into<String>, ttl: Duration) -> Self {
        Self {
            identity: identity.into(),
            ttl,
        }
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentialProvider {
    async fn issue_token(&self, channel: &str, uid: u32) -> Result<String, CredentialError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| CredentialError::Token(format!("system clock before epoch: {e}")))?;
        let expires_at = (now + self.ttl).as_secs();
        Ok(format!(
            "{}:{channel}:{uid}:{expires_at}:{}",
            self.identity,
            new_correlation_id()
        ))
    }

    async fn transport_identity(&self) -> Result<String, CredentialError> {
        if self.identity.is_empty() {
            return Err(CredentialError::Identity("no transport identity configured".into()));
        }
        Ok(self.identity.clone())
    }
}

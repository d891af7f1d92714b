//! Error types for credentials, transport calls, joins and publishes.

use std::fmt;

#[derive(Debug, Clone, thiserror::Error)]
pub enum CredentialError {
    #[error("token request failed: {0}")]
    Token(String),

    #[error("transport identity unavailable: {0}")]
    Identity(String),
}

/// Failure classes reported by a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// The transport connection was already torn down underneath the call.
    Disconnected,
    /// The call needs a joined channel and there is none (yet).
    NotJoined,
    /// The local media device could not be opened.
    Device,
    /// Refused by the service: bad token, quota, invalid parameters.
    Rejected,
    Network,
    Other,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::NotJoined => "not joined",
            Self::Device => "device",
            Self::Rejected => "rejected",
            Self::Network => "network",
            Self::Other => "other",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn disconnected(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Disconnected, message)
    }

    pub fn not_joined(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::NotJoined, message)
    }

    pub fn device(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Device, message)
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Rejected, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Network, message)
    }

    /// Whether a publish that failed with this error is worth retrying.
    ///
    /// Only the "connection went away under us" class qualifies; everything
    /// else fails the same way on a retry.
    pub fn is_transient(&self) -> bool {
        matches!(
            self.kind,
            TransportErrorKind::Disconnected | TransportErrorKind::NotJoined
        )
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum JoinError {
    #[error("invalid channel name: {0:?}")]
    InvalidChannel(String),

    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error("transport join failed: {0}")]
    Transport(#[from] TransportError),

    #[error("join of {channel} was superseded before it completed")]
    Cancelled { channel: String },
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum PublishError {
    #[error("could not create local audio track: {0}")]
    Track(TransportError),

    #[error("publish failed: {0}")]
    Transport(TransportError),

    #[error("session changed while publishing")]
    Superseded,
}

impl PublishError {
    /// The underlying transport error, if the failure came from the transport.
    pub fn transport_error(&self) -> Option<&TransportError> {
        match self {
            Self::Track(e) | Self::Transport(e) => Some(e),
            Self::Superseded => None,
        }
    }
}

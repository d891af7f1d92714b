use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a channel connection.
///
/// `Disconnected` is both the initial state and the terminal state of every
/// session. `Publishing` is reserved for the transient publish sub-phase and
/// is accepted wherever a live session is expected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Publishing,
    Reconnecting,
    Disconnecting,
}

impl ConnectionState {
    /// States in which a scheduled publish retry is still worth running.
    pub fn allows_publish_retry(self) -> bool {
        matches!(
            self,
            Self::Connected | Self::Connecting | Self::Publishing | Self::Reconnecting
        )
    }

    /// States between two stable points (neither fully up nor fully down).
    pub fn is_transitional(self) -> bool {
        matches!(
            self,
            Self::Connecting | Self::Disconnecting | Self::Publishing | Self::Reconnecting
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Publishing => "publishing",
            Self::Reconnecting => "reconnecting",
            Self::Disconnecting => "disconnecting",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of media a remote participant publishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Audio,
    Video,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Audio => f.write_str("audio"),
            Self::Video => f.write_str("video"),
        }
    }
}

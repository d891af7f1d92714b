//! Capability interface of the real-time media transport.
//!
//! The manager never talks to a wire protocol directly; it drives a
//! [`TransportClient`] and consumes the [`TransportEvent`] stream that the
//! concrete transport hands out next to the client when it is created.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use huddle_common::MediaKind;

use crate::error::TransportError;

/// The local microphone track.
#[async_trait]
pub trait LocalAudioTrack: Send + Sync + fmt::Debug {
    fn id(&self) -> &str;

    async fn set_muted(&self, muted: bool) -> Result<(), TransportError>;

    /// Release the capture device. Idempotent.
    fn close(&self);
}

/// Playback handle for a remote participant's audio.
pub trait RemoteAudioTrack: Send + Sync + fmt::Debug {
    fn play(&self);

    fn stop(&self);
}

/// Connection states as reported by the transport itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
    Disconnecting,
}

/// Why the transport reports `Disconnected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    /// The local side called `leave`.
    Leave,
    NetworkError,
    ServerError,
    Kicked,
    TokenExpired,
    Other,
}

#[derive(Debug, Clone)]
pub enum TransportEvent {
    ParticipantPublished {
        participant_id: String,
        kind: MediaKind,
    },
    ParticipantUnpublished {
        participant_id: String,
        kind: MediaKind,
    },
    ParticipantLeft {
        participant_id: String,
    },
    /// Remote mute state changed without an unpublish.
    ParticipantMuted {
        participant_id: String,
        muted: bool,
    },
    ConnectionStateChanged {
        current: TransportConnectionState,
        previous: TransportConnectionState,
        reason: Option<DisconnectReason>,
    },
}

/// A connected transport client. One instance is shared by every
/// coordinator of a channel manager.
#[async_trait]
pub trait TransportClient: Send + Sync {
    async fn join(
        &self,
        identity: &str,
        channel: &str,
        token: &str,
        uid: u32,
    ) -> Result<(), TransportError>;

    /// Open the microphone and wrap it in a fresh, unpublished track.
    async fn create_audio_track(&self) -> Result<Arc<dyn LocalAudioTrack>, TransportError>;

    async fn publish(&self, track: &dyn LocalAudioTrack) -> Result<(), TransportError>;

    async fn unpublish(&self, track: &dyn LocalAudioTrack) -> Result<(), TransportError>;

    async fn leave(&self) -> Result<(), TransportError>;

    /// Subscribe to a remote publication. Audio subscriptions return the
    /// playback handle; other kinds return `None`.
    async fn subscribe(
        &self,
        participant_id: &str,
        kind: MediaKind,
    ) -> Result<Option<Arc<dyn RemoteAudioTrack>>, TransportError>;
}

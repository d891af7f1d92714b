//! Real-time channel connection lifecycle management.
//!
//! Joins a multi-party audio channel on an external real-time transport,
//! publishes the local microphone track, tracks remote participants and
//! tears everything down again. The transport and the credential backend
//! are capability traits; [`loopback`] provides an in-process transport for
//! tests and local runs.

pub mod credentials;
pub mod error;
pub mod loopback;
mod manager;
pub mod registry;
pub mod scheduler;
pub mod state;
pub mod transport;
pub mod types;

pub use credentials::{CredentialProvider, StaticCredentialProvider};
pub use error::{CredentialError, JoinError, PublishError, TransportError, TransportErrorKind};
pub use loopback::{LoopbackAudioTrack, LoopbackRemoteTrack, LoopbackTransport};
pub use manager::ChannelManager;
pub use registry::{ParticipantRegistry, RemoteParticipant};
pub use scheduler::{Scheduler, TimerKind};
pub use state::StateCell;
pub use transport::{
    DisconnectReason, LocalAudioTrack, RemoteAudioTrack, TransportClient,
    TransportConnectionState, TransportEvent,
};
pub use types::{ChannelIdentity, ChannelSettings, JoinOutcome, ParticipantSnapshot, RetryBudget};

pub use huddle_common::{ConnectionState, Event, MediaKind};

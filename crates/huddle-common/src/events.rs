use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::types::ConnectionState;

/// Events a channel manager publishes for UI and application observers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Event {
    StateChanged {
        previous: ConnectionState,
        current: ConnectionState,
    },
    Joined { channel: String, uid: u32 },
    JoinFailed { channel: String, reason: String },
    Left { channel: Option<String> },
    ParticipantJoined { participant_id: String },
    ParticipantLeft { participant_id: String },
    LocalAudioPublished,
    PublishAbandoned { reason: String },
    MuteChanged { muted: bool },
    #[serde(other)]
    Unknown,
}

/// Fan-out of [`Event`]s to any number of observers. Slow observers
/// lag and lose the oldest events instead of blocking the publisher.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<Event>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        Self {
            tx: broadcast::Sender::new(capacity),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    /// Returns how many observers received the event.
    pub fn publish(&self, event: Event) -> usize {
        match self.tx.send(event) {
            Ok(delivered) => delivered,
            Err(_) => 0,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

//! The channel manager: one instance per joined (or joinable) channel.
//!
//! All mutable session data lives in [`Session`] behind a single
//! synchronous mutex that is never held across an await. The connection
//! state itself lives in a [`StateCell`] and is only written while that
//! mutex is held, so state and session change together. Every async
//! continuation captures the session generation before suspending and
//! compares it afterwards; a mismatch means a leave, a newer join or a
//! transport disconnect happened in between and the continuation drops its
//! side effects.
//!
//! Lock order: `session` before `registry`. The scheduler's own lock is
//! never held while calling back into the manager.

mod events;
mod join;
mod leave;
mod publish;
#[cfg(test)]
mod tests;

use std::sync::{Arc, Weak};

use huddle_common::{ConnectionState, Event, EventBus};
use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;

use crate::credentials::CredentialProvider;
use crate::error::{JoinError, TransportError};
use crate::registry::ParticipantRegistry;
use crate::scheduler::Scheduler;
use crate::state::StateCell;
use crate::transport::{LocalAudioTrack, TransportClient, TransportEvent};
use crate::types::{ChannelIdentity, ChannelSettings, JoinOutcome, ParticipantSnapshot, RetryBudget};

use join::JoinOrigin;

/// Session data guarded as one unit.
#[derive(Debug)]
struct Session {
    /// Bumped whenever an in-flight operation must be invalidated.
    generation: u64,
    has_joined: bool,
    identity: Option<ChannelIdentity>,
    /// Channel of the join attempt in flight, if any.
    join_target: Option<String>,
    retry: RetryBudget,
    /// Generation of the publish attempt in flight, if any.
    publishing: Option<u64>,
    local_track: Option<Arc<dyn LocalAudioTrack>>,
    is_muted: bool,
}

impl Session {
    fn new(max_retries: u32) -> Self {
        Self {
            generation: 0,
            has_joined: false,
            identity: None,
            join_target: None,
            retry: RetryBudget::new(max_retries),
            publishing: None,
            local_track: None,
            is_muted: false,
        }
    }

    fn bump(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    /// Joined, or a join is in flight. Transport events outside a live
    /// session are leftovers of an earlier one.
    fn is_live(&self) -> bool {
        self.has_joined || self.join_target.is_some()
    }

    fn channel_name(&self) -> Option<&str> {
        self.identity
            .as_ref()
            .map(|identity| identity.name.as_str())
            .or(self.join_target.as_deref())
    }
}

struct Inner {
    transport: Arc<dyn TransportClient>,
    credentials: Arc<dyn CredentialProvider>,
    settings: ChannelSettings,
    state: StateCell,
    session: Mutex<Session>,
    registry: Mutex<ParticipantRegistry>,
    scheduler: Scheduler,
    join_gate: tokio::sync::Mutex<()>,
    leave_gate: tokio::sync::Mutex<()>,
    events: EventBus,
}

impl Inner {
    /// Move to `next` and tell observers. Call with the session lock held.
    fn transition(&self, next: ConnectionState) {
        if let Some(previous) = self.state.set(next) {
            tracing::info!(from = %previous, to = %next, "connection state changed");
            self.events.publish(Event::StateChanged {
                previous,
                current: next,
            });
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        self.session.lock().generation == generation
    }
}

/// Joins a channel, publishes the microphone, tracks remote participants
/// and leaves again.
///
/// Must be created inside a tokio runtime: the constructor spawns the task
/// that consumes the transport's event stream.
pub struct ChannelManager {
    inner: Arc<Inner>,
    pump: JoinHandle<()>,
}

impl ChannelManager {
    pub fn new(
        transport: Arc<dyn TransportClient>,
        transport_events: mpsc::Receiver<TransportEvent>,
        credentials: Arc<dyn CredentialProvider>,
        settings: ChannelSettings,
    ) -> Self {
        let inner = Arc::new(Inner {
            transport,
            credentials,
            state: StateCell::new(),
            session: Mutex::new(Session::new(settings.max_publish_retries)),
            registry: Mutex::new(ParticipantRegistry::new()),
            scheduler: Scheduler::new(),
            join_gate: tokio::sync::Mutex::new(()),
            leave_gate: tokio::sync::Mutex::new(()),
            events: EventBus::new(settings.event_buffer.max(1)),
            settings,
        });
        let pump = tokio::spawn(pump_transport_events(
            Arc::downgrade(&inner),
            transport_events,
        ));
        Self { inner, pump }
    }

    /// Join `channel`, using `uid` or a random non-zero one.
    pub async fn join(&self, channel: &str, uid: Option<u32>) -> Result<JoinOutcome, JoinError> {
        self.inner.join(channel, uid, JoinOrigin::Caller).await
    }

    /// Leave the current channel. Never fails; transport errors are logged
    /// and the manager always ends up disconnected.
    pub async fn leave(&self) {
        self.inner.leave().await;
    }

    /// Flip the microphone mute. Without a published track this does
    /// nothing and returns the current preference.
    pub async fn toggle_mute(&self) -> Result<bool, TransportError> {
        self.inner.toggle_mute().await
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.inner.state.get()
    }

    pub fn is_muted(&self) -> bool {
        self.inner.session.lock().is_muted
    }

    pub fn has_joined(&self) -> bool {
        self.inner.session.lock().has_joined
    }

    pub fn channel(&self) -> Option<ChannelIdentity> {
        self.inner.session.lock().identity.clone()
    }

    pub fn local_audio_track(&self) -> Option<Arc<dyn LocalAudioTrack>> {
        self.inner.session.lock().local_track.clone()
    }

    pub fn remote_participants(&self) -> Vec<ParticipantSnapshot> {
        self.inner.registry.lock().snapshot()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state.subscribe()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<Event> {
        self.inner.events.subscribe()
    }

    /// Number of scheduled publish retries and deferred joins.
    pub fn pending_timers(&self) -> usize {
        self.inner.scheduler.pending()
    }
}

impl Drop for ChannelManager {
    fn drop(&mut self) {
        self.pump.abort();
    }
}

async fn pump_transport_events(inner: Weak<Inner>, mut rx: mpsc::Receiver<TransportEvent>) {
    while let Some(event) = rx.recv().await {
        let Some(inner) = inner.upgrade() else {
            break;
        };
        inner.handle_transport_event(event).await;
    }
    tracing::debug!("transport event stream closed");
}

//! In-process transport for tests and local runs.
//!
//! `LoopbackTransport` behaves like a well-mannered media service: joins
//! succeed, publishes need a joined channel and every call is counted. Tests
//! inject failures and latency, and push remote events through the same
//! channel a real transport would use.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use huddle_common::MediaKind;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::error::TransportError;
use crate::transport::{
    DisconnectReason, LocalAudioTrack, RemoteAudioTrack, TransportClient,
    TransportConnectionState, TransportEvent,
};

// ---------------------------------------------------------------------------
// Tracks
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct LoopbackAudioTrack {
    id: String,
    muted: AtomicBool,
    closed: AtomicBool,
}

impl LoopbackAudioTrack {
    fn new(id: String) -> Self {
        Self {
            id,
            muted: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        }
    }

    pub fn is_muted(&self) -> bool {
        self.muted.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LocalAudioTrack for LoopbackAudioTrack {
    fn id(&self) -> &str {
        &self.id
    }

    async fn set_muted(&self, muted: bool) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::device("track is closed"));
        }
        self.muted.store(muted, Ordering::SeqCst);
        Ok(())
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

#[derive(Debug)]
pub struct LoopbackRemoteTrack {
    participant_id: String,
    playing: AtomicBool,
    plays: AtomicUsize,
}

impl LoopbackRemoteTrack {
    pub fn new(participant_id: impl Into<String>) -> Self {
        Self {
            participant_id: participant_id.into(),
            playing: AtomicBool::new(false),
            plays: AtomicUsize::new(0),
        }
    }

    pub fn participant_id(&self) -> &str {
        &self.participant_id
    }

    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }

    /// How many times `play` was called.
    pub fn play_count(&self) -> usize {
        self.plays.load(Ordering::SeqCst)
    }
}

impl RemoteAudioTrack for LoopbackRemoteTrack {
    fn play(&self) {
        self.plays.fetch_add(1, Ordering::SeqCst);
        self.playing.store(true, Ordering::SeqCst);
    }

    fn stop(&self) {
        self.playing.store(false, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct Latency {
    join: Duration,
    leave: Duration,
    publish: Duration,
    subscribe: Duration,
}

#[derive(Debug, Default)]
struct Faults {
    next_join: Option<TransportError>,
    publish: VecDeque<TransportError>,
    leave: bool,
    unpublish: bool,
    subscribe: bool,
}

#[derive(Debug, Default)]
struct Counters {
    join: AtomicUsize,
    publish: AtomicUsize,
    unpublish: AtomicUsize,
    leave: AtomicUsize,
    subscribe: AtomicUsize,
}

#[derive(Debug)]
struct Shared {
    events: mpsc::Sender<TransportEvent>,
    joined: Mutex<Option<String>>,
    latency: Mutex<Latency>,
    faults: Mutex<Faults>,
    calls: Counters,
    local_tracks: Mutex<Vec<Arc<LoopbackAudioTrack>>>,
    remote_tracks: Mutex<Vec<Arc<LoopbackRemoteTrack>>>,
}

/// Cheap to clone; clones share state.
#[derive(Debug, Clone)]
pub struct LoopbackTransport {
    shared: Arc<Shared>,
}

impl LoopbackTransport {
    /// Create the transport and the receiving end of its event stream.
    pub fn new(buffer: usize) -> (Self, mpsc::Receiver<TransportEvent>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        let shared = Shared {
            events: tx,
            joined: Mutex::new(None),
            latency: Mutex::new(Latency::default()),
            faults: Mutex::new(Faults::default()),
            calls: Counters::default(),
            local_tracks: Mutex::new(Vec::new()),
            remote_tracks: Mutex::new(Vec::new()),
        };
        (
            Self {
                shared: Arc::new(shared),
            },
            rx,
        )
    }

    // -- fault injection ----------------------------------------------------

    pub fn fail_next_join(&self, error: TransportError) {
        self.shared.faults.lock().next_join = Some(error);
    }

    /// Queue a publish failure. Publish calls consume queued failures in order.
    pub fn push_publish_failure(&self, error: TransportError) {
        self.shared.faults.lock().publish.push_back(error);
    }

    pub fn fail_leave(&self, fail: bool) {
        self.shared.faults.lock().leave = fail;
    }

    pub fn fail_unpublish(&self, fail: bool) {
        self.shared.faults.lock().unpublish = fail;
    }

    pub fn fail_subscribe(&self, fail: bool) {
        self.shared.faults.lock().subscribe = fail;
    }

    pub fn set_join_latency(&self, latency: Duration) {
        self.shared.latency.lock().join = latency;
    }

    pub fn set_leave_latency(&self, latency: Duration) {
        self.shared.latency.lock().leave = latency;
    }

    pub fn set_publish_latency(&self, latency: Duration) {
        self.shared.latency.lock().publish = latency;
    }

    pub fn set_subscribe_latency(&self, latency: Duration) {
        self.shared.latency.lock().subscribe = latency;
    }

    // -- remote side --------------------------------------------------------

    pub async fn inject(&self, event: TransportEvent) {
        if self.shared.events.send(event).await.is_err() {
            tracing::debug!("loopback event dropped, receiver closed");
        }
    }

    pub async fn remote_publish(&self, participant_id: &str, kind: MediaKind) {
        self.inject(TransportEvent::ParticipantPublished {
            participant_id: participant_id.to_string(),
            kind,
        })
        .await;
    }

    pub async fn remote_unpublish(&self, participant_id: &str, kind: MediaKind) {
        self.inject(TransportEvent::ParticipantUnpublished {
            participant_id: participant_id.to_string(),
            kind,
        })
        .await;
    }

    pub async fn remote_leave(&self, participant_id: &str) {
        self.inject(TransportEvent::ParticipantLeft {
            participant_id: participant_id.to_string(),
        })
        .await;
    }

    pub async fn remote_mute(&self, participant_id: &str, muted: bool) {
        self.inject(TransportEvent::ParticipantMuted {
            participant_id: participant_id.to_string(),
            muted,
        })
        .await;
    }

    /// Simulate the service dropping the connection.
    pub async fn drop_connection(&self, reason: DisconnectReason) {
        *self.shared.joined.lock() = None;
        self.report_state(
            TransportConnectionState::Connected,
            TransportConnectionState::Disconnected,
            Some(reason),
        )
        .await;
    }

    /// Emit a connection state change as the transport would report it.
    pub async fn report_state(
        &self,
        previous: TransportConnectionState,
        current: TransportConnectionState,
        reason: Option<DisconnectReason>,
    ) {
        self.inject(TransportEvent::ConnectionStateChanged {
            current,
            previous,
            reason,
        })
        .await;
    }

    // -- inspection ---------------------------------------------------------

    pub fn joined_channel(&self) -> Option<String> {
        self.shared.joined.lock().clone()
    }

    pub fn join_calls(&self) -> usize {
        self.shared.calls.join.load(Ordering::SeqCst)
    }

    pub fn publish_calls(&self) -> usize {
        self.shared.calls.publish.load(Ordering::SeqCst)
    }

    pub fn unpublish_calls(&self) -> usize {
        self.shared.calls.unpublish.load(Ordering::SeqCst)
    }

    pub fn leave_calls(&self) -> usize {
        self.shared.calls.leave.load(Ordering::SeqCst)
    }

    pub fn subscribe_calls(&self) -> usize {
        self.shared.calls.subscribe.load(Ordering::SeqCst)
    }

    /// Every local track created so far, oldest first.
    pub fn created_tracks(&self) -> Vec<Arc<LoopbackAudioTrack>> {
        self.shared.local_tracks.lock().clone()
    }

    /// Every remote playback handle handed out for `participant_id`.
    pub fn remote_tracks(&self, participant_id: &str) -> Vec<Arc<LoopbackRemoteTrack>> {
        self.shared
            .remote_tracks
            .lock()
            .iter()
            .filter(|t| t.participant_id == participant_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl TransportClient for LoopbackTransport {
    async fn join(
        &self,
        identity: &str,
        channel: &str,
        token: &str,
        uid: u32,
    ) -> Result<(), TransportError> {
        self.shared.calls.join.fetch_add(1, Ordering::SeqCst);
        let latency = self.shared.latency.lock().join;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        if let Some(error) = self.shared.faults.lock().next_join.take() {
            return Err(error);
        }
        if token.is_empty() {
            return Err(TransportError::rejected("empty token"));
        }

        tracing::debug!(identity, channel, uid, "loopback join");
        self.report_state(
            TransportConnectionState::Disconnected,
            TransportConnectionState::Connecting,
            None,
        )
        .await;
        *self.shared.joined.lock() = Some(channel.to_string());
        self.report_state(
            TransportConnectionState::Connecting,
            TransportConnectionState::Connected,
            None,
        )
        .await;
        Ok(())
    }

    async fn create_audio_track(&self) -> Result<Arc<dyn LocalAudioTrack>, TransportError> {
        let mut tracks = self.shared.local_tracks.lock();
        let track = Arc::new(LoopbackAudioTrack::new(format!("mic-{}", tracks.len() + 1)));
        tracks.push(Arc::clone(&track));
        let handle: Arc<dyn LocalAudioTrack> = track;
        Ok(handle)
    }

    async fn publish(&self, track: &dyn LocalAudioTrack) -> Result<(), TransportError> {
        self.shared.calls.publish.fetch_add(1, Ordering::SeqCst);
        let latency = self.shared.latency.lock().publish;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        if let Some(error) = self.shared.faults.lock().publish.pop_front() {
            return Err(error);
        }
        if self.shared.joined.lock().is_none() {
            return Err(TransportError::not_joined("publish before join"));
        }
        tracing::debug!(track = track.id(), "loopback publish");
        Ok(())
    }

    async fn unpublish(&self, track: &dyn LocalAudioTrack) -> Result<(), TransportError> {
        self.shared.calls.unpublish.fetch_add(1, Ordering::SeqCst);
        if self.shared.faults.lock().unpublish {
            return Err(TransportError::disconnected("unpublish on closed connection"));
        }
        tracing::debug!(track = track.id(), "loopback unpublish");
        Ok(())
    }

    async fn leave(&self) -> Result<(), TransportError> {
        self.shared.calls.leave.fetch_add(1, Ordering::SeqCst);
        let latency = self.shared.latency.lock().leave;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        if self.shared.faults.lock().leave {
            return Err(TransportError::network("leave request timed out"));
        }
        let was_joined = self.shared.joined.lock().take().is_some();
        if was_joined {
            self.report_state(
                TransportConnectionState::Connected,
                TransportConnectionState::Disconnected,
                Some(DisconnectReason::Leave),
            )
            .await;
        }
        Ok(())
    }

    async fn subscribe(
        &self,
        participant_id: &str,
        kind: MediaKind,
    ) -> Result<Option<Arc<dyn RemoteAudioTrack>>, TransportError> {
        self.shared.calls.subscribe.fetch_add(1, Ordering::SeqCst);
        let latency = self.shared.latency.lock().subscribe;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        if self.shared.faults.lock().subscribe {
            return Err(TransportError::network("subscribe timed out"));
        }
        match kind {
            MediaKind::Audio => {
                let track = Arc::new(LoopbackRemoteTrack::new(participant_id));
                self.shared.remote_tracks.lock().push(Arc::clone(&track));
                let handle: Arc<dyn RemoteAudioTrack> = track;
                Ok(Some(handle))
            }
            MediaKind::Video => Ok(None),
        }
    }
}

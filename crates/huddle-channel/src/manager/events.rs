use std::sync::Arc;

use huddle_common::{ConnectionState, Event, MediaKind};

use super::Inner;
use crate::transport::{DisconnectReason, TransportConnectionState, TransportEvent};

impl Inner {
    pub(super) async fn handle_transport_event(self: &Arc<Self>, event: TransportEvent) {
        match event {
            TransportEvent::ConnectionStateChanged {
                current,
                previous,
                reason,
            } => self.on_connection_state(current, previous, reason),
            TransportEvent::ParticipantPublished {
                participant_id,
                kind,
            } => self.on_participant_published(participant_id, kind).await,
            TransportEvent::ParticipantUnpublished {
                participant_id,
                kind,
            } => {
                if self.session_is_live() {
                    tracing::debug!(participant = %participant_id, %kind, "remote unpublished");
                    self.registry.lock().detach(&participant_id, kind);
                }
            }
            TransportEvent::ParticipantLeft { participant_id } => {
                if !self.session_is_live() {
                    return;
                }
                if self.registry.lock().remove(&participant_id).is_some() {
                    tracing::info!(participant = %participant_id, "remote participant left");
                    self.events.publish(Event::ParticipantLeft { participant_id });
                }
            }
            TransportEvent::ParticipantMuted {
                participant_id,
                muted,
            } => {
                if self.session_is_live() {
                    self.registry.lock().set_muted(&participant_id, muted);
                }
            }
        }
    }

    fn session_is_live(&self) -> bool {
        self.session.lock().is_live()
    }

    /// Generation of the live session, if there is one.
    fn live_generation(&self) -> Option<u64> {
        let session = self.session.lock();
        session.is_live().then_some(session.generation)
    }

    fn on_connection_state(
        self: &Arc<Self>,
        current: TransportConnectionState,
        previous: TransportConnectionState,
        reason: Option<DisconnectReason>,
    ) {
        let mut session = self.session.lock();
        if !session.is_live() {
            tracing::debug!(?current, "ignoring connection event outside a session");
            return;
        }
        let state = self.state.get();

        if current == TransportConnectionState::Disconnected {
            if reason == Some(DisconnectReason::Leave) {
                // Caused by our own leave; the leave path owns this transition.
                return;
            }
            tracing::warn!(?reason, %state, "transport disconnected");
            let channel = session.channel_name().map(str::to_string);
            session.bump();
            session.has_joined = false;
            session.identity = None;
            session.join_target = None;
            session.retry.reset();
            let track = session.local_track.take();
            let removed = self.registry.lock().clear();
            self.transition(ConnectionState::Disconnected);
            drop(session);

            self.scheduler.cancel_all();
            if let Some(track) = track {
                track.close();
            }
            tracing::info!(channel = channel.as_deref().unwrap_or("-"), removed, "session dropped by transport");
            return;
        }

        // Until a join commits, the join coordinator drives the state; a
        // running leave likewise owns everything but the final disconnect.
        if !session.has_joined || state == ConnectionState::Disconnecting {
            tracing::debug!(?current, %state, "ignoring connection event during transition");
            return;
        }

        match current {
            TransportConnectionState::Connected => {
                if state == ConnectionState::Connected {
                    return;
                }
                self.transition(ConnectionState::Connected);
                session.retry.reset();
                drop(session);

                if self.schedule_publish_if_missing() {
                    tracing::info!("connection restored, scheduling publish");
                }
            }
            TransportConnectionState::Connecting => {
                // The handshake of a fresh join is reported by the join itself.
                if previous != TransportConnectionState::Disconnected {
                    self.transition(ConnectionState::Connecting);
                }
            }
            TransportConnectionState::Reconnecting => {
                self.transition(ConnectionState::Reconnecting);
            }
            TransportConnectionState::Disconnecting => {
                self.transition(ConnectionState::Disconnecting);
            }
            TransportConnectionState::Disconnected => {}
        }
    }

    async fn on_participant_published(&self, participant_id: String, kind: MediaKind) {
        let Some(generation) = self.live_generation() else {
            tracing::debug!(participant = %participant_id, "ignoring publication outside a session");
            return;
        };

        let subscribed = self.transport.subscribe(&participant_id, kind).await;
        if self.live_generation() != Some(generation) {
            tracing::debug!(participant = %participant_id, "session changed during subscribe");
            if let Ok(Some(track)) = subscribed {
                track.stop();
            }
            return;
        }

        let inserted = match (kind, subscribed) {
            (MediaKind::Audio, Ok(Some(track))) => {
                self.registry.lock().upsert_audio(&participant_id, track)
            }
            (MediaKind::Audio, Ok(None)) => self.registry.lock().ensure(&participant_id),
            (MediaKind::Audio, Err(e)) => {
                tracing::warn!(participant = %participant_id, error = %e, "audio subscribe failed");
                self.registry.lock().ensure(&participant_id)
            }
            (MediaKind::Video, Err(e)) => {
                tracing::debug!(participant = %participant_id, error = %e, "video subscribe failed");
                false
            }
            (MediaKind::Video, Ok(_)) => false,
        };

        if inserted {
            tracing::info!(participant = %participant_id, "remote participant joined");
            self.events.publish(Event::ParticipantJoined { participant_id });
        }
    }
}

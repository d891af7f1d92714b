use std::sync::Arc;

use huddle_common::{ConnectionState, Event};

use super::Inner;
use crate::error::TransportError;

/// Final reset of a leave. Runs on drop so the manager ends up
/// disconnected even if the leave future is abandoned halfway.
struct Teardown<'a> {
    inner: &'a Inner,
    generation: u64,
}

impl Drop for Teardown<'_> {
    fn drop(&mut self) {
        let mut session = self.inner.session.lock();
        if session.generation != self.generation {
            // A transport disconnect or a newer join owns the session now.
            return;
        }
        session.has_joined = false;
        session.identity = None;
        session.join_target = None;
        session.retry.reset();
        session.is_muted = false;
        let removed = self.inner.registry.lock().clear();
        tracing::debug!(removed, "remote participants cleared");
        self.inner.transition(ConnectionState::Disconnected);
    }
}

impl Inner {
    pub(super) async fn leave(self: &Arc<Self>) {
        let _gate = self.leave_gate.lock().await;

        let (generation, track, was_joined, channel) = {
            let mut session = self.session.lock();
            let state = self.state.get();
            if matches!(
                state,
                ConnectionState::Disconnected | ConnectionState::Disconnecting
            ) {
                tracing::debug!(%state, "leave: nothing to do");
                return;
            }
            let channel = session.channel_name().map(str::to_string);
            let generation = session.bump();
            session.join_target = None;
            self.transition(ConnectionState::Disconnecting);
            (
                generation,
                session.local_track.take(),
                session.has_joined,
                channel,
            )
        };
        let teardown = Teardown {
            inner: self,
            generation,
        };
        tracing::info!(channel = channel.as_deref().unwrap_or("-"), "leaving channel");

        self.scheduler.cancel_all();

        if let Some(track) = track {
            if let Err(e) = self.transport.unpublish(track.as_ref()).await {
                tracing::warn!(track = track.id(), error = %e, "unpublish failed during leave");
            }
            track.close();
        }

        if was_joined {
            if let Err(e) = self.transport.leave().await {
                tracing::warn!(error = %e, "transport leave failed, resetting anyway");
            }
        }

        drop(teardown);
        tracing::info!(channel = channel.as_deref().unwrap_or("-"), "left channel");
        self.events.publish(Event::Left { channel });
    }

    pub(super) async fn toggle_mute(&self) -> Result<bool, TransportError> {
        let (track, muted) = {
            let session = self.session.lock();
            match &session.local_track {
                Some(track) => (Arc::clone(track), !session.is_muted),
                None => return Ok(session.is_muted),
            }
        };

        track.set_muted(muted).await?;

        {
            let mut session = self.session.lock();
            let still_ours = session
                .local_track
                .as_ref()
                .is_some_and(|current| Arc::ptr_eq(current, &track));
            if !still_ours {
                return Ok(session.is_muted);
            }
            session.is_muted = muted;
        }
        tracing::info!(muted, "microphone mute toggled");
        self.events.publish(Event::MuteChanged { muted });
        Ok(muted)
    }
}

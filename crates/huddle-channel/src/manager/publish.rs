use std::sync::{Arc, Weak};

use huddle_common::{ConnectionState, Event};

use super::Inner;
use crate::error::{PublishError, TransportError};
use crate::scheduler::{BoxTask, TimerKind};
use crate::transport::LocalAudioTrack;

/// Clears the in-flight publish marker on every exit path. Nothing else
/// clears it, so a publish outliving its session still blocks the next one.
struct PublishingFlag<'a> {
    inner: &'a Inner,
    generation: u64,
}

impl Drop for PublishingFlag<'_> {
    fn drop(&mut self) {
        let mut session = self.inner.session.lock();
        if session.publishing == Some(self.generation) {
            session.publishing = None;
        }
    }
}

impl Inner {
    /// Create and publish the local audio track for `generation`.
    ///
    /// Silently does nothing unless the session is joined, connected, has no
    /// track yet and no other publish is running, including one left over
    /// from an earlier session. When a leftover finishes it hands over by
    /// scheduling a publish for the session that replaced it.
    pub(super) async fn attempt_publish(self: &Arc<Self>, generation: u64) -> Result<(), PublishError> {
        {
            let mut session = self.session.lock();
            let state = self.state.get();
            if session.generation != generation
                || !session.has_joined
                || session.publishing.is_some()
                || session.local_track.is_some()
                || state != ConnectionState::Connected
            {
                tracing::trace!(generation, %state, "publish attempt not applicable");
                return Ok(());
            }
            session.publishing = Some(generation);
        }
        let flag = PublishingFlag {
            inner: self,
            generation,
        };

        let result = match self.publish_fresh_track().await {
            Ok(track) => self.store_published(generation, track).await,
            Err(err) => {
                self.publish_failed(generation, &err);
                Err(err)
            }
        };
        drop(flag);

        if !self.is_current(generation) && self.schedule_publish_if_missing() {
            tracing::info!(generation, "stale publish finished, publishing for the current session");
        }
        result
    }

    /// Schedule the post-join publish for the current session if it is
    /// connected without a track, nothing is publishing and no publish timer
    /// is pending. Returns whether a timer was scheduled.
    pub(super) fn schedule_publish_if_missing(self: &Arc<Self>) -> bool {
        let generation = {
            let session = self.session.lock();
            let idle = session.has_joined
                && session.local_track.is_none()
                && session.publishing.is_none()
                && self.state.get() == ConnectionState::Connected;
            if !idle {
                return false;
            }
            session.generation
        };
        if self.scheduler.pending_of(TimerKind::Publish) > 0 {
            return false;
        }
        self.scheduler.schedule(
            TimerKind::Publish,
            generation,
            self.settings.publish_delay,
            publish_task(Arc::downgrade(self), generation, false),
        );
        true
    }

    async fn publish_fresh_track(&self) -> Result<Arc<dyn LocalAudioTrack>, PublishError> {
        let track = self
            .transport
            .create_audio_track()
            .await
            .map_err(PublishError::Track)?;
        if let Err(e) = self.transport.publish(track.as_ref()).await {
            track.close();
            return Err(PublishError::Transport(e));
        }
        Ok(track)
    }

    async fn store_published(
        &self,
        generation: u64,
        track: Arc<dyn LocalAudioTrack>,
    ) -> Result<(), PublishError> {
        let muted = {
            let mut session = self.session.lock();
            if session.generation != generation || !session.has_joined {
                None
            } else {
                session.local_track = Some(Arc::clone(&track));
                Some(session.is_muted)
            }
        };
        let Some(muted) = muted else {
            // The transport may have been rejoined meanwhile; take the
            // track back off it before closing.
            tracing::info!(track = track.id(), "session changed while publishing, withdrawing track");
            if let Err(e) = self.transport.unpublish(track.as_ref()).await {
                tracing::debug!(track = track.id(), error = %e, "unpublish of stale track failed");
            }
            track.close();
            return Err(PublishError::Superseded);
        };

        if muted {
            if let Err(e) = track.set_muted(true).await {
                tracing::warn!(track = track.id(), error = %e, "could not apply mute to new track");
            }
        }
        tracing::info!(track = track.id(), "local audio published");
        self.events.publish(Event::LocalAudioPublished);
        Ok(())
    }

    /// Schedule a retry for transient failures while budget remains,
    /// otherwise give up and stay connected without audio.
    fn publish_failed(self: &Arc<Self>, generation: u64, err: &PublishError) {
        let transient = err.transport_error().is_some_and(TransportError::is_transient);
        if transient {
            let attempt = {
                let mut session = self.session.lock();
                if session.generation != generation || !session.has_joined {
                    return;
                }
                session.retry.consume()
            };
            if let Some(attempt) = attempt {
                let delay = self.settings.publish_base_delay * attempt;
                tracing::info!(attempt, ?delay, error = %err, "publish failed, retrying");
                self.scheduler.schedule(
                    TimerKind::Publish,
                    generation,
                    delay,
                    publish_task(Arc::downgrade(self), generation, true),
                );
                return;
            }
            tracing::warn!(error = %err, "publish retries exhausted, continuing without audio");
        } else {
            tracing::warn!(error = %err, "publish failed, continuing without audio");
        }
        if self.is_current(generation) {
            self.events.publish(Event::PublishAbandoned {
                reason: err.to_string(),
            });
        }
    }
}

/// Timer body for the post-join publish and for retries. A retry only runs
/// while the session is still joined and in a state that can publish.
pub(super) fn publish_task(inner: Weak<Inner>, generation: u64, retry: bool) -> BoxTask {
    Box::pin(async move {
        let Some(inner) = inner.upgrade() else {
            return;
        };
        if retry {
            let has_joined = inner.session.lock().has_joined;
            let state = inner.state.get();
            if !has_joined || !state.allows_publish_retry() {
                tracing::debug!(%state, has_joined, "dropping publish retry");
                return;
            }
        }
        // Failures are handled inside.
        let _ = inner.attempt_publish(generation).await;
    })
}

use std::sync::{Arc, Weak};

use huddle_common::{ConnectionState, Event};
use rand::Rng;

use super::Inner;
use crate::error::{CredentialError, JoinError};
use crate::scheduler::{BoxTask, TimerKind};
use crate::types::{ChannelIdentity, JoinOutcome};

/// Who asked for a join. Deferred joins are never deferred again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum JoinOrigin {
    Caller,
    Deferred,
}

/// Resets the session to disconnected if an attempt ends without
/// committing, including when the join future is dropped mid-flight.
/// Does nothing once a newer generation owns the session.
struct JoinAttemptGuard<'a> {
    inner: &'a Inner,
    generation: u64,
    committed: bool,
}

impl Drop for JoinAttemptGuard<'_> {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        let mut session = self.inner.session.lock();
        if session.generation != self.generation {
            return;
        }
        session.join_target = None;
        session.has_joined = false;
        session.identity = None;
        self.inner.transition(ConnectionState::Disconnected);
    }
}

fn random_uid() -> u32 {
    rand::thread_rng().gen_range(1..=u32::MAX)
}

impl Inner {
    pub(super) async fn join(
        self: &Arc<Self>,
        channel: &str,
        uid: Option<u32>,
        origin: JoinOrigin,
    ) -> Result<JoinOutcome, JoinError> {
        let channel = channel.trim();
        if channel.is_empty() {
            return Err(JoinError::InvalidChannel(channel.to_string()));
        }

        if self.is_joined_to(channel, &[ConnectionState::Connecting, ConnectionState::Connected]) {
            tracing::debug!(channel, "already joined");
            return Ok(JoinOutcome::AlreadyJoined);
        }

        // At most one attempt in flight. A caller arriving while one runs
        // waits for it and only proceeds if it left us disconnected.
        let _gate = match self.join_gate.try_lock() {
            Ok(gate) => gate,
            Err(_) => {
                tracing::debug!(channel, "join in flight, waiting for it");
                let gate = self.join_gate.lock().await;
                let state = self.state.get();
                if state != ConnectionState::Disconnected {
                    tracing::debug!(channel, %state, "join coalesced with the one in flight");
                    return Ok(JoinOutcome::Coalesced);
                }
                gate
            }
        };

        let state = self.state.get();
        match state {
            ConnectionState::Disconnected => {}
            ConnectionState::Connected if self.is_joined_to(channel, &[state]) => {
                return Ok(JoinOutcome::AlreadyJoined);
            }
            ConnectionState::Connected => {
                tracing::info!(channel, "switching channels, leaving current one first");
                self.leave().await;
            }
            ConnectionState::Reconnecting | ConnectionState::Publishing
                if self.is_joined_to(channel, &[state]) =>
            {
                return Ok(JoinOutcome::AlreadyJoined);
            }
            _ => {}
        }

        let state = self.state.get();
        if state.is_transitional() {
            return match origin {
                JoinOrigin::Caller => {
                    self.defer_join(channel, uid, state);
                    Ok(JoinOutcome::Deferred)
                }
                JoinOrigin::Deferred => {
                    tracing::debug!(channel, %state, "still transitioning, dropping deferred join");
                    Err(JoinError::Cancelled {
                        channel: channel.to_string(),
                    })
                }
            };
        }
        if state != ConnectionState::Disconnected {
            // Another session came up while we were leaving the old one.
            tracing::debug!(channel, %state, "join overtaken");
            return Ok(JoinOutcome::Coalesced);
        }

        let generation = {
            let mut session = self.session.lock();
            let generation = session.bump();
            session.join_target = Some(channel.to_string());
            session.identity = None;
            session.has_joined = false;
            self.transition(ConnectionState::Connecting);
            generation
        };
        // Timers of earlier attempts must not act on this one.
        let cancelled = self.scheduler.cancel_stale(generation);
        if cancelled > 0 {
            tracing::debug!(cancelled, generation, "cancelled timers of earlier attempts");
        }
        let mut guard = JoinAttemptGuard {
            inner: self,
            generation,
            committed: false,
        };

        let uid = uid.unwrap_or_else(random_uid);
        tracing::info!(channel, uid, generation, "joining channel");

        if let Err(err) = self.connect(channel, uid, generation).await {
            if !self.is_current(generation) {
                return Err(JoinError::Cancelled {
                    channel: channel.to_string(),
                });
            }
            tracing::warn!(channel, error = %err, "join failed");
            drop(guard);
            self.events.publish(Event::JoinFailed {
                channel: channel.to_string(),
                reason: err.to_string(),
            });
            return Err(err);
        }

        let committed = {
            let mut session = self.session.lock();
            if session.generation == generation {
                session.join_target = None;
                session.has_joined = true;
                session.identity = Some(ChannelIdentity {
                    name: channel.to_string(),
                    local_uid: uid,
                });
                session.retry.reset();
                self.transition(ConnectionState::Connected);
                true
            } else {
                false
            }
        };

        if !committed {
            tracing::info!(channel, "join superseded after transport join, undoing it");
            if let Err(e) = self.transport.leave().await {
                tracing::warn!(channel, error = %e, "undoing superseded join failed");
            }
            return Err(JoinError::Cancelled {
                channel: channel.to_string(),
            });
        }
        guard.committed = true;

        self.events.publish(Event::Joined {
            channel: channel.to_string(),
            uid,
        });
        self.scheduler.schedule(
            TimerKind::Publish,
            generation,
            self.settings.publish_delay,
            super::publish::publish_task(Arc::downgrade(self), generation, false),
        );
        tracing::info!(channel, uid, "joined channel");
        Ok(JoinOutcome::Joined)
    }

    /// Credentials, then the transport join. Gives up before the transport
    /// call if the attempt was superseded while fetching credentials.
    async fn connect(&self, channel: &str, uid: u32, generation: u64) -> Result<(), JoinError> {
        let (identity, token) = self.fetch_credentials(channel, uid).await?;
        if !self.is_current(generation) {
            return Err(JoinError::Cancelled {
                channel: channel.to_string(),
            });
        }
        self.transport.join(&identity, channel, &token, uid).await?;
        Ok(())
    }

    async fn fetch_credentials(
        &self,
        channel: &str,
        uid: u32,
    ) -> Result<(String, String), CredentialError> {
        let identity = self.credentials.transport_identity().await?;
        let token = self.credentials.issue_token(channel, uid).await?;
        Ok((identity, token))
    }

    fn is_joined_to(&self, channel: &str, states: &[ConnectionState]) -> bool {
        let session = self.session.lock();
        session
            .identity
            .as_ref()
            .is_some_and(|identity| identity.name == channel)
            && states.contains(&self.state.get())
    }

    fn defer_join(self: &Arc<Self>, channel: &str, uid: Option<u32>, state: ConnectionState) {
        // Latest request wins.
        self.scheduler.cancel_kind(TimerKind::DeferredJoin);
        let generation = self.session.lock().generation;
        tracing::info!(channel, %state, "transition in progress, deferring join");
        self.scheduler.schedule(
            TimerKind::DeferredJoin,
            generation,
            self.settings.deferred_join_delay,
            deferred_join_task(Arc::downgrade(self), generation, channel.to_string(), uid),
        );
    }
}

/// Runs the deferred join once, provided nothing replaced the session it
/// was deferred behind and the manager has come to rest disconnected.
fn deferred_join_task(
    inner: Weak<Inner>,
    generation: u64,
    channel: String,
    uid: Option<u32>,
) -> BoxTask {
    Box::pin(async move {
        let Some(inner) = inner.upgrade() else {
            return;
        };
        if !inner.is_current(generation) {
            tracing::debug!(channel, generation, "session moved on, dropping deferred join");
            return;
        }
        let state = inner.state.get();
        if state != ConnectionState::Disconnected {
            tracing::debug!(channel, %state, "dropping deferred join");
            return;
        }
        match inner.join(&channel, uid, JoinOrigin::Deferred).await {
            Ok(outcome) => tracing::debug!(channel, ?outcome, "deferred join finished"),
            Err(e) => tracing::warn!(channel, error = %e, "deferred join failed"),
        }
    })
}

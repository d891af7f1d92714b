//! Configuration, identity and bookkeeping types for the channel manager.

use std::time::Duration;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Timings and budgets of a channel manager.
#[derive(Debug, Clone)]
pub struct ChannelSettings {
    /// Wait between a successful join and the first publish attempt.
    pub publish_delay: Duration,
    /// Backoff unit for publish retries; retry `n` waits `n * publish_base_delay`.
    pub publish_base_delay: Duration,
    pub max_publish_retries: u32,
    /// Wait before a join deferred by an in-progress transition is retried.
    pub deferred_join_delay: Duration,
    /// Capacity of the observer event bus.
    pub event_buffer: usize,
}

impl Default for ChannelSettings {
    fn default() -> Self {
        Self {
            publish_delay: Duration::from_millis(300),
            publish_base_delay: Duration::from_secs(1),
            max_publish_retries: 3,
            deferred_join_delay: Duration::from_millis(500),
            event_buffer: 256,
        }
    }
}

// ---------------------------------------------------------------------------
// Session types
// ---------------------------------------------------------------------------

/// The channel this manager is joined to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelIdentity {
    pub name: String,
    pub local_uid: u32,
}

/// Publish retries left for the current join.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryBudget {
    pub attempt: u32,
    pub max: u32,
}

impl RetryBudget {
    pub fn new(max: u32) -> Self {
        Self { attempt: 0, max }
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    /// Take one retry from the budget, returning its 1-based number, or
    /// `None` once the budget is spent.
    pub fn consume(&mut self) -> Option<u32> {
        if self.attempt < self.max {
            self.attempt += 1;
            Some(self.attempt)
        } else {
            None
        }
    }
}

/// How a successful `join` call was satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    /// This call performed the transport join.
    Joined,
    /// Already joined (or joining) the same channel; nothing was done.
    AlreadyJoined,
    /// Another join was in flight; after it settled there was nothing to do.
    Coalesced,
    /// A transition was in progress; the join is retried once later.
    Deferred,
}

/// Read-only view of a remote participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantSnapshot {
    pub id: String,
    pub has_audio: bool,
    pub is_muted: bool,
}

//! Channel lifecycle and audio publish configuration types.

use serde::{Deserialize, Serialize};

/// Timings of the join coordinator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// Delay between a successful join and the first publish attempt (ms).
    pub publish_delay_ms: u64,
    /// Delay before a join deferred by an in-progress transition is retried (ms).
    pub deferred_join_delay_ms: u64,
    /// Capacity of the observer event bus.
    pub event_buffer: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            publish_delay_ms: 300,
            deferred_join_delay_ms: 500,
            event_buffer: 256,
        }
    }
}

/// Retry budget of the audio publish manager.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishConfig {
    pub max_retries: u32,
    /// Backoff unit; retry `n` waits `n * base_delay_ms`.
    pub base_delay_ms: u64,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1000,
        }
    }
}

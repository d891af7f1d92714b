//! Maps the TOML config onto channel manager settings.

use std::time::Duration;

use huddle_channel::ChannelSettings;
use huddle_config::HuddleConfig;

pub fn channel_settings(config: &HuddleConfig) -> ChannelSettings {
    ChannelSettings {
        publish_delay: Duration::from_millis(config.channel.publish_delay_ms),
        publish_base_delay: Duration::from_millis(config.publish.base_delay_ms),
        max_publish_retries: config.publish.max_retries,
        deferred_join_delay: Duration::from_millis(config.channel.deferred_join_delay_ms),
        event_buffer: config.channel.event_buffer,
    }
}

/// Upper bound on how long the first publish can take, retries included.
pub fn publish_deadline(settings: &ChannelSettings) -> Duration {
    let retries: u32 = (1..=settings.max_publish_retries).sum();
    settings.publish_delay + settings.publish_base_delay * retries + Duration::from_secs(1)
}

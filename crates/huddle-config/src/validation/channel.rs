//! Validation for the `[channel]` and `[publish]` sections.

use crate::schema::HuddleConfig;

use super::helpers::validate_range;

pub(crate) fn validate_channel(errors: &mut Vec<String>, config: &HuddleConfig) {
    validate_range(
        errors,
        "channel.publish_delay_ms",
        config.channel.publish_delay_ms,
        0,
        10_000,
    );
    validate_range(
        errors,
        "channel.deferred_join_delay_ms",
        config.channel.deferred_join_delay_ms,
        50,
        10_000,
    );
    validate_range(
        errors,
        "channel.event_buffer",
        config.channel.event_buffer as u64,
        16,
        4096,
    );
}

pub(crate) fn validate_publish(errors: &mut Vec<String>, config: &HuddleConfig) {
    validate_range(
        errors,
        "publish.max_retries",
        u64::from(config.publish.max_retries),
        0,
        10,
    );
    validate_range(
        errors,
        "publish.base_delay_ms",
        config.publish.base_delay_ms,
        100,
        30_000,
    );
}

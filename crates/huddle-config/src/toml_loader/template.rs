//! Default TOML config template with inline documentation comments.

/// Generate the default TOML config content with comments.
pub(crate) fn default_config_toml() -> String {
    r##"# Huddle Configuration
# Schema version 1
# Only override what you want to change -- missing fields use defaults.

[channel]
# publish_delay_ms = 300        # 0-10000, wait after join before publishing audio
# deferred_join_delay_ms = 500  # 50-10000, retry delay for a join deferred by a transition
# event_buffer = 256            # 16-4096

[publish]
# max_retries = 3               # 0-10
# base_delay_ms = 1000          # 100-30000, retry n waits n * base_delay_ms

[credentials]
# transport_identity = "huddle-dev"
# token_ttl_secs = 3600         # 60-86400

[logging]
# level = "info"                # trace, debug, info, warn, error
"##
    .to_string()
}

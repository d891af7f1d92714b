//! Validation for the `[credentials]` section.

use crate::schema::HuddleConfig;

use super::helpers::validate_range;

pub(crate) fn validate_credentials(errors: &mut Vec<String>, config: &HuddleConfig) {
    if config.credentials.transport_identity.trim().is_empty() {
        errors.push("credentials.transport_identity must not be empty".into());
    }
    validate_range(
        errors,
        "credentials.token_ttl_secs",
        config.credentials.token_ttl_secs,
        60,
        86_400,
    );
}

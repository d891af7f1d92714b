use uuid::Uuid;

/// Eight hex characters taken from a fresh v4 uuid. Enough to tell
/// apart tokens and log lines within one run, not globally unique.
pub fn new_correlation_id() -> String {
    let simple = Uuid::new_v4().simple().to_string();
    simple[..8].to_string()
}

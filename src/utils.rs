use sha2::{Digest, Sha256};

use crate::config::LoggingConfig;

/// Creates a truncated, salted hash of an identifier for safe logging.
pub fn log_safe_id(id: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(id.as_bytes());
    let hash = hasher.finalize();

    hash[..4]
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<String>()
}

/// Renders a user id for log output, honoring the privacy configuration:
/// the raw id when identifiers are enabled, a salted hash otherwise.
pub fn display_user(id: &str, logging: &LoggingConfig) -> String {
    if logging.enable_user_identifiers {
        id.to_string()
    } else {
        log_safe_id(id, &logging.hash_salt)
    }
}

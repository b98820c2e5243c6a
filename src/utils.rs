use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

/// Short, non-reversible token label for logs. Tokens themselves are never
/// logged.
pub fn token_fingerprint(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    let hash = hex::encode(hasher.finalize());
    hash[..12].to_string()
}

pub fn utc_now() -> DateTime<Utc> {
    Utc::now()
}

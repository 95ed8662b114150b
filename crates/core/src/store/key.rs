//! Request-identity keys for bucket entries.

use sha2::{Digest, Sha256};

/// Compute the entry key for a request identity (method + URL).
pub fn entry_key(method: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}

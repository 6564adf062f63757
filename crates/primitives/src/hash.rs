use sha2::{Digest, Sha256};

/// SHA-256 of `data`, hex-encoded — used for SHATTER's plaintext chunk
/// fingerprints (§3).
#[must_use]
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

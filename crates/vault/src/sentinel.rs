//! The VAULT sentinel's crypto format: an AEAD record over a fixed magic
//! string, proving "this folder is locked by this passphrase" (§3, §4.4,
//! §6.1). This module only knows the wire format; the state machine
//! (PLAIN/LOCKED-THIS-KEY/LOCKED-OTHER/CORRUPT) lives in `engine.rs`, which
//! is also where the master key gets derived.

use antigravity_primitives::aead::{aead_encrypt_random_nonce, aead_open};
use antigravity_primitives::error::Result;
use antigravity_primitives::kdf::derive_subkey;
use antigravity_primitives::KeyMaterial;

pub const FILENAME: &str = ".vault_manifest";
pub const MAGIC: &[u8] = b"ANTIGRAVITY_VAULT_OK_v2";

/// HKDF salt/info pair resolving the open question in spec.md §9: the
/// upstream implementation (`SecurityManager.derive_file_key`) always uses
/// the fixed info label `"file-encryption-key"` and treats the *salt*
/// parameter as the overloaded slot — a real per-file salt for file
/// encryption, or one of these fixed label strings for the sentinel and
/// filename subkeys.
const MANIFEST_KEY_SALT: &[u8] = b"MANIFEST_KEY_SALT";
const HKDF_INFO: &[u8] = b"file-encryption-key";

/// Derives the subkey the sentinel's magic string is encrypted under.
///
/// # Errors
/// Returns [`Error::Crypto`] if HKDF expansion fails.
pub fn derive_sentinel_key(master: &KeyMaterial) -> Result<KeyMaterial> {
    derive_subkey(master, MANIFEST_KEY_SALT, HKDF_INFO)
}

/// Builds `nonce(12) ‖ AEAD_ct(MAGIC)` for a freshly-created sentinel. The
/// caller prepends the vault salt before writing to disk.
///
/// # Errors
/// Returns [`Error::Crypto`] if the platform CSPRNG or AEAD seal fails.
pub fn build(master: &KeyMaterial) -> Result<Vec<u8>> {
    let key = derive_sentinel_key(master)?;
    let (nonce, ciphertext) = aead_encrypt_random_nonce(&key, MAGIC, b"")?;
    let mut body = Vec::with_capacity(nonce.len() + ciphertext.len());
    body.extend_from_slice(&nonce);
    body.extend_from_slice(&ciphertext);
    Ok(body)
}

/// True if `nonce ‖ ciphertext` decrypts under `master` to exactly
/// [`MAGIC`]. A decrypt failure (wrong key, tampered bytes) is reported as
/// `Ok(false)`, never propagated — the caller decides what that means
/// (wrong passphrase vs. corrupt sentinel) rather than this module building
/// an oracle.
///
/// # Errors
/// Returns [`Error::Crypto`] only if subkey derivation itself fails.
pub fn verify(master: &KeyMaterial, nonce: &[u8], ciphertext: &[u8]) -> Result<bool> {
    let key = derive_sentinel_key(master)?;
    Ok(matches!(aead_open(&key, nonce, ciphertext, b""), Ok(pt) if pt == MAGIC))
}

#[cfg(test)]
mod tests {
    use super::*;
    use antigravity_primitives::kdf::derive_master_key_scrypt;

    #[test]
    fn build_then_verify_with_same_master_succeeds() {
        let master = derive_master_key_scrypt("pw", b"0123456789abcdef").unwrap();
        let body = build(&master).unwrap();
        let (nonce, ct) = body.split_at(12);
        assert!(verify(&master, nonce, ct).unwrap());
    }

    #[test]
    fn verify_with_different_master_fails_without_erroring() {
        let master_a = derive_master_key_scrypt("pw-a", b"0123456789abcdef").unwrap();
        let master_b = derive_master_key_scrypt("pw-b", b"0123456789abcdef").unwrap();
        let body = build(&master_a).unwrap();
        let (nonce, ct) = body.split_at(12);
        assert!(!verify(&master_b, nonce, ct).unwrap());
    }
}

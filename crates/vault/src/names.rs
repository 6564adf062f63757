//! Filename and directory-name encryption (§3, §4.4, §6.1): one subkey per
//! vault, AEAD over the UTF-8 name with no associated data, encoded as
//! URL-safe base64 so the result is a legal path component everywhere.

use antigravity_primitives::aead::{aead_encrypt_random_nonce, aead_open, NONCE_SIZE};
use antigravity_primitives::error::{Error, Result};
use antigravity_primitives::kdf::derive_subkey;
use antigravity_primitives::KeyMaterial;
use base64::engine::general_purpose::URL_SAFE as B64_URL_SAFE;
use base64::Engine as _;

const FILENAME_ENCRYPTION_SALT: &[u8] = b"FILENAME_ENCRYPTION_SALT";
const HKDF_INFO: &[u8] = b"file-encryption-key";

/// # Errors
/// Returns [`Error::Crypto`] if HKDF expansion fails.
pub fn derive_name_key(master: &KeyMaterial) -> Result<KeyMaterial> {
    derive_subkey(master, FILENAME_ENCRYPTION_SALT, HKDF_INFO)
}

/// Encrypts `name` (a single path component, not a full path) to
/// `base64-urlsafe(nonce ‖ ciphertext ‖ tag)`.
///
/// # Errors
/// Returns [`Error::Crypto`] if the platform CSPRNG or AEAD seal fails.
pub fn encrypt_name(name_key: &KeyMaterial, name: &str) -> Result<String> {
    let (nonce, ciphertext) = aead_encrypt_random_nonce(name_key, name.as_bytes(), b"")?;
    let mut body = Vec::with_capacity(nonce.len() + ciphertext.len());
    body.extend_from_slice(&nonce);
    body.extend_from_slice(&ciphertext);
    Ok(B64_URL_SAFE.encode(body))
}

/// Inverse of [`encrypt_name`]. A malformed token or a token that does not
/// decrypt to valid UTF-8 is reported the same way as a bad key: `Err`.
///
/// # Errors
/// Returns [`Error::Format`] for a token that is not valid base64, is too
/// short to contain a nonce, or decrypts to non-UTF-8 bytes.
/// Returns [`Error::Crypto`] if AEAD verification fails.
pub fn decrypt_name(name_key: &KeyMaterial, token: &str) -> Result<String> {
    let data = B64_URL_SAFE
        .decode(token)
        .map_err(|e| Error::Format(format!("not a valid encrypted name: {e}")))?;
    if data.len() < NONCE_SIZE {
        return Err(Error::Format("encrypted name too short to contain a nonce".to_string()));
    }
    let (nonce, ciphertext) = data.split_at(NONCE_SIZE);
    let plaintext = aead_open(name_key, nonce, ciphertext, b"")?;
    String::from_utf8(plaintext).map_err(|e| Error::Format(format!("decrypted name is not valid UTF-8: {e}")))
}

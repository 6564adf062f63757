use crate::error::{CryptoFault, Error, Result};
use crate::keymaterial::KeyMaterial;
use chacha20poly1305::aead::{Aead, Payload};
use chacha20poly1305::{ChaCha20Poly1305, KeyInit, Nonce};

pub const NONCE_SIZE: usize = 12;
pub const TAG_SIZE: usize = 16;

/// Encrypts `plaintext` with ChaCha20-Poly1305 under a fresh random nonce.
/// Returns `(nonce, ciphertext ‖ tag)`.
///
/// # Errors
/// Returns [`Error::Crypto`] if the platform CSPRNG fails or the cipher
/// rejects the inputs (the latter should not happen for valid sizes).
pub fn aead_encrypt_random_nonce(key: &KeyMaterial, plaintext: &[u8], ad: &[u8]) -> Result<([u8; NONCE_SIZE], Vec<u8>)> {
    let mut nonce_bytes = [0u8; NONCE_SIZE];
    getrandom::fill(&mut nonce_bytes)
        .map_err(|e| Error::crypto(CryptoFault::Kdf(format!("getrandom failed: {e}"))))?;
    let ct = aead_seal(key, &nonce_bytes, plaintext, ad)?;
    Ok((nonce_bytes, ct))
}

/// Encrypts `plaintext` under an explicit, caller-derived nonce. Used by
/// SHATTER, where every (key, nonce) pair is unique by construction even
/// though the nonce itself is deterministic (§3, Invariants).
///
/// # Errors
/// Returns [`Error::Crypto`] if the cipher rejects the inputs.
pub fn aead_seal(key: &KeyMaterial, nonce: &[u8; NONCE_SIZE], plaintext: &[u8], ad: &[u8]) -> Result<Vec<u8>> {
    let cipher = ChaCha20Poly1305::new(key.as_bytes().into());
    cipher
        .encrypt(Nonce::from_slice(nonce), Payload { msg: plaintext, aad: ad })
        .map_err(|_| Error::crypto(CryptoFault::AeadVerification))
}

/// Decrypts `ciphertext ‖ tag` with ChaCha20-Poly1305. AD mismatch,
/// truncated tag, or tampered ciphertext all collapse to the same
/// [`CryptoFault::AeadVerification`] (§4.2, Failure modes).
///
/// # Errors
/// Returns [`Error::Crypto`] if the authenticator does not verify.
pub fn aead_open(key: &KeyMaterial, nonce: &[u8], ciphertext: &[u8], ad: &[u8]) -> Result<Vec<u8>> {
    if nonce.len() != NONCE_SIZE {
        return Err(Error::crypto(CryptoFault::MalformedHeader));
    }
    let cipher = ChaCha20Poly1305::new(key.as_bytes().into());
    cipher
        .decrypt(Nonce::from_slice(nonce), Payload { msg: ciphertext, aad: ad })
        .map_err(|_| Error::crypto(CryptoFault::AeadVerification))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_with_ad() {
        let key = KeyMaterial::random().unwrap();
        let (nonce, ct) = aead_encrypt_random_nonce(&key, b"hello world", b"ad").unwrap();
        let pt = aead_open(&key, &nonce, &ct, b"ad").unwrap();
        assert_eq!(pt, b"hello world");
    }

    #[test]
    fn wrong_ad_fails() {
        let key = KeyMaterial::random().unwrap();
        let (nonce, ct) = aead_encrypt_random_nonce(&key, b"hello world", b"ad-a").unwrap();
        assert!(aead_open(&key, &nonce, &ct, b"ad-b").is_err());
    }

    #[test]
    fn tamper_detection() {
        let key = KeyMaterial::random().unwrap();
        let (nonce, mut ct) = aead_encrypt_random_nonce(&key, b"payload", b"ad").unwrap();
        ct[0] ^= 0x01;
        assert!(aead_open(&key, &nonce, &ct, b"ad").is_err());
    }

    #[test]
    fn deterministic_nonce_path_roundtrips() {
        let key = KeyMaterial::random().unwrap();
        let nonce = [7u8; NONCE_SIZE];
        let ct = aead_seal(&key, &nonce, b"chunk body", b"ctx").unwrap();
        let pt = aead_open(&key, &nonce, &ct, b"ctx").unwrap();
        assert_eq!(pt, b"chunk body");
    }
}

use antigravity_primitives::aead::{aead_encrypt_random_nonce, aead_open, NONCE_SIZE, TAG_SIZE};
use antigravity_primitives::error::{CryptoFault, Error, Result};
use antigravity_primitives::KeyMaterial;

/// `wrap(master, key_to_wrap, ctx) -> nonce(12) ‖ AEAD(master, key_to_wrap, AD=ctx)`
/// (§4.2). `ctx` MUST be the identity of the thing the key belongs to — in
/// SHATTER, the chunk's UUID string — so a wrapped key cannot be moved to
/// another slot without the unwrap failing.
///
/// # Errors
/// Returns [`Error::Crypto`] if the platform CSPRNG or AEAD seal fails.
pub fn wrap_key(master: &KeyMaterial, key_to_wrap: &[u8; 32], ctx: &str) -> Result<Vec<u8>> {
    let (nonce, ciphertext) = aead_encrypt_random_nonce(master, key_to_wrap, ctx.as_bytes())?;
    let mut out = Vec::with_capacity(NONCE_SIZE + key_to_wrap.len() + TAG_SIZE);
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Unwraps a key wrapped by [`wrap_key`]. Unwrapping under the wrong
/// context always fails with the same generic crypto error as a corrupted
/// ciphertext — never a distinct oracle (§4.2).
///
/// # Errors
/// Returns [`Error::Crypto`] if the wrapped blob is too short to contain a
/// nonce, or AEAD verification fails.
pub fn unwrap_key(master: &KeyMaterial, wrapped: &[u8], ctx: &str) -> Result<[u8; 32]> {
    if wrapped.len() < NONCE_SIZE {
        return Err(Error::crypto(CryptoFault::KeyUnwrap));
    }
    let (nonce, ciphertext) = wrapped.split_at(NONCE_SIZE);
    let plaintext = aead_open(master, nonce, ciphertext, ctx.as_bytes()).map_err(|_| Error::crypto(CryptoFault::KeyUnwrap))?;
    plaintext.try_into().map_err(|_| Error::crypto(CryptoFault::KeyUnwrap))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_returns_exact_bytes() {
        let master = KeyMaterial::random().unwrap();
        let key_to_wrap = [42u8; 32];
        let wrapped = wrap_key(&master, &key_to_wrap, "chunk-uuid-1").unwrap();
        let unwrapped = unwrap_key(&master, &wrapped, "chunk-uuid-1").unwrap();
        assert_eq!(unwrapped, key_to_wrap);
    }

    #[test]
    fn wrong_context_fails() {
        let master = KeyMaterial::random().unwrap();
        let key_to_wrap = [7u8; 32];
        let wrapped = wrap_key(&master, &key_to_wrap, "chunk-uuid-1").unwrap();
        assert!(unwrap_key(&master, &wrapped, "chunk-uuid-2").is_err());
    }

    #[test]
    fn wrong_master_key_fails() {
        let master_a = KeyMaterial::random().unwrap();
        let master_b = KeyMaterial::random().unwrap();
        let key_to_wrap = [3u8; 32];
        let wrapped = wrap_key(&master_a, &key_to_wrap, "ctx").unwrap();
        assert!(unwrap_key(&master_b, &wrapped, "ctx").is_err());
    }
}

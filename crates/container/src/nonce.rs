use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// `nonce(key, ctx) = HMAC_SHA256(key, ctx)[0:12]` (§4.1). SHATTER's only
/// safe use of a deterministic nonce: each chunk carries its own
/// independently random key, so the (key, nonce) pair is still unique even
/// though the nonce is a pure function of that key and the chunk index.
#[must_use]
pub fn deterministic_nonce(key: &[u8], ctx: &[u8]) -> [u8; 12] {
    // HMAC accepts any key length, so this never fails.
    let mut mac = <HmacSha256 as Mac>::new_from_slice(key).expect("HMAC accepts keys of any length");
    mac.update(ctx);
    let digest = mac.finalize().into_bytes();
    let mut nonce = [0u8; 12];
    nonce.copy_from_slice(&digest[..12]);
    nonce
}

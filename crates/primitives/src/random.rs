use crate::error::{CryptoFault, Error, Result};
use subtle::ConstantTimeEq;

/// Platform CSPRNG bytes (§4.1). No userspace PRNG reseeding; this is a
/// thin, honest wrapper over `getrandom` so call sites never reach for
/// `rand::thread_rng` out of habit.
///
/// # Errors
/// Propagates failure from the platform CSPRNG.
pub fn random_bytes(len: usize) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; len];
    getrandom::fill(&mut buf).map_err(|e| Error::crypto(CryptoFault::Kdf(format!("getrandom failed: {e}"))))?;
    Ok(buf)
}

/// Constant-time equality for MAC-like values (§4.1). Never use `==` on a
/// tag, digest, or verifier — timing differences leak how many leading
/// bytes matched.
#[must_use]
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_bytes_have_requested_length() {
        assert_eq!(random_bytes(16).unwrap().len(), 16);
    }

    #[test]
    fn constant_time_eq_matches_naive_eq() {
        assert!(constant_time_eq(b"abcd", b"abcd"));
        assert!(!constant_time_eq(b"abcd", b"abce"));
        assert!(!constant_time_eq(b"abc", b"abcd"));
    }
}

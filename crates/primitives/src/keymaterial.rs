use zeroize::Zeroize;

/// A 32-byte secret key that scrubs itself on drop.
///
/// Master keys, subkeys, and SHATTER chunk keys are all `KeyMaterial`; none
/// of them are ever written to disk unwrapped (§9, Secret lifetime).
#[derive(Clone)]
pub struct KeyMaterial(pub(crate) [u8; 32]);

impl KeyMaterial {
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// 32 fresh CSPRNG bytes, used for SHATTER's per-chunk keys.
    ///
    /// # Errors
    /// Propagates failure from the platform CSPRNG.
    pub fn random() -> crate::error::Result<Self> {
        let mut k = [0u8; 32];
        getrandom::fill(&mut k).map_err(|e| {
            crate::error::Error::crypto(crate::error::CryptoFault::Kdf(format!(
                "getrandom failed: {e}"
            )))
        })?;
        Ok(Self(k))
    }
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("KeyMaterial(..)")
    }
}

impl Drop for KeyMaterial {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

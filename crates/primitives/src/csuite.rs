//! The dynamic-dispatch seam named in the design notes: replace the
//! original's module-level crypto globals with a single trait so an
//! engine's platform backend is swappable without touching call sites.

use crate::aead;
use crate::error::Result;
use crate::hash::sha256_hex;
use crate::kdf;
use crate::keymaterial::KeyMaterial;
use crate::random::{constant_time_eq, random_bytes};

/// Which memory-hard KDF a caller wants. Baked into format versions (§4.1,
/// §9) — never selected by process-global configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KdfAlgorithm {
    Argon2idShatter,
    ScryptVault,
}

pub trait CryptoSuite {
    fn kdf(&self, algorithm: KdfAlgorithm, passphrase: &str, salt: &[u8]) -> Result<KeyMaterial>;
    fn hkdf(&self, master: &KeyMaterial, salt: &[u8], info: &[u8]) -> Result<KeyMaterial>;
    fn aead_seal(&self, key: &KeyMaterial, nonce: &[u8; aead::NONCE_SIZE], plaintext: &[u8], ad: &[u8]) -> Result<Vec<u8>>;
    fn aead_open(&self, key: &KeyMaterial, nonce: &[u8], ciphertext: &[u8], ad: &[u8]) -> Result<Vec<u8>>;
    fn hash_hex(&self, data: &[u8]) -> String;
    fn random(&self, len: usize) -> Result<Vec<u8>>;
    fn constant_time_eq(&self, a: &[u8], b: &[u8]) -> bool;
}

/// The only implementation shipped today: Argon2id/scrypt + ChaCha20-Poly1305
/// + SHA-256, backed by the platform CSPRNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct ChaChaSuite;

impl CryptoSuite for ChaChaSuite {
    fn kdf(&self, algorithm: KdfAlgorithm, passphrase: &str, salt: &[u8]) -> Result<KeyMaterial> {
        match algorithm {
            KdfAlgorithm::Argon2idShatter => kdf::derive_master_key_argon2id(passphrase, salt),
            KdfAlgorithm::ScryptVault => kdf::derive_master_key_scrypt(passphrase, salt),
        }
    }

    fn hkdf(&self, master: &KeyMaterial, salt: &[u8], info: &[u8]) -> Result<KeyMaterial> {
        kdf::derive_subkey(master, salt, info)
    }

    fn aead_seal(&self, key: &KeyMaterial, nonce: &[u8; aead::NONCE_SIZE], plaintext: &[u8], ad: &[u8]) -> Result<Vec<u8>> {
        aead::aead_seal(key, nonce, plaintext, ad)
    }

    fn aead_open(&self, key: &KeyMaterial, nonce: &[u8], ciphertext: &[u8], ad: &[u8]) -> Result<Vec<u8>> {
        aead::aead_open(key, nonce, ciphertext, ad)
    }

    fn hash_hex(&self, data: &[u8]) -> String {
        sha256_hex(data)
    }

    fn random(&self, len: usize) -> Result<Vec<u8>> {
        random_bytes(len)
    }

    fn constant_time_eq(&self, a: &[u8], b: &[u8]) -> bool {
        constant_time_eq(a, b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suite_roundtrips_through_trait_object() {
        let suite: Box<dyn CryptoSuite> = Box::new(ChaChaSuite);
        let master = suite.kdf(KdfAlgorithm::ScryptVault, "pw", b"0123456789abcdef").unwrap();
        let sub = suite.hkdf(&master, b"file-salt-16byte", b"file-encryption-key").unwrap();
        let nonce = [1u8; aead::NONCE_SIZE];
        let ct = suite.aead_seal(&sub, &nonce, b"data", b"ad").unwrap();
        let pt = suite.aead_open(&sub, &nonce, &ct, b"ad").unwrap();
        assert_eq!(pt, b"data");
    }
}

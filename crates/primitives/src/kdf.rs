use crate::error::{CryptoFault, Error, Result};
use crate::keymaterial::KeyMaterial;
use argon2::{Algorithm, Argon2, Params, Version};
use hkdf::Hkdf;
use sha2::Sha256;

/// SHATTER's manifest KDF: Argon2id, m=64 MiB, t=2, p=2 (§4.1, §6.1).
/// Baked into the SHATTER format version — never read from process config.
pub struct ShatterKdfParams;

impl ShatterKdfParams {
    const M_COST_KIB: u32 = 65_536;
    const T_COST: u32 = 2;
    const P_COST: u32 = 2;
}

/// VAULT's sentinel/file KDF: scrypt N=2^16, r=8, p=1 (§4.1, §6.1).
pub struct VaultKdfParams;

impl VaultKdfParams {
    const LOG_N: u8 = 16;
    const R: u32 = 8;
    const P: u32 = 1;
}

/// `derive_master_key` for SHATTER manifests (Argon2id).
///
/// # Errors
/// Returns [`Error::Crypto`] if Argon2 rejects the parameters or derivation
/// itself fails (both indicate a corrupt or hostile manifest, never a
/// legitimate caller error).
pub fn derive_master_key_argon2id(passphrase: &str, salt: &[u8]) -> Result<KeyMaterial> {
    let argon2 = Argon2::new(
        Algorithm::Argon2id,
        Version::V0x13,
        Params::new(
            ShatterKdfParams::M_COST_KIB,
            ShatterKdfParams::T_COST,
            ShatterKdfParams::P_COST,
            Some(32),
        )
        .map_err(|e| Error::crypto(CryptoFault::Kdf(e.to_string())))?,
    );
    let mut out = [0u8; 32];
    argon2
        .hash_password_into(passphrase.as_bytes(), salt, &mut out)
        .map_err(|e| Error::crypto(CryptoFault::Kdf(e.to_string())))?;
    Ok(KeyMaterial::from_bytes(out))
}

/// `derive_master_key` for VAULT sentinels/files (scrypt).
///
/// # Errors
/// Returns [`Error::Crypto`] if scrypt's parameters are rejected or
/// derivation fails.
pub fn derive_master_key_scrypt(passphrase: &str, salt: &[u8]) -> Result<KeyMaterial> {
    let params = scrypt::Params::new(VaultKdfParams::LOG_N, VaultKdfParams::R, VaultKdfParams::P, 32)
        .map_err(|e| Error::crypto(CryptoFault::Kdf(e.to_string())))?;
    let mut out = [0u8; 32];
    scrypt::scrypt(passphrase.as_bytes(), salt, &params, &mut out)
        .map_err(|e| Error::crypto(CryptoFault::Kdf(e.to_string())))?;
    Ok(KeyMaterial::from_bytes(out))
}

/// HKDF-SHA-256 subkey derivation: `derive_subkey(master, salt, info) -> 32B`
/// (§4.1). Used for VAULT's per-file key and name key.
///
/// # Errors
/// Returns [`Error::Crypto`] if HKDF's output-length expansion fails (it
/// cannot for a 32-byte output with SHA-256, but the fallible API is kept
/// honest rather than unwrapped).
pub fn derive_subkey(master: &KeyMaterial, salt: &[u8], info: &[u8]) -> Result<KeyMaterial> {
    let hk = Hkdf::<Sha256>::new(Some(salt), master.as_bytes());
    let mut out = [0u8; 32];
    hk.expand(info, &mut out)
        .map_err(|e| Error::crypto(CryptoFault::Kdf(e.to_string())))?;
    Ok(KeyMaterial::from_bytes(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex::encode as hex_encode;

    #[test]
    fn argon2id_is_deterministic_and_salt_sensitive() {
        let a = derive_master_key_argon2id("correct horse battery staple", b"salt-one-sixteen").unwrap();
        let b = derive_master_key_argon2id("correct horse battery staple", b"salt-one-sixteen").unwrap();
        let c = derive_master_key_argon2id("correct horse battery staple", b"salt-two-sixteen").unwrap();
        assert_eq!(hex_encode(a.as_bytes()), hex_encode(b.as_bytes()));
        assert_ne!(hex_encode(a.as_bytes()), hex_encode(c.as_bytes()));
    }

    #[test]
    fn scrypt_is_deterministic_and_salt_sensitive() {
        let a = derive_master_key_scrypt("hunter2", b"salt-one-sixteen").unwrap();
        let b = derive_master_key_scrypt("hunter2", b"salt-one-sixteen").unwrap();
        let c = derive_master_key_scrypt("hunter2", b"salt-two-sixteen").unwrap();
        assert_eq!(hex_encode(a.as_bytes()), hex_encode(b.as_bytes()));
        assert_ne!(hex_encode(a.as_bytes()), hex_encode(c.as_bytes()));
    }

    #[test]
    fn subkey_derivation_differs_by_info_label() {
        let master = derive_master_key_scrypt("pw", b"0123456789abcdef").unwrap();
        let file_key = derive_subkey(&master, b"file-salt-16byte", b"file-encryption-key").unwrap();
        let name_key = derive_subkey(&master, b"FILENAME_ENCRYPTION_SALT", b"").unwrap();
        assert_ne!(hex_encode(file_key.as_bytes()), hex_encode(name_key.as_bytes()));
    }
}

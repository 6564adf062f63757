//! Cryptographic primitives shared by the SHATTER and VAULT engines:
//! password-based key derivation, HKDF subkeys, AEAD, hashing, CSPRNG
//! bytes, and constant-time comparison (spec §4.1).

pub mod aead;
pub mod csuite;
pub mod error;
pub mod hash;
pub mod kdf;
pub mod keymaterial;
pub mod random;

pub use csuite::{ChaChaSuite, CryptoSuite, KdfAlgorithm};
pub use error::{CryptoFault, Error, Result};
pub use keymaterial::KeyMaterial;

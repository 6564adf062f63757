//! Shared crypto container plumbing used by both SHATTER and VAULT (§4.2):
//! identity-bound key wrapping, deterministic nonce derivation, and the
//! atomic/secure file I/O both engines' at-rest formats depend on.

pub mod fsops;
pub mod nonce;
pub mod wrap;

pub use fsops::{secure_delete, write_atomic};
pub use nonce::deterministic_nonce;
pub use wrap::{unwrap_key, wrap_key};

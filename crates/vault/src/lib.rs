//! Folder-scoped encryption: stream-encrypt every file inside a folder in
//! place, rewrite every file and directory name under AEAD, and gate the
//! whole operation behind a per-folder sentinel manifest (§4.4).

pub mod config;
pub mod engine;
pub mod names;
pub mod path_policy;
pub mod sentinel;
pub mod walker;

pub use config::EngineConfig;
pub use engine::{SentinelState, VaultEngine};
pub use path_policy::ENCRYPTED_EXT;
pub use sentinel::FILENAME as SENTINEL_FILENAME;

/// `(fraction_in_0_1, human_status)` progress callback (§2, §5). Mirrors
/// `antigravity_shatter::ProgressFn` — duplicated rather than shared across
/// crates since it is a single-line alias and neither engine otherwise
/// depends on the other.
pub type ProgressFn<'a> = dyn FnMut(f64, &str) + 'a;

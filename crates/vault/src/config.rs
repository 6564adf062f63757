//! Plain `serde`-derived configuration, not a process-global (§9's design
//! note that KDF parameters must never be read from global state) — the
//! handful of knobs here (stream chunk size, erase pass count, path limit)
//! are the only things this engine lets a caller tune at all.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Per-file streaming chunk size (§4.4): 64 KiB.
    pub stream_chunk_size: usize,
    /// Secure-erase overwrite passes for plaintext files and the sentinel.
    /// Upstream default is 1 pass (`FileManager.secure_delete(passes=1)`).
    pub secure_erase_passes: u32,
    /// Conservative full-path length ceiling before a name is encrypted (§4.4).
    pub max_path_length: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            stream_chunk_size: 64 * 1024,
            secure_erase_passes: 1,
            max_path_length: 250,
        }
    }
}

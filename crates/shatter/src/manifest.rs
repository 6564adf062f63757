use antigravity_primitives::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// One entry per on-disk chunk (§3, §6.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub index: u64,
    pub id: String,
    pub filename: String,
    /// base64 of `nonce(12) ‖ AEAD_ct(chunk_key) ‖ tag(16)`.
    pub key: String,
    /// hex-encoded SHA-256 of the plaintext chunk.
    pub hash: String,
}

/// The SHATTER manifest body, serialised to UTF-8 JSON and then
/// AEAD-encrypted as a whole (§3, §6.1).
///
/// `version` is a JSON number in the on-disk format (`3.0`, historically a
/// float). Both integer and float encodings deserialize into this `f64`
/// field without extra handling — whether a future `3.x` manifest is
/// accepted is left to [`Manifest::validate_version`], not to serde.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub version: f64,
    pub original_filename: String,
    pub original_size: u64,
    pub chunk_size: u64,
    pub chunks: Vec<ManifestEntry>,
}

/// Manifests at this major version and any minor revision are accepted;
/// older or newer major versions are not (left unspecified upstream — we
/// decide the conservative reading: major version must match exactly).
pub const SUPPORTED_MAJOR_VERSION: u64 = 3;

impl Manifest {
    #[must_use]
    pub fn new(original_filename: String, original_size: u64, chunk_size: u64) -> Self {
        Self {
            version: 3.0,
            original_filename,
            original_size,
            chunk_size,
            chunks: Vec::new(),
        }
    }

    /// Parses manifest JSON bytes, surfacing malformed JSON or missing
    /// required fields (e.g. a chunk entry without `id`, SH-3) as
    /// [`Error::Format`] rather than a panic.
    ///
    /// # Errors
    /// Returns [`Error::Format`] if the bytes are not valid UTF-8 JSON for
    /// this schema, or [`Error::Format`] if the version is unsupported.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let manifest: Self = serde_json::from_slice(bytes).map_err(|e| Error::Format(e.to_string()))?;
        manifest.validate_version()?;
        Ok(manifest)
    }

    /// # Errors
    /// Returns [`Error::Format`] if the manifest's major version does not
    /// match [`SUPPORTED_MAJOR_VERSION`].
    pub fn validate_version(&self) -> Result<()> {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let major = self.version.trunc() as u64;
        if major != SUPPORTED_MAJOR_VERSION {
            return Err(Error::Format(format!(
                "unsupported manifest version {} (expected major version {SUPPORTED_MAJOR_VERSION})",
                self.version
            )));
        }
        Ok(())
    }

    #[must_use]
    pub fn to_json_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(self).expect("Manifest serializes without error")
    }

    pub fn sorted_by_index(&mut self) {
        self.chunks.sort_by_key(|c| c.index);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_entry_missing_id() {
        let json = br#"{
            "version": 3.0,
            "original_filename": "f.bin",
            "original_size": 10,
            "chunk_size": 10,
            "chunks": [{"index": 0, "filename": "x.enc", "key": "aGVsbG8=", "hash": "deadbeef"}]
        }"#;
        let err = Manifest::parse(json).unwrap_err();
        assert!(matches!(err, Error::Format(_)));
    }

    #[test]
    fn accepts_integer_and_float_version_encodings() {
        let json_float = br#"{"version":3.0,"original_filename":"a","original_size":0,"chunk_size":1,"chunks":[]}"#;
        let json_int = br#"{"version":3,"original_filename":"a","original_size":0,"chunk_size":1,"chunks":[]}"#;
        assert!(Manifest::parse(json_float).is_ok());
        assert!(Manifest::parse(json_int).is_ok());
    }

    #[test]
    fn rejects_unsupported_major_version() {
        let json = br#"{"version":2.5,"original_filename":"a","original_size":0,"chunk_size":1,"chunks":[]}"#;
        assert!(Manifest::parse(json).is_err());
    }

    #[test]
    fn sorted_by_index_reorders_shuffled_chunks() {
        let mut m = Manifest::new("f".into(), 0, 1);
        for i in [2u64, 0, 1] {
            m.chunks.push(ManifestEntry {
                index: i,
                id: format!("id{i}"),
                filename: format!("{i}.enc"),
                key: String::new(),
                hash: String::new(),
            });
        }
        m.sorted_by_index();
        let indices: Vec<_> = m.chunks.iter().map(|c| c.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }
}

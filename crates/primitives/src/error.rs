use std::path::PathBuf;

/// The five error kinds named in the design: callers only ever observe one
/// of these, never the lower-level primitive that produced it.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Bad caller input: missing file, refused path, passphrase too short.
    #[error("invalid input: {0}")]
    Input(String),

    /// Any AEAD verification failure, hash mismatch, or key-unwrap failure.
    /// Deliberately generic — see [`CryptoFault`] for what actually failed.
    #[error("cryptographic verification failed")]
    Crypto(#[source] CryptoFault),

    /// Manifest/sentinel JSON malformed, or an unsupported format version.
    #[error("malformed format: {0}")]
    Format(String),

    /// OS-level read/write/rename/fsync failure, with the offending path.
    #[error("i/o error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A sentinel/manifest already exists and refuses to be overwritten.
    #[error("conflict: {0}")]
    Conflict(String),
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn crypto(fault: CryptoFault) -> Self {
        Self::Crypto(fault)
    }

    /// True for the one case local recovery applies: the caller may retry
    /// against a `.bak` copy of the manifest or sentinel.
    #[must_use]
    pub const fn is_recoverable_via_backup(&self) -> bool {
        matches!(self, Self::Crypto(_) | Self::Format(_))
    }
}

/// Internal detail behind a [`Error::Crypto`], kept for logging only.
/// Never surfaced in a `Display` impl an adversarial caller can observe —
/// logging code should use `{:?}` deliberately, not propagate this string
/// to a user-facing message.
#[derive(Debug, thiserror::Error)]
pub enum CryptoFault {
    #[error("AEAD tag verification failed")]
    AeadVerification,
    #[error("key unwrap failed")]
    KeyUnwrap,
    #[error("plaintext hash mismatch")]
    HashMismatch,
    #[error("KDF parameters rejected: {0}")]
    Kdf(String),
    #[error("manifest or sentinel header too short or malformed")]
    MalformedHeader,
}

pub type Result<T> = std::result::Result<T, Error>;

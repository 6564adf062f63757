//! Content-addressed file sharding: split a file into authenticated
//! encrypted chunks under opaque names with a self-describing, authenticated
//! manifest, and reassemble it back byte-identically (§4.3).

pub mod chunk_size;
pub mod engine;
pub mod manifest;

pub use chunk_size::choose_chunk_size;
pub use engine::{ShatterEngine, CHUNK_EXT, MANIFEST_EXT};
pub use manifest::{Manifest, ManifestEntry};

/// `(fraction_in_0_1, human_status)` progress callback shared by both
/// engines' programmatic surface (§2, §5).
pub type ProgressFn<'a> = dyn FnMut(f64, &str) + 'a;

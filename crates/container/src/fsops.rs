//! File-level plumbing both engines need: atomic write-then-rename and
//! single-pass secure overwrite-then-unlink (§3, §4.3, §4.4).

use antigravity_primitives::error::{Error, Result};
use antigravity_primitives::random::random_bytes;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

/// Writes `content` to `path` via a `.tmp` sibling, `fsync`, then rename —
/// the rename is the only observable state transition, so a crash leaves
/// either the old file or the new one, never a half-written one.
///
/// # Errors
/// Returns [`Error::Io`] on any underlying filesystem failure.
pub fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    let tmp_path = tmp_sibling(path);
    {
        let mut f = File::create(&tmp_path).map_err(|e| Error::io(&tmp_path, e))?;
        f.write_all(content).map_err(|e| Error::io(&tmp_path, e))?;
        f.sync_all().map_err(|e| Error::io(&tmp_path, e))?;
    }
    fs::rename(&tmp_path, path).map_err(|e| Error::io(path, e))?;
    Ok(())
}

fn tmp_sibling(path: &Path) -> std::path::PathBuf {
    let mut os = path.as_os_str().to_owned();
    os.push(".tmp");
    std::path::PathBuf::from(os)
}

/// Overwrites the file at `path` with `passes` rounds of fresh random
/// bytes, `fsync`s, then unlinks it. A no-op if the path does not exist.
/// SSD wear-leveling means this is a best-effort overwrite, not a physical
/// erasure guarantee — the real guarantee is cryptographic: the file was
/// never durably present except as ciphertext once this returns.
///
/// # Errors
/// Returns [`Error::Io`] on any underlying filesystem failure.
pub fn secure_delete(path: &Path, passes: u32) -> Result<()> {
    if !path.exists() {
        return Ok(());
    }
    let len = fs::metadata(path).map_err(|e| Error::io(path, e))?.len() as usize;

    {
        let mut f = fs::OpenOptions::new()
            .write(true)
            .open(path)
            .map_err(|e| Error::io(path, e))?;
        for _ in 0..passes.max(1) {
            use std::io::Seek;
            f.seek(std::io::SeekFrom::Start(0)).map_err(|e| Error::io(path, e))?;
            let mut written = 0usize;
            while written < len {
                let chunk_len = (len - written).min(64 * 1024);
                let chunk = random_bytes(chunk_len)?;
                f.write_all(&chunk).map_err(|e| Error::io(path, e))?;
                written += chunk_len;
            }
            f.flush().map_err(|e| Error::io(path, e))?;
            f.sync_all().map_err(|e| Error::io(path, e))?;
        }
    }

    fs::remove_file(path).map_err(|e| Error::io(path, e))?;
    Ok(())
}

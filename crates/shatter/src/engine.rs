//! Split→encrypt→hash→wrap-key→emit manifest, and the inverse
//! scan→load-manifest→parallel-decrypt→verify→concatenate (§4.3).

use crate::chunk_size::choose_chunk_size;
use crate::manifest::{Manifest, ManifestEntry};
use crate::ProgressFn;
use antigravity_container::{deterministic_nonce, secure_delete, unwrap_key, wrap_key, write_atomic};
use antigravity_primitives::aead::{aead_open, aead_seal};
use antigravity_primitives::csuite::{ChaChaSuite, CryptoSuite, KdfAlgorithm};
use antigravity_primitives::error::{CryptoFault, Error, Result};
use antigravity_primitives::hash::sha256_hex;
use antigravity_primitives::KeyMaterial;
use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine as _;
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const MANIFEST_EXT: &str = ".shatter_manifest";
pub const CHUNK_EXT: &str = ".enc";
const MANIFEST_AD: [u8; 8] = 0u64.to_le_bytes();

/// Owns its [`CryptoSuite`] and parameters, per the design note that a
/// single global crypto backend must not be implicit (§9).
pub struct ShatterEngine {
    suite: Box<dyn CryptoSuite + Send + Sync>,
}

impl Default for ShatterEngine {
    fn default() -> Self {
        Self { suite: Box::new(ChaChaSuite) }
    }
}

impl ShatterEngine {
    #[must_use]
    pub fn new(suite: Box<dyn CryptoSuite + Send + Sync>) -> Self {
        Self { suite }
    }

    /// Splits `file_path` into encrypted chunks under `<basename>_sharded`,
    /// emitting a manifest and its `.bak` (§4.3 Shatter operation).
    ///
    /// # Errors
    /// Returns [`Error::Input`] if `file_path` does not exist, or any I/O or
    /// crypto failure encountered while chunking.
    pub fn shatter(
        &self,
        file_path: &Path,
        passphrase: &str,
        out_dir: Option<&Path>,
        delete_original: bool,
        mut progress: Option<&mut ProgressFn>,
    ) -> Result<PathBuf> {
        if !file_path.exists() {
            return Err(Error::Input(format!("file not found: {}", file_path.display())));
        }
        let file_size = fs::metadata(file_path).map_err(|e| Error::io(file_path, e))?.len();
        let filename = file_path
            .file_name()
            .ok_or_else(|| Error::Input("file path has no filename component".to_string()))?
            .to_string_lossy()
            .into_owned();

        let base_output_dir = match out_dir {
            Some(d) => d.to_path_buf(),
            None => file_path.parent().map(Path::to_path_buf).unwrap_or_default(),
        };
        let target_dir = base_output_dir.join(format!("{filename}_sharded"));
        fs::create_dir_all(&target_dir).map_err(|e| Error::io(&target_dir, e))?;

        let manifest_salt = self.suite.random(16)?;
        let master_key = self.suite.kdf(KdfAlgorithm::Argon2idShatter, passphrase, &manifest_salt)?;

        let chunk_size = choose_chunk_size(file_size);
        let mut manifest = Manifest::new(filename.clone(), file_size, chunk_size);
        let total_chunks = if file_size == 0 { 0 } else { file_size.div_ceil(chunk_size) };

        let mut file = File::open(file_path).map_err(|e| Error::io(file_path, e))?;
        let started = Instant::now();
        let mut processed_bytes = 0u64;
        let mut index = 0u64;
        loop {
            let chunk_data = read_up_to(&mut file, chunk_size as usize).map_err(|e| Error::io(file_path, e))?;
            if chunk_data.is_empty() {
                break;
            }
            processed_bytes += chunk_data.len() as u64;

            let chunk_key = KeyMaterial::random()?;
            let chunk_hash = self.suite.hash_hex(&chunk_data);
            let ad = index.to_le_bytes();
            let nonce = deterministic_nonce(chunk_key.as_bytes(), &ad);
            let ciphertext = self.suite.aead_seal(&chunk_key, &nonce, &chunk_data, &ad)?;

            let chunk_uuid = Uuid::new_v4().simple().to_string();
            let chunk_filename = format!("{chunk_uuid}{CHUNK_EXT}");
            let chunk_path = target_dir.join(&chunk_filename);
            let mut body = Vec::with_capacity(nonce.len() + ciphertext.len());
            body.extend_from_slice(&nonce);
            body.extend_from_slice(&ciphertext);
            write_atomic(&chunk_path, &body)?;

            let wrapped_key = wrap_key(&master_key, chunk_key.as_bytes(), &chunk_uuid)?;
            manifest.chunks.push(ManifestEntry {
                index,
                id: chunk_uuid,
                filename: chunk_filename,
                key: B64.encode(wrapped_key),
                hash: chunk_hash,
            });
            // `chunk_key` drops (and zeroises) here at end of iteration.

            index += 1;
            if let Some(cb) = progress.as_deref_mut() {
                let elapsed = started.elapsed().as_secs_f64().max(f64::EPSILON);
                let speed_mb = (processed_bytes as f64 / (1024.0 * 1024.0)) / elapsed;
                let fraction = index as f64 / total_chunks.max(1) as f64;
                cb(fraction, &format!("sharding {index}/{total_chunks} ({speed_mb:.1} MiB/s)"));
            }
            debug!(index, chunk_size, "wrote shatter chunk");
        }

        let manifest_path = target_dir.join(format!("{filename}{MANIFEST_EXT}"));
        write_manifest(&manifest_path, &manifest, &master_key, &manifest_salt)?;
        info!(chunks = manifest.chunks.len(), path = %manifest_path.display(), "shatter manifest written");

        if delete_original {
            if let Some(cb) = progress.as_deref_mut() {
                cb(1.0, "securely erasing original");
            }
            secure_delete(file_path, 1)?;
        }

        Ok(target_dir)
    }

    /// Reads a manifest, derives the master key, and decrypts every chunk
    /// with a worker pool of `min(32, cpus+4)` feeding a single ordered
    /// writer (§4.3 Reassemble operation, §5).
    ///
    /// # Errors
    /// Returns [`Error::Crypto`] if the manifest or any chunk fails to
    /// verify, [`Error::Format`] for a malformed/unsupported manifest, or
    /// [`Error::Io`] for underlying filesystem failures. Partial output is
    /// removed before returning an error.
    pub fn reassemble(
        &self,
        manifest_path: &Path,
        passphrase: &str,
        out_dir: Option<&Path>,
        delete_source: bool,
        mut progress: Option<&mut ProgressFn>,
    ) -> Result<PathBuf> {
        let (mut manifest, master_key) = load_manifest(manifest_path, passphrase)?;
        manifest.sorted_by_index();

        let base_dir = manifest_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        let output_dir = resolve_output_dir(out_dir, &base_dir, delete_source);
        fs::create_dir_all(&output_dir).map_err(|e| Error::io(&output_dir, e))?;
        let target_path = output_dir.join(&manifest.original_filename);

        let total = manifest.chunks.len();
        let result = run_parallel_reassembly(&manifest, &base_dir, &master_key, &target_path, &mut progress, total);

        match result {
            Ok(()) => {
                info!(path = %target_path.display(), "reassembly complete");
            }
            Err(e) => {
                let _ = fs::remove_file(&target_path);
                return Err(e);
            }
        }

        if delete_source {
            cleanup_source(&manifest, &base_dir, manifest_path);
        }

        Ok(target_path)
    }

    /// Recursively finds `*.shatter_manifest` files under `dir`
    /// (`scan_directory_for_manifests` in the original, §6.2).
    ///
    /// # Errors
    /// Returns [`Error::Io`] if `dir` cannot be read.
    pub fn scan_for_manifests(dir: &Path) -> Result<Vec<PathBuf>> {
        let mut found = Vec::new();
        if !dir.exists() {
            return Ok(found);
        }
        scan_dir_recursive(dir, &mut found)?;
        Ok(found)
    }
}

fn scan_dir_recursive(dir: &Path, found: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir).map_err(|e| Error::io(dir, e))? {
        let entry = entry.map_err(|e| Error::io(dir, e))?;
        let path = entry.path();
        if path.is_dir() {
            scan_dir_recursive(&path, found)?;
        } else if path.to_string_lossy().ends_with(MANIFEST_EXT) {
            found.push(path);
        }
    }
    Ok(())
}

fn read_up_to(file: &mut File, max_len: usize) -> std::io::Result<Vec<u8>> {
    let mut buf = vec![0u8; max_len];
    let mut filled = 0;
    while filled < max_len {
        let n = file.read(&mut buf[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    buf.truncate(filled);
    Ok(buf)
}

fn write_manifest(path: &Path, manifest: &Manifest, master_key: &KeyMaterial, salt: &[u8]) -> Result<()> {
    let json = manifest.to_json_bytes();
    let nonce = deterministic_nonce(master_key.as_bytes(), &MANIFEST_AD);
    let ciphertext = aead_seal(master_key, &nonce, &json, &MANIFEST_AD)?;

    let mut body = Vec::with_capacity(salt.len() + nonce.len() + ciphertext.len());
    body.extend_from_slice(salt);
    body.extend_from_slice(&nonce);
    body.extend_from_slice(&ciphertext);
    write_atomic(path, &body)?;

    let bak_path = bak_sibling(path);
    fs::copy(path, &bak_path).map_err(|e| Error::io(&bak_path, e))?;
    Ok(())
}

fn bak_sibling(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_owned();
    os.push(".bak");
    PathBuf::from(os)
}

/// Parses `salt(16) ‖ nonce(12) ‖ AEAD_ct(manifest_json)` and returns the
/// parsed manifest alongside the master key it was decrypted under — the
/// caller needs the key again immediately for chunk-key unwrapping.
///
/// # Errors
/// Returns [`Error::Crypto`] with [`CryptoFault::MalformedHeader`] if the
/// file is too short, or the KDF/AEAD/format error encountered decrypting.
fn load_manifest(path: &Path, passphrase: &str) -> Result<(Manifest, KeyMaterial)> {
    let data = fs::read(path).map_err(|e| Error::io(path, e))?;
    if data.len() < 16 + 12 {
        return Err(Error::crypto(CryptoFault::MalformedHeader));
    }
    let (salt, rest) = data.split_at(16);
    let (nonce, ciphertext) = rest.split_at(12);

    let master_key = antigravity_primitives::kdf::derive_master_key_argon2id(passphrase, salt)?;
    let json = aead_open(&master_key, nonce, ciphertext, &MANIFEST_AD)?;
    let manifest = Manifest::parse(&json)?;
    Ok((manifest, master_key))
}

fn resolve_output_dir(out_dir: Option<&Path>, base_dir: &Path, delete_source: bool) -> PathBuf {
    let Some(chosen) = out_dir else {
        return base_dir.parent().map(Path::to_path_buf).unwrap_or_else(|| base_dir.to_path_buf());
    };
    if delete_source {
        let abs_chosen = chosen.canonicalize().unwrap_or_else(|_| chosen.to_path_buf());
        let abs_base = base_dir.canonicalize().unwrap_or_else(|_| base_dir.to_path_buf());
        if abs_chosen == abs_base || abs_chosen.starts_with(&abs_base) {
            warn!(
                chosen = %chosen.display(),
                base = %base_dir.display(),
                "output directory is inside the sharded directory being deleted; redirecting one level up"
            );
            return abs_base.parent().map(Path::to_path_buf).unwrap_or(abs_base);
        }
    }
    chosen.to_path_buf()
}

fn decrypt_one_chunk(base_dir: &Path, master_key: &KeyMaterial, entry: &ManifestEntry) -> Result<Vec<u8>> {
    let chunk_path = base_dir.join(&entry.filename);
    if !chunk_path.exists() {
        return Err(Error::Input(format!("missing chunk: {}", entry.filename)));
    }

    let wrapped_key = B64
        .decode(&entry.key)
        .map_err(|e| Error::Format(format!("chunk {} has malformed wrapped key: {e}", entry.index)))?;
    let chunk_key_bytes = unwrap_key(master_key, &wrapped_key, &entry.id)?;
    let chunk_key = KeyMaterial::from_bytes(chunk_key_bytes);

    let content = fs::read(&chunk_path).map_err(|e| Error::io(&chunk_path, e))?;
    if content.len() < 12 {
        return Err(Error::crypto(CryptoFault::MalformedHeader));
    }
    let (nonce, ciphertext) = content.split_at(12);
    let ad = entry.index.to_le_bytes();
    let plaintext = aead_open(&chunk_key, nonce, ciphertext, &ad)?;

    let actual_hash = sha256_hex(&plaintext);
    if !antigravity_primitives::random::constant_time_eq(actual_hash.as_bytes(), entry.hash.as_bytes()) {
        return Err(Error::crypto(CryptoFault::HashMismatch));
    }
    Ok(plaintext)
}

fn worker_pool_size() -> usize {
    let cpus = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
    (cpus + 4).min(32)
}

fn run_parallel_reassembly(
    manifest: &Manifest,
    base_dir: &Path,
    master_key: &KeyMaterial,
    target_path: &Path,
    progress: &mut Option<&mut ProgressFn>,
    total: usize,
) -> Result<()> {
    if total == 0 {
        File::create(target_path).map_err(|e| Error::io(target_path, e))?;
        return Ok(());
    }

    let queue = Arc::new(Mutex::new(manifest.chunks.clone().into_iter()));
    let (tx, rx) = mpsc::channel::<(u64, Result<Vec<u8>>)>();
    let base_dir = Arc::new(base_dir.to_path_buf());
    let master_key = Arc::new(master_key.clone());

    let workers = worker_pool_size().min(total);
    let handles: Vec<_> = (0..workers)
        .map(|_| {
            let queue = Arc::clone(&queue);
            let tx = tx.clone();
            let base_dir = Arc::clone(&base_dir);
            let master_key = Arc::clone(&master_key);
            std::thread::spawn(move || loop {
                let next = {
                    let mut q = queue.lock().expect("reassembly queue mutex poisoned");
                    q.next()
                };
                let Some(entry) = next else { break };
                let result = decrypt_one_chunk(&base_dir, &master_key, &entry);
                if tx.send((entry.index, result)).is_err() {
                    break;
                }
            })
        })
        .collect();
    drop(tx);

    let mut writer = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(target_path)
        .map_err(|e| Error::io(target_path, e))?;

    let mut pending: BTreeMap<u64, Vec<u8>> = BTreeMap::new();
    let mut next_index = 0u64;
    let mut received = 0usize;
    let mut first_error: Option<Error> = None;
    let started = Instant::now();
    let mut processed_bytes = 0u64;

    while received < total {
        let Ok((index, outcome)) = rx.recv() else { break };
        received += 1;
        match outcome {
            Ok(plaintext) => {
                pending.insert(index, plaintext);
                while let Some(plaintext) = pending.remove(&next_index) {
                    if first_error.is_none() {
                        if let Err(e) = writer.write_all(&plaintext) {
                            first_error = Some(Error::io(target_path, e));
                        } else {
                            processed_bytes += plaintext.len() as u64;
                        }
                    }
                    next_index += 1;
                    if let Some(cb) = progress.as_deref_mut() {
                        let elapsed = started.elapsed().as_secs_f64().max(f64::EPSILON);
                        let speed_mb = (processed_bytes as f64 / (1024.0 * 1024.0)) / elapsed;
                        let fraction = next_index as f64 / total as f64;
                        cb(fraction, &format!("reassembling {next_index}/{total} ({speed_mb:.1} MiB/s)"));
                    }
                }
            }
            Err(e) => {
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
    }

    for h in handles {
        let _ = h.join();
    }

    if let Some(e) = first_error {
        return Err(e);
    }
    if received < total {
        return Err(Error::Format(format!(
            "reassembly worker pool stopped early: received {received}/{total} chunk results"
        )));
    }
    writer.sync_all().map_err(|e| Error::io(target_path, e))?;
    Ok(())
}

fn cleanup_source(manifest: &Manifest, base_dir: &Path, manifest_path: &Path) {
    for chunk in &manifest.chunks {
        let cp = base_dir.join(&chunk.filename);
        if cp.exists() {
            let _ = fs::remove_file(&cp);
        }
    }
    let _ = fs::remove_file(manifest_path);
    let bak = bak_sibling(manifest_path);
    if bak.exists() {
        let _ = fs::remove_file(&bak);
    }
    if base_dir.file_name().is_some_and(|n| n.to_string_lossy().ends_with("_sharded")) {
        let _ = fs::remove_dir_all(base_dir);
    }
}

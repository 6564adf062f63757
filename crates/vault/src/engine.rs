//! Folder walker plus per-file streaming encrypt/decrypt, gated by the
//! sentinel's state machine (§4.4): `PLAIN` / `LOCKED-THIS-KEY` /
//! `LOCKED-OTHER` / `CORRUPT`.

use crate::config::EngineConfig;
use crate::names::{decrypt_name, derive_name_key, encrypt_name};
use crate::path_policy::{check_length, ENCRYPTED_EXT};
use crate::sentinel::{self, FILENAME as SENTINEL_FILENAME};
use crate::walker::walk_bottom_up;
use crate::ProgressFn;
use antigravity_container::{secure_delete, write_atomic};
use antigravity_primitives::aead::{aead_encrypt_random_nonce, aead_open, NONCE_SIZE, TAG_SIZE};
use antigravity_primitives::csuite::{ChaChaSuite, CryptoSuite, KdfAlgorithm};
use antigravity_primitives::error::{CryptoFault, Error, Result};
use antigravity_primitives::kdf::derive_subkey;
use antigravity_primitives::random::random_bytes;
use antigravity_primitives::KeyMaterial;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

const HKDF_INFO: &[u8] = b"file-encryption-key";
const TMP_EXT: &str = ".agv.tmp";

/// Outcome of inspecting a folder's sentinel against a passphrase (§4.4).
/// `LockedThisKey` carries the already-derived master key so callers don't
/// re-run the memory-hard KDF a second time.
pub enum SentinelState {
    Plain,
    LockedThisKey(KeyMaterial),
    LockedOther,
    Corrupt,
}

/// Owns its [`CryptoSuite`] and [`EngineConfig`], mirroring `ShatterEngine`.
pub struct VaultEngine {
    suite: Box<dyn CryptoSuite + Send + Sync>,
    config: EngineConfig,
}

impl Default for VaultEngine {
    fn default() -> Self {
        Self {
            suite: Box::new(ChaChaSuite),
            config: EngineConfig::default(),
        }
    }
}

impl VaultEngine {
    #[must_use]
    pub fn new(suite: Box<dyn CryptoSuite + Send + Sync>, config: EngineConfig) -> Self {
        Self { suite, config }
    }

    /// Reads and classifies `folder`'s sentinel against `passphrase` without
    /// mutating anything.
    ///
    /// # Errors
    /// Returns [`Error::Io`] if a sentinel file exists but cannot be read.
    pub fn inspect(&self, folder: &Path, passphrase: &str) -> Result<SentinelState> {
        let sentinel_path = folder.join(SENTINEL_FILENAME);
        if !sentinel_path.exists() {
            return Ok(SentinelState::Plain);
        }
        let data = fs::read(&sentinel_path).map_err(|e| Error::io(&sentinel_path, e))?;
        if data.len() < 16 + NONCE_SIZE {
            return Ok(SentinelState::Corrupt);
        }
        let (salt, rest) = data.split_at(16);
        let (nonce, ciphertext) = rest.split_at(NONCE_SIZE);
        let master = self.suite.kdf(KdfAlgorithm::ScryptVault, passphrase, salt)?;
        if sentinel::verify(&master, nonce, ciphertext)? {
            Ok(SentinelState::LockedThisKey(master))
        } else {
            Ok(SentinelState::LockedOther)
        }
    }

    /// Locks `folder` under `passphrase` (§4.4 Folder encrypt).
    ///
    /// # Errors
    /// Returns [`Error::Conflict`] if a sentinel already verifies (same or
    /// different passphrase), [`Error::Format`] if the sentinel is corrupt,
    /// or any I/O/crypto failure while walking the tree.
    pub fn vault_encrypt(&self, folder: &Path, passphrase: &str, mut progress: Option<&mut ProgressFn>) -> Result<()> {
        match self.inspect(folder, passphrase)? {
            SentinelState::LockedThisKey(_) => {
                return Err(Error::Conflict("folder already locked by this passphrase".to_string()));
            }
            SentinelState::LockedOther => {
                return Err(Error::Conflict("folder already locked; refusing to double-lock".to_string()));
            }
            SentinelState::Corrupt => {
                return Err(Error::Format("sentinel unreadable; retry against its .bak copy".to_string()));
            }
            SentinelState::Plain => {}
        }

        let salt = self.suite.random(16)?;
        let master = self.suite.kdf(KdfAlgorithm::ScryptVault, passphrase, &salt)?;
        let sentinel_body = sentinel::build(&master)?;
        let mut sentinel_bytes = Vec::with_capacity(salt.len() + sentinel_body.len());
        sentinel_bytes.extend_from_slice(&salt);
        sentinel_bytes.extend_from_slice(&sentinel_body);

        let sentinel_path = folder.join(SENTINEL_FILENAME);
        write_atomic(&sentinel_path, &sentinel_bytes)?;
        let bak_path = sentinel_bak_path(folder);
        fs::copy(&sentinel_path, &bak_path).map_err(|e| Error::io(&bak_path, e))?;
        info!(folder = %folder.display(), "vault sentinel written");

        let name_key = derive_name_key(&master)?;
        let total = count_files_for_progress(folder);
        let mut processed = 0usize;
        let started = Instant::now();
        let config = &self.config;

        let mut on_file = |path: &Path| -> Result<()> {
            if should_skip_file(path) || has_extension(path, "agv") {
                return Ok(());
            }
            encrypt_single_file(config, &master, &name_key, path)?;
            processed += 1;
            report(&mut progress, processed, total, &started, "encrypting");
            Ok(())
        };
        let mut on_dir = |dir: &Path| -> Result<()> { rename_dir_name(config, &name_key, dir) };

        walk_bottom_up(folder, true, &mut on_file, &mut on_dir).inspect_err(|e| {
            warn!(error = %e, "vault encrypt aborted mid-walk; already-processed entries remain encrypted");
        })
    }

    /// Unlocks `folder` under `passphrase` (§4.4 Folder decrypt). Fails
    /// before touching any file when the passphrase does not verify.
    ///
    /// # Errors
    /// Returns [`Error::Input`] if the folder has no sentinel,
    /// [`Error::Crypto`] for a wrong passphrase, [`Error::Format`] for a
    /// corrupt sentinel, or any I/O/crypto failure while walking the tree.
    pub fn vault_decrypt(&self, folder: &Path, passphrase: &str, mut progress: Option<&mut ProgressFn>) -> Result<()> {
        let master = match self.inspect(folder, passphrase)? {
            SentinelState::Plain => return Err(Error::Input("folder has no vault sentinel".to_string())),
            SentinelState::LockedOther => return Err(Error::crypto(CryptoFault::KeyUnwrap)),
            SentinelState::Corrupt => {
                return Err(Error::Format("sentinel unreadable; retry against its .bak copy".to_string()));
            }
            SentinelState::LockedThisKey(master) => master,
        };

        let name_key = derive_name_key(&master)?;
        let total = count_files_for_progress(folder);
        let mut processed = 0usize;
        let started = Instant::now();
        let config = &self.config;

        let mut on_file = |path: &Path| -> Result<()> {
            if should_skip_file(path) || !has_extension(path, "agv") {
                return Ok(());
            }
            decrypt_single_file(config, &master, &name_key, path)?;
            processed += 1;
            report(&mut progress, processed, total, &started, "decrypting");
            Ok(())
        };
        let mut on_dir = |dir: &Path| -> Result<()> {
            rename_dir_name_back(&name_key, dir);
            Ok(())
        };

        walk_bottom_up(folder, true, &mut on_file, &mut on_dir)?;

        let sentinel_path = folder.join(SENTINEL_FILENAME);
        let bak_path = sentinel_bak_path(folder);
        secure_delete(&sentinel_path, self.config.secure_erase_passes)?;
        secure_delete(&bak_path, self.config.secure_erase_passes)?;
        info!(folder = %folder.display(), "vault unlocked");
        Ok(())
    }

    /// Recursively finds orphaned `*.agv.tmp` files left by an interrupted
    /// encrypt (§9 open question). Reported only — the plaintext a tmp file
    /// was derived from may still be the only live copy, so nothing here
    /// deletes anything.
    ///
    /// # Errors
    /// Returns [`Error::Io`] if `folder` cannot be read.
    pub fn find_orphan_temp_files(folder: &Path) -> Result<Vec<PathBuf>> {
        let mut found = Vec::new();
        if folder.exists() {
            scan_for_orphans(folder, &mut found)?;
        }
        Ok(found)
    }
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension().is_some_and(|e| e.to_string_lossy() == ext)
}

fn should_skip_file(path: &Path) -> bool {
    let Some(name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
        return true;
    };
    name.starts_with('.') || name.ends_with(TMP_EXT)
}

fn append_ext(path: &Path, ext: &str) -> PathBuf {
    let mut os = path.as_os_str().to_owned();
    os.push(ext);
    PathBuf::from(os)
}

fn sentinel_bak_path(folder: &Path) -> PathBuf {
    append_ext(&folder.join(SENTINEL_FILENAME), ".bak")
}

fn count_files_for_progress(folder: &Path) -> usize {
    fn count(dir: &Path, total: &mut usize) {
        let Ok(entries) = fs::read_dir(dir) else { return };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                count(&path, total);
            } else if !should_skip_file(&path) {
                *total += 1;
            }
        }
    }
    let mut total = 0;
    count(folder, &mut total);
    total
}

fn report(progress: &mut Option<&mut ProgressFn>, processed: usize, total: usize, started: &Instant, verb: &str) {
    if let Some(cb) = progress.as_deref_mut() {
        let elapsed = started.elapsed().as_secs_f64().max(f64::EPSILON);
        let fraction = if total == 0 { 1.0 } else { processed as f64 / total as f64 };
        let rate = processed as f64 / elapsed;
        cb(fraction, &format!("{verb} {processed}/{total} ({rate:.1} files/s)"));
    }
}

/// Pre-derives the token that would name the encrypted file before touching
/// any byte of it — token length depends only on plaintext name length, not
/// nonce, so the length check and the final rename reuse the same token.
fn encrypt_single_file(config: &EngineConfig, master: &KeyMaterial, name_key: &KeyMaterial, path: &Path) -> Result<()> {
    let basename = path
        .file_name()
        .ok_or_else(|| Error::Input("file path has no filename component".to_string()))?
        .to_string_lossy()
        .into_owned();
    let token = encrypt_name(name_key, &basename)?;
    let parent = path.parent().unwrap_or_else(|| Path::new(""));
    check_length(parent, &token, config.max_path_length)?;

    let file_salt = random_bytes(16)?;
    let file_key = derive_subkey(master, &file_salt, HKDF_INFO)?;

    let tmp_path = append_ext(path, TMP_EXT);
    {
        let mut input = File::open(path).map_err(|e| Error::io(path, e))?;
        let mut output = File::create(&tmp_path).map_err(|e| Error::io(&tmp_path, e))?;
        output.write_all(&file_salt).map_err(|e| Error::io(&tmp_path, e))?;

        let mut buf = vec![0u8; config.stream_chunk_size];
        let mut index = 0u64;
        loop {
            let n = read_fill(&mut input, &mut buf).map_err(|e| Error::io(path, e))?;
            if n == 0 {
                break;
            }
            let ad = index.to_le_bytes();
            let (nonce, ciphertext) = aead_encrypt_random_nonce(&file_key, &buf[..n], &ad)?;
            output.write_all(&nonce).map_err(|e| Error::io(&tmp_path, e))?;
            output.write_all(&ciphertext).map_err(|e| Error::io(&tmp_path, e))?;
            index += 1;
        }
        output.sync_all().map_err(|e| Error::io(&tmp_path, e))?;
    }

    let intermediate_path = append_ext(path, ENCRYPTED_EXT);
    fs::rename(&tmp_path, &intermediate_path).map_err(|e| Error::io(&intermediate_path, e))?;
    secure_delete(path, config.secure_erase_passes)?;

    let final_path = parent.join(format!("{token}{ENCRYPTED_EXT}"));
    fs::rename(&intermediate_path, &final_path).map_err(|e| Error::io(&final_path, e))?;
    debug!(path = %final_path.display(), "encrypted file in place");
    Ok(())
}

/// Inverse of [`encrypt_single_file`]. A name that fails to decrypt aborts
/// the walk (fatal) — unlike directory-name decrypt, there is no sensible
/// plaintext name to fall back to for a file.
fn decrypt_single_file(config: &EngineConfig, master: &KeyMaterial, name_key: &KeyMaterial, agv_path: &Path) -> Result<()> {
    let file_name = agv_path
        .file_name()
        .ok_or_else(|| Error::Input("file path has no filename component".to_string()))?
        .to_string_lossy()
        .into_owned();
    let token = file_name
        .strip_suffix(ENCRYPTED_EXT)
        .ok_or_else(|| Error::Format(format!("{file_name} does not end in {ENCRYPTED_EXT}")))?;
    let decrypted_name = decrypt_name(name_key, token)?;

    let parent = agv_path.parent().unwrap_or_else(|| Path::new(""));
    let final_path = parent.join(&decrypted_name);
    let tmp_path = append_ext(&final_path, ".tmp");

    {
        let mut input = File::open(agv_path).map_err(|e| Error::io(agv_path, e))?;
        let total_len = fs::metadata(agv_path).map_err(|e| Error::io(agv_path, e))?.len();
        let mut file_salt = [0u8; 16];
        input.read_exact(&mut file_salt).map_err(|e| Error::io(agv_path, e))?;
        let file_key = derive_subkey(master, &file_salt, HKDF_INFO)?;

        let mut output = File::create(&tmp_path).map_err(|e| Error::io(&tmp_path, e))?;
        let mut remaining = total_len - 16;
        let mut index = 0u64;
        while remaining > 0 {
            let mut nonce = [0u8; NONCE_SIZE];
            input.read_exact(&mut nonce).map_err(|e| Error::io(agv_path, e))?;
            remaining -= NONCE_SIZE as u64;

            let ct_len = (config.stream_chunk_size as u64 + TAG_SIZE as u64).min(remaining) as usize;
            let mut ciphertext = vec![0u8; ct_len];
            input.read_exact(&mut ciphertext).map_err(|e| Error::io(agv_path, e))?;
            remaining -= ct_len as u64;

            let ad = index.to_le_bytes();
            let plaintext = aead_open(&file_key, &nonce, &ciphertext, &ad)?;
            output.write_all(&plaintext).map_err(|e| Error::io(&tmp_path, e))?;
            index += 1;
        }
        output.sync_all().map_err(|e| Error::io(&tmp_path, e))?;
    }

    fs::rename(&tmp_path, &final_path).map_err(|e| Error::io(&final_path, e))?;
    fs::remove_file(agv_path).map_err(|e| Error::io(agv_path, e))?;
    debug!(path = %final_path.display(), "decrypted file in place");
    Ok(())
}

fn read_fill(file: &mut File, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = file.read(&mut buf[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

fn rename_dir_name(config: &EngineConfig, name_key: &KeyMaterial, dir: &Path) -> Result<()> {
    let leaf = dir
        .file_name()
        .ok_or_else(|| Error::Input("directory has no name component".to_string()))?
        .to_string_lossy()
        .into_owned();
    let token = encrypt_name(name_key, &leaf)?;
    let parent = dir.parent().unwrap_or_else(|| Path::new(""));
    check_length(parent, &token, config.max_path_length)?;
    let target = parent.join(&token);
    fs::rename(dir, &target).map_err(|e| Error::io(dir, e))?;
    Ok(())
}

/// Best-effort: a directory whose leaf name fails to decrypt is left as-is
/// rather than aborting the whole walk (§4.4 Folder decrypt step 3).
fn rename_dir_name_back(name_key: &KeyMaterial, dir: &Path) {
    let Some(leaf) = dir.file_name().map(|n| n.to_string_lossy().into_owned()) else {
        return;
    };
    let Ok(plain) = decrypt_name(name_key, &leaf) else {
        debug!(dir = %dir.display(), "directory leaf name did not decrypt; leaving as-is");
        return;
    };
    let parent = dir.parent().unwrap_or_else(|| Path::new(""));
    let target = parent.join(&plain);
    if let Err(e) = fs::rename(dir, &target) {
        warn!(dir = %dir.display(), error = %e, "failed to rename decrypted directory");
    }
}

fn scan_for_orphans(dir: &Path, found: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir).map_err(|e| Error::io(dir, e))? {
        let entry = entry.map_err(|e| Error::io(dir, e))?;
        let path = entry.path();
        if path.is_dir() {
            scan_for_orphans(&path, found)?;
        } else if path.to_string_lossy().ends_with(TMP_EXT) {
            found.push(path);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn tree(root: &Path) {
        fs::write(root.join("a.txt"), b"hi").unwrap();
        fs::create_dir_all(root.join("sub")).unwrap();
        fs::write(root.join("sub/b.txt"), b"bye").unwrap();
    }

    #[test]
    fn folder_roundtrip_restores_structure_and_contents() {
        let dir = tempdir().unwrap();
        tree(dir.path());

        let engine = VaultEngine::default();
        engine.vault_encrypt(dir.path(), "pw", None).unwrap();

        assert!(dir.path().join(SENTINEL_FILENAME).exists());
        assert!(!dir.path().join("a.txt").exists());
        assert!(!dir.path().join("sub").exists());

        engine.vault_decrypt(dir.path(), "pw", None).unwrap();

        assert_eq!(fs::read(dir.path().join("a.txt")).unwrap(), b"hi");
        assert_eq!(fs::read(dir.path().join("sub/b.txt")).unwrap(), b"bye");
        assert!(!dir.path().join(SENTINEL_FILENAME).exists());
    }

    #[test]
    fn unicode_filename_roundtrips_through_a_folder_cycle() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("Düma_🌍.txt"), "hola").unwrap();

        let engine = VaultEngine::default();
        engine.vault_encrypt(dir.path(), "pw", None).unwrap();
        assert!(!dir.path().join("Düma_🌍.txt").exists());

        engine.vault_decrypt(dir.path(), "pw", None).unwrap();
        assert_eq!(fs::read_to_string(dir.path().join("Düma_🌍.txt")).unwrap(), "hola");
    }

    #[test]
    fn wrong_passphrase_decrypt_fails_before_touching_any_file() {
        let dir = tempdir().unwrap();
        tree(dir.path());

        let engine = VaultEngine::default();
        engine.vault_encrypt(dir.path(), "right-pw", None).unwrap();

        let err = engine.vault_decrypt(dir.path(), "wrong-pw", None).unwrap_err();
        assert!(matches!(err, Error::Crypto(_)));
        assert!(dir.path().join(SENTINEL_FILENAME).exists());
    }

    #[test]
    fn double_encrypt_with_same_passphrase_is_a_conflict() {
        let dir = tempdir().unwrap();
        tree(dir.path());

        let engine = VaultEngine::default();
        engine.vault_encrypt(dir.path(), "pw", None).unwrap();
        let err = engine.vault_encrypt(dir.path(), "pw", None).unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[test]
    fn double_encrypt_with_different_passphrase_is_a_conflict() {
        let dir = tempdir().unwrap();
        tree(dir.path());

        let engine = VaultEngine::default();
        engine.vault_encrypt(dir.path(), "pw-a", None).unwrap();
        let err = engine.vault_encrypt(dir.path(), "pw-b", None).unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[test]
    fn decrypting_a_never_locked_folder_is_an_input_error() {
        let dir = tempdir().unwrap();
        tree(dir.path());

        let engine = VaultEngine::default();
        let err = engine.vault_decrypt(dir.path(), "pw", None).unwrap_err();
        assert!(matches!(err, Error::Input(_)));
    }

    #[test]
    fn orphan_tmp_file_is_reported_but_left_untouched() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), b"hi").unwrap();
        fs::write(dir.path().join("a.txt.agv.tmp"), b"partial").unwrap();

        let found = VaultEngine::find_orphan_temp_files(dir.path()).unwrap();
        assert_eq!(found, vec![dir.path().join("a.txt.agv.tmp")]);
        assert!(dir.path().join("a.txt").exists());
        assert!(dir.path().join("a.txt.agv.tmp").exists());
    }
}

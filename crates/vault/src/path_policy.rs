//! Conservative path-length guard (§4.4): refuse to encrypt a name if the
//! resulting full path would risk an OS-level `ENAMETOOLONG`/`MAX_PATH`
//! failure partway through a bottom-up walk, where a failure would leave
//! the walk half-renamed.

use antigravity_primitives::error::{Error, Result};
use std::path::Path;

pub const ENCRYPTED_EXT: &str = ".agv";

/// # Errors
/// Returns [`Error::Input`] if `parent_dir` joined with `encrypted_name` and
/// [`ENCRYPTED_EXT`] would exceed `max_path_length` characters.
pub fn check_length(parent_dir: &Path, encrypted_name: &str, max_path_length: usize) -> Result<()> {
    let potential = parent_dir.as_os_str().len() + encrypted_name.len() + ENCRYPTED_EXT.len() + 1;
    if potential > max_path_length {
        return Err(Error::Input(format!(
            "encrypted path under {} would be {potential} chars, over the {max_path_length}-char limit",
            parent_dir.display()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn short_name_passes() {
        assert!(check_length(&PathBuf::from("/tmp/vault"), "short-token", 250).is_ok());
    }

    #[test]
    fn long_name_is_rejected() {
        let long_token = "a".repeat(300);
        assert!(check_length(&PathBuf::from("/tmp/vault"), &long_token, 250).is_err());
    }
}

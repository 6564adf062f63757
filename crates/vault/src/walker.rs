//! Bottom-up directory walk (§4.4, §5): every file in a directory is
//! visited before that directory's own leaf name is renamed, and a
//! directory's children (files and subdirectories alike) are always fully
//! processed before the directory itself. Serial by design — concurrent
//! renames during a bottom-up walk risk path aliasing.

use antigravity_primitives::error::Result;
use std::fs;
use std::path::Path;

/// Recursively visits `dir`: subdirectories first (depth-first), then this
/// directory's own files, then — unless `is_root` — `on_dir` is called to
/// let the caller rename `dir` itself. `on_dir` is called last precisely
/// because by then every path inside `dir` has already settled.
///
/// # Errors
/// Propagates whatever `on_file`/`on_dir` return, and [`Error::Io`] for any
/// directory read failure.
pub fn walk_bottom_up(
    dir: &Path,
    is_root: bool,
    on_file: &mut dyn FnMut(&Path) -> Result<()>,
    on_dir: &mut dyn FnMut(&Path) -> Result<()>,
) -> Result<()> {
    let mut subdirs = Vec::new();
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| antigravity_primitives::error::Error::io(dir, e))? {
        let entry = entry.map_err(|e| antigravity_primitives::error::Error::io(dir, e))?;
        let path = entry.path();
        if path.is_dir() {
            subdirs.push(path);
        } else {
            files.push(path);
        }
    }

    for sub in &subdirs {
        walk_bottom_up(sub, false, on_file, on_dir)?;
    }
    for file in &files {
        on_file(file)?;
    }
    if !is_root {
        on_dir(dir)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use tempfile::tempdir;

    #[test]
    fn visits_children_before_their_parent_directory() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("a/b")).unwrap();
        fs::write(dir.path().join("a/b/leaf.txt"), b"x").unwrap();

        let visited_dirs = RefCell::new(Vec::new());
        let mut on_file = |_: &Path| -> Result<()> { Ok(()) };
        let mut on_dir = |p: &Path| -> Result<()> {
            visited_dirs.borrow_mut().push(p.to_path_buf());
            Ok(())
        };
        walk_bottom_up(dir.path(), true, &mut on_file, &mut on_dir).unwrap();

        let visited = visited_dirs.into_inner();
        assert_eq!(visited.len(), 2);
        assert_eq!(visited[0], dir.path().join("a/b"));
        assert_eq!(visited[1], dir.path().join("a"));
    }

    #[test]
    fn root_directory_itself_is_never_passed_to_on_dir() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("f.txt"), b"x").unwrap();

        let mut dir_calls = 0;
        let mut on_file = |_: &Path| -> Result<()> { Ok(()) };
        let mut on_dir = |_: &Path| -> Result<()> {
            dir_calls += 1;
            Ok(())
        };
        walk_bottom_up(dir.path(), true, &mut on_file, &mut on_dir).unwrap();
        assert_eq!(dir_calls, 0);
    }
}

//! Root directory resolution and lexical path cleaning.

use super::error::LoadError;
use std::path::{Component, Path, PathBuf};

/// Resolve a user-supplied directory into an absolute, canonical path.
///
/// Fails with [`LoadError::Path`] when the path does not exist, cannot be
/// read, or is not a directory.
pub fn resolve_root(dir: &Path) -> Result<PathBuf, LoadError> {
    let abs = std::fs::canonicalize(dir).map_err(|e| LoadError::Path {
        path: dir.to_path_buf(),
        source: e,
    })?;
    if !abs.is_dir() {
        return Err(LoadError::Path {
            path: dir.to_path_buf(),
            source: std::io::Error::other("not a directory"),
        });
    }
    Ok(abs)
}

/// Lexically normalize a path: drop `.` components and fold `..` into the
/// preceding normal component. Does not touch the filesystem.
pub fn clean_path(path: &Path) -> PathBuf {
    let mut out: Vec<Component<'_>> = Vec::new();
    for comp in path.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                // `..` at the root stays at the root
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(comp),
            },
            other => out.push(other),
        }
    }
    if out.is_empty() {
        return PathBuf::from(".");
    }
    out.iter().map(|c| c.as_os_str()).collect()
}

/// Render `path` relative to `base` when it lies under it.
pub fn display_relative(path: &Path, base: &Path) -> String {
    path.strip_prefix(base)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

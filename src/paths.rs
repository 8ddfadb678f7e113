//! Resolution of project-relative paths.
//!
//! Every place that turns a relative path into a filesystem path goes
//! through [`resolve_within`], which guarantees the result stays inside the
//! project root, both lexically and after following symlinks that already
//! exist on disk.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum PathError {
    #[error("Path escapes project root: {0}")]
    Escapes(PathBuf),
    #[error("Path leaves project root through a symlink: {0}")]
    SymlinkEscape(PathBuf),
    #[error("Path does not name an entry below the project root: {0}")]
    Empty(PathBuf),
    #[error("IO error: {0}")]
    Io(std::io::Error),
}

/// Resolves `relative` against `root`, refusing anything that ends up outside `root`.
///
/// `..` components are folded lexically and may never climb above the root.
/// Absolute paths are accepted only when they already lie under `root`.
/// When some prefix of the resolved path exists on disk, its canonical form
/// must also lie under the canonical root, so a symlinked directory cannot
/// be used to reach outside the project.
pub fn resolve_within(root: &Path, relative: &Path) -> Result<PathBuf, PathError> {
    let relative = if relative.is_absolute() {
        relative
            .strip_prefix(root)
            .map_err(|_| PathError::Escapes(relative.to_path_buf()))?
    } else {
        relative
    };

    let mut normalized = PathBuf::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => normalized.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    return Err(PathError::Escapes(relative.to_path_buf()));
                }
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(PathError::Escapes(relative.to_path_buf()));
            }
        }
    }

    if normalized.as_os_str().is_empty() {
        return Err(PathError::Empty(relative.to_path_buf()));
    }

    let resolved = root.join(&normalized);
    check_existing_prefix(root, &resolved)?;
    Ok(resolved)
}

fn check_existing_prefix(root: &Path, resolved: &Path) -> Result<(), PathError> {
    let canonical_root = match root.canonicalize() {
        Ok(path) => path,
        // Nothing exists yet, so nothing can be a symlink pointing elsewhere.
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(PathError::Io(e)),
    };

    for ancestor in resolved.ancestors() {
        if std::fs::symlink_metadata(ancestor).is_err() {
            continue;
        }
        let canonical = match ancestor.canonicalize() {
            Ok(path) => path,
            // A dangling symlink has no target to escape to yet, but writing
            // through it would create one wherever it points.
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(PathError::SymlinkEscape(resolved.to_path_buf()));
            }
            Err(e) => return Err(PathError::Io(e)),
        };
        if !canonical.starts_with(&canonical_root) {
            return Err(PathError::SymlinkEscape(resolved.to_path_buf()));
        }
        return Ok(());
    }

    Ok(())
}

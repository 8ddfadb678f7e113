use crate::paths::resolve_within;
use crate::signature::{self, FileStatus};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Prompt files managed when the caller does not name any.
pub const DEFAULT_MANAGED_FILES: [&str; 2] = ["CLAUDE.md", "GEMINI.md"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanResult {
    /// Where the file lives. `None` when the requested path was rejected
    /// because it would resolve outside the project root.
    pub absolute_path: Option<PathBuf>,
    /// The path as requested, relative to the project root.
    pub relative_path: PathBuf,
    pub status: FileStatus,
}

/// Returns the default managed file set as relative paths.
pub fn default_managed_files() -> Vec<PathBuf> {
    DEFAULT_MANAGED_FILES.iter().map(PathBuf::from).collect()
}

/// Classifies managed files below `root` by their signature status.
///
/// `relative_paths` defaults to [`DEFAULT_MANAGED_FILES`]. Results are
/// returned in request order, one per path. Nothing is written.
///
/// Each file is handled on its own and no failure aborts the scan:
/// * a path that would resolve outside `root` is reported `Missing` without
///   an absolute path and is never read
/// * a file that does not exist is `Missing`
/// * a file that exists but cannot be read as UTF-8 text (permissions,
///   binary content, ...) is `Legacy`, so it is treated as user content
pub fn scan(root: &Path, relative_paths: Option<&[PathBuf]>) -> Vec<ScanResult> {
    let defaults;
    let relative_paths: &[PathBuf] = match relative_paths {
        Some(paths) => paths,
        None => {
            defaults = default_managed_files();
            &defaults
        }
    };

    relative_paths
        .iter()
        .map(|relative| scan_one(root, relative))
        .collect()
}

fn scan_one(root: &Path, relative: &Path) -> ScanResult {
    let absolute = match resolve_within(root, relative) {
        Ok(path) => path,
        Err(e) => {
            warn!("Ignoring {}: {}", relative.display(), e);
            return ScanResult {
                absolute_path: None,
                relative_path: relative.to_path_buf(),
                status: FileStatus::Missing,
            };
        }
    };

    let status = match std::fs::symlink_metadata(&absolute) {
        Err(e) if e.kind() == ErrorKind::NotFound => FileStatus::Missing,
        Err(e) => {
            debug!("Cannot stat {}: {}", absolute.display(), e);
            FileStatus::Legacy
        }
        Ok(_) => match std::fs::read_to_string(&absolute) {
            Ok(content) => {
                if let Some(trailer) = signature::extract_trailer(&content) {
                    debug!("{} was signed by version {}", relative.display(), trailer.version);
                }
                signature::verify(&content)
            }
            Err(e) => {
                debug!("Cannot read {}: {}", absolute.display(), e);
                FileStatus::Legacy
            }
        },
    };

    debug!("{} is {}", relative.display(), status);

    ScanResult {
        absolute_path: Some(absolute),
        relative_path: relative.to_path_buf(),
        status,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::sign;
    use std::fs;
    use tempfile::TempDir;

    fn paths(list: &[&str]) -> Vec<PathBuf> {
        list.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn classifies_each_status() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();

        fs::write(root.join("pristine.md"), sign("# Original", "1.0.0")).unwrap();
        fs::write(
            root.join("modified.md"),
            format!("{}\nUser edit", sign("# Original", "1.0.0")),
        )
        .unwrap();
        fs::write(root.join("legacy.md"), "# No Signature").unwrap();

        let results = scan(
            root,
            Some(&paths(&["pristine.md", "modified.md", "legacy.md", "missing.md"])[..]),
        );

        let statuses: Vec<_> = results.iter().map(|r| r.status).collect();
        assert_eq!(
            statuses,
            vec![
                FileStatus::Pristine,
                FileStatus::Modified,
                FileStatus::Legacy,
                FileStatus::Missing
            ]
        );
        assert_eq!(results[0].absolute_path, Some(root.join("pristine.md")));
        assert_eq!(results[3].relative_path, Path::new("missing.md"));
    }

    #[test]
    fn defaults_to_prompt_files() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("CLAUDE.md"), sign("claude", "1.0.0")).unwrap();

        let results = scan(temp.path(), None);

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].relative_path, Path::new("CLAUDE.md"));
        assert_eq!(results[0].status, FileStatus::Pristine);
        assert_eq!(results[1].relative_path, Path::new("GEMINI.md"));
        assert_eq!(results[1].status, FileStatus::Missing);
    }

    #[test]
    fn nested_paths_are_supported() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join(".project")).unwrap();
        fs::write(temp.path().join(".project/context.md"), sign("ctx", "1.0.0")).unwrap();

        let results = scan(temp.path(), Some(&paths(&[".project/context.md"])[..]));

        assert_eq!(results[0].status, FileStatus::Pristine);
    }

    #[test]
    fn binary_content_is_legacy() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("blob.md"), [0xff, 0xfe, 0x00, 0x80]).unwrap();

        let results = scan(temp.path(), Some(&paths(&["blob.md"])[..]));

        assert_eq!(results[0].status, FileStatus::Legacy);
    }

    #[test]
    fn directory_in_place_of_file_is_legacy() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("CLAUDE.md")).unwrap();

        let results = scan(temp.path(), Some(&paths(&["CLAUDE.md"])[..]));

        assert_eq!(results[0].status, FileStatus::Legacy);
    }

    #[test]
    fn traversal_is_reported_missing_without_a_path() {
        let outer = TempDir::new().unwrap();
        let root = outer.path().join("project");
        fs::create_dir(&root).unwrap();
        fs::write(outer.path().join("secret.md"), sign("secret", "1.0.0")).unwrap();

        let results = scan(&root, Some(&paths(&["../secret.md", "a/../../secret.md"])[..]));

        for result in &results {
            assert_eq!(result.status, FileStatus::Missing);
            assert_eq!(result.absolute_path, None);
        }
    }

    #[test]
    fn one_bad_file_does_not_hide_the_others() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::write(root.join("bad.md"), [0xff, 0xff]).unwrap();
        fs::write(root.join("good.md"), sign("good", "1.0.0")).unwrap();

        let results = scan(root, Some(&paths(&["bad.md", "../x.md", "good.md"])[..]));

        assert_eq!(results.len(), 3);
        assert_eq!(results[2].status, FileStatus::Pristine);
    }

    #[test]
    #[cfg(unix)]
    fn unreadable_file_is_legacy() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let path = temp.path().join("locked.md");
        fs::write(&path, sign("locked", "1.0.0")).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o000)).unwrap();

        // Privileged users can read anything; only assert when the
        // permission bits actually take effect.
        if fs::read(&path).is_err() {
            let results = scan(temp.path(), Some(&paths(&["locked.md"])[..]));
            assert_eq!(results[0].status, FileStatus::Legacy);
        }

        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();
    }
}

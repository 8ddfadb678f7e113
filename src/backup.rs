//! Snapshots of the `.project` tree taken before an update writes anything.

use chrono::{DateTime, SecondsFormat, Utc};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const PROJECT_DIR: &str = ".project";
pub const BACKUPS_DIR: &str = ".project-backups";

#[derive(Debug, thiserror::Error)]
pub enum BackupError {
    #[error("IO error: {0}")]
    Io(std::io::Error),
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),
}

impl BackupError {
    fn from_io(e: std::io::Error, path: &Path) -> Self {
        if e.kind() == ErrorKind::PermissionDenied {
            BackupError::PermissionDenied(path.to_path_buf())
        } else {
            BackupError::Io(e)
        }
    }
}

/// Copies `<root>/.project` to `<root>/.project-backups/<timestamp>/`.
///
/// Returns `Ok(None)` when there is no `.project` directory. With `dry_run`
/// the destination is only computed and does not exist on disk.
///
/// Any entry named `.project-backups` inside the tree is left out of the
/// copy. A failure anywhere is returned as an error; callers must not go on
/// to write managed files after a failed backup.
pub fn create_backup(root: &Path, dry_run: bool) -> Result<Option<PathBuf>, BackupError> {
    create_backup_at(root, dry_run, Utc::now())
}

pub(crate) fn create_backup_at(
    root: &Path,
    dry_run: bool,
    now: DateTime<Utc>,
) -> Result<Option<PathBuf>, BackupError> {
    let source = root.join(PROJECT_DIR);
    match std::fs::symlink_metadata(&source) {
        Ok(metadata) if metadata.is_dir() => {}
        Ok(_) => return Ok(None),
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(BackupError::from_io(e, &source)),
    }

    let destination = unique_destination(&root.join(BACKUPS_DIR), &backup_name(now));

    if dry_run {
        debug!("Would back up {} to {}", source.display(), destination.display());
        return Ok(Some(destination));
    }

    std::fs::create_dir_all(&destination)
        .map_err(|e| BackupError::from_io(e, &destination))?;
    copy_tree(&source, &destination)?;

    info!("Backed up {} to {}", source.display(), destination.display());
    Ok(Some(destination))
}

/// Directory name for a backup taken at `now`: RFC 3339 with millisecond
/// precision, with `:` and `.` replaced so the name is valid everywhere and
/// sorts chronologically.
fn backup_name(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-")
}

fn unique_destination(backups_dir: &Path, name: &str) -> PathBuf {
    let mut candidate = backups_dir.join(name);
    let mut suffix = 1u32;
    while std::fs::symlink_metadata(&candidate).is_ok() {
        candidate = backups_dir.join(format!("{name}-{suffix}"));
        suffix += 1;
    }
    candidate
}

fn copy_tree(source: &Path, destination: &Path) -> Result<(), BackupError> {
    let read_dir = std::fs::read_dir(source).map_err(|e| BackupError::from_io(e, source))?;

    for entry in read_dir {
        let entry = entry.map_err(BackupError::Io)?;
        let name = entry.file_name();
        if name == BACKUPS_DIR {
            debug!("Skipping nested {}", entry.path().display());
            continue;
        }

        let from = entry.path();
        let to = destination.join(&name);
        let file_type = entry.file_type().map_err(|e| BackupError::from_io(e, &from))?;

        if file_type.is_dir() {
            std::fs::create_dir(&to).map_err(|e| BackupError::from_io(e, &to))?;
            copy_tree(&from, &to)?;
        } else if file_type.is_symlink() {
            copy_symlink(&from, &to)?;
        } else if file_type.is_file() {
            std::fs::copy(&from, &to).map_err(|e| BackupError::from_io(e, &from))?;
        } else {
            warn!("Not backing up special file {}", from.display());
        }
    }

    Ok(())
}

#[cfg(unix)]
fn copy_symlink(from: &Path, to: &Path) -> Result<(), BackupError> {
    let target = std::fs::read_link(from).map_err(|e| BackupError::from_io(e, from))?;
    std::os::unix::fs::symlink(target, to).map_err(|e| BackupError::from_io(e, to))
}

#[cfg(not(unix))]
fn copy_symlink(from: &Path, _to: &Path) -> Result<(), BackupError> {
    debug!("Not backing up symlink {}", from.display());
    Ok(())
}

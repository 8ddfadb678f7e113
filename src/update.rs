use crate::backup::{BackupError, create_backup};
use crate::scan::{ScanResult, default_managed_files, scan};
use crate::signature::{FileStatus, sign};
use crate::templates::Renderer;
use crate::util::fs::write_atomic;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum UpdateError {
    #[error("Backup failed, nothing was updated: {0}")]
    Backup(#[from] BackupError),
}

pub struct UpdateOptions {
    /// Relative paths of the files to manage; `None` means the default set.
    pub files: Option<Vec<PathBuf>>,
    /// Version written into the trailer of regenerated files.
    pub producer_version: String,
    pub dry_run: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateStatus {
    Updated,
    Created,
    Skipped,
    Error,
}

impl fmt::Display for UpdateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            UpdateStatus::Updated => "updated",
            UpdateStatus::Created => "created",
            UpdateStatus::Skipped => "skipped",
            UpdateStatus::Error => "error",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateResult {
    pub file: PathBuf,
    pub status: UpdateStatus,
    pub reason: Option<String>,
}

#[derive(Debug)]
pub struct UpdateReport {
    /// Backup taken before writing; with `dry_run` the path that would have been used.
    pub backup: Option<PathBuf>,
    /// One entry per managed file, in scan order.
    pub results: Vec<UpdateResult>,
}

impl UpdateReport {
    pub fn has_errors(&self) -> bool {
        self.results.iter().any(|r| r.status == UpdateStatus::Error)
    }
}

pub const REASON_USER_MODIFIED: &str = "User modified";
pub const REASON_UNSIGNED: &str = "User modified or unsigned (no signature found)";
pub const REASON_OUTSIDE_ROOT: &str = "Path escapes project root";

/// Regenerates the managed files of the project at `root` where that is safe.
///
/// # Behavior
///
/// 1. Scans the managed files (see [`crate::scan::scan`]).
/// 2. Backs up `.project` (see [`crate::backup::create_backup`]). If the
///    backup fails the whole update fails and nothing is written.
/// 3. Decides per file:
///    - `Missing`: render, sign, write; reported `Created`
///    - `Pristine`: render, sign, write; reported `Updated`
///    - `Modified` / `Legacy`: left untouched; reported `Skipped`
///
/// A file can only be overwritten when its content provably is what this
/// tool wrote last time, so content a user edited is never destroyed.
///
/// Rendering or writing one file may fail without affecting the others; the
/// failure is reported as `Error` with the reason. A managed path that would
/// resolve outside `root` is reported as `Error` and never written.
///
/// With `dry_run` the same decisions are made and reported, but neither the
/// backup nor any file is written.
pub fn update_project(
    root: &Path,
    renderer: &dyn Renderer,
    options: UpdateOptions,
) -> Result<UpdateReport, UpdateError> {
    let files = options.files.unwrap_or_else(default_managed_files);
    let scans = scan(root, Some(files.as_slice()));

    let backup = create_backup(root, options.dry_run)?;

    let results = scans
        .iter()
        .map(|scan| update_file(scan, renderer, &options.producer_version, options.dry_run))
        .collect();

    Ok(UpdateReport { backup, results })
}

fn update_file(
    scan: &ScanResult,
    renderer: &dyn Renderer,
    producer_version: &str,
    dry_run: bool,
) -> UpdateResult {
    let file = scan.relative_path.clone();

    let Some(path) = &scan.absolute_path else {
        return UpdateResult {
            file,
            status: UpdateStatus::Error,
            reason: Some(REASON_OUTSIDE_ROOT.to_string()),
        };
    };

    let status = match scan.status {
        FileStatus::Missing => UpdateStatus::Created,
        FileStatus::Pristine => UpdateStatus::Updated,
        FileStatus::Modified | FileStatus::Legacy => {
            warn!("Skipping user-modified file: {}", file.display());
            let reason = if scan.status == FileStatus::Modified {
                REASON_USER_MODIFIED
            } else {
                REASON_UNSIGNED
            };
            return UpdateResult {
                file,
                status: UpdateStatus::Skipped,
                reason: Some(reason.to_string()),
            };
        }
    };

    let content = match renderer.render(&file) {
        Ok(content) => content,
        Err(e) => {
            return UpdateResult {
                file,
                status: UpdateStatus::Error,
                reason: Some(e.to_string()),
            };
        }
    };
    let signed = sign(&content, producer_version);

    if dry_run {
        info!("[DRY RUN] Would write {} ({})", file.display(), scan.status);
    } else {
        if let Err(e) = write_atomic(path, signed.as_bytes()) {
            return UpdateResult {
                file,
                status: UpdateStatus::Error,
                reason: Some(format!("Write failed: {e}")),
            };
        }
        debug!("Wrote {}", path.display());
    }

    UpdateResult {
        file,
        status,
        reason: None,
    }
}

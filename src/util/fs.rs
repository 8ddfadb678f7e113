use std::io::Write;
use std::path::Path;

/// Writes `content` to `path` atomically.
///
/// Writes to a temporary file in the destination directory, fsyncs it, then
/// renames it into place, so readers see either the old or the new content.
/// Missing parent directories are created. An existing file keeps its
/// permissions; a new one gets the usual `0644` on Unix.
pub(crate) fn write_atomic(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;

    let permissions = std::fs::metadata(path).ok().map(|m| m.permissions());

    let mut temp_file = tempfile::NamedTempFile::new_in(parent)?;
    temp_file.write_all(content)?;
    match permissions {
        Some(permissions) => temp_file.as_file().set_permissions(permissions)?,
        None => set_default_permissions(temp_file.as_file())?,
    }
    temp_file.as_file().sync_all()?;

    temp_file.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(unix)]
fn set_default_permissions(file: &std::fs::File) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(std::fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn set_default_permissions(_file: &std::fs::File) -> std::io::Result<()> {
    Ok(())
}

use super::RenderError;
use std::fs::File;
use std::path::Path;

/// Runs `write` against a temp file next to `path` and renames it into place
/// once `write` succeeds. On any error the temp file is dropped and removed,
/// and whatever was at `path` before is left untouched.
pub fn write_atomically<F>(path: &Path, write: F) -> Result<(), RenderError>
where
    F: FnOnce(&mut File) -> Result<(), RenderError>,
{
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut tmp = tempfile::Builder::new()
        .prefix(".inspection-report-")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|e| RenderError::write_failure(path, e))?;

    write(tmp.as_file_mut())?;

    let file = tmp.as_file_mut();
    file.sync_all()
        .map_err(|e| RenderError::write_failure(path, e))?;
    // Temp files are created owner-only; reports are ordinary documents.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o644))
            .map_err(|e| RenderError::write_failure(path, e))?;
    }

    tmp.persist(path)
        .map_err(|e| RenderError::write_failure(path, e.error))?;
    Ok(())
}

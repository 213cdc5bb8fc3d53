use std::io::{self, Write};
use std::path::Path;

use tempfile::NamedTempFile;

/// Atomically write `data` to `path` using a tempfile in the same directory.
///
/// The destination is left untouched when any step fails. Missing parent
/// directories are not created.
pub fn atomic_write(path: &Path, data: &[u8]) -> io::Result<()> {
    let mut tmp = NamedTempFile::new_in(parent_dir(path))?;
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|err| err.error)?;
    Ok(())
}

/// Same as [`atomic_write`], but fails with `AlreadyExists` instead of
/// replacing an existing file.
pub fn atomic_create(path: &Path, data: &[u8]) -> io::Result<()> {
    let mut tmp = NamedTempFile::new_in(parent_dir(path))?;
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;
    tmp.persist_noclobber(path).map_err(|err| err.error)?;
    Ok(())
}

/// Write a file only if it does not already exist. Returns true if written.
pub fn write_if_missing(path: &Path, data: &[u8]) -> io::Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    atomic_create(path, data)?;
    Ok(true)
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum LockError {
    #[error("Failed to lock {}: {source}", .path.display())]
    Acquire {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{} is locked by another tasks invocation", .0.display())]
    Busy(PathBuf),
}

/// Exclusive advisory lock over the records directory, held for the duration
/// of a mutating command and released on drop.
#[derive(Debug)]
pub struct DirLock {
    file: File,
    path: PathBuf,
}

impl DirLock {
    /// Block until the lock is available.
    pub fn acquire(path: &Path) -> Result<Self, LockError> {
        match Self::try_acquire(path) {
            Err(LockError::Busy(_)) => {}
            other => return other,
        }
        debug!(path = %path.display(), "waiting for another tasks invocation");
        let file = open_lock_file(path)?;
        file.lock_exclusive().map_err(|source| LockError::Acquire {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "lock acquired");
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    /// Fail with [`LockError::Busy`] instead of waiting.
    pub fn try_acquire(path: &Path) -> Result<Self, LockError> {
        let file = open_lock_file(path)?;
        match FileExt::try_lock_exclusive(&file) {
            Ok(()) => {
                debug!(path = %path.display(), "lock acquired");
                Ok(Self {
                    file,
                    path: path.to_path_buf(),
                })
            }
            Err(err) if err.kind() == fs2::lock_contended_error().kind() => {
                Err(LockError::Busy(path.to_path_buf()))
            }
            Err(source) => Err(LockError::Acquire {
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}

impl Drop for DirLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
        debug!(path = %self.path.display(), "lock released");
    }
}

fn open_lock_file(path: &Path) -> Result<File, LockError> {
    OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(path)
        .map_err(|source| LockError::Acquire {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn second_lock_is_busy_until_first_drops() {
        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join(".lock");

        let first = DirLock::acquire(&path).expect("first");
        assert!(matches!(DirLock::try_acquire(&path), Err(LockError::Busy(_))));
        drop(first);
        DirLock::try_acquire(&path).expect("after release");
    }

    #[test]
    fn acquire_waits_for_release() {
        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join(".lock");

        let first = DirLock::acquire(&path).expect("first");
        let waiter = {
            let path = path.clone();
            std::thread::spawn(move || DirLock::acquire(&path).map(drop))
        };
        std::thread::sleep(std::time::Duration::from_millis(50));
        drop(first);
        waiter.join().expect("join").expect("second acquire");
    }

    #[test]
    fn acquire_fails_without_directory() {
        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join("missing").join(".lock");
        assert!(matches!(
            DirLock::acquire(&path),
            Err(LockError::Acquire { .. })
        ));
    }
}

//! Exclusive lock serializing runs that share a results store.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use fs4::fs_std::FileExt;

/// Holds an exclusive lock on `<store>.lock` until dropped.
///
/// The lock lives in a sidecar file so the store itself can be replaced
/// atomically while the lock is held.
#[derive(Debug)]
pub struct StoreLock {
    file: File,
    path: PathBuf,
}

impl StoreLock {
    /// Blocks until the lock for `store_path` is acquired.
    pub fn acquire(store_path: &Path) -> io::Result<Self> {
        let path = lock_path_for(store_path);
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)?;

        log::debug!("Waiting for lock {}", path.display());
        FileExt::lock_exclusive(&file)?;
        log::debug!("Acquired lock {}", path.display());

        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            log::warn!("Failed to release lock {}: {}", self.path.display(), e);
        }
    }
}

fn lock_path_for(store_path: &Path) -> PathBuf {
    let mut name = store_path.as_os_str().to_owned();
    name.push(".lock");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_file_next_to_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = dir.path().join("_stats.json");

        let lock = StoreLock::acquire(&store).unwrap();
        assert_eq!(lock.path(), dir.path().join("_stats.json.lock"));
        assert!(lock.path().exists());
        drop(lock);

        // released on drop, so it can be taken again
        let again = StoreLock::acquire(&store).unwrap();
        drop(again);
    }
}

// file: src/registry/lock.rs
// description: exclusive advisory lock held around registry read-modify-write
// reference: https://docs.rs/fs2

use crate::error::{Result, TrackError};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Guard for `<registry>.lock`. The lock is released on drop.
///
/// The lock file itself is left in place; removing it would race with a
/// process that opened it but has not locked it yet.
#[derive(Debug)]
pub struct RegistryLock {
    path: PathBuf,
    file: File,
}

impl RegistryLock {
    /// Blocks until the lock is available.
    pub fn acquire(registry_path: &Path) -> Result<Self> {
        if let Some(lock) = Self::try_acquire(registry_path)? {
            return Ok(lock);
        }

        let path = lock_path_for(registry_path);
        info!("Registry is locked by another run, waiting: {}", path.display());
        let file = open_lock_file(&path)?;
        file.lock_exclusive().map_err(|source| TrackError::Lock {
            path: path.clone(),
            source,
        })?;

        write_pid(&file);
        debug!("Registry lock acquired after waiting: {}", path.display());
        Ok(Self { path, file })
    }

    /// Returns `Ok(None)` instead of waiting when another run holds the lock.
    pub fn try_acquire(registry_path: &Path) -> Result<Option<Self>> {
        let path = lock_path_for(registry_path);
        let file = open_lock_file(&path)?;

        match file.try_lock_exclusive() {
            Ok(()) => {
                write_pid(&file);
                debug!("Registry lock acquired: {}", path.display());
                Ok(Some(Self { path, file }))
            }
            Err(err) if err.kind() == fs2::lock_contended_error().kind() => Ok(None),
            Err(source) => Err(TrackError::Lock { path, source }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RegistryLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            warn!("Failed to release registry lock {}: {}", self.path.display(), e);
        }
    }
}

pub fn lock_path_for(registry_path: &Path) -> PathBuf {
    let mut name = registry_path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".lock");
    registry_path.with_file_name(name)
}

fn open_lock_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|source| TrackError::Lock {
            path: path.to_path_buf(),
            source,
        })?;
    }

    OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .map_err(|source| TrackError::Lock {
            path: path.to_path_buf(),
            source,
        })
}

// Informational only; a stale pid never blocks acquisition.
fn write_pid(mut file: &File) {
    let result = file
        .set_len(0)
        .and_then(|_| writeln!(file, "{}", std::process::id()));
    if let Err(e) = result {
        debug!("Could not record pid in lock file: {}", e);
    }
}

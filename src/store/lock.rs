use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::Path;

use crate::error::{Result, TaskpadError};

/// Take the data directory's write lock without blocking. The lock is
/// released when the returned handle is dropped.
pub fn acquire_lock(path: &Path) -> Result<File> {
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)?;

    file.try_lock_exclusive()
        .map_err(|_| TaskpadError::Locked(path.display().to_string()))?;

    Ok(file)
}

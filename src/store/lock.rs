//! File locking for store writes.
//!
//! A [`StoreLock`] serializes writers of the same store entry across tasks
//! *and* processes (two `musai` invocations sharing one store directory). The
//! lock is released when the value is dropped.

use anyhow::{Context, Result};
use fs4::fs_std::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

/// An exclusive OS-level lock on `{root}/.locks/{name}.lock`.
pub struct StoreLock {
    _file: File,
    path: PathBuf,
}

impl StoreLock {
    /// Acquire the exclusive lock named `name` under `root`.
    ///
    /// Blocks (on a blocking-pool thread, not the runtime) until any other
    /// holder releases it. Lock files are left in place after release.
    ///
    /// # Errors
    ///
    /// Fails if the `.locks` directory or lock file cannot be created, or if
    /// the file system does not support locking.
    pub async fn acquire(root: &Path, name: &str) -> Result<Self> {
        let locks_dir = root.join(".locks");
        tokio::fs::create_dir_all(&locks_dir).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::PermissionDenied {
                anyhow::anyhow!(
                    "Permission denied: cannot create locks directory at {}",
                    locks_dir.display()
                )
            } else {
                anyhow::anyhow!("Failed to create directory {}: {}", locks_dir.display(), e)
            }
        })?;

        let lock_path = locks_dir.join(format!("{name}.lock"));
        let lock_path_clone = lock_path.clone();
        let name = name.to_string();

        let file = tokio::task::spawn_blocking(move || -> Result<File> {
            let file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&lock_path_clone)
                .with_context(|| {
                    format!("Failed to open lock file: {}", lock_path_clone.display())
                })?;

            file.lock_exclusive().with_context(|| format!("Failed to acquire lock for: {name}"))?;

            Ok(file)
        })
        .await
        .context("Failed to spawn blocking task for lock acquisition")??;

        Ok(Self {
            _file: file,
            path: lock_path,
        })
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        #[allow(unstable_name_collisions)]
        if let Err(e) = self._file.unlock() {
            tracing::warn!(target: "store", "Failed to unlock {}: {}", self.path.display(), e);
        }
    }
}

//! Durable artifact store backed by a directory tree.
//!
//! # Layout
//!
//! ```text
//! <root>/
//! ├── draft/<sha256>.json
//! ├── lecture/<sha256>.json
//! ├── marker/<sha256>.flag
//! ├── icon/<sha256>.bin
//! ├── lecture-image/<sha256>.bin
//! └── .locks/<namespace>-<sha256>.lock
//! ```
//!
//! File names are the hex SHA-256 of the entry id, so arbitrary (already
//! URL-safe) keys of any length map to fixed-size, portable names. Images are
//! kept in their own directories so small JSON artifacts stay cheap to list.
//!
//! Writes go through a per-entry [`StoreLock`] and [`atomic_write`], so a
//! reader never observes a half-written file and two processes writing the
//! same entry serialize. Reads take no lock.

use super::{ArtifactStore, Namespace, StoreKey, StoreLock};
use crate::core::MusaiError;
use crate::utils::fs::atomic_write;
use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Directory-backed [`ArtifactStore`]; survives restarts.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Open (lazily create) a store rooted at `root`.
    ///
    /// Nothing touches the disk until the first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
        }
    }

    /// Root directory of the store.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the file holding `key`.
    #[must_use]
    pub fn path_for(&self, key: &StoreKey) -> PathBuf {
        self.root
            .join(key.namespace().name())
            .join(format!("{}.{}", hashed_id(key), extension(key.namespace())))
    }

    fn lock_name(key: &StoreKey) -> String {
        format!("{}-{}", key.namespace().name(), hashed_id(key))
    }
}

fn hashed_id(key: &StoreKey) -> String {
    hex::encode(Sha256::digest(key.id().as_bytes()))
}

const fn extension(namespace: Namespace) -> &'static str {
    match namespace {
        Namespace::Draft | Namespace::Lecture => "json",
        Namespace::Icon | Namespace::LectureImage => "bin",
        Namespace::Marker | Namespace::ImageAttempt => "flag",
    }
}

impl ArtifactStore for FileStore {
    async fn get(&self, key: &StoreKey) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(anyhow::Error::from(e).context(MusaiError::StoreError {
                operation: format!("read {key}"),
                path: path.display().to_string(),
            })),
        }
    }

    async fn set(&self, key: &StoreKey, value: Vec<u8>) -> Result<()> {
        let path = self.path_for(key);
        let _lock = StoreLock::acquire(&self.root, &Self::lock_name(key)).await?;

        let target = path.clone();
        tokio::task::spawn_blocking(move || atomic_write(&target, &value))
            .await
            .context("Failed to join store write task")?
            .with_context(|| MusaiError::StoreError {
                operation: format!("write {key}"),
                path: path.display().to_string(),
            })?;

        tracing::debug!(target: "store", "Wrote {} to {}", key, path.display());
        Ok(())
    }

    async fn has(&self, key: &StoreKey) -> Result<bool> {
        let path = self.path_for(key);
        tokio::fs::try_exists(&path).await.map_err(|e| {
            anyhow::Error::from(e).context(MusaiError::StoreError {
                operation: format!("check {key}"),
                path: path.display().to_string(),
            })
        })
    }

    async fn remove(&self, key: &StoreKey) -> Result<bool> {
        let path = self.path_for(key);
        let _lock = StoreLock::acquire(&self.root, &Self::lock_name(key)).await?;

        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::debug!(target: "store", "Removed {}", key);
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(anyhow::Error::from(e).context(MusaiError::StoreError {
                operation: format!("remove {key}"),
                path: path.display().to_string(),
            })),
        }
    }
}

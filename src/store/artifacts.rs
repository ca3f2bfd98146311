//! Typed access to the artifact store.
//!
//! [`Artifacts`] is the only place that knows how each artifact kind is
//! encoded: drafts and lectures as JSON, images as `mime\nbytes`, markers as a
//! single byte. Everything above this layer deals in [`CourseDraft`],
//! [`LectureArtifact`] and [`ImageArtifact`] values.
//!
//! An entry that exists but cannot be decoded (hand-edited file, older format)
//! is logged and reported as absent; the next access regenerates it.

use super::{ArtifactStore, StoreKey};
use crate::course::{CourseDraft, ImageArtifact, LectureArtifact};
use crate::key::{CacheKey, LectureKey};
use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;

const MARKER_VALUE: &[u8] = b"1";

/// Typed façade over an [`ArtifactStore`].
///
/// Cheap to clone; clones share the underlying store.
#[derive(Debug)]
pub struct Artifacts<S> {
    store: Arc<S>,
}

impl<S> Clone for Artifacts<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: ArtifactStore> Artifacts<S> {
    /// Wrap a store.
    pub fn new(store: S) -> Self {
        Self::from_arc(Arc::new(store))
    }

    /// Wrap a shared store.
    pub const fn from_arc(store: Arc<S>) -> Self {
        Self {
            store,
        }
    }

    /// The underlying byte store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Cached draft for a course.
    pub async fn draft(&self, key: &CacheKey) -> Result<Option<CourseDraft>> {
        self.get_json(&StoreKey::draft(key)).await
    }

    /// Store a draft, replacing any previous one.
    pub async fn put_draft(&self, key: &CacheKey, draft: &CourseDraft) -> Result<()> {
        self.put_json(&StoreKey::draft(key), draft).await
    }

    /// Delete a course's draft.
    pub async fn remove_draft(&self, key: &CacheKey) -> Result<bool> {
        self.store.remove(&StoreKey::draft(key)).await
    }

    /// Cached course icon.
    pub async fn icon(&self, key: &CacheKey) -> Result<Option<ImageArtifact>> {
        self.image(&StoreKey::icon(key)).await
    }

    /// Store a course icon.
    pub async fn put_icon(&self, key: &CacheKey, icon: &ImageArtifact) -> Result<()> {
        self.put_image(&StoreKey::icon(key), icon).await
    }

    /// Delete a course icon.
    pub async fn remove_icon(&self, key: &CacheKey) -> Result<bool> {
        self.store.remove(&StoreKey::icon(key)).await
    }

    /// Cached lecture content.
    pub async fn lecture(&self, key: &LectureKey) -> Result<Option<LectureArtifact>> {
        self.get_json(&StoreKey::lecture(key)).await
    }

    /// Store lecture content.
    pub async fn put_lecture(&self, key: &LectureKey, lecture: &LectureArtifact) -> Result<()> {
        self.put_json(&StoreKey::lecture(key), lecture).await
    }

    /// Delete lecture content.
    pub async fn remove_lecture(&self, key: &LectureKey) -> Result<bool> {
        self.store.remove(&StoreKey::lecture(key)).await
    }

    /// Cached lecture illustration.
    pub async fn lecture_image(&self, key: &LectureKey) -> Result<Option<ImageArtifact>> {
        self.image(&StoreKey::lecture_image(key)).await
    }

    /// Store a lecture illustration.
    pub async fn put_lecture_image(&self, key: &LectureKey, image: &ImageArtifact) -> Result<()> {
        self.put_image(&StoreKey::lecture_image(key), image).await
    }

    /// Delete a lecture illustration.
    pub async fn remove_lecture_image(&self, key: &LectureKey) -> Result<bool> {
        self.store.remove(&StoreKey::lecture_image(key)).await
    }

    /// Whether a draft generation for this course already ran.
    pub async fn is_generated(&self, key: &CacheKey) -> Result<bool> {
        self.store.has(&StoreKey::marker(key)).await
    }

    /// Record that a draft generation for this course ran.
    pub async fn mark_generated(&self, key: &CacheKey) -> Result<()> {
        self.store.set(&StoreKey::marker(key), MARKER_VALUE.to_vec()).await
    }

    /// Forget that a draft generation ran, allowing a new one.
    pub async fn clear_generated(&self, key: &CacheKey) -> Result<bool> {
        self.store.remove(&StoreKey::marker(key)).await
    }

    /// Whether an earlier generation of this image failed.
    pub async fn image_attempted(&self, image: &StoreKey) -> Result<bool> {
        self.store.has(&StoreKey::image_attempt(image)).await
    }

    /// Record a failed image generation so it is not requested again.
    pub async fn mark_image_attempt(&self, image: &StoreKey) -> Result<()> {
        self.store.set(&StoreKey::image_attempt(image), MARKER_VALUE.to_vec()).await
    }

    /// Allow a new generation of this image.
    pub async fn clear_image_attempt(&self, image: &StoreKey) -> Result<bool> {
        self.store.remove(&StoreKey::image_attempt(image)).await
    }

    async fn get_json<T: DeserializeOwned>(&self, key: &StoreKey) -> Result<Option<T>> {
        let Some(bytes) = self.store.get(key).await? else {
            tracing::debug!(target: "store", "Cache miss: {}", key);
            return Ok(None);
        };
        match serde_json::from_slice(&bytes) {
            Ok(value) => {
                tracing::debug!(target: "store", "Cache hit: {}", key);
                Ok(Some(value))
            }
            Err(e) => {
                tracing::warn!(target: "store", "Ignoring undecodable entry {}: {}", key, e);
                Ok(None)
            }
        }
    }

    async fn put_json<T: Serialize + Sync>(&self, key: &StoreKey, value: &T) -> Result<()> {
        let bytes =
            serde_json::to_vec(value).with_context(|| format!("Failed to serialize {key}"))?;
        self.store.set(key, bytes).await
    }

    /// Image stored under any image key.
    pub(crate) async fn image(&self, key: &StoreKey) -> Result<Option<ImageArtifact>> {
        let Some(bytes) = self.store.get(key).await? else {
            return Ok(None);
        };
        let image = ImageArtifact::from_bytes(&bytes);
        if image.is_none() {
            tracing::warn!(target: "store", "Ignoring undecodable image entry {}", key);
        }
        Ok(image)
    }

    /// Store an image under any image key.
    pub(crate) async fn put_image(&self, key: &StoreKey, image: &ImageArtifact) -> Result<()> {
        self.store.set(key, image.to_bytes()).await
    }
}

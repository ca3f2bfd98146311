//! Durable, keyed storage for generated artifacts.
//!
//! The store is the only shared mutable resource in the pipeline and the
//! reason the pipeline exists: once an artifact is written here, no later run
//! pays for generating it again.
//!
//! # Layers
//!
//! - [`ArtifactStore`] - raw byte store, injected into the pipeline. Two
//!   implementations ship with the crate:
//!   - [`FileStore`] - one file per entry, survives restarts
//!   - [`MemoryStore`] - `DashMap`-backed, for tests and throwaway sessions
//! - [`Artifacts`] - typed façade that encodes drafts, lectures and images and
//!   derives [`StoreKey`]s from [`CacheKey`] / [`LectureKey`]
//!
//! # Namespaces
//!
//! | Namespace        | Key          | Value                          |
//! |------------------|--------------|--------------------------------|
//! | `draft`          | [`CacheKey`] | course draft JSON              |
//! | `icon`           | [`CacheKey`] | image bytes                    |
//! | `marker`         | [`CacheKey`] | "draft generation completed"   |
//! | `lecture`        | [`LectureKey`] | lecture JSON                 |
//! | `lecture-image`  | [`LectureKey`] | image bytes                  |
//! | `image-attempt`  | image [`StoreKey`] | "image generation failed" |
//!
//! # Consistency
//!
//! Writes replace whole entries; there are no partial or merge writes, so
//! last-writer-wins is sufficient and no transactions are needed. Nothing is
//! evicted automatically. Entries disappear only through an explicit
//! [`ArtifactStore::remove`] (discard or regenerate).

use crate::key::{CacheKey, LectureKey};
use anyhow::Result;
use std::fmt;
use std::future::Future;

pub mod artifacts;
pub mod file;
pub mod lock;
pub mod memory;

pub use artifacts::Artifacts;
pub use file::FileStore;
pub use lock::StoreLock;
pub use memory::MemoryStore;

/// Kind of artifact an entry holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Namespace {
    /// Course draft (metadata and syllabus)
    Draft,
    /// Course icon image
    Icon,
    /// Rendered lecture content
    Lecture,
    /// Lecture illustration image
    LectureImage,
    /// "Draft generation already ran" flag
    Marker,
    /// "Image generation failed, do not ask again" flag
    ImageAttempt,
}

impl Namespace {
    /// Directory / display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Icon => "icon",
            Self::Lecture => "lecture",
            Self::LectureImage => "lecture-image",
            Self::Marker => "marker",
            Self::ImageAttempt => "image-attempt",
        }
    }

    /// Whether values are (potentially large) binary blobs.
    #[must_use]
    pub const fn is_blob(self) -> bool {
        matches!(self, Self::Icon | Self::LectureImage)
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Address of one store entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StoreKey {
    namespace: Namespace,
    id: String,
}

impl StoreKey {
    /// Key of a course draft.
    #[must_use]
    pub fn draft(key: &CacheKey) -> Self {
        Self::course(Namespace::Draft, key)
    }

    /// Key of a course icon.
    #[must_use]
    pub fn icon(key: &CacheKey) -> Self {
        Self::course(Namespace::Icon, key)
    }

    /// Key of a course's generated marker.
    #[must_use]
    pub fn marker(key: &CacheKey) -> Self {
        Self::course(Namespace::Marker, key)
    }

    /// Key of the failed-attempt flag for an image entry.
    #[must_use]
    pub fn image_attempt(image: &Self) -> Self {
        Self {
            namespace: Namespace::ImageAttempt,
            id: image.to_string(),
        }
    }

    /// Key of a lecture's content.
    #[must_use]
    pub fn lecture(key: &LectureKey) -> Self {
        Self {
            namespace: Namespace::Lecture,
            id: key.composite(),
        }
    }

    /// Key of a lecture's illustration.
    #[must_use]
    pub fn lecture_image(key: &LectureKey) -> Self {
        Self {
            namespace: Namespace::LectureImage,
            id: key.composite(),
        }
    }

    fn course(namespace: Namespace, key: &CacheKey) -> Self {
        Self {
            namespace,
            id: key.as_str().to_string(),
        }
    }

    /// Namespace of this entry.
    #[must_use]
    pub const fn namespace(&self) -> Namespace {
        self.namespace
    }

    /// Identity within the namespace.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.id)
    }
}

/// Byte-level key/value store for artifacts.
///
/// Implementations must:
/// - return `Ok(None)` / `Ok(false)` for missing keys, never an error
/// - make [`set`](Self::set) an unconditional whole-value replacement
/// - be safe for concurrent reads at any time
pub trait ArtifactStore: Send + Sync {
    /// Read an entry.
    fn get(&self, key: &StoreKey) -> impl Future<Output = Result<Option<Vec<u8>>>> + Send;

    /// Write an entry, replacing any previous value.
    fn set(&self, key: &StoreKey, value: Vec<u8>) -> impl Future<Output = Result<()>> + Send;

    /// Whether an entry exists.
    fn has(&self, key: &StoreKey) -> impl Future<Output = Result<bool>> + Send {
        async move { Ok(self.get(key).await?.is_some()) }
    }

    /// Delete an entry, returning whether it existed.
    fn remove(&self, key: &StoreKey) -> impl Future<Output = Result<bool>> + Send;
}

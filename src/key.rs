//! Cache identities for courses and lectures.
//!
//! Every artifact in the store is addressed through one of the two key types
//! defined here, never through a hand-built string:
//!
//! - [`CacheKey`] identifies a course (its draft, icon and generated marker).
//!   It is derived from the free-text topic the user typed.
//! - [`LectureKey`] identifies one lecture of a course. It pairs the course's
//!   [`CacheKey`] with the lecture title as it currently appears in the
//!   syllabus, so retitling an entry yields a different key.
//!
//! # Normalization
//!
//! Both keys fold their text the same way: leading and trailing whitespace is
//! dropped, runs of inner whitespace collapse to a single space, and the text
//! is lowercased (Unicode-aware, locale-independent). The folded text is then
//! percent-encoded so keys are URL-safe and can never contain the `::`
//! separator used by [`LectureKey::composite`].
//!
//! ```rust
//! use musai_course::key::normalize;
//!
//! assert_eq!(normalize(" Quantum Physics "), normalize("quantum physics"));
//! assert_eq!(normalize("   "), None);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Fold text for identity comparison: trim, collapse whitespace, lowercase.
pub(crate) fn fold_text(text: &str) -> String {
    text.split_whitespace().map(str::to_lowercase).collect::<Vec<_>>().join(" ")
}

/// Normalized, URL-safe identity of a course topic.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derive the key for a topic.
    ///
    /// Returns `None` when the topic is empty after trimming; callers treat
    /// that as "no identity" and skip caching entirely.
    #[must_use]
    pub fn normalize(topic: &str) -> Option<Self> {
        let folded = fold_text(topic);
        if folded.is_empty() {
            return None;
        }
        Some(Self(urlencoding::encode(&folded).into_owned()))
    }

    /// The encoded key.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The folded topic this key was derived from, for display.
    #[must_use]
    pub fn topic(&self) -> String {
        urlencoding::decode(&self.0).map_or_else(|_| self.0.clone(), |t| t.into_owned())
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derive the [`CacheKey`] for a topic. See [`CacheKey::normalize`].
#[must_use]
pub fn normalize(topic: &str) -> Option<CacheKey> {
    CacheKey::normalize(topic)
}

/// Identity of a single lecture: course key plus folded lecture title.
///
/// The lecture part is recomputed from the live syllabus title every time a
/// lecture is looked up. A rename therefore points at a different (usually
/// empty) slot; old artifacts are left where they are and are never migrated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LectureKey {
    course: CacheKey,
    lecture: String,
}

impl LectureKey {
    /// Build the key for `lecture_title` within `course`.
    ///
    /// Returns `None` if the title is blank.
    #[must_use]
    pub fn new(course: &CacheKey, lecture_title: &str) -> Option<Self> {
        let folded = fold_text(lecture_title);
        if folded.is_empty() {
            return None;
        }
        Some(Self {
            course: course.clone(),
            lecture: urlencoding::encode(&folded).into_owned(),
        })
    }

    /// The course this lecture belongs to.
    #[must_use]
    pub fn course(&self) -> &CacheKey {
        &self.course
    }

    /// Encoded, folded lecture title.
    #[must_use]
    pub fn lecture(&self) -> &str {
        &self.lecture
    }

    /// `{course}::{lecture}` form used as the storage id.
    #[must_use]
    pub fn composite(&self) -> String {
        format!("{}::{}", self.course, self.lecture)
    }
}

impl fmt::Display for LectureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.course, self.lecture)
    }
}

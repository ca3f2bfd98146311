//! Export gating: is every lecture of the current syllabus really there?
//!
//! A course may only be exported when each syllabus entry of the *current*
//! draft has a lecture cached under the [`LectureKey`] derived from its
//! *current* title, and that lecture says something. "Says something" means
//! at least [`ContentPolicy::min_meaningful_chars`] characters remain once
//! markup, images, code fences and whitespace are stripped; a lecture that is
//! only an image or a heading does not count.
//!
//! Readiness is recomputed from the store on every call and never cached, so
//! a rename, a discard or a deleted store file is reflected immediately.

use crate::constants::DEFAULT_MIN_MEANINGFUL_CHARS;
use crate::course::{CourseDraft, LectureArtifact};
use crate::key::{CacheKey, LectureKey};
use crate::store::{ArtifactStore, Artifacts};
use anyhow::Result;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

static CODE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)(```|~~~).*?(```|~~~|\z)").expect("static regex"));
static SCRIPT_OR_STYLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(script|style)\b[^>]*>.*?</(script|style)\s*>").expect("static regex")
});
static MARKDOWN_IMAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!\[[^\]]*\]\([^)]*\)").expect("static regex"));
static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("static regex"));
static BLOCK_BOUNDARY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)</?(p|div|h[1-6]|li|ul|ol|br|section|blockquote|pre|tr)\b[^>]*>")
        .expect("static regex")
});
static NBSP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)&nbsp;|&#160;|&#xa0;").expect("static regex"));

/// Reduce lecture content to the prose it carries.
///
/// Removes fenced code blocks, `<script>`/`<style>` elements, Markdown
/// images, every remaining HTML tag (images included), non-breaking space
/// entities and finally all whitespace.
#[must_use]
pub fn strip_markup(content: &str) -> String {
    let text = CODE_FENCE.replace_all(content, "");
    let text = SCRIPT_OR_STYLE.replace_all(&text, "");
    let text = MARKDOWN_IMAGE.replace_all(&text, "");
    let text = TAG.replace_all(&text, "");
    let text = NBSP.replace_all(&text, "");
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Lecture content as readable terminal text: tags removed, line structure
/// kept, runs of blank lines collapsed.
#[must_use]
pub fn plain_text(content: &str) -> String {
    let text = SCRIPT_OR_STYLE.replace_all(content, "");
    let text = BLOCK_BOUNDARY.replace_all(&text, "\n");
    let text = TAG.replace_all(&text, "");
    let text = NBSP.replace_all(&text, " ");

    let mut out = Vec::new();
    for line in text.lines().map(str::trim_end) {
        if line.trim().is_empty() && out.last().is_none_or(|l: &&str| l.trim().is_empty()) {
            continue;
        }
        out.push(line);
    }
    while out.last().is_some_and(|l| l.trim().is_empty()) {
        out.pop();
    }
    out.join("\n")
}

/// Tunable thresholds for what counts as real content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentPolicy {
    /// Minimum prose characters after [`strip_markup`]
    pub min_meaningful_chars: usize,
}

impl Default for ContentPolicy {
    fn default() -> Self {
        Self {
            min_meaningful_chars: DEFAULT_MIN_MEANINGFUL_CHARS,
        }
    }
}

/// Whether `lecture` carries at least `policy.min_meaningful_chars` of prose.
#[must_use]
pub fn is_meaningfully_present(lecture: &LectureArtifact, policy: &ContentPolicy) -> bool {
    strip_markup(&lecture.content).chars().count() >= policy.min_meaningful_chars
}

/// Export status of one syllabus entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LectureStatus {
    /// Cached and meaningful
    Ready,
    /// Nothing cached under the current title
    Missing,
    /// Cached, but below the content floor
    Degenerate,
}

impl fmt::Display for LectureStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ready => "ready",
            Self::Missing => "missing",
            Self::Degenerate => "too short",
        })
    }
}

/// Readiness of one syllabus entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LectureReadiness {
    /// 0-based syllabus position
    pub index: usize,
    /// Current title
    pub title: String,
    /// Key derived from the current title, `None` for a blank title
    pub key: Option<LectureKey>,
    /// Status under that key
    pub status: LectureStatus,
}

/// Result of a completeness check over a whole syllabus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportReadiness {
    /// One entry per syllabus entry, in syllabus order
    pub lectures: Vec<LectureReadiness>,
}

impl ExportReadiness {
    /// True when the syllabus is non-empty and every lecture is ready.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        !self.lectures.is_empty() && self.lectures.iter().all(|l| l.status == LectureStatus::Ready)
    }

    /// Number of ready lectures.
    #[must_use]
    pub fn ready_count(&self) -> usize {
        self.lectures.iter().filter(|l| l.status == LectureStatus::Ready).count()
    }

    /// Titles of lectures that block export.
    #[must_use]
    pub fn missing(&self) -> Vec<String> {
        self.lectures
            .iter()
            .filter(|l| l.status != LectureStatus::Ready)
            .map(|l| l.title.clone())
            .collect()
    }
}

/// Checks a draft against the store.
#[derive(Debug)]
pub struct CompletenessGate<S> {
    artifacts: Artifacts<S>,
    policy: ContentPolicy,
}

impl<S: ArtifactStore> CompletenessGate<S> {
    /// Create a gate reading from `artifacts`.
    pub const fn new(artifacts: Artifacts<S>, policy: ContentPolicy) -> Self {
        Self {
            artifacts,
            policy,
        }
    }

    /// The content policy in use.
    #[must_use]
    pub const fn policy(&self) -> &ContentPolicy {
        &self.policy
    }

    /// Status of every syllabus entry of `draft`.
    ///
    /// # Errors
    ///
    /// Fails only if the store itself fails.
    pub async fn check(&self, course: &CacheKey, draft: &CourseDraft) -> Result<ExportReadiness> {
        let mut lectures = Vec::with_capacity(draft.syllabus.len());
        for (index, entry) in draft.syllabus.iter().enumerate() {
            let key = LectureKey::new(course, &entry.title);
            let status = match &key {
                None => LectureStatus::Missing,
                Some(key) => match self.artifacts.lecture(key).await? {
                    None => LectureStatus::Missing,
                    Some(lecture) if is_meaningfully_present(&lecture, &self.policy) => {
                        LectureStatus::Ready
                    }
                    Some(_) => LectureStatus::Degenerate,
                },
            };
            lectures.push(LectureReadiness {
                index,
                title: entry.title.clone(),
                key,
                status,
            });
        }

        let readiness = ExportReadiness {
            lectures,
        };
        tracing::debug!(
            target: "completeness",
            "{}: {}/{} lectures ready",
            course,
            readiness.ready_count(),
            readiness.lectures.len()
        );
        Ok(readiness)
    }

    /// Shorthand for `check(..).is_ready()`.
    ///
    /// # Errors
    ///
    /// Fails only if the store itself fails.
    pub async fn is_export_ready(&self, course: &CacheKey, draft: &CourseDraft) -> Result<bool> {
        Ok(self.check(course, draft).await?.is_ready())
    }
}

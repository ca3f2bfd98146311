//! Course data model: drafts, syllabus entries, lectures, and images.
//!
//! These are the artifacts the pipeline generates, caches, edits and exports.
//! The serialized form uses camelCase field names because the same JSON is
//! exchanged with the workflow backend and written to the store.

use crate::constants::DEFAULT_IMAGE_MIME;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

static MIME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^image/[a-z0-9][a-z0-9.+-]*$").expect("static regex"));

/// Course difficulty level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Difficulty {
    /// No prior knowledge assumed
    #[default]
    Beginner,
    /// Some familiarity assumed
    Intermediate,
    /// Working knowledge assumed
    Advanced,
}

impl Difficulty {
    /// Lowercase name as used on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Beginner => "beginner",
            Self::Intermediate => "intermediate",
            Self::Advanced => "advanced",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "beginner" => Ok(Self::Beginner),
            "intermediate" => Ok(Self::Intermediate),
            "advanced" => Ok(Self::Advanced),
            other => Err(format!(
                "unknown difficulty '{other}' (expected beginner, intermediate or advanced)"
            )),
        }
    }
}

impl TryFrom<String> for Difficulty {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// One entry of a course syllabus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyllabusEntry {
    /// Lecture title; also the lecture's cache identity
    pub title: String,
    /// One or two sentence summary used as the generation prompt
    #[serde(default, alias = "description")]
    pub summary: String,
    /// Free-form duration, e.g. "45 min"
    #[serde(default)]
    pub duration: String,
}

impl SyllabusEntry {
    /// Create an entry.
    pub fn new(
        title: impl Into<String>,
        summary: impl Into<String>,
        duration: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            summary: summary.into(),
            duration: duration.into(),
        }
    }
}

/// Generated course metadata and syllabus.
///
/// Created by the generation gateway, changed only through
/// [`crate::editor::EditableDraft`], and read-only everywhere else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseDraft {
    /// Course title
    pub title: String,
    /// Course description
    #[serde(default)]
    pub description: String,
    /// Instructor persona name
    #[serde(default)]
    pub instructor: String,
    /// Ordered lectures
    #[serde(default)]
    pub syllabus: Vec<SyllabusEntry>,
    /// Free-form total duration, e.g. "6 weeks"
    #[serde(default)]
    pub estimated_duration: String,
    /// Difficulty level
    #[serde(default)]
    pub difficulty: Difficulty,
    /// Tags, unique ignoring case, in insertion order
    #[serde(default)]
    pub tags: Vec<String>,
    /// When this draft was last generated or committed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl CourseDraft {
    /// Why this draft is unusable, if it is.
    ///
    /// A draft without a title or without a single titled lecture cannot be
    /// shown or exported, so the gateway treats it as a degenerate result.
    #[must_use]
    pub fn degenerate_reason(&self) -> Option<&'static str> {
        if self.title.trim().is_empty() {
            Some("draft has no title")
        } else if self.syllabus.is_empty() {
            Some("draft has an empty syllabus")
        } else if self.syllabus.iter().all(|e| e.title.trim().is_empty()) {
            Some("no syllabus entry has a title")
        } else {
            None
        }
    }

    /// Drop blank and duplicate tags (case-insensitive), keeping first
    /// occurrences in order.
    pub fn dedupe_tags(&mut self) {
        let mut seen = std::collections::HashSet::new();
        self.tags.retain(|tag| {
            let folded = tag.trim().to_lowercase();
            !folded.is_empty() && seen.insert(folded)
        });
        for tag in &mut self.tags {
            *tag = tag.trim().to_string();
        }
    }

    /// Whether a tag is present (case-insensitive).
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        let folded = tag.trim().to_lowercase();
        self.tags.iter().any(|t| t.to_lowercase() == folded)
    }
}

/// Rendered content of one lecture.
///
/// Written once per generation; a lecture is either cached or not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LectureArtifact {
    /// Lecture body, HTML or plain/Markdown text
    pub content: String,
    /// Whether `content` is trusted HTML
    #[serde(default)]
    pub is_html: bool,
    /// Title the service gave the lecture
    #[serde(default)]
    pub title: String,
    /// When the lecture was generated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<DateTime<Utc>>,
}

impl LectureArtifact {
    /// Create a lecture artifact without a timestamp.
    pub fn new(title: impl Into<String>, content: impl Into<String>, is_html: bool) -> Self {
        Self {
            content: content.into(),
            is_html,
            title: title.into(),
            generated_at: None,
        }
    }
}

/// A generated image: the course icon or a lecture illustration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageArtifact {
    /// Image mime type, e.g. `image/png`
    pub mime_type: String,
    /// Raw image bytes
    pub data: Vec<u8>,
}

impl ImageArtifact {
    /// Create an image, falling back to `image/png` for unknown mime types.
    pub fn new(mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        let mime_type = mime_type.into().trim().to_lowercase();
        let mime_type = if MIME_PATTERN.is_match(&mime_type) {
            mime_type
        } else {
            DEFAULT_IMAGE_MIME.to_string()
        };
        Self {
            mime_type,
            data,
        }
    }

    /// Parse a `data:<mime>;base64,<payload>` URI.
    #[must_use]
    pub fn from_data_uri(uri: &str) -> Option<Self> {
        use base64::Engine;

        let rest = uri.trim().strip_prefix("data:")?;
        let (meta, payload) = rest.split_once(',')?;
        let mime = meta.strip_suffix(";base64")?;
        let data = base64::engine::general_purpose::STANDARD.decode(payload.trim()).ok()?;
        Some(Self::new(mime, data))
    }

    /// Encode as a self-contained `data:` URI for embedding.
    #[must_use]
    pub fn to_data_uri(&self) -> String {
        use base64::Engine;

        format!(
            "data:{};base64,{}",
            self.mime_type,
            base64::engine::general_purpose::STANDARD.encode(&self.data)
        )
    }

    /// Storage encoding: mime type, newline, raw bytes.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.mime_type.len() + 1 + self.data.len());
        bytes.extend_from_slice(self.mime_type.as_bytes());
        bytes.push(b'\n');
        bytes.extend_from_slice(&self.data);
        bytes
    }

    /// Inverse of [`to_bytes`](Self::to_bytes).
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let split = bytes.iter().position(|b| *b == b'\n')?;
        let mime = std::str::from_utf8(&bytes[..split]).ok()?;
        Some(Self::new(mime, bytes[split + 1..].to_vec()))
    }
}

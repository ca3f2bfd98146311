//! Assembly of cached artifacts into one exportable document.
//!
//! The assembler is deliberately forgiving: it renders whatever is cached, in
//! syllabus order, and silently skips syllabus entries that have no lecture.
//! Deciding whether a partial course may be exported at all is the
//! [`crate::completeness`] gate's job, not this module's.
//!
//! Output is a single self-contained HTML file: icons and illustrations are
//! embedded as `data:` URIs so the file can be mailed or archived as is.
//!
//! # Example
//!
//! ```rust,no_run
//! use musai_course::export::{AssemblyOptions, DocumentAssembler, LectureSet};
//! use musai_course::key::normalize;
//! use musai_course::store::{Artifacts, MemoryStore};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let artifacts = Artifacts::new(MemoryStore::new());
//! let key = normalize("Rust for beginners").unwrap();
//! let draft = artifacts.draft(&key).await?.unwrap();
//!
//! let lectures = LectureSet::load(&artifacts, &key, &draft, false).await?;
//! let assembler = DocumentAssembler::new(AssemblyOptions::default())?;
//! let document = assembler.assemble(&key, &draft, None, &lectures)?;
//! document.write_to(std::path::Path::new("."))?;
//! # Ok(())
//! # }
//! ```

use crate::constants::FALLBACK_EXPORT_STEM;
use crate::course::{CourseDraft, ImageArtifact, LectureArtifact};
use crate::key::{CacheKey, LectureKey};
use crate::store::{ArtifactStore, Artifacts};
use crate::utils::fs::atomic_write;
use anyhow::{Context, Result};
use futures::future::try_join_all;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tera::Tera;

pub mod template;

use template::{COURSE_TEMPLATE, COURSE_TEMPLATE_NAME, format_tera_error};

/// Assembly switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssemblyOptions {
    /// Embed each lecture's illustration above its body, unless the body
    /// already starts with an image
    pub attach_lecture_images: bool,
}

/// Lectures and illustrations available for one course.
#[derive(Debug, Clone, Default)]
pub struct LectureSet {
    lectures: HashMap<LectureKey, LectureArtifact>,
    images: HashMap<LectureKey, ImageArtifact>,
}

impl LectureSet {
    /// An empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every cached lecture (and, if `with_images`, illustration) of
    /// `draft`'s current syllabus concurrently.
    ///
    /// # Errors
    ///
    /// Fails if the store fails. Missing entries are simply absent.
    pub async fn load<S: ArtifactStore>(
        artifacts: &Artifacts<S>,
        course: &CacheKey,
        draft: &CourseDraft,
        with_images: bool,
    ) -> Result<Self> {
        let keys: Vec<LectureKey> =
            draft.syllabus.iter().filter_map(|e| LectureKey::new(course, &e.title)).collect();

        let loaded = try_join_all(keys.iter().map(|key| async move {
            let lecture = artifacts.lecture(key).await?;
            let image =
                if with_images { artifacts.lecture_image(key).await? } else { None };
            anyhow::Ok((key.clone(), lecture, image))
        }))
        .await?;

        let mut set = Self::new();
        for (key, lecture, image) in loaded {
            if let Some(lecture) = lecture {
                set.lectures.insert(key.clone(), lecture);
            }
            if let Some(image) = image {
                set.images.insert(key, image);
            }
        }
        Ok(set)
    }

    /// Add or replace a lecture.
    pub fn insert_lecture(&mut self, key: LectureKey, lecture: LectureArtifact) {
        self.lectures.insert(key, lecture);
    }

    /// Add or replace an illustration.
    pub fn insert_image(&mut self, key: LectureKey, image: ImageArtifact) {
        self.images.insert(key, image);
    }

    /// Lecture stored under `key`.
    #[must_use]
    pub fn lecture(&self, key: &LectureKey) -> Option<&LectureArtifact> {
        self.lectures.get(key)
    }

    /// Illustration stored under `key`.
    #[must_use]
    pub fn image(&self, key: &LectureKey) -> Option<&ImageArtifact> {
        self.images.get(key)
    }

    /// Number of lectures.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lectures.len()
    }

    /// Whether no lecture is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lectures.is_empty()
    }
}

/// A rendered course.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Suggested file name, see [`export_filename`]
    pub filename: String,
    /// Complete HTML
    pub html: String,
    /// Number of lecture sections rendered
    pub section_count: usize,
}

impl Document {
    /// Write to `dir/filename` atomically, returning the path.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be written.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(&self.filename);
        atomic_write(&path, self.html.as_bytes())
            .with_context(|| format!("Failed to write export to {}", path.display()))?;
        Ok(path)
    }
}

#[derive(Serialize)]
struct DocumentView<'a> {
    title: &'a str,
    description: &'a str,
    instructor: &'a str,
    difficulty: &'a str,
    duration: &'a str,
    tags: &'a [String],
    icon: Option<String>,
    sections: Vec<SectionView<'a>>,
}

#[derive(Serialize)]
struct SectionView<'a> {
    number: usize,
    title: &'a str,
    duration: &'a str,
    body: &'a str,
    is_html: bool,
    image: Option<String>,
}

/// Renders drafts and lectures into [`Document`]s.
#[derive(Debug)]
pub struct DocumentAssembler {
    tera: Tera,
    options: AssemblyOptions,
}

impl DocumentAssembler {
    /// Create an assembler.
    ///
    /// # Errors
    ///
    /// Fails only if the built-in template does not parse.
    pub fn new(options: AssemblyOptions) -> Result<Self> {
        let mut tera = Tera::default();
        tera.autoescape_on(vec![".html"]);
        tera.add_raw_template(COURSE_TEMPLATE_NAME, COURSE_TEMPLATE).map_err(|e| {
            anyhow::anyhow!("Failed to parse course template:\n{}", format_tera_error(&e))
        })?;
        Ok(Self {
            tera,
            options,
        })
    }

    /// The switches this assembler renders with.
    #[must_use]
    pub const fn options(&self) -> AssemblyOptions {
        self.options
    }

    /// Render `draft` with whatever `lectures` holds.
    ///
    /// Sections follow syllabus order. Entries with no lecture in `lectures`
    /// are skipped without error; the returned
    /// [`section_count`](Document::section_count) says how many made it.
    ///
    /// # Errors
    ///
    /// Fails only if rendering fails.
    pub fn assemble(
        &self,
        course: &CacheKey,
        draft: &CourseDraft,
        icon: Option<&ImageArtifact>,
        lectures: &LectureSet,
    ) -> Result<Document> {
        let mut sections = Vec::new();
        for entry in &draft.syllabus {
            let Some(key) = LectureKey::new(course, &entry.title) else {
                continue;
            };
            let Some(lecture) = lectures.lecture(&key) else {
                tracing::debug!(target: "export", "Skipping '{}': no cached lecture", entry.title);
                continue;
            };

            let image = if self.options.attach_lecture_images && !leads_with_image(&lecture.content)
            {
                lectures.image(&key).map(ImageArtifact::to_data_uri)
            } else {
                None
            };

            sections.push(SectionView {
                number: sections.len() + 1,
                title: &entry.title,
                duration: &entry.duration,
                body: &lecture.content,
                is_html: lecture.is_html,
                image,
            });
        }

        let section_count = sections.len();
        let view = DocumentView {
            title: &draft.title,
            description: &draft.description,
            instructor: &draft.instructor,
            difficulty: draft.difficulty.as_str(),
            duration: &draft.estimated_duration,
            tags: &draft.tags,
            icon: icon.map(ImageArtifact::to_data_uri),
            sections,
        };

        let context = tera::Context::from_serialize(&view)
            .map_err(|e| anyhow::anyhow!("Failed to build template context: {}", e))?;
        let html = self.tera.render(COURSE_TEMPLATE_NAME, &context).map_err(|e| {
            anyhow::anyhow!("Failed to render course document:\n{}", format_tera_error(&e))
        })?;

        tracing::debug!(
            target: "export",
            "Assembled '{}' with {}/{} sections",
            draft.title,
            section_count,
            draft.syllabus.len()
        );

        Ok(Document {
            filename: export_filename(&draft.title),
            html,
            section_count,
        })
    }
}

/// Whether lecture content already opens with an image.
fn leads_with_image(content: &str) -> bool {
    let start = content.trim_start().to_lowercase();
    ["<img", "<p><img", "<figure", "!["].iter().any(|prefix| start.starts_with(prefix))
}

/// File name for an exported course.
///
/// Lowercases the title, turns whitespace runs into `-`, drops anything that
/// is not alphanumeric, `-`, `_` or `.`, and appends `.html`. A title that
/// leaves nothing behind becomes `course.html`.
#[must_use]
pub fn export_filename(title: &str) -> String {
    let words: Vec<String> = title
        .split_whitespace()
        .map(|word| {
            word.to_lowercase()
                .chars()
                .filter(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.'))
                .collect::<String>()
        })
        .filter(|word| !word.is_empty())
        .collect();

    let stem = words.join("-");
    let stem = stem.trim_matches(|c| c == '.' || c == '-');
    if stem.is_empty() {
        format!("{FALLBACK_EXPORT_STEM}.html")
    } else {
        format!("{stem}.html")
    }
}

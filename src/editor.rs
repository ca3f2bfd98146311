//! Editing a cached draft without breaking its identity.
//!
//! An edit session works on a private copy of the draft. Nothing reaches the
//! store until [`Reconciler::commit`], which writes the edited draft back under
//! the *same* [`CacheKey`] it was opened with. Changing the course title
//! never moves the course.
//!
//! Lectures are a different matter: their keys are derived from the current
//! syllabus titles, so renaming an entry points it at a new, empty slot. The
//! old lecture stays in the store untouched (it is never migrated or
//! deleted); [`EditableDraft::orphaned_lectures`] lists the entries that will
//! need regenerating.

use crate::core::MusaiError;
use crate::course::{CourseDraft, Difficulty, SyllabusEntry};
use crate::key::{CacheKey, LectureKey, fold_text};
use crate::store::{ArtifactStore, Artifacts};
use anyhow::Result;
use chrono::Utc;

/// One change to a draft.
///
/// Lecture indices are 0-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DraftEdit {
    /// Replace the course title
    SetTitle(String),
    /// Replace the description
    SetDescription(String),
    /// Replace the instructor persona
    SetInstructor(String),
    /// Change the difficulty level
    SetDifficulty(Difficulty),
    /// Replace the total duration text
    SetEstimatedDuration(String),
    /// Add a tag (no-op if present, ignoring case)
    AddTag(String),
    /// Remove a tag (ignoring case)
    RemoveTag(String),
    /// Append a lecture
    AddLecture(SyllabusEntry),
    /// Insert a lecture before `index` (`index == len` appends)
    InsertLecture {
        /// Position of the new entry
        index: usize,
        /// The entry
        entry: SyllabusEntry,
    },
    /// Remove the lecture at an index
    RemoveLecture(usize),
    /// Change a lecture's title
    RetitleLecture {
        /// Lecture position
        index: usize,
        /// New title
        title: String,
    },
    /// Change a lecture's summary
    ResummarizeLecture {
        /// Lecture position
        index: usize,
        /// New summary
        summary: String,
    },
    /// Move a lecture to a new position
    MoveLecture {
        /// Current position
        from: usize,
        /// Target position
        to: usize,
    },
}

fn invalid(reason: impl Into<String>) -> anyhow::Error {
    MusaiError::InvalidEdit {
        reason: reason.into(),
    }
    .into()
}

/// A draft being edited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditableDraft {
    key: CacheKey,
    original: CourseDraft,
    working: CourseDraft,
}

impl EditableDraft {
    /// Start editing `draft`, cached under `key`.
    #[must_use]
    pub fn begin(key: CacheKey, draft: CourseDraft) -> Self {
        Self {
            key,
            working: draft.clone(),
            original: draft,
        }
    }

    /// The course identity; fixed for the whole session.
    #[must_use]
    pub const fn key(&self) -> &CacheKey {
        &self.key
    }

    /// The draft as it was when editing began.
    #[must_use]
    pub const fn original(&self) -> &CourseDraft {
        &self.original
    }

    /// The draft with all edits applied so far.
    #[must_use]
    pub const fn working(&self) -> &CourseDraft {
        &self.working
    }

    /// Whether any edit changed the draft.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.working != self.original
    }

    /// Apply one edit, returning the new session state.
    ///
    /// `self` is left untouched, so a rejected edit loses nothing.
    ///
    /// # Errors
    ///
    /// [`MusaiError::InvalidEdit`] for an index outside the syllabus, a blank
    /// title, or a lecture title that would collide with another entry.
    pub fn apply(&self, edit: DraftEdit) -> Result<Self> {
        let mut next = self.clone();
        let draft = &mut next.working;
        let len = draft.syllabus.len();

        match edit {
            DraftEdit::SetTitle(title) => {
                if title.trim().is_empty() {
                    return Err(invalid("course title cannot be empty"));
                }
                draft.title = title.trim().to_string();
            }
            DraftEdit::SetDescription(description) => draft.description = description,
            DraftEdit::SetInstructor(instructor) => {
                draft.instructor = instructor.trim().to_string();
            }
            DraftEdit::SetDifficulty(difficulty) => draft.difficulty = difficulty,
            DraftEdit::SetEstimatedDuration(duration) => {
                draft.estimated_duration = duration.trim().to_string();
            }
            DraftEdit::AddTag(tag) => {
                if tag.trim().is_empty() {
                    return Err(invalid("tag cannot be empty"));
                }
                if !draft.has_tag(&tag) {
                    draft.tags.push(tag.trim().to_string());
                }
            }
            DraftEdit::RemoveTag(tag) => {
                let folded = tag.trim().to_lowercase();
                draft.tags.retain(|t| t.to_lowercase() != folded);
            }
            DraftEdit::AddLecture(entry) => {
                let entry = validated_entry(draft, entry, None)?;
                draft.syllabus.push(entry);
            }
            DraftEdit::InsertLecture {
                index,
                entry,
            } => {
                if index > len {
                    return Err(invalid(format!(
                        "cannot insert at position {}: syllabus has {len} entries",
                        index + 1
                    )));
                }
                let entry = validated_entry(draft, entry, None)?;
                draft.syllabus.insert(index, entry);
            }
            DraftEdit::RemoveLecture(index) => {
                check_index(index, len)?;
                draft.syllabus.remove(index);
            }
            DraftEdit::RetitleLecture {
                index,
                title,
            } => {
                check_index(index, len)?;
                let current = draft.syllabus[index].clone();
                let entry = validated_entry(
                    draft,
                    SyllabusEntry {
                        title,
                        ..current
                    },
                    Some(index),
                )?;
                draft.syllabus[index] = entry;
            }
            DraftEdit::ResummarizeLecture {
                index,
                summary,
            } => {
                check_index(index, len)?;
                draft.syllabus[index].summary = summary;
            }
            DraftEdit::MoveLecture {
                from,
                to,
            } => {
                check_index(from, len)?;
                check_index(to, len)?;
                let entry = draft.syllabus.remove(from);
                draft.syllabus.insert(to, entry);
            }
        }

        Ok(next)
    }

    /// Abandon the session, returning the unedited draft.
    #[must_use]
    pub fn cancel(self) -> CourseDraft {
        tracing::debug!(target: "editor", "Discarding edits to {}", self.key);
        self.original
    }

    /// Original syllabus titles whose lecture key no longer appears in the
    /// working syllabus.
    ///
    /// Their cached lectures stay in the store but no longer count toward
    /// export; the retitled or new entries start out missing.
    #[must_use]
    pub fn orphaned_lectures(&self) -> Vec<String> {
        let current: Vec<LectureKey> = self
            .working
            .syllabus
            .iter()
            .filter_map(|e| LectureKey::new(&self.key, &e.title))
            .collect();

        self.original
            .syllabus
            .iter()
            .filter(|e| {
                LectureKey::new(&self.key, &e.title).is_some_and(|key| !current.contains(&key))
            })
            .map(|e| e.title.clone())
            .collect()
    }
}

fn check_index(index: usize, len: usize) -> Result<()> {
    if index >= len {
        return Err(invalid(format!(
            "lecture {} does not exist: syllabus has {len} entries",
            index + 1
        )));
    }
    Ok(())
}

/// Trim `entry` and make sure its title is non-blank and unique in `draft`
/// (ignoring the entry at `replacing`).
fn validated_entry(
    draft: &CourseDraft,
    mut entry: SyllabusEntry,
    replacing: Option<usize>,
) -> Result<SyllabusEntry> {
    entry.title = entry.title.trim().to_string();
    if entry.title.is_empty() {
        return Err(invalid("lecture title cannot be empty"));
    }
    let folded = fold_text(&entry.title);
    let clash = draft
        .syllabus
        .iter()
        .enumerate()
        .any(|(i, e)| Some(i) != replacing && fold_text(&e.title) == folded);
    if clash {
        return Err(invalid(format!("a lecture titled '{}' already exists", entry.title)));
    }
    Ok(entry)
}

/// Loads drafts for editing and writes edited drafts back.
#[derive(Debug)]
pub struct Reconciler<S> {
    artifacts: Artifacts<S>,
}

impl<S: ArtifactStore> Reconciler<S> {
    /// Create a reconciler over `artifacts`.
    pub const fn new(artifacts: Artifacts<S>) -> Self {
        Self {
            artifacts,
        }
    }

    /// Open the cached draft of `key` for editing.
    ///
    /// # Errors
    ///
    /// [`MusaiError::DraftNotFound`] if no draft is cached.
    pub async fn begin_edit(&self, key: &CacheKey) -> Result<EditableDraft> {
        let draft = self.artifacts.draft(key).await?.ok_or_else(|| MusaiError::DraftNotFound {
            key: key.to_string(),
        })?;
        Ok(EditableDraft::begin(key.clone(), draft))
    }

    /// Replace the cached draft with the session's working draft, under the
    /// key the session was opened with.
    ///
    /// # Errors
    ///
    /// [`MusaiError::InvalidEdit`] if the edited draft is unusable (no title
    /// or no lectures); store failures otherwise.
    pub async fn commit(&self, session: EditableDraft) -> Result<CourseDraft> {
        let EditableDraft {
            key,
            original,
            mut working,
        } = session;

        if let Some(reason) = working.degenerate_reason() {
            return Err(invalid(reason));
        }
        if working == original {
            tracing::debug!(target: "editor", "No changes to {}", key);
            return Ok(original);
        }

        working.dedupe_tags();
        working.updated_at = Some(Utc::now());
        self.artifacts.put_draft(&key, &working).await?;
        tracing::info!(target: "editor", "Saved edited draft for '{}'", key.topic());
        Ok(working)
    }
}

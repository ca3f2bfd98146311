//! The whole course pipeline behind one type.
//!
//! [`CoursePipeline`] wires the store, the generation gateway, the
//! completeness gate, the editor and the assembler together so front ends
//! (the CLI today) only ever deal with topics, indices and guards.

use crate::completeness::{CompletenessGate, ContentPolicy, ExportReadiness};
use crate::config::MusaiConfig;
use crate::constants::PENDING_STATE_TIMEOUT;
use crate::core::MusaiError;
use crate::course::{CourseDraft, ImageArtifact, LectureArtifact};
use crate::editor::{EditableDraft, Reconciler};
use crate::export::{AssemblyOptions, Document, DocumentAssembler, LectureSet};
use crate::generation::{ArtifactState, Gateway, GenerationService, ViewGuard};
use crate::key::{CacheKey, LectureKey};
use crate::store::{ArtifactStore, Artifacts, StoreKey};
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;

/// Tunables for a [`CoursePipeline`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineOptions {
    /// What counts as a real lecture
    pub policy: ContentPolicy,
    /// Export rendering switches
    pub assembly: AssemblyOptions,
    /// How long to wait on another caller's in-flight generation
    pub pending_timeout: Duration,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            policy: ContentPolicy::default(),
            assembly: AssemblyOptions::default(),
            pending_timeout: PENDING_STATE_TIMEOUT,
        }
    }
}

impl From<&MusaiConfig> for PipelineOptions {
    fn from(config: &MusaiConfig) -> Self {
        Self {
            policy: config.content_policy(),
            assembly: AssemblyOptions {
                attach_lecture_images: config.export.attach_lecture_images,
            },
            pending_timeout: config.pending_timeout(),
        }
    }
}

/// Whether export checks completeness first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportMode {
    /// Refuse unless every lecture is ready
    Gated,
    /// Export whatever is cached
    Forced,
}

/// A course as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseView {
    /// Course identity; `None` for a blank topic, which is never cached
    pub key: Option<CacheKey>,
    /// The draft
    pub draft: CourseDraft,
    /// The icon, if one could be produced
    pub icon: Option<ImageArtifact>,
}

/// What [`CoursePipeline::discard`] removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiscardSummary {
    /// Whether a draft was stored
    pub draft: bool,
    /// Lectures removed
    pub lectures: usize,
    /// Images removed (icon and illustrations)
    pub images: usize,
}

/// Topic in, exported document out.
pub struct CoursePipeline<S, G> {
    artifacts: Artifacts<S>,
    gateway: Gateway<S, G>,
    gate: CompletenessGate<S>,
    reconciler: Reconciler<S>,
    assembler: DocumentAssembler,
}

impl<S: ArtifactStore, G: GenerationService> CoursePipeline<S, G> {
    /// Build a pipeline over `store` and `service`.
    ///
    /// # Errors
    ///
    /// Fails only if the export template cannot be loaded.
    pub fn new(store: S, service: G, options: PipelineOptions) -> Result<Self> {
        let artifacts = Artifacts::new(store);
        let gateway = Gateway::new(artifacts.clone(), Arc::new(service), options.policy)
            .with_pending_timeout(options.pending_timeout);
        Ok(Self {
            gate: CompletenessGate::new(artifacts.clone(), options.policy),
            reconciler: Reconciler::new(artifacts.clone()),
            assembler: DocumentAssembler::new(options.assembly)?,
            gateway,
            artifacts,
        })
    }

    /// Typed store access.
    #[must_use]
    pub const fn artifacts(&self) -> &Artifacts<S> {
        &self.artifacts
    }

    /// The generation gateway.
    #[must_use]
    pub const fn gateway(&self) -> &Gateway<S, G> {
        &self.gateway
    }

    /// Open a course: the cached draft, or a freshly generated one, plus its
    /// icon (best effort).
    ///
    /// # Errors
    ///
    /// See [`Gateway::ensure_draft`].
    pub async fn open_course(&self, topic: &str, guard: &ViewGuard) -> Result<CourseView> {
        let draft = self.gateway.ensure_draft(topic, guard).await?;
        self.view(topic, draft, guard).await
    }

    /// Throw away the cached draft and icon and generate new ones.
    ///
    /// Lectures cached under titles that survive into the new syllabus are
    /// reused.
    ///
    /// # Errors
    ///
    /// See [`Gateway::regenerate_draft`].
    pub async fn regenerate(&self, topic: &str, guard: &ViewGuard) -> Result<CourseView> {
        let draft = self.gateway.regenerate_draft(topic, guard).await?;
        self.view(topic, draft, guard).await
    }

    async fn view(&self, topic: &str, draft: CourseDraft, guard: &ViewGuard) -> Result<CourseView> {
        let key = CacheKey::normalize(topic);
        let icon = match &key {
            Some(key) => self.gateway.ensure_icon(key, &draft, guard).await,
            None => None,
        };
        Ok(CourseView {
            key,
            draft,
            icon,
        })
    }

    /// The cached draft of a course.
    ///
    /// # Errors
    ///
    /// [`MusaiError::DraftNotFound`] if none is cached.
    pub async fn draft(&self, key: &CacheKey) -> Result<CourseDraft> {
        self.artifacts.draft(key).await?.ok_or_else(|| {
            MusaiError::DraftNotFound {
                key: key.to_string(),
            }
            .into()
        })
    }

    /// Open the lecture at 0-based `index` of the course's current syllabus.
    ///
    /// # Errors
    ///
    /// [`MusaiError::DraftNotFound`] without a cached draft; otherwise see
    /// [`Gateway::open_lecture`].
    pub async fn open_lecture(
        &self,
        key: &CacheKey,
        index: usize,
        guard: &ViewGuard,
    ) -> Result<LectureArtifact> {
        let draft = self.draft(key).await?;
        self.gateway.open_lecture(key, &draft, index, guard).await
    }

    /// Illustration for the lecture at `index` (best effort).
    ///
    /// # Errors
    ///
    /// [`MusaiError::DraftNotFound`] without a cached draft.
    pub async fn lecture_image(
        &self,
        key: &CacheKey,
        index: usize,
        guard: &ViewGuard,
    ) -> Result<Option<ImageArtifact>> {
        let draft = self.draft(key).await?;
        Ok(self.gateway.ensure_lecture_image(key, &draft, index, guard).await)
    }

    /// Export readiness of the course's current syllabus.
    ///
    /// # Errors
    ///
    /// [`MusaiError::DraftNotFound`] without a cached draft.
    pub async fn readiness(&self, key: &CacheKey) -> Result<ExportReadiness> {
        let draft = self.draft(key).await?;
        self.gate.check(key, &draft).await
    }

    /// Lifecycle state of one store entry.
    ///
    /// # Errors
    ///
    /// Fails only if the store fails.
    pub async fn state(&self, key: &StoreKey) -> Result<ArtifactState> {
        self.gateway.state(key).await
    }

    /// Assemble the course into a document.
    ///
    /// [`ExportMode::Gated`] refuses while any lecture is missing or below
    /// the content floor. Only cached artifacts are used; nothing is
    /// generated during export.
    ///
    /// # Errors
    ///
    /// - [`MusaiError::DraftNotFound`] without a cached draft
    /// - [`MusaiError::ExportNotReady`] for a gated export of an incomplete
    ///   course
    pub async fn export(&self, key: &CacheKey, mode: ExportMode) -> Result<Document> {
        let draft = self.draft(key).await?;

        if mode == ExportMode::Gated {
            let readiness = self.gate.check(key, &draft).await?;
            if !readiness.is_ready() {
                let mut missing = readiness.missing();
                if missing.is_empty() {
                    missing.push("(syllabus is empty)".to_string());
                }
                return Err(MusaiError::ExportNotReady {
                    missing,
                }
                .into());
            }
        }

        let with_images = self.assembler.options().attach_lecture_images;
        let lectures = LectureSet::load(&self.artifacts, key, &draft, with_images).await?;
        let icon = self.artifacts.icon(key).await?;
        let document = self.assembler.assemble(key, &draft, icon.as_ref(), &lectures)?;

        tracing::info!(
            target: "pipeline",
            "Exported '{}' ({} of {} lectures)",
            draft.title,
            document.section_count,
            draft.syllabus.len()
        );
        Ok(document)
    }

    /// Start editing the cached draft.
    ///
    /// # Errors
    ///
    /// [`MusaiError::DraftNotFound`] without a cached draft.
    pub async fn begin_edit(&self, key: &CacheKey) -> Result<EditableDraft> {
        self.reconciler.begin_edit(key).await
    }

    /// Save an edit session under its original key.
    ///
    /// # Errors
    ///
    /// See [`Reconciler::commit`].
    pub async fn commit(&self, session: EditableDraft) -> Result<CourseDraft> {
        self.reconciler.commit(session).await
    }

    /// Remove everything cached for a course: draft, icon, generated marker,
    /// failed image attempts, and the lectures and illustrations of its
    /// current syllabus.
    ///
    /// Lectures orphaned by earlier renames are not reachable from the
    /// current syllabus and stay in the store.
    ///
    /// # Errors
    ///
    /// Fails if the store fails.
    pub async fn discard(&self, key: &CacheKey) -> Result<DiscardSummary> {
        let mut summary = DiscardSummary::default();

        if let Some(draft) = self.artifacts.draft(key).await? {
            for entry in &draft.syllabus {
                let Some(lecture) = LectureKey::new(key, &entry.title) else {
                    continue;
                };
                if self.artifacts.remove_lecture(&lecture).await? {
                    summary.lectures += 1;
                }
                if self.artifacts.remove_lecture_image(&lecture).await? {
                    summary.images += 1;
                }
                self.artifacts.clear_image_attempt(&StoreKey::lecture_image(&lecture)).await?;
            }
        }

        summary.draft = self.artifacts.remove_draft(key).await?;
        if self.artifacts.remove_icon(key).await? {
            summary.images += 1;
        }
        self.artifacts.clear_image_attempt(&StoreKey::icon(key)).await?;
        self.artifacts.clear_generated(key).await?;

        tracing::info!(target: "pipeline", "Discarded '{}': {:?}", key.topic(), summary);
        Ok(summary)
    }
}

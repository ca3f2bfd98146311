//! Cache-first coordination of generation requests.
//!
//! Every public operation follows the same shape:
//!
//! 1. Look the artifact up in the store. A hit returns without contacting the
//!    service.
//! 2. Reserve the artifact's in-flight slot. If another caller holds it, wait
//!    for that caller to finish, then look the artifact up again. A wait
//!    longer than the pending timeout fails with
//!    [`MusaiError::StillGenerating`]; the service is never called without
//!    the slot.
//! 3. Call the service exactly once.
//! 4. If the [`ViewGuard`] was closed meanwhile, drop the response.
//! 5. Validate the response, and store it only if it is usable.
//! 6. Release the slot, waking every waiter.
//!
//! A failed call leaves the store exactly as it was and is never retried
//! here. Callers that were waiting on it receive the same error. The user
//! retries explicitly.
//!
//! # Optional images
//!
//! Icons and lecture illustrations are best effort. A failed or empty image
//! generation records an attempt marker so later opens do not call the
//! service again; regenerating or discarding the course clears it.
//!
//! # Degenerate drafts
//!
//! A draft with no title or no titled lecture is not stored. A marker is
//! recorded instead, and later `ensure_draft` calls for the same topic fail
//! with [`MusaiError::DegenerateContent`] without calling the service, so a
//! bad topic cannot trigger a retry storm. [`Gateway::regenerate_draft`]
//! clears the marker.

use super::state::{ArtifactState, ViewGuard};
use super::{GenerationService, LectureRequest};
use crate::completeness::{ContentPolicy, is_meaningfully_present};
use crate::constants::PENDING_STATE_TIMEOUT;
use crate::core::{GenerationError, MusaiError};
use crate::course::{CourseDraft, ImageArtifact, LectureArtifact};
use crate::key::{CacheKey, LectureKey};
use crate::store::{ArtifactStore, Artifacts, StoreKey};
use anyhow::Result;
use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::sync::Notify;

/// One outstanding generation request, shared with its waiters.
#[derive(Default)]
struct Pending {
    done: Notify,
    failure: OnceLock<MusaiError>,
}

type Registry = DashMap<StoreKey, Arc<Pending>>;

/// A reserved in-flight slot. Dropping it releases the slot and wakes
/// waiters, including when the generating future is itself dropped.
struct InFlightSlot<'a> {
    registry: &'a Registry,
    key: StoreKey,
    pending: Arc<Pending>,
}

impl InFlightSlot<'_> {
    /// Hand a failed outcome to the waiters so they do not call again.
    ///
    /// Stale responses are not shared: the call itself succeeded, only this
    /// caller's view went away.
    fn settle<T>(&self, outcome: &Result<T>) {
        let Err(e) = outcome else {
            return;
        };
        if let Some(err @ (MusaiError::Generation { .. } | MusaiError::DegenerateContent { .. })) =
            e.downcast_ref::<MusaiError>()
        {
            let _ = self.pending.failure.set(err.clone());
        }
    }
}

impl Drop for InFlightSlot<'_> {
    fn drop(&mut self) {
        self.registry.remove_if(&self.key, |_, current| Arc::ptr_eq(current, &self.pending));
        self.pending.done.notify_waiters();
    }
}

/// Cache-first front end to a [`GenerationService`].
pub struct Gateway<S, G> {
    artifacts: Artifacts<S>,
    service: Arc<G>,
    policy: ContentPolicy,
    in_flight: Registry,
    pending_timeout: Duration,
}

impl<S: ArtifactStore, G: GenerationService> Gateway<S, G> {
    /// Create a gateway over `artifacts` calling `service`.
    pub fn new(artifacts: Artifacts<S>, service: Arc<G>, policy: ContentPolicy) -> Self {
        Self {
            artifacts,
            service,
            policy,
            in_flight: DashMap::new(),
            pending_timeout: PENDING_STATE_TIMEOUT,
        }
    }

    /// Override how long a caller waits on another caller's request.
    #[must_use]
    pub const fn with_pending_timeout(mut self, timeout: Duration) -> Self {
        self.pending_timeout = timeout;
        self
    }

    /// The store this gateway writes to.
    #[must_use]
    pub const fn artifacts(&self) -> &Artifacts<S> {
        &self.artifacts
    }

    /// The content policy used to judge lectures.
    #[must_use]
    pub const fn policy(&self) -> &ContentPolicy {
        &self.policy
    }

    /// Current lifecycle state of one store entry.
    ///
    /// # Errors
    ///
    /// Fails only if the store fails.
    pub async fn state(&self, key: &StoreKey) -> Result<ArtifactState> {
        if self.in_flight.contains_key(key) {
            Ok(ArtifactState::InFlight)
        } else if self.artifacts.store().has(key).await? {
            Ok(ArtifactState::Present)
        } else {
            Ok(ArtifactState::Absent)
        }
    }

    /// Return the cached draft for `topic`, generating it on first request.
    ///
    /// A topic without identity (blank after normalization) is generated
    /// every time and never stored.
    ///
    /// # Errors
    ///
    /// - [`MusaiError::Generation`] if the service call failed
    /// - [`MusaiError::DegenerateContent`] if the result (now or earlier) was
    ///   unusable
    /// - [`MusaiError::StaleResponse`] if `guard` was closed during the call
    /// - [`MusaiError::StillGenerating`] if another request for the same
    ///   artifact outlived the pending timeout
    pub async fn ensure_draft(&self, topic: &str, guard: &ViewGuard) -> Result<CourseDraft> {
        let Some(key) = CacheKey::normalize(topic) else {
            tracing::debug!(target: "gateway", "Topic has no identity, generating without cache");
            return self.generate_draft_uncached(topic, guard).await;
        };

        if let Some(draft) = self.cached_draft(&key).await? {
            return Ok(draft);
        }

        let store_key = StoreKey::draft(&key);
        let slot = self.reserve(&store_key).await?;
        if let Some(draft) = self.cached_draft(&key).await? {
            return Ok(draft);
        }

        let outcome = self.generate_draft(&key, &store_key, topic, guard).await;
        slot.settle(&outcome);
        outcome
    }

    async fn generate_draft(
        &self,
        key: &CacheKey,
        store_key: &StoreKey,
        topic: &str,
        guard: &ViewGuard,
    ) -> Result<CourseDraft> {
        tracing::info!(target: "gateway", "Generating course draft for '{}'", key.topic());
        let result = self.service.generate_draft(topic).await;
        ensure_live(guard, store_key)?;
        let mut draft =
            result.map_err(|e| MusaiError::generation(format!("course draft for '{topic}'"), e))?;

        if let Some(reason) = draft.degenerate_reason() {
            tracing::warn!(target: "gateway", "Degenerate draft for '{}': {}", key, reason);
            self.artifacts.mark_generated(key).await?;
            return Err(MusaiError::DegenerateContent {
                key: key.to_string(),
                reason: reason.to_string(),
            }
            .into());
        }

        draft.dedupe_tags();
        draft.updated_at = Some(Utc::now());
        self.artifacts.put_draft(key, &draft).await?;
        self.artifacts.mark_generated(key).await?;
        Ok(draft)
    }

    /// Discard the cached draft, icon and marker for `topic`, then generate a
    /// fresh draft.
    ///
    /// This is the explicit user retry; nothing calls it automatically.
    ///
    /// # Errors
    ///
    /// See [`ensure_draft`](Self::ensure_draft).
    pub async fn regenerate_draft(&self, topic: &str, guard: &ViewGuard) -> Result<CourseDraft> {
        if let Some(key) = CacheKey::normalize(topic) {
            tracing::info!(target: "gateway", "Discarding cached draft for '{}'", key.topic());
            self.artifacts.remove_draft(&key).await?;
            self.artifacts.remove_icon(&key).await?;
            self.artifacts.clear_image_attempt(&StoreKey::icon(&key)).await?;
            self.artifacts.clear_generated(&key).await?;
        }
        self.ensure_draft(topic, guard).await
    }

    /// Return the course icon, generating it on first request.
    ///
    /// Best effort: every failure is logged and reported as `None`.
    pub async fn ensure_icon(
        &self,
        key: &CacheKey,
        draft: &CourseDraft,
        guard: &ViewGuard,
    ) -> Option<ImageArtifact> {
        let store_key = StoreKey::icon(key);
        let result = self
            .ensure_image(&store_key, || self.service.generate_icon(draft), guard)
            .await;
        match result {
            Ok(icon) => icon,
            Err(e) => {
                tracing::warn!(target: "gateway", "Course icon for '{}' unavailable: {:#}", key, e);
                None
            }
        }
    }

    /// Return the lecture at `index` of `draft`, generating it if no
    /// meaningful version is cached.
    ///
    /// A cached lecture below the content floor counts as a miss. It is only
    /// replaced when the new generation produces meaningful content; it is
    /// never deleted.
    ///
    /// # Errors
    ///
    /// - [`MusaiError::LectureNotFound`] if `index` is outside the syllabus
    /// - [`MusaiError::Generation`] if the service call failed
    /// - [`MusaiError::DegenerateContent`] if the title is blank or the
    ///   generated content is below the floor
    /// - [`MusaiError::StaleResponse`] if `guard` was closed during the call
    /// - [`MusaiError::StillGenerating`] if another request for the same
    ///   artifact outlived the pending timeout
    pub async fn open_lecture(
        &self,
        course: &CacheKey,
        draft: &CourseDraft,
        index: usize,
        guard: &ViewGuard,
    ) -> Result<LectureArtifact> {
        let (key, request) = lecture_target(course, draft, index)?;

        if let Some(lecture) = self.cached_lecture(&key).await? {
            return Ok(lecture);
        }

        let store_key = StoreKey::lecture(&key);
        let slot = self.reserve(&store_key).await?;
        if let Some(lecture) = self.cached_lecture(&key).await? {
            return Ok(lecture);
        }

        let outcome = self.generate_lecture(&key, &store_key, &request, guard).await;
        slot.settle(&outcome);
        outcome
    }

    async fn generate_lecture(
        &self,
        key: &LectureKey,
        store_key: &StoreKey,
        request: &LectureRequest,
        guard: &ViewGuard,
    ) -> Result<LectureArtifact> {
        tracing::info!(target: "gateway", "Generating lecture '{}'", request.lecture_title);
        let result = self.service.generate_lecture(request).await;
        ensure_live(guard, store_key)?;
        let mut lecture = result.map_err(|e| {
            MusaiError::generation(format!("lecture '{}'", request.lecture_title), e)
        })?;

        if !is_meaningfully_present(&lecture, &self.policy) {
            tracing::warn!(
                target: "gateway",
                "Generated lecture {} is below the content floor",
                key
            );
            return Err(MusaiError::DegenerateContent {
                key: key.to_string(),
                reason: format!(
                    "lecture has fewer than {} characters of content",
                    self.policy.min_meaningful_chars
                ),
            }
            .into());
        }

        if lecture.title.trim().is_empty() {
            lecture.title.clone_from(&request.lecture_title);
        }
        lecture.generated_at = Some(Utc::now());
        self.artifacts.put_lecture(key, &lecture).await?;
        Ok(lecture)
    }

    /// Return the illustration for the lecture at `index`, generating it on
    /// first request.
    ///
    /// Best effort, like [`ensure_icon`](Self::ensure_icon).
    pub async fn ensure_lecture_image(
        &self,
        course: &CacheKey,
        draft: &CourseDraft,
        index: usize,
        guard: &ViewGuard,
    ) -> Option<ImageArtifact> {
        let (key, request) = match lecture_target(course, draft, index) {
            Ok(target) => target,
            Err(e) => {
                tracing::warn!(target: "gateway", "Lecture image unavailable: {:#}", e);
                return None;
            }
        };
        let store_key = StoreKey::lecture_image(&key);
        let result = self
            .ensure_image(&store_key, || self.service.generate_lecture_image(&request), guard)
            .await;
        match result {
            Ok(image) => image,
            Err(e) => {
                tracing::warn!(target: "gateway", "Lecture image for {} unavailable: {:#}", key, e);
                None
            }
        }
    }

    async fn generate_draft_uncached(&self, topic: &str, guard: &ViewGuard) -> Result<CourseDraft> {
        let result = self.service.generate_draft(topic).await;
        if guard.is_closed() {
            return Err(MusaiError::StaleResponse {
                key: String::new(),
            }
            .into());
        }
        let mut draft = result.map_err(|e| MusaiError::generation("course draft", e))?;
        if let Some(reason) = draft.degenerate_reason() {
            return Err(MusaiError::DegenerateContent {
                key: String::new(),
                reason: reason.to_string(),
            }
            .into());
        }
        draft.dedupe_tags();
        Ok(draft)
    }

    /// Stored draft, or `DegenerateContent` if a generation already ran and
    /// left nothing usable.
    async fn cached_draft(&self, key: &CacheKey) -> Result<Option<CourseDraft>> {
        if let Some(draft) = self.artifacts.draft(key).await? {
            return Ok(Some(draft));
        }
        if self.artifacts.is_generated(key).await? {
            return Err(MusaiError::DegenerateContent {
                key: key.to_string(),
                reason: "the last generation produced an unusable draft; regenerate to try again"
                    .to_string(),
            }
            .into());
        }
        Ok(None)
    }

    async fn cached_lecture(&self, key: &LectureKey) -> Result<Option<LectureArtifact>> {
        Ok(self
            .artifacts
            .lecture(key)
            .await?
            .filter(|lecture| is_meaningfully_present(lecture, &self.policy)))
    }

    async fn ensure_image<C, CF>(
        &self,
        store_key: &StoreKey,
        call: C,
        guard: &ViewGuard,
    ) -> Result<Option<ImageArtifact>>
    where
        C: FnOnce() -> CF,
        CF: Future<Output = Result<ImageArtifact, GenerationError>>,
    {
        if let Some(image) = self.artifacts.image(store_key).await? {
            return Ok(Some(image));
        }
        if self.artifacts.image_attempted(store_key).await? {
            tracing::debug!(target: "gateway", "Skipping {}: an earlier attempt failed", store_key);
            return Ok(None);
        }

        let slot = self.reserve(store_key).await?;
        if let Some(image) = self.artifacts.image(store_key).await? {
            return Ok(Some(image));
        }
        if self.artifacts.image_attempted(store_key).await? {
            return Ok(None);
        }

        tracing::info!(target: "gateway", "Generating image {}", store_key);
        let result = call().await;
        ensure_live(guard, store_key)?;
        let outcome: Result<ImageArtifact> = match result {
            Ok(image) if image.data.is_empty() => Err(MusaiError::DegenerateContent {
                key: store_key.to_string(),
                reason: "image is empty".to_string(),
            }
            .into()),
            Ok(image) => Ok(image),
            Err(e) => Err(MusaiError::generation(store_key.to_string(), e).into()),
        };
        slot.settle(&outcome);

        match outcome {
            Ok(image) => {
                self.artifacts.put_image(store_key, &image).await?;
                Ok(Some(image))
            }
            Err(e) => {
                self.artifacts.mark_image_attempt(store_key).await?;
                Err(e)
            }
        }
    }

    /// Reserve the in-flight slot for `key`, waiting while another caller
    /// holds it.
    ///
    /// # Errors
    ///
    /// - the holder's failure, if the holder's call failed while this caller
    ///   waited
    /// - [`MusaiError::StillGenerating`] if the holder did not finish within
    ///   the pending timeout
    async fn reserve(&self, key: &StoreKey) -> Result<InFlightSlot<'_>> {
        let deadline = tokio::time::Instant::now() + self.pending_timeout;
        loop {
            let existing = match self.in_flight.entry(key.clone()) {
                Entry::Vacant(entry) => {
                    let pending = Arc::new(Pending::default());
                    entry.insert(Arc::clone(&pending));
                    return Ok(InFlightSlot {
                        registry: &self.in_flight,
                        key: key.clone(),
                        pending,
                    });
                }
                Entry::Occupied(entry) => entry,
            };

            // Create the notified future BEFORE releasing the entry: the
            // holder removes the entry and then notifies, and Notify only
            // wakes futures that already exist.
            let pending = Arc::clone(existing.get());
            let notified = pending.done.notified();
            drop(existing);
            tracing::debug!(target: "gateway", "Waiting for in-flight generation of {}", key);

            tokio::select! {
                () = notified => {}
                () = tokio::time::sleep_until(deadline) => {
                    tracing::warn!(
                        target: "gateway",
                        "Timeout waiting for in-flight generation of {}",
                        key
                    );
                    return Err(MusaiError::StillGenerating {
                        key: key.to_string(),
                    }
                    .into());
                }
            }

            if let Some(failure) = pending.failure.get() {
                tracing::debug!(target: "gateway", "Sharing failed outcome of {}", key);
                return Err(failure.clone().into());
            }
        }
    }
}

fn ensure_live(guard: &ViewGuard, key: &StoreKey) -> Result<()> {
    if guard.is_closed() {
        tracing::debug!(
            target: "gateway",
            "Dropping response for {}: view {} was closed",
            key,
            guard.id()
        );
        return Err(MusaiError::StaleResponse {
            key: key.to_string(),
        }
        .into());
    }
    Ok(())
}

fn lecture_target(
    course: &CacheKey,
    draft: &CourseDraft,
    index: usize,
) -> Result<(LectureKey, LectureRequest)> {
    let entry = draft.syllabus.get(index).ok_or(MusaiError::LectureNotFound {
        index: index + 1,
        count: draft.syllabus.len(),
    })?;
    let key = LectureKey::new(course, &entry.title).ok_or_else(|| MusaiError::DegenerateContent {
        key: format!("{course}::"),
        reason: format!("lecture {} has no title", index + 1),
    })?;
    Ok((key, LectureRequest::new(draft, entry, index)))
}

//! Generation of course artifacts.
//!
//! The external generation service is slow, costs money per call, and may
//! fail or answer with garbage. This module puts a [`Gateway`] in front of it
//! that guarantees:
//!
//! - a cached artifact is never requested again
//! - at most one request per artifact is outstanding at a time
//! - a failed or degenerate response never overwrites a good cached artifact
//! - a response for a view that has since been closed is dropped
//!
//! # Modules
//!
//! - [`gateway`] - cache-first request coordination
//! - [`state`] - the explicit per-artifact state and the view guard
//! - [`http`] - the workflow backend client

use crate::core::GenerationError;
use crate::course::{CourseDraft, ImageArtifact, LectureArtifact, SyllabusEntry};
use serde::Serialize;
use std::future::Future;

pub mod gateway;
pub mod http;
pub mod state;

pub use gateway::Gateway;
pub use http::HttpGenerationService;
pub use state::{ArtifactState, ViewGuard};

/// Everything the service needs to write one lecture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LectureRequest {
    /// Course title, for context
    pub course_title: String,
    /// Course description, for context
    pub course_description: String,
    /// Instructor persona
    pub instructor: String,
    /// Lecture title as it currently appears in the syllabus
    pub lecture_title: String,
    /// Lecture summary from the syllabus
    pub lecture_summary: String,
    /// 0-based position in the syllabus
    pub index: usize,
    /// Number of lectures in the course
    pub total: usize,
}

impl LectureRequest {
    /// Build the request for `entry` of `draft`.
    #[must_use]
    pub fn new(draft: &CourseDraft, entry: &SyllabusEntry, index: usize) -> Self {
        Self {
            course_title: draft.title.clone(),
            course_description: draft.description.clone(),
            instructor: draft.instructor.clone(),
            lecture_title: entry.title.clone(),
            lecture_summary: entry.summary.clone(),
            index,
            total: draft.syllabus.len(),
        }
    }
}

/// The external, opaque generation service.
///
/// Implementations only talk to the service; caching, deduplication and
/// validation are the [`Gateway`]'s job. None of these methods is retried
/// automatically.
pub trait GenerationService: Send + Sync {
    /// Produce a course draft for a free-text topic.
    fn generate_draft(
        &self,
        topic: &str,
    ) -> impl Future<Output = Result<CourseDraft, GenerationError>> + Send;

    /// Produce an icon for a course.
    fn generate_icon(
        &self,
        draft: &CourseDraft,
    ) -> impl Future<Output = Result<ImageArtifact, GenerationError>> + Send;

    /// Produce the body of one lecture.
    fn generate_lecture(
        &self,
        request: &LectureRequest,
    ) -> impl Future<Output = Result<LectureArtifact, GenerationError>> + Send;

    /// Produce an illustration for one lecture.
    fn generate_lecture_image(
        &self,
        request: &LectureRequest,
    ) -> impl Future<Output = Result<ImageArtifact, GenerationError>> + Send;
}

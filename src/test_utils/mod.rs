//! Test utilities for the course pipeline
//!
//! Available to unit tests and, through the `test-utils` feature, to the
//! integration suite.
//!
//! - [`ScriptedService`] - an in-process [`GenerationService`] with scripted
//!   responses, injected failures, an optional delay, and per-operation call
//!   counters
//! - fixtures for drafts and lecture bodies
//! - [`init_test_logging`] - opt-in tracing output for tests
//!
//! # Example
//!
//! ```rust,no_run
//! use musai_course::generation::ViewGuard;
//! use musai_course::pipeline::{CoursePipeline, PipelineOptions};
//! use musai_course::store::MemoryStore;
//! use musai_course::test_utils::{Call, ScriptedService, sample_draft};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let service = ScriptedService::new(sample_draft("Rust", &["Ownership", "Traits"]));
//! let options = PipelineOptions::default();
//! let pipeline = CoursePipeline::new(MemoryStore::new(), service.clone(), options)?;
//!
//! pipeline.open_course("rust", &ViewGuard::new()).await?;
//! pipeline.open_course("RUST", &ViewGuard::new()).await?;
//! assert_eq!(service.calls(Call::Draft), 1);
//! # Ok(())
//! # }
//! ```

use crate::core::GenerationError;
use crate::course::{CourseDraft, ImageArtifact, LectureArtifact, SyllabusEntry};
use crate::generation::{GenerationService, LectureRequest, ViewGuard};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Uses `level` if given, otherwise `RUST_LOG`; with neither, tests stay
/// silent. Safe to call from every test.
///
/// ```bash
/// RUST_LOG=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .with_ansi(true)
            .try_init();
    });
}

/// Bytes of a tiny PNG header, enough to look like an image.
pub const PNG_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

/// A draft titled `title` with one lecture per entry of `lectures`.
pub fn sample_draft(title: &str, lectures: &[&str]) -> CourseDraft {
    CourseDraft {
        title: title.to_string(),
        description: format!("An introduction to {title}."),
        instructor: "Professor Musai".to_string(),
        syllabus: lectures
            .iter()
            .map(|t| SyllabusEntry::new(*t, format!("What you need to know about {t}."), "45 min"))
            .collect(),
        estimated_duration: "4 weeks".to_string(),
        difficulty: crate::course::Difficulty::Beginner,
        tags: vec!["science".to_string()],
        updated_at: None,
    }
}

/// A lecture body comfortably above the default content floor.
pub fn lecture_body(title: &str) -> String {
    format!(
        "<h3>{title}</h3><p>This lecture walks through {title} step by step, \
         with worked examples and a short exercise at the end.</p>"
    )
}

/// A generation operation, for counting and failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Call {
    /// `generate_draft`
    Draft,
    /// `generate_icon`
    Icon,
    /// `generate_lecture`
    Lecture,
    /// `generate_lecture_image`
    LectureImage,
}

#[derive(Default)]
struct Script {
    draft: Mutex<Option<CourseDraft>>,
    lectures: Mutex<HashMap<String, LectureArtifact>>,
    failures: Mutex<HashMap<Call, GenerationError>>,
    close_on_call: Mutex<Option<ViewGuard>>,
    delay: Mutex<Duration>,
    counts: [AtomicUsize; 4],
    requests: Mutex<Vec<LectureRequest>>,
}

/// In-process [`GenerationService`] driven by a script.
///
/// Clones share the script and counters, so a test can keep a handle after
/// moving the service into a pipeline.
///
/// - `generate_draft` returns the scripted draft
/// - `generate_lecture` returns the scripted lecture for the requested title,
///   or an HTML body built with [`lecture_body`]
/// - both image calls return a small PNG
#[derive(Clone, Default)]
pub struct ScriptedService {
    script: Arc<Script>,
}

impl ScriptedService {
    /// A service that answers every draft request with `draft`.
    pub fn new(draft: CourseDraft) -> Self {
        let service = Self::default();
        service.set_draft(draft);
        service
    }

    /// Sleep this long inside every call before answering.
    #[must_use]
    pub fn with_delay(self, delay: Duration) -> Self {
        *lock(&self.script.delay) = delay;
        self
    }

    /// Replace the draft returned from now on.
    pub fn set_draft(&self, draft: CourseDraft) {
        *lock(&self.script.draft) = Some(draft);
    }

    /// Return `lecture` whenever the lecture titled `title` is requested.
    pub fn set_lecture(&self, title: &str, lecture: LectureArtifact) {
        lock(&self.script.lectures).insert(title.to_string(), lecture);
    }

    /// Make every `call` fail with `error` until [`succeed`](Self::succeed).
    pub fn fail(&self, call: Call, error: GenerationError) {
        lock(&self.script.failures).insert(call, error);
    }

    /// Stop failing `call`.
    pub fn succeed(&self, call: Call) {
        lock(&self.script.failures).remove(&call);
    }

    /// Close `guard` while the next call is outstanding, simulating a user
    /// leaving the view before the response arrives.
    pub fn close_during_next_call(&self, guard: &ViewGuard) {
        *lock(&self.script.close_on_call) = Some(guard.clone());
    }

    /// How many times `call` has been made.
    pub fn calls(&self, call: Call) -> usize {
        self.script.counts[call as usize].load(Ordering::SeqCst)
    }

    /// Every lecture request received, in order.
    pub fn lecture_requests(&self) -> Vec<LectureRequest> {
        lock(&self.script.requests).clone()
    }

    /// Shared prologue of every call: count, wait, close the guard, and
    /// return the injected failure if any.
    async fn begin(&self, call: Call) -> Result<(), GenerationError> {
        self.script.counts[call as usize].fetch_add(1, Ordering::SeqCst);

        let delay = *lock(&self.script.delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if let Some(guard) = lock(&self.script.close_on_call).take() {
            guard.close();
        }

        match lock(&self.script.failures).get(&call) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

impl GenerationService for ScriptedService {
    async fn generate_draft(&self, _topic: &str) -> Result<CourseDraft, GenerationError> {
        self.begin(Call::Draft).await?;
        lock(&self.script.draft).clone().ok_or_else(|| GenerationError::InvalidResponse {
            reason: "no draft scripted".to_string(),
        })
    }

    async fn generate_icon(&self, _draft: &CourseDraft) -> Result<ImageArtifact, GenerationError> {
        self.begin(Call::Icon).await?;
        Ok(ImageArtifact::new("image/png", PNG_BYTES.to_vec()))
    }

    async fn generate_lecture(
        &self,
        request: &LectureRequest,
    ) -> Result<LectureArtifact, GenerationError> {
        self.begin(Call::Lecture).await?;
        lock(&self.script.requests).push(request.clone());

        let scripted = lock(&self.script.lectures).get(&request.lecture_title).cloned();
        Ok(scripted.unwrap_or_else(|| {
            LectureArtifact::new(
                request.lecture_title.clone(),
                lecture_body(&request.lecture_title),
                true,
            )
        }))
    }

    async fn generate_lecture_image(
        &self,
        _request: &LectureRequest,
    ) -> Result<ImageArtifact, GenerationError> {
        self.begin(Call::LectureImage).await?;
        Ok(ImageArtifact::new("image/png", PNG_BYTES.to_vec()))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

//! Musai University course pipeline.
//!
//! Turns a free-text topic into a course: a generated draft (title,
//! description, instructor, syllabus), generated lectures and images, and
//! finally a single self-contained HTML document.
//!
//! Everything the external generation service produces is cached locally and
//! keyed by a normalized identity, so asking for the same course or lecture
//! twice never pays for a second generation.
//!
//! # Architecture Overview
//!
//! ```text
//! topic ──► key ──► generation::Gateway ──► store (cache)
//!                         │                     │
//!                         ▼                     ▼
//!              GenerationService        completeness ──► export
//! ```
//!
//! # Core Modules
//!
//! - [`key`] - [`key::CacheKey`] and [`key::LectureKey`], the only way
//!   artifacts are addressed
//! - [`course`] - draft, lecture and image data types
//! - [`store`] - the [`store::ArtifactStore`] trait, in-memory and on-disk
//!   stores, and typed access through [`store::Artifacts`]
//! - [`generation`] - the [`generation::GenerationService`] trait, its HTTP
//!   client, and the cache-first [`generation::Gateway`]
//! - [`completeness`] - what counts as a real lecture and whether a course
//!   can be exported
//! - [`export`] - renders a course into one HTML document
//! - [`editor`] - edits a cached draft without changing its identity
//! - [`pipeline`] - [`pipeline::CoursePipeline`], all of the above behind one
//!   type
//!
//! ## Supporting Modules
//!
//! - [`cli`] - the `musai` command-line interface
//! - [`config`] - `~/.musai/config.toml`
//! - [`core`] - error types and user-facing error display
//! - [`constants`] - defaults and timeouts
//! - [`utils`] - file writes and progress spinners
//!
//! # Example
//!
//! ```rust,no_run
//! use musai_course::generation::{HttpGenerationService, ViewGuard};
//! use musai_course::pipeline::{CoursePipeline, ExportMode, PipelineOptions};
//! use musai_course::store::FileStore;
//! use std::time::Duration;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let timeout = Duration::from_secs(120);
//! let service = HttpGenerationService::new("http://localhost:5678/webhook", timeout)?;
//! let store = FileStore::new("/tmp/musai");
//! let pipeline = CoursePipeline::new(store, service, PipelineOptions::default())?;
//!
//! let guard = ViewGuard::new();
//! let course = pipeline.open_course("Quantum physics", &guard).await?;
//! let key = course.key.expect("non-blank topic");
//! for index in 0..course.draft.syllabus.len() {
//!     pipeline.open_lecture(&key, index, &guard).await?;
//! }
//! let document = pipeline.export(&key, ExportMode::Gated).await?;
//! document.write_to(std::path::Path::new("."))?;
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod completeness;
pub mod config;
pub mod constants;
pub mod core;
pub mod course;
pub mod editor;
pub mod export;
pub mod generation;
pub mod key;
pub mod pipeline;
pub mod store;
pub mod utils;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

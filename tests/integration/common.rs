//! Shared setup for integration tests.

use musai_course::pipeline::{CoursePipeline, PipelineOptions};
use musai_course::store::{FileStore, MemoryStore};
use musai_course::test_utils::{ScriptedService, init_test_logging, sample_draft};
use std::path::Path;
use std::time::Duration;

pub const LECTURES: &[&str] = &["Wave functions", "The uncertainty principle", "Entanglement"];

pub type MemoryPipeline = CoursePipeline<MemoryStore, ScriptedService>;
pub type DiskPipeline = CoursePipeline<FileStore, ScriptedService>;

/// A scripted service for a three-lecture quantum physics course.
pub fn quantum_service() -> ScriptedService {
    ScriptedService::new(sample_draft("Quantum Physics", LECTURES))
}

pub fn test_options() -> PipelineOptions {
    PipelineOptions {
        pending_timeout: Duration::from_secs(10),
        ..PipelineOptions::default()
    }
}

pub fn memory_pipeline(service: &ScriptedService) -> MemoryPipeline {
    init_test_logging(None);
    CoursePipeline::new(MemoryStore::new(), service.clone(), test_options()).unwrap()
}

pub fn disk_pipeline(root: &Path, service: &ScriptedService) -> DiskPipeline {
    init_test_logging(None);
    CoursePipeline::new(FileStore::new(root), service.clone(), test_options()).unwrap()
}

//! Completeness gating and document assembly.

use crate::common::{LECTURES, memory_pipeline, quantum_service, test_options};
use musai_course::completeness::LectureStatus;
use musai_course::core::MusaiError;
use musai_course::course::LectureArtifact;
use musai_course::export::AssemblyOptions;
use musai_course::generation::ViewGuard;
use musai_course::key::LectureKey;
use musai_course::pipeline::{CoursePipeline, ExportMode, PipelineOptions};
use musai_course::store::MemoryStore;
use musai_course::test_utils::{Call, sample_draft};
use tempfile::TempDir;

fn missing_titles(err: &anyhow::Error) -> Vec<String> {
    match err.downcast_ref::<MusaiError>() {
        Some(MusaiError::ExportNotReady {
            missing,
        }) => missing.clone(),
        other => panic!("expected ExportNotReady, got {other:?}"),
    }
}

#[tokio::test]
async fn test_content_floor_decides_readiness() {
    let service = quantum_service();
    let pipeline = memory_pipeline(&service);
    let key =
        pipeline.open_course("Quantum Physics", &ViewGuard::new()).await.unwrap().key.unwrap();
    let artifacts = pipeline.artifacts();

    let image_only = LectureArtifact::new("", "<p><img src=\"psi.png\" alt=\"psi\"></p>\n", true);
    let exactly_twenty = LectureArtifact::new("", "abcdefghijklmnopqrst", false);
    let nineteen_in_markup = LectureArtifact::new("", "<b>abcdefghij</b> <i>klmnopqrs</i>", true);

    let lectures = [&image_only, &exactly_twenty, &nineteen_in_markup];
    for (title, lecture) in LECTURES.iter().zip(lectures) {
        let lecture_key = LectureKey::new(&key, title).unwrap();
        artifacts.put_lecture(&lecture_key, lecture).await.unwrap();
    }

    let readiness = pipeline.readiness(&key).await.unwrap();
    let statuses: Vec<_> = readiness.lectures.iter().map(|l| l.status).collect();
    assert_eq!(statuses, vec![
        LectureStatus::Degenerate,
        LectureStatus::Ready,
        LectureStatus::Degenerate
    ]);
    assert!(!readiness.is_ready());
    assert_eq!(readiness.ready_count(), 1);
}

#[tokio::test]
async fn test_gated_export_end_to_end() {
    let service = quantum_service();
    let pipeline = memory_pipeline(&service);
    let guard = ViewGuard::new();
    let key = pipeline.open_course("Quantum Physics", &guard).await.unwrap().key.unwrap();

    let err = pipeline.export(&key, ExportMode::Gated).await.unwrap_err();
    assert_eq!(missing_titles(&err), LECTURES);

    pipeline.open_lecture(&key, 0, &guard).await.unwrap();
    pipeline.open_lecture(&key, 2, &guard).await.unwrap();
    let err = pipeline.export(&key, ExportMode::Gated).await.unwrap_err();
    assert_eq!(missing_titles(&err), vec![LECTURES[1]]);

    pipeline.open_lecture(&key, 1, &guard).await.unwrap();
    let document = pipeline.export(&key, ExportMode::Gated).await.unwrap();
    assert_eq!(document.section_count, LECTURES.len());
    assert_eq!(document.filename, "quantum-physics.html");

    // Losing a lecture from the store closes the gate again
    let removed = LectureKey::new(&key, LECTURES[2]).unwrap();
    assert!(pipeline.artifacts().remove_lecture(&removed).await.unwrap());
    let err = pipeline.export(&key, ExportMode::Gated).await.unwrap_err();
    assert_eq!(missing_titles(&err), vec![LECTURES[2]]);
}

#[tokio::test]
async fn test_forced_export_skips_missing_lectures() {
    let service = quantum_service();
    let pipeline = memory_pipeline(&service);
    let guard = ViewGuard::new();
    let key = pipeline.open_course("Quantum Physics", &guard).await.unwrap().key.unwrap();

    pipeline.open_lecture(&key, 0, &guard).await.unwrap();
    pipeline.open_lecture(&key, 2, &guard).await.unwrap();

    let document = pipeline.export(&key, ExportMode::Forced).await.unwrap();
    assert_eq!(document.section_count, 2);
    assert!(document.html.contains("1. Wave functions"));
    assert!(document.html.contains("2. Entanglement"));
    assert!(!document.html.contains("The uncertainty principle</h2>"));
    assert!(document.html.contains("<section id=\"lecture-2\">"));
    assert!(!document.html.contains("<section id=\"lecture-3\">"));
}

#[tokio::test]
async fn test_export_never_generates() {
    let service = quantum_service();
    let pipeline = memory_pipeline(&service);
    let guard = ViewGuard::new();
    let key = pipeline.open_course("Quantum Physics", &guard).await.unwrap().key.unwrap();

    pipeline.export(&key, ExportMode::Forced).await.unwrap();
    let _ = pipeline.export(&key, ExportMode::Gated).await;

    assert_eq!(service.calls(Call::Lecture), 0);
    assert_eq!(service.calls(Call::LectureImage), 0);
    assert_eq!(service.calls(Call::Icon), 1);
}

#[tokio::test]
async fn test_empty_syllabus_is_never_ready() {
    let service = quantum_service();
    let pipeline = memory_pipeline(&service);
    let key =
        pipeline.open_course("Quantum Physics", &ViewGuard::new()).await.unwrap().key.unwrap();

    let mut draft = pipeline.draft(&key).await.unwrap();
    draft.syllabus.clear();
    pipeline.artifacts().put_draft(&key, &draft).await.unwrap();

    assert!(!pipeline.readiness(&key).await.unwrap().is_ready());
    let err = pipeline.export(&key, ExportMode::Gated).await.unwrap_err();
    assert_eq!(missing_titles(&err), vec!["(syllabus is empty)".to_string()]);
}

#[tokio::test]
async fn test_exported_document_escapes_draft_text() {
    let mut draft = sample_draft("Physics <script>alert(1)</script>", &["Waves & Particles"]);
    draft.description = "Quarks \"and\" leptons".to_string();
    let service = musai_course::test_utils::ScriptedService::new(draft);
    let pipeline = memory_pipeline(&service);
    let guard = ViewGuard::new();
    let key = pipeline.open_course("physics", &guard).await.unwrap().key.unwrap();
    pipeline.open_lecture(&key, 0, &guard).await.unwrap();

    let document = pipeline.export(&key, ExportMode::Gated).await.unwrap();
    assert!(!document.html.contains("<script>"));
    assert!(document.html.contains("&lt;script&gt;"));
    assert!(document.html.contains("Waves &amp; Particles"));
    // Trusted lecture HTML is embedded as-is
    assert!(document.html.contains("<h3>Waves & Particles</h3>"));
    assert_eq!(document.filename, "physics-scriptalert1script.html");
}

#[tokio::test]
async fn test_export_embeds_icon_and_lecture_images() {
    let service = quantum_service();
    let options = PipelineOptions {
        assembly: AssemblyOptions {
            attach_lecture_images: true,
        },
        ..test_options()
    };
    let pipeline = CoursePipeline::new(MemoryStore::new(), service.clone(), options).unwrap();
    let guard = ViewGuard::new();
    let key = pipeline.open_course("Quantum Physics", &guard).await.unwrap().key.unwrap();
    for index in 0..LECTURES.len() {
        pipeline.open_lecture(&key, index, &guard).await.unwrap();
    }
    pipeline.lecture_image(&key, 0, &guard).await.unwrap();

    let document = pipeline.export(&key, ExportMode::Gated).await.unwrap();
    assert_eq!(document.html.matches("src=\"data:image/png;base64,").count(), 2);
    assert!(document.html.contains("class=\"icon\""));
}

#[tokio::test]
async fn test_document_written_to_directory() {
    let service = quantum_service();
    let pipeline = memory_pipeline(&service);
    let guard = ViewGuard::new();
    let key = pipeline.open_course("Quantum Physics", &guard).await.unwrap().key.unwrap();
    pipeline.open_lecture(&key, 0, &guard).await.unwrap();

    let temp = TempDir::new().unwrap();
    let document = pipeline.export(&key, ExportMode::Forced).await.unwrap();
    let path = document.write_to(temp.path()).unwrap();

    assert_eq!(path, temp.path().join("quantum-physics.html"));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), document.html);
}

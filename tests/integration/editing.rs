//! Editing keeps the course identity; renames detach lectures.

use crate::common::{LECTURES, memory_pipeline, quantum_service};
use musai_course::completeness::LectureStatus;
use musai_course::core::MusaiError;
use musai_course::course::{Difficulty, SyllabusEntry};
use musai_course::editor::DraftEdit;
use musai_course::generation::ViewGuard;
use musai_course::key::{CacheKey, LectureKey};
use musai_course::pipeline::ExportMode;
use musai_course::test_utils::Call;

#[tokio::test]
async fn test_edit_keeps_course_identity() {
    let service = quantum_service();
    let pipeline = memory_pipeline(&service);
    let guard = ViewGuard::new();
    let key = pipeline.open_course("Quantum Physics", &guard).await.unwrap().key.unwrap();

    let session = pipeline.begin_edit(&key).await.unwrap();
    let session = session
        .apply(DraftEdit::SetTitle("Relativity for Poets".to_string()))
        .unwrap()
        .apply(DraftEdit::SetDifficulty(Difficulty::Advanced))
        .unwrap()
        .apply(DraftEdit::AddTag("Physics".to_string()))
        .unwrap();
    assert_eq!(session.key(), &key);
    let committed = pipeline.commit(session).await.unwrap();
    assert_eq!(committed.title, "Relativity for Poets");

    // Same topic, edited draft, no new generation
    let view = pipeline.open_course("Quantum Physics", &guard).await.unwrap();
    assert_eq!(view.key.as_ref(), Some(&key));
    assert_eq!(view.draft, committed);
    assert_eq!(view.draft.difficulty, Difficulty::Advanced);
    assert_eq!(service.calls(Call::Draft), 1);

    // The new title is not an identity of its own
    let new_key = CacheKey::normalize("Relativity for Poets").unwrap();
    assert!(pipeline.artifacts().draft(&new_key).await.unwrap().is_none());
}

#[tokio::test]
async fn test_rename_detaches_cached_lecture() {
    let service = quantum_service();
    let pipeline = memory_pipeline(&service);
    let guard = ViewGuard::new();
    let key = pipeline.open_course("Quantum Physics", &guard).await.unwrap().key.unwrap();
    for index in 0..LECTURES.len() {
        pipeline.open_lecture(&key, index, &guard).await.unwrap();
    }
    assert!(pipeline.readiness(&key).await.unwrap().is_ready());

    let session = pipeline.begin_edit(&key).await.unwrap();
    let session = session
        .apply(DraftEdit::RetitleLecture {
            index: 1,
            title: "Heisenberg's principle".to_string(),
        })
        .unwrap();
    assert_eq!(session.orphaned_lectures(), vec![LECTURES[1].to_string()]);
    pipeline.commit(session).await.unwrap();

    let readiness = pipeline.readiness(&key).await.unwrap();
    assert_eq!(readiness.lectures[1].title, "Heisenberg's principle");
    assert_eq!(readiness.lectures[1].status, LectureStatus::Missing);
    assert!(pipeline.export(&key, ExportMode::Gated).await.is_err());

    // The old lecture is left in place, not migrated
    let old_key = LectureKey::new(&key, LECTURES[1]).unwrap();
    assert!(pipeline.artifacts().lecture(&old_key).await.unwrap().is_some());

    let lecture = pipeline.open_lecture(&key, 1, &guard).await.unwrap();
    assert_eq!(lecture.title, "Heisenberg's principle");
    assert_eq!(service.calls(Call::Lecture), LECTURES.len() + 1);
    assert!(pipeline.export(&key, ExportMode::Gated).await.is_ok());
}

#[tokio::test]
async fn test_case_only_rename_keeps_lecture() {
    let service = quantum_service();
    let pipeline = memory_pipeline(&service);
    let guard = ViewGuard::new();
    let key = pipeline.open_course("Quantum Physics", &guard).await.unwrap().key.unwrap();
    pipeline.open_lecture(&key, 0, &guard).await.unwrap();

    let session = pipeline.begin_edit(&key).await.unwrap();
    let session = session
        .apply(DraftEdit::RetitleLecture {
            index: 0,
            title: "WAVE  FUNCTIONS".to_string(),
        })
        .unwrap();
    assert!(session.orphaned_lectures().is_empty());
    pipeline.commit(session).await.unwrap();

    let readiness = pipeline.readiness(&key).await.unwrap();
    assert_eq!(readiness.lectures[0].status, LectureStatus::Ready);
}

#[tokio::test]
async fn test_reordering_keeps_lectures() {
    let service = quantum_service();
    let pipeline = memory_pipeline(&service);
    let guard = ViewGuard::new();
    let key = pipeline.open_course("Quantum Physics", &guard).await.unwrap().key.unwrap();
    for index in 0..LECTURES.len() {
        pipeline.open_lecture(&key, index, &guard).await.unwrap();
    }

    let session = pipeline
        .begin_edit(&key)
        .await
        .unwrap()
        .apply(DraftEdit::MoveLecture {
            from: 2,
            to: 0,
        })
        .unwrap();
    pipeline.commit(session).await.unwrap();

    let document = pipeline.export(&key, ExportMode::Gated).await.unwrap();
    let entanglement = document.html.find("1. Entanglement").unwrap();
    let waves = document.html.find("2. Wave functions").unwrap();
    assert!(entanglement < waves);
}

#[tokio::test]
async fn test_rejected_edit_changes_nothing() {
    let service = quantum_service();
    let pipeline = memory_pipeline(&service);
    let guard = ViewGuard::new();
    let key = pipeline.open_course("Quantum Physics", &guard).await.unwrap().key.unwrap();
    let before = pipeline.draft(&key).await.unwrap();

    let session = pipeline.begin_edit(&key).await.unwrap();
    let err = session.apply(DraftEdit::RemoveLecture(7)).unwrap_err();
    assert!(matches!(err.downcast_ref::<MusaiError>(), Some(MusaiError::InvalidEdit { .. })));
    let err = session
        .apply(DraftEdit::AddLecture(SyllabusEntry::new("entanglement", "", "")))
        .unwrap_err();
    assert!(matches!(err.downcast_ref::<MusaiError>(), Some(MusaiError::InvalidEdit { .. })));

    let edited = session.apply(DraftEdit::SetInstructor("Dr. Bohr".to_string())).unwrap();
    assert_eq!(edited.cancel(), before);
    assert_eq!(pipeline.draft(&key).await.unwrap(), before);
}

#[tokio::test]
async fn test_commit_without_changes_keeps_timestamp() {
    let service = quantum_service();
    let pipeline = memory_pipeline(&service);
    let key =
        pipeline.open_course("Quantum Physics", &ViewGuard::new()).await.unwrap().key.unwrap();
    let before = pipeline.draft(&key).await.unwrap();

    let session = pipeline.begin_edit(&key).await.unwrap();
    assert!(!session.is_dirty());
    let committed = pipeline.commit(session).await.unwrap();
    assert_eq!(committed, before);
    assert_eq!(pipeline.draft(&key).await.unwrap().updated_at, before.updated_at);
}

#[tokio::test]
async fn test_discard_removes_course() {
    let service = quantum_service();
    let pipeline = memory_pipeline(&service);
    let guard = ViewGuard::new();
    let key = pipeline.open_course("Quantum Physics", &guard).await.unwrap().key.unwrap();
    pipeline.open_lecture(&key, 0, &guard).await.unwrap();
    pipeline.open_lecture(&key, 1, &guard).await.unwrap();
    pipeline.lecture_image(&key, 0, &guard).await.unwrap();

    let summary = pipeline.discard(&key).await.unwrap();
    assert!(summary.draft);
    assert_eq!(summary.lectures, 2);
    assert_eq!(summary.images, 2);
    assert!(pipeline.artifacts().store().is_empty());

    let err = pipeline.begin_edit(&key).await.unwrap_err();
    assert!(matches!(err.downcast_ref::<MusaiError>(), Some(MusaiError::DraftNotFound { .. })));

    pipeline.open_course("Quantum Physics", &guard).await.unwrap();
    assert_eq!(service.calls(Call::Draft), 2);
}

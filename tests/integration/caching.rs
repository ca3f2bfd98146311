//! Cache identity and deduplication.

use crate::common::{LECTURES, disk_pipeline, memory_pipeline, quantum_service};
use futures::future::join_all;
use musai_course::completeness::LectureStatus;
use musai_course::generation::{ArtifactState, ViewGuard};
use musai_course::key::{CacheKey, LectureKey};
use musai_course::store::StoreKey;
use musai_course::test_utils::{Call, ScriptedService};
use std::time::Duration;
use tempfile::TempDir;

#[tokio::test]
async fn test_topic_variants_share_one_draft() {
    let service = quantum_service();
    let pipeline = memory_pipeline(&service);
    let guard = ViewGuard::new();

    let first = pipeline.open_course("Quantum Physics", &guard).await.unwrap();
    let second = pipeline.open_course("  quantum   physics ", &guard).await.unwrap();
    let third = pipeline.open_course("QUANTUM PHYSICS", &guard).await.unwrap();

    assert_eq!(first.key, CacheKey::normalize("quantum physics"));
    assert_eq!(first.key, second.key);
    assert_eq!(first.key, third.key);
    assert_eq!(first.draft, third.draft);
    assert!(first.icon.is_some());

    assert_eq!(service.calls(Call::Draft), 1);
    assert_eq!(service.calls(Call::Icon), 1);
}

#[tokio::test]
async fn test_different_topics_are_separate_courses() {
    let service = quantum_service();
    let pipeline = memory_pipeline(&service);
    let guard = ViewGuard::new();

    let quantum = pipeline.open_course("Quantum Physics", &guard).await.unwrap();
    let classical = pipeline.open_course("Classical Physics", &guard).await.unwrap();

    assert_ne!(quantum.key, classical.key);
    assert_eq!(service.calls(Call::Draft), 2);
}

#[tokio::test]
async fn test_concurrent_opens_generate_once() {
    let service = quantum_service().with_delay(Duration::from_millis(100));
    let pipeline = memory_pipeline(&service);
    let guard = ViewGuard::new();

    let topics = [
        "Quantum Physics",
        "quantum physics",
        " QUANTUM PHYSICS",
        "quantum  physics",
        "Quantum physics",
    ];
    let views = join_all(topics.iter().map(|topic| pipeline.open_course(topic, &guard))).await;

    let drafts: Vec<_> = views.into_iter().map(|v| v.unwrap().draft).collect();
    assert!(drafts.windows(2).all(|pair| pair[0] == pair[1]));
    assert_eq!(service.calls(Call::Draft), 1);
    assert_eq!(service.calls(Call::Icon), 1);
}

#[tokio::test]
async fn test_lecture_generated_once() {
    let service = quantum_service().with_delay(Duration::from_millis(50));
    let pipeline = memory_pipeline(&service);
    let guard = ViewGuard::new();
    let key = pipeline.open_course("Quantum Physics", &guard).await.unwrap().key.unwrap();

    let first = pipeline.open_lecture(&key, 0, &guard).await.unwrap();
    let again = pipeline.open_lecture(&key, 0, &guard).await.unwrap();
    assert_eq!(first, again);
    assert_eq!(first.title, LECTURES[0]);
    assert_eq!(service.calls(Call::Lecture), 1);

    let concurrent = join_all((0..4).map(|_| pipeline.open_lecture(&key, 1, &guard))).await;
    assert!(concurrent.iter().all(Result::is_ok));
    assert_eq!(service.calls(Call::Lecture), 2);

    let requests = service.lecture_requests();
    assert_eq!(requests[1].lecture_title, LECTURES[1]);
    assert_eq!(requests[1].index, 1);
    assert_eq!(requests[1].total, LECTURES.len());
}

#[tokio::test]
async fn test_lecture_images_generated_once() {
    let service = quantum_service();
    let pipeline = memory_pipeline(&service);
    let guard = ViewGuard::new();
    let key = pipeline.open_course("Quantum Physics", &guard).await.unwrap().key.unwrap();

    assert!(pipeline.lecture_image(&key, 2, &guard).await.unwrap().is_some());
    assert!(pipeline.lecture_image(&key, 2, &guard).await.unwrap().is_some());
    assert_eq!(service.calls(Call::LectureImage), 1);

    assert!(pipeline.lecture_image(&key, 9, &guard).await.unwrap().is_none());
    assert_eq!(service.calls(Call::LectureImage), 1);
}

#[tokio::test]
async fn test_state_reports_in_flight_generation() {
    let service = quantum_service().with_delay(Duration::from_millis(200));
    let pipeline = memory_pipeline(&service);
    let guard = ViewGuard::new();
    let key = CacheKey::normalize("Quantum Physics").unwrap();
    let draft_key = StoreKey::draft(&key);

    assert_eq!(pipeline.state(&draft_key).await.unwrap(), ArtifactState::Absent);

    let probe = async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        pipeline.state(&draft_key).await.unwrap()
    };
    let (view, during) = tokio::join!(pipeline.open_course("Quantum Physics", &guard), probe);

    view.unwrap();
    assert_eq!(during, ArtifactState::InFlight);
    assert_eq!(pipeline.state(&draft_key).await.unwrap(), ArtifactState::Present);
}

#[tokio::test]
async fn test_blank_topic_is_generated_but_never_cached() {
    let service = quantum_service();
    let pipeline = memory_pipeline(&service);
    let guard = ViewGuard::new();

    let first = pipeline.open_course("   ", &guard).await.unwrap();
    let second = pipeline.open_course("", &guard).await.unwrap();

    assert!(first.key.is_none());
    assert!(second.key.is_none());
    assert!(first.icon.is_none());
    assert_eq!(service.calls(Call::Draft), 2);
    assert_eq!(service.calls(Call::Icon), 0);
    assert!(pipeline.artifacts().store().is_empty());
}

#[tokio::test]
async fn test_cache_survives_a_new_store_instance() {
    let temp = TempDir::new().unwrap();
    let guard = ViewGuard::new();

    let first_service = quantum_service();
    let key = {
        let pipeline = disk_pipeline(temp.path(), &first_service);
        let key = pipeline.open_course("Quantum Physics", &guard).await.unwrap().key.unwrap();
        pipeline.open_lecture(&key, 0, &guard).await.unwrap();
        key
    };

    let second_service = ScriptedService::default();
    let pipeline = disk_pipeline(temp.path(), &second_service);

    let view = pipeline.open_course("quantum physics", &guard).await.unwrap();
    assert_eq!(view.key.as_ref(), Some(&key));
    assert!(view.icon.is_some());
    pipeline.open_lecture(&key, 0, &guard).await.unwrap();

    assert_eq!(second_service.calls(Call::Draft), 0);
    assert_eq!(second_service.calls(Call::Icon), 0);
    assert_eq!(second_service.calls(Call::Lecture), 0);

    let readiness = pipeline.readiness(&key).await.unwrap();
    assert_eq!(readiness.lectures[0].status, LectureStatus::Ready);
    assert_eq!(readiness.lectures[1].status, LectureStatus::Missing);

    let stored = LectureKey::new(&key, LECTURES[0]).unwrap();
    assert!(pipeline.artifacts().lecture(&stored).await.unwrap().is_some());
}

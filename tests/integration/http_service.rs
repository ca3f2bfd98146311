//! Wire mapping of the HTTP generation client.

use musai_course::core::GenerationError;
use musai_course::course::{CourseDraft, ImageArtifact};
use musai_course::generation::{
    GenerationService, HttpGenerationService, LectureRequest, ViewGuard,
};
use musai_course::pipeline::{CoursePipeline, PipelineOptions};
use musai_course::store::MemoryStore;
use musai_course::test_utils::{PNG_BYTES, sample_draft};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn draft_json() -> serde_json::Value {
    json!({
        "title": "Rust for Beginners",
        "description": "Ownership without tears",
        "instructor": "Ferris",
        "difficulty": "beginner",
        "estimatedDuration": "3 weeks",
        "tags": ["rust", "Rust", "systems"],
        "syllabus": [
            {"title": "Ownership", "summary": "Moves and copies", "duration": "30 min"},
            {"title": "Borrowing", "description": "References"}
        ]
    })
}

fn service(server: &MockServer) -> HttpGenerationService {
    HttpGenerationService::new(format!("{}/webhook/", server.uri()), Duration::from_secs(5))
        .unwrap()
}

fn lecture_request() -> LectureRequest {
    let draft: CourseDraft = serde_json::from_value(draft_json()).unwrap();
    LectureRequest::new(&draft, &draft.syllabus[1], 1)
}

#[tokio::test]
async fn test_draft_request_and_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/webhook/course-draft"))
        .and(header("authorization", "Bearer secret"))
        .and(body_json(json!({"topic": "Rust"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(draft_json()))
        .expect(1)
        .mount(&server)
        .await;

    let service = service(&server).with_api_key(Some("secret".to_string()));
    let draft = service.generate_draft("Rust").await.unwrap();

    assert_eq!(draft.title, "Rust for Beginners");
    assert_eq!(draft.estimated_duration, "3 weeks");
    assert_eq!(draft.syllabus.len(), 2);
    assert_eq!(draft.syllabus[1].summary, "References");
}

#[tokio::test]
async fn test_draft_wrapped_in_list() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/webhook/course-draft"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([draft_json()])))
        .mount(&server)
        .await;

    let draft = service(&server).generate_draft("Rust").await.unwrap();
    assert_eq!(draft.title, "Rust for Beginners");
}

#[tokio::test]
async fn test_error_status_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/webhook/course-draft"))
        .respond_with(ResponseTemplate::new(500).set_body_string("workflow crashed"))
        .mount(&server)
        .await;

    let err = service(&server).generate_draft("Rust").await.unwrap_err();
    assert_eq!(err, GenerationError::Status {
        status: 500,
        body: "workflow crashed".to_string(),
    });
}

#[tokio::test]
async fn test_malformed_draft_is_invalid_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/webhook/course-draft"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"unexpected": true})))
        .mount(&server)
        .await;

    let err = service(&server).generate_draft("Rust").await.unwrap_err();
    assert!(matches!(err, GenerationError::InvalidResponse { .. }));
}

#[tokio::test]
async fn test_slow_service_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/webhook/course-draft"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(draft_json())
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let timeout = Duration::from_millis(200);
    let service =
        HttpGenerationService::new(format!("{}/webhook", server.uri()), timeout).unwrap();
    let err = service.generate_draft("Rust").await.unwrap_err();
    assert_eq!(err, GenerationError::Timeout(timeout));
}

#[tokio::test]
async fn test_unreachable_service_is_request_error() {
    let service =
        HttpGenerationService::new("http://127.0.0.1:9/webhook", Duration::from_secs(2)).unwrap();
    let err = service.generate_draft("Rust").await.unwrap_err();
    assert!(matches!(err, GenerationError::Request { .. }));
}

#[tokio::test]
async fn test_lecture_as_html_text_or_json() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/webhook/lecture-content"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            "<p>Borrowing lets you use a value without owning it.</p>",
            "text/html",
        ))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/webhook/lecture-content"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": "# Borrowing\n\nShared and mutable references.",
            "isHtml": false,
            "title": "Borrowing basics"
        })))
        .mount(&server)
        .await;

    let service = service(&server);
    let request = lecture_request();

    let html = service.generate_lecture(&request).await.unwrap();
    assert!(html.is_html);
    assert_eq!(html.title, "Borrowing");
    assert!(html.content.starts_with("<p>Borrowing"));

    let json = service.generate_lecture(&request).await.unwrap();
    assert!(!json.is_html);
    assert_eq!(json.title, "Borrowing basics");

    let received = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&received[0].body).unwrap();
    assert_eq!(body["lectureTitle"], "Borrowing");
    assert_eq!(body["courseTitle"], "Rust for Beginners");
    assert_eq!(body["index"], 1);
    assert_eq!(body["total"], 2);
}

#[tokio::test]
async fn test_images_as_bytes_or_json() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/webhook/course-icon"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(PNG_BYTES, "image/png"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/webhook/lecture-image"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"image": "data:image/jpeg;base64,AQID"})),
        )
        .mount(&server)
        .await;

    let service = service(&server);
    let draft = sample_draft("Rust", &["Ownership"]);

    let icon = service.generate_icon(&draft).await.unwrap();
    assert_eq!(icon, ImageArtifact::new("image/png", PNG_BYTES.to_vec()));

    let image = service.generate_lecture_image(&lecture_request()).await.unwrap();
    assert_eq!(image, ImageArtifact::new("image/jpeg", vec![1, 2, 3]));
}

#[tokio::test]
async fn test_pipeline_over_http_calls_each_endpoint_once() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/webhook/course-draft"))
        .respond_with(ResponseTemplate::new(200).set_body_json(draft_json()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/webhook/course-icon"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(PNG_BYTES, "image/png"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/webhook/lecture-content"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            "<p>Ownership means every value has exactly one owner.</p>",
            "text/html",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let pipeline =
        CoursePipeline::new(MemoryStore::new(), service(&server), PipelineOptions::default())
            .unwrap();
    let guard = ViewGuard::new();

    let view = pipeline.open_course("Rust", &guard).await.unwrap();
    assert_eq!(view.draft.tags, vec!["rust".to_string(), "systems".to_string()]);
    let key = view.key.unwrap();
    pipeline.open_course(" rust ", &guard).await.unwrap();
    pipeline.open_lecture(&key, 0, &guard).await.unwrap();
    pipeline.open_lecture(&key, 0, &guard).await.unwrap();

    server.verify().await;
}

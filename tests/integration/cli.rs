//! The `musai` binary.

use assert_cmd::Command;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use serde_json::json;
use std::path::Path;
use std::process::Output;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// `musai` isolated from the user's home, config and store.
fn musai(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("musai").unwrap();
    cmd.env("HOME", home)
        .env("MUSAI_CONFIG", home.join("config.toml"))
        .env("MUSAI_STORE_DIR", home.join("store"))
        .env("MUSAI_NO_PROGRESS", "1")
        .env("NO_COLOR", "1")
        .env_remove("MUSAI_SERVICE_URL")
        .env_remove("MUSAI_API_KEY")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_help_lists_commands() {
    let temp = TempDir::new().unwrap();
    musai(temp.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("draft"))
        .stdout(predicate::str::contains("export"))
        .stdout(predicate::str::contains("discard"));
}

#[test]
fn test_config_path_follows_flag_and_env() {
    let temp = TempDir::new().unwrap();
    let env_path = temp.path().join("config.toml");
    musai(temp.path())
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains(env_path.display().to_string()));

    let flag_path = temp.path().join("other.toml");
    musai(temp.path())
        .args(["--config", flag_path.to_str().unwrap(), "config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains(flag_path.display().to_string()));
}

#[test]
fn test_config_init_then_show() {
    let temp = TempDir::new().unwrap();
    musai(temp.path())
        .args(["config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created config"));
    assert!(temp.path().join("config.toml").exists());

    musai(temp.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("base_url"))
        .stdout(predicate::str::contains("min_meaningful_chars"));
}

#[test]
fn test_status_without_draft_fails() {
    let temp = TempDir::new().unwrap();
    musai(temp.path())
        .args(["status", "Quantum Physics"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("No course draft cached"));
}

#[test]
fn test_lecture_numbers_start_at_one() {
    let temp = TempDir::new().unwrap();
    musai(temp.path())
        .args(["lecture", "Quantum Physics", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("lecture numbers start at 1"));
}

#[test]
fn test_invalid_service_url_is_config_error() {
    let temp = TempDir::new().unwrap();
    musai(temp.path())
        .env("MUSAI_SERVICE_URL", "ftp://example.com")
        .args(["status", "Quantum Physics"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration error"));
}

/// Run `musai` against the mock service off the async runtime.
async fn run(home: &Path, uri: &str, args: &[&str]) -> Output {
    let mut cmd = musai(home);
    cmd.env("MUSAI_SERVICE_URL", uri).args(args);
    tokio::task::spawn_blocking(move || cmd.output().unwrap()).await.unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn test_draft_lecture_export_round() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/course-draft"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "title": "Rust for Beginners",
            "instructor": "Ferris",
            "syllabus": [{"title": "Ownership", "summary": "Moves"}]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/course-icon"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/lecture-content"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            "<p>Every value in Rust has exactly one owner at a time.</p>",
            "text/html",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let home = temp.path();
    let uri = server.uri();
    let out = home.join("out");

    run(home, &uri, &["draft", "Rust"])
        .await
        .assert()
        .success()
        .stdout(predicate::str::contains("Rust for Beginners"))
        .stdout(predicate::str::contains("1. Ownership"));

    run(home, &uri, &["export", "rust"])
        .await
        .assert()
        .failure()
        .stderr(predicate::str::contains("not ready to export"));

    run(home, &uri, &["lecture", "RUST", "1"])
        .await
        .assert()
        .success()
        .stdout(predicate::str::contains("exactly one owner"));

    run(home, &uri, &["status", "rust"])
        .await
        .assert()
        .success()
        .stdout(predicate::str::contains("1/1 lectures ready"));

    run(home, &uri, &["export", "rust", "--output", out.to_str().unwrap()])
        .await
        .assert()
        .success()
        .stdout(predicate::str::contains("Exported 1 of 1 lectures"));

    let html = std::fs::read_to_string(out.join("rust-for-beginners.html")).unwrap();
    assert!(html.contains("exactly one owner"));

    server.verify().await;
}

mod helpers;

use epubfix_processing::testing::Script;
use helpers::auth::register_test_user;
use helpers::fixtures::epub_form;
use helpers::{setup_test_app, setup_test_app_with, setup_test_app_with_timeout, TestApp};
use serde_json::Value;
use std::time::Duration;

fn key(url: &Value) -> String {
    url.as_str()
        .expect("record carries the url")
        .trim_start_matches('/')
        .to_string()
}

async fn list(app: &TestApp, bearer: &str) -> Vec<Value> {
    let response = app
        .client()
        .get("/api/epub/list")
        .add_header("Authorization", bearer.to_string())
        .await;
    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    body["data"].as_array().cloned().unwrap_or_default()
}

#[tokio::test]
async fn test_process_epub3_skips_conversion() {
    let app = setup_test_app().await;
    let user = register_test_user(app.client(), None).await;

    let response = app
        .client()
        .post("/api/epub/process")
        .add_header("Authorization", user.bearer())
        .multipart(epub_form("my-book.epub"))
        .await;

    assert_eq!(response.status_code(), 200, "{}", response.text());
    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "EPUB3 fixed successfully");
    assert!(body["data"]["epub3_file_url"].is_null());
    assert!(body["data"]["fixed_file_url"]
        .as_str()
        .unwrap()
        .starts_with("/api/epub/download?file="));
    assert_eq!(app.tool.calls(), vec!["version", "analyze", "fix"]);

    let records = list(&app, &user.bearer()).await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["status"], "completed");
    assert_eq!(records[0]["title"], "my-book");
    assert!(records[0]["epub3_url"].is_null());
    assert!(app.path(&key(&records[0]["fixed_url"])).exists());
    assert!(app.path(&key(&records[0]["log_url"])).exists());
}

#[tokio::test]
async fn test_process_epub2_converts_first() {
    let app = setup_test_app_with(Script::epub2()).await;
    let user = register_test_user(app.client(), None).await;

    let response = app
        .client()
        .post("/api/epub/process")
        .add_header("Authorization", user.bearer())
        .multipart(epub_form("legacy.epub"))
        .await;

    assert_eq!(response.status_code(), 200, "{}", response.text());
    let body: Value = response.json();
    assert_eq!(body["message"], "EPUB2 converted to EPUB3 and fixed successfully");
    assert!(body["data"]["epub3_file_url"].is_string());
    assert_eq!(app.tool.calls(), vec!["version", "analyze", "convert", "fix"]);

    let records = list(&app, &user.bearer()).await;
    let epub3 = key(&records[0]["epub3_url"]);
    assert!(epub3.starts_with("uploads/"));
    assert!(epub3.ends_with("legacy_epub3.epub"));
    assert!(app.path(&epub3).exists());
}

#[tokio::test]
async fn test_fix_failure_records_failed_upload() {
    let app = setup_test_app_with(Script {
        fix_exit_code: 1,
        ..Script::default()
    })
    .await;
    let user = register_test_user(app.client(), None).await;

    let response = app
        .client()
        .post("/api/epub/process")
        .add_header("Authorization", user.bearer())
        .multipart(epub_form("broken.epub"))
        .await;

    assert_eq!(response.status_code(), 500);
    let body: Value = response.json();
    assert_eq!(body["code"], "FIX_FAILED");

    let records = list(&app, &user.bearer()).await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["status"], "failed");
    assert!(app.files_under("uploads").is_empty());
    assert!(app.files_under("processed").is_empty());
}

#[tokio::test]
async fn test_timed_out_request_still_records_failed_upload() {
    let app = setup_test_app_with_timeout(
        Script {
            fix_delay: Duration::from_secs(2),
            fix_exit_code: 1,
            ..Script::default()
        },
        1,
    )
    .await;
    let user = register_test_user(app.client(), None).await;

    let response = app
        .client()
        .post("/api/epub/process")
        .add_header("Authorization", user.bearer())
        .multipart(epub_form("slow.epub"))
        .await;
    assert_eq!(response.status_code(), 408);

    // Processing carries on after the response; wait for its record.
    for _ in 0..50 {
        if app.store.upload_count() == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    let records = list(&app, &user.bearer()).await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["status"], "failed");
    assert!(records[0]["fixed_url"].is_null());
    assert!(app.files_under("uploads").is_empty());
    assert!(app.files_under("processed").is_empty());
}

#[tokio::test]
async fn test_old_tool_is_rejected() {
    let app = setup_test_app_with(Script {
        version: epubfix_core::naming::ToolVersion { major: 1, minor: 0 },
        ..Script::default()
    })
    .await;
    let user = register_test_user(app.client(), None).await;

    let response = app
        .client()
        .post("/api/epub/process")
        .add_header("Authorization", user.bearer())
        .multipart(epub_form("book.epub"))
        .await;

    assert_eq!(response.status_code(), 500);
    let body: Value = response.json();
    assert_eq!(body["code"], "TOOL_VERSION_TOO_LOW");
    assert_eq!(app.tool.calls(), vec!["version"]);
}

#[tokio::test]
async fn test_rejects_wrong_extension_without_record() {
    let app = setup_test_app().await;
    let user = register_test_user(app.client(), None).await;

    let response = app
        .client()
        .post("/api/epub/process")
        .add_header("Authorization", user.bearer())
        .multipart(epub_form("notes.pdf"))
        .await;

    assert_eq!(response.status_code(), 400);
    assert_eq!(app.store.upload_count(), 0);
    assert!(app.tool.calls().is_empty());
}

#[tokio::test]
async fn test_missing_file_field() {
    let app = setup_test_app().await;
    let user = register_test_user(app.client(), None).await;

    let form = axum_test::multipart::MultipartForm::new().add_text("title", "no file here");
    let response = app
        .client()
        .post("/api/epub/process")
        .add_header("Authorization", user.bearer())
        .multipart(form)
        .await;

    assert_eq!(response.status_code(), 400);
    let body: Value = response.json();
    assert_eq!(body["error"], "No file provided");
}

#[tokio::test]
async fn test_list_is_scoped_to_owner() {
    let app = setup_test_app().await;
    let alice = register_test_user(app.client(), Some("alice@example.com")).await;
    let bob = register_test_user(app.client(), Some("bob@example.com")).await;

    app.client()
        .post("/api/epub/process")
        .add_header("Authorization", alice.bearer())
        .multipart(epub_form("alice.epub"))
        .await;

    assert_eq!(list(&app, &alice.bearer()).await.len(), 1);
    assert!(list(&app, &bob.bearer()).await.is_empty());
}

#[tokio::test]
async fn test_delete_respects_ownership() {
    let app = setup_test_app().await;
    let alice = register_test_user(app.client(), Some("alice@example.com")).await;
    let bob = register_test_user(app.client(), Some("bob@example.com")).await;

    app.client()
        .post("/api/epub/process")
        .add_header("Authorization", alice.bearer())
        .multipart(epub_form("alice.epub"))
        .await;
    let record = list(&app, &alice.bearer()).await.remove(0);
    let id = record["id"].as_str().unwrap().to_string();

    let response = app
        .client()
        .delete("/api/epub/delete")
        .add_query_param("id", &id)
        .add_header("Authorization", bob.bearer())
        .await;
    assert_eq!(response.status_code(), 404);
    assert_eq!(app.store.upload_count(), 1);
    assert!(app.path(&key(&record["fixed_url"])).exists());

    let response = app
        .client()
        .delete("/api/epub/delete")
        .add_query_param("id", &id)
        .add_header("Authorization", alice.bearer())
        .await;
    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["message"], "EPUB deleted successfully");
    assert_eq!(app.store.upload_count(), 0);
    assert!(app.files_under("uploads").is_empty());
    assert!(app.files_under("processed").is_empty());
}

#[tokio::test]
async fn test_delete_requires_valid_id() {
    let app = setup_test_app().await;
    let user = register_test_user(app.client(), None).await;

    let response = app
        .client()
        .delete("/api/epub/delete")
        .add_header("Authorization", user.bearer())
        .await;
    assert_eq!(response.status_code(), 400);

    let response = app
        .client()
        .delete("/api/epub/delete")
        .add_query_param("id", "not-a-uuid")
        .add_header("Authorization", user.bearer())
        .await;
    assert_eq!(response.status_code(), 400);
}

#[tokio::test]
async fn test_download_fixed_epub_as_attachment() {
    let app = setup_test_app().await;
    let user = register_test_user(app.client(), None).await;

    app.client()
        .post("/api/epub/process")
        .add_header("Authorization", user.bearer())
        .multipart(epub_form("book.epub"))
        .await;
    let record = list(&app, &user.bearer()).await.remove(0);

    let response = app
        .client()
        .get("/api/epub/download")
        .add_query_param("file", key(&record["fixed_url"]))
        .add_header("Authorization", user.bearer())
        .await;

    assert_eq!(response.status_code(), 200);
    assert_eq!(response.header("content-type"), "application/epub+zip");
    assert!(response
        .header("content-disposition")
        .to_str()
        .unwrap()
        .starts_with("attachment;"));
    assert_eq!(response.as_bytes().as_ref(), b"fixed");
}

#[tokio::test]
async fn test_download_placeholder_report() {
    let app = setup_test_app_with(Script {
        fix_writes_report: false,
        ..Script::default()
    })
    .await;
    let user = register_test_user(app.client(), None).await;

    let response = app
        .client()
        .post("/api/epub/process")
        .add_header("Authorization", user.bearer())
        .multipart(epub_form("book.epub"))
        .await;
    assert_eq!(response.status_code(), 200);
    let record = list(&app, &user.bearer()).await.remove(0);

    let response = app
        .client()
        .get("/api/epub/download")
        .add_query_param("file", key(&record["log_url"]))
        .add_header("Authorization", user.bearer())
        .await;

    assert_eq!(response.status_code(), 200);
    assert_eq!(response.header("content-type"), "text/html; charset=utf-8");
    assert!(response.text().contains("<html"));
}

#[tokio::test]
async fn test_download_rejects_traversal() {
    let app = setup_test_app().await;
    let user = register_test_user(app.client(), None).await;

    let response = app
        .client()
        .get("/api/epub/download")
        .add_query_param("file", "../../etc/passwd")
        .add_header("Authorization", user.bearer())
        .await;
    assert_eq!(response.status_code(), 400);

    let response = app
        .client()
        .get("/api/epub/download")
        .add_header("Authorization", user.bearer())
        .await;
    assert_eq!(response.status_code(), 400);

    let response = app
        .client()
        .get("/api/epub/download")
        .add_query_param("file", "processed/missing/fixed-book.epub")
        .add_header("Authorization", user.bearer())
        .await;
    assert_eq!(response.status_code(), 404);
}

//! OCR client tests against a fake read service: the async submit +
//! operation-status poll loop, including the bounded poll budget.

use axum::{
    extract::State,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use lib::services::VisionClient;
use serde_json::json;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
struct FakeRead {
    /// Poll attempt on which the operation becomes ready; a service that
    /// never finishes uses u32::MAX.
    polls_until_ready: u32,
    /// Status to report when ready ("succeeded" or "failed").
    final_status: &'static str,
    poll_count: Arc<AtomicU32>,
}

async fn submit(State(state): State<(FakeRead, String)>) -> impl IntoResponse {
    let (_, base) = state;
    (
        [("Operation-Location", format!("{}/read/result/1", base))],
        "",
    )
}

async fn poll(State(state): State<(FakeRead, String)>) -> Json<serde_json::Value> {
    let (fake, _) = state;
    let n = fake.poll_count.fetch_add(1, Ordering::SeqCst) + 1;
    if n < fake.polls_until_ready {
        return Json(json!({ "status": "running" }));
    }
    if fake.final_status == "failed" {
        return Json(json!({ "status": "failed" }));
    }
    Json(json!({
        "status": "succeeded",
        "analyzeResult": {
            "readResults": [
                { "lines": [ { "text": "TOTAL DUE" }, { "text": "42.00" } ] }
            ]
        }
    }))
}

/// Start the fake read service; returns (base_url, poll counter).
async fn spawn_fake_read(polls_until_ready: u32, final_status: &'static str) -> (String, Arc<AtomicU32>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let base = format!("http://{}", listener.local_addr().expect("local_addr"));
    let poll_count = Arc::new(AtomicU32::new(0));
    let fake = FakeRead {
        polls_until_ready,
        final_status,
        poll_count: poll_count.clone(),
    };
    let router = Router::new()
        .route("/vision/v3.2/read/analyze", post(submit))
        .route("/read/result/1", get(poll))
        .with_state((fake, base.clone()));
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    (base, poll_count)
}

fn temp_image() -> PathBuf {
    let path = std::env::temp_dir().join(format!("yerba-ocr-test-{}.png", uuid::Uuid::new_v4()));
    std::fs::write(&path, [0u8; 32]).expect("write image");
    path
}

fn fast_client(base: &str) -> VisionClient {
    VisionClient::new(base.to_string(), "k".to_string()).with_poll_timing(
        Duration::from_millis(1),
        Duration::from_millis(1),
        10,
    )
}

#[tokio::test]
async fn read_succeeds_after_a_few_polls() {
    let (base, polls) = spawn_fake_read(3, "succeeded").await;
    let image = temp_image();
    let text = fast_client(&base).read_text(&image).await.expect("read");
    assert_eq!(text.as_deref(), Some("TOTAL DUE\n42.00"));
    assert_eq!(polls.load(Ordering::SeqCst), 3);
    let _ = std::fs::remove_file(&image);
}

#[tokio::test]
async fn failed_status_yields_no_text() {
    let (base, _) = spawn_fake_read(1, "failed").await;
    let image = temp_image();
    let text = fast_client(&base).read_text(&image).await.expect("read");
    assert!(text.is_none());
    let _ = std::fs::remove_file(&image);
}

#[tokio::test]
async fn poll_budget_is_bounded_at_ten_attempts() {
    let (base, polls) = spawn_fake_read(u32::MAX, "succeeded").await;
    let image = temp_image();
    let text = fast_client(&base).read_text(&image).await.expect("read");
    assert!(text.is_none());
    assert_eq!(polls.load(Ordering::SeqCst), 10);
    let _ = std::fs::remove_file(&image);
}

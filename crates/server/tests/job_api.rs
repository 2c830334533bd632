//! Job API integration tests.
//!
//! These tests drive the job endpoints through the router with the mock
//! job service behind them.

mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::{TestFixture, TOKEN};
use printwizard_core::{JobStatusReport, JobSummary, RemoteStatus};

fn pre_submission() -> serde_json::Value {
    json!({
        "kind": "pre_submission",
        "order_lines": [
            {"print_id": "A", "qty": 2},
            {"print_id": "B", "qty": 1},
            {"print_id": "A", "qty": 3}
        ]
    })
}

#[tokio::test]
async fn test_health_and_config() {
    let fixture = TestFixture::new();

    let health = fixture.get("/api/v1/health").await;
    assert_eq!(health.status, StatusCode::OK);
    assert_eq!(health.body["status"], "ok");

    let config = fixture.get("/api/v1/config").await;
    assert_eq!(config.status, StatusCode::OK);
    assert_eq!(config.body["remote"]["url"], "https://jobs.example.com");
    assert_eq!(config.body["lifecycle"]["progress_cap_pct"], 95);
}

#[tokio::test]
async fn test_job_requires_bearer_token() {
    let fixture = TestFixture::new();

    let response = fixture.request("GET", "/api/v1/job", None, None).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["kind"], "auth");

    let response = fixture
        .request("POST", "/api/v1/job", None, Some(pre_submission()))
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert!(fixture.remote.calls().await.is_empty());
}

#[tokio::test]
async fn test_initial_snapshot() {
    let fixture = TestFixture::new();

    let response = fixture.get("/api/v1/job").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["phase"], "initial");
    assert_eq!(response.body["progress_percent"], 0);
    assert_eq!(response.body["progress_is_estimate"], true);
    assert_eq!(response.body["files"], json!([]));
}

#[tokio::test]
async fn test_open_preview_and_confirm_flow() {
    let fixture = TestFixture::new();

    let opened = fixture.post("/api/v1/job", pre_submission()).await;
    assert_eq!(opened.status, StatusCode::OK);
    assert_eq!(opened.body["phase"], "preview_requested");
    assert_eq!(
        opened.body["order"],
        json!([{"print_id": "A", "quantity": 5}, {"print_id": "B", "quantity": 1}])
    );
    let job_id = opened.body["job_id"].as_str().unwrap().to_string();

    fixture
        .remote
        .set_status(&job_id, RemoteStatus::PreviewReady)
        .await;
    let polled = fixture.post_empty("/api/v1/job/poll").await;
    assert_eq!(polled.status, StatusCode::OK);
    assert_eq!(polled.body["phase"], "preview_ready");
    assert_eq!(polled.body["progress_percent"], 100);
    assert_eq!(polled.body["files"].as_array().unwrap().len(), 1);

    let confirmed = fixture.post_empty("/api/v1/job/confirm").await;
    assert_eq!(confirmed.status, StatusCode::OK);
    assert_eq!(confirmed.body["phase"], "confirmed");
    assert_eq!(confirmed.body["files"], json!([]));

    fixture.remote.set_status(&job_id, RemoteStatus::Done).await;
    let done = fixture.post_empty("/api/v1/job/poll").await;
    assert_eq!(done.body["phase"], "done");
    assert_eq!(done.body["status_text"], "Final files ready");

    let reset = fixture.post_empty("/api/v1/job/reset").await;
    assert_eq!(reset.status, StatusCode::OK);
    assert_eq!(reset.body["phase"], "initial");
    assert_eq!(reset.body["job_id"], json!(null));
}

#[tokio::test]
async fn test_empty_order_is_bad_request() {
    let fixture = TestFixture::new();

    let response = fixture
        .post(
            "/api/v1/job",
            json!({"kind": "pre_submission", "order_lines": [{"print_id": "A", "qty": 0}]}),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["kind"], "validation");
    assert!(fixture.remote.calls().await.is_empty());
}

#[tokio::test]
async fn test_untagged_panel_request_is_rejected() {
    let fixture = TestFixture::new();

    let response = fixture
        .post("/api/v1/job", json!({"job_id": "job-1"}))
        .await;
    assert!(response.status.is_client_error());
    assert!(fixture.remote.calls().await.is_empty());
}

#[tokio::test]
async fn test_confirm_outside_preview_ready_is_rejected() {
    let fixture = TestFixture::new();
    fixture.post("/api/v1/job", pre_submission()).await;

    let response = fixture.post_empty("/api/v1/job/confirm").await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["kind"], "validation");
    assert_eq!(fixture.remote.confirm_calls().await, 0);
}

#[tokio::test]
async fn test_confirm_with_mismatched_job_id() {
    let fixture = TestFixture::new();
    let opened = fixture.post("/api/v1/job", pre_submission()).await;
    let job_id = opened.body["job_id"].as_str().unwrap().to_string();
    fixture
        .remote
        .set_status(&job_id, RemoteStatus::PreviewReady)
        .await;
    fixture.post_empty("/api/v1/job/poll").await;

    let response = fixture
        .post_empty("/api/v1/job/confirm?job_id=someone-else")
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(fixture.remote.confirm_calls().await, 0);

    let response = fixture
        .post_empty(&format!("/api/v1/job/confirm?job_id={}", job_id))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["phase"], "confirmed");
}

#[tokio::test]
async fn test_remote_failure_is_bad_gateway() {
    let fixture = TestFixture::new();
    fixture
        .remote
        .set_next_error(printwizard_core::RemoteError::Api {
            status: 429,
            message: "Plan limit reached".to_string(),
        })
        .await;

    let response = fixture.post("/api/v1/job", pre_submission()).await;
    assert_eq!(response.status, StatusCode::BAD_GATEWAY);
    assert_eq!(response.body["kind"], "remote");

    let snapshot = fixture.get("/api/v1/job").await;
    assert_eq!(snapshot.body["phase"], "error");
    assert_eq!(snapshot.body["job_id"], json!(null));
}

#[tokio::test]
async fn test_attach_existing_job() {
    let fixture = TestFixture::new();
    fixture
        .remote
        .set_report(
            JobStatusReport::new("job-77", RemoteStatus::Done).with_items(vec![
                printwizard_core::OrderLine::new("X", 1),
                printwizard_core::OrderLine::new("X", 2),
            ]),
        )
        .await;

    let response = fixture
        .post(
            "/api/v1/job",
            json!({"kind": "post_submission", "job_id": "job-77"}),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["phase"], "done");
    assert_eq!(response.body["job_id"], "job-77");
    assert_eq!(
        response.body["order"],
        json!([{"print_id": "X", "quantity": 3}])
    );
}

#[tokio::test]
async fn test_sessions_are_isolated() {
    let fixture = TestFixture::new();
    fixture.post("/api/v1/job", pre_submission()).await;

    let mine = fixture.get("/api/v1/job").await;
    assert_eq!(mine.body["phase"], "preview_requested");

    let other = fixture
        .request("GET", "/api/v1/job", Some("other-token"), None)
        .await;
    assert_eq!(other.status, StatusCode::OK);
    assert_eq!(other.body["phase"], "initial");

    let calls = fixture.remote.calls().await;
    assert!(matches!(
        &calls[0],
        printwizard_core::testing::RecordedCall::CreateJob { token, .. } if token == TOKEN
    ));
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let fixture = TestFixture::new();
    fixture.get("/api/v1/health").await;

    let response = fixture.request("GET", "/metrics", None, None).await;
    assert_eq!(response.status, StatusCode::OK);
    let text = response.body.as_str().unwrap();
    assert!(text.contains("printwizard_http_requests_total"));
    assert!(text.contains("printwizard_active_sessions"));
}

#[tokio::test]
async fn test_job_history() {
    let fixture = TestFixture::new();
    fixture
        .remote
        .set_history(vec![JobSummary::new("job-42", RemoteStatus::Done)])
        .await;

    let response = fixture.get("/api/v1/job/history").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body[0]["id"], "job-42");
    assert_eq!(response.body[0]["status"], "done");

    let response = fixture
        .request("GET", "/api/v1/job/history", None, None)
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_done_snapshot_carries_archive_url() {
    let fixture = TestFixture::new();
    let opened = fixture.post("/api/v1/job", pre_submission()).await;
    let job_id = opened.body["job_id"].as_str().unwrap().to_string();
    fixture
        .remote
        .set_report(
            JobStatusReport::new(&job_id, RemoteStatus::Done)
                .with_result_files(vec![common::fixtures::sheet(&job_id, 0)])
                .with_archive_url("https://files.mock/final.zip"),
        )
        .await;

    let done = fixture.post_empty("/api/v1/job/poll").await;
    assert_eq!(done.body["phase"], "done");
    assert_eq!(done.body["archive_url"], "https://files.mock/final.zip");
    assert_eq!(done.body["files"].as_array().unwrap().len(), 1);
    assert_eq!(fixture.remote.files_calls().await, 0);
}

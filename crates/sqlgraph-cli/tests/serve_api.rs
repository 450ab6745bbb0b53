//! API handler tests against the router, without a running server.

use std::io::{Cursor, Write};
use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::Value;
use sqlgraph_cli::input::ArchiveLimits;
use sqlgraph_cli::server::{build_router, AppState, ServerConfig};
use sqlgraph_core::WorkflowOptions;
use tower::ServiceExt;
use zip::write::FileOptions;

const BOUNDARY: &str = "sqlgraph-test-boundary";

fn default_config() -> ServerConfig {
    ServerConfig {
        port: 8080,
        allowed_origins: vec!["http://localhost:5173".to_string()],
        limits: ArchiveLimits {
            max_archive_bytes: 1_000_000,
            max_files: 100,
        },
        request_timeout_secs: 30,
        options: WorkflowOptions::default(),
    }
}

fn test_router(config: ServerConfig) -> axum::Router {
    build_router(Arc::new(AppState::new(config)))
}

fn zip_bytes(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = zip::ZipWriter::new(&mut cursor);
        let options = FileOptions::default().compression_method(zip::CompressionMethod::Deflated);
        for (name, content) in entries {
            writer.start_file(*name, options).unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap();
    }
    cursor.into_inner()
}

fn upload_request(file_name: &str, bytes: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; \
             filename=\"{file_name}\"\r\nContent-Type: application/zip\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::post("/api/workflow")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// === Health and config ===

#[tokio::test]
async fn health_returns_ok_status() {
    let app = test_router(default_config());
    let response = app
        .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn config_reflects_limits() {
    let app = test_router(default_config());
    let response = app
        .oneshot(Request::get("/api/config").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["max_archive_bytes"], 1_000_000);
    assert_eq!(json["max_files"], 100);
    assert_eq!(json["has_catalog"], false);
}

// === Workflow endpoint ===

#[tokio::test]
async fn upload_builds_two_job_workflow() {
    let bytes = zip_bytes(&[
        (
            "job1.sql",
            "SELECT a.account_id, c.customer_id FROM accounts a \
             INNER JOIN customers c ON a.customer_id = c.customer_id",
        ),
        (
            "job2.sql",
            "SELECT j.account_id, b.branch_name FROM job1 j \
             LEFT JOIN branches b ON j.branch_id = b.branch_id",
        ),
    ]);

    let app = test_router(default_config());
    let response = app
        .oneshot(upload_request("monthly.zip", &bytes))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["workflow_name"], "monthly");
    let jobs = json["jobs"].as_array().unwrap();
    assert_eq!(jobs.len(), 2);
    assert_eq!(jobs[0]["job_name"], "job1");
    assert_eq!(jobs[0]["rank"], 1);
    assert_eq!(jobs[0]["job_type"], "Ingest");
    assert_eq!(jobs[1]["job_name"], "job2");
    assert_eq!(jobs[1]["rank"], 2);
    assert_eq!(jobs[1]["dependencies"][0], "job1");
    assert!(json.get("warnings").is_none());
}

#[tokio::test]
async fn non_zip_filename_is_rejected_without_processing() {
    let app = test_router(default_config());
    let response = app
        .oneshot(upload_request("scripts.tar.gz", b"irrelevant"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = json_body(response).await;
    assert_eq!(json["kind"], "InputError");
    assert!(json.get("jobs").is_none());
}

#[tokio::test]
async fn oversized_archive_is_an_input_error() {
    let mut config = default_config();
    config.limits.max_archive_bytes = 64;
    let app = test_router(config);

    let filler = "-- padding\n".repeat(50);
    let sql = format!("{filler}SELECT a.x FROM accounts a");
    let bytes = zip_bytes(&[("job1.sql", sql.as_str())]);

    let response = app
        .oneshot(upload_request("big.zip", &bytes))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);

    let json = json_body(response).await;
    assert_eq!(json["kind"], "InputError");
}

#[tokio::test]
async fn malformed_file_yields_warning_not_failure() {
    let bytes = zip_bytes(&[
        ("good.sql", "SELECT a.account_id FROM accounts a"),
        ("broken.sql", "SELEC nothing FORM nowhere"),
    ]);

    let app = test_router(default_config());
    let response = app
        .oneshot(upload_request("batch.zip", &bytes))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["jobs"].as_array().unwrap().len(), 1);
    assert_eq!(json["jobs"][0]["job_name"], "good");
    let warnings = json["warnings"].as_array().unwrap();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0]["file"], "broken.sql");
}

#[tokio::test]
async fn self_referencing_job_is_a_cycle_error() {
    let bytes = zip_bytes(&[("own.sql", "SELECT o.amount FROM own o")]);

    let app = test_router(default_config());
    let response = app
        .oneshot(upload_request("cyclic.zip", &bytes))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let json = json_body(response).await;
    assert_eq!(json["kind"], "CycleError");
    assert!(json["detail"].as_str().unwrap().contains("own"));
}

#[tokio::test]
async fn missing_file_field_is_an_input_error() {
    let body = format!("--{BOUNDARY}--\r\n");
    let request = Request::post("/api/workflow")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap();

    let app = test_router(default_config());
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = json_body(response).await;
    assert_eq!(json["kind"], "InputError");
}

mod common;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
    response::Response,
};
use common::FakeAuditor;
use lighthouse_batch::{
    catalog::Catalog,
    dispatcher::Dispatcher,
    naming::Clock,
    runner::AuditRunner,
    secret::Secret,
    server::{AppState, router},
};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

const SECRET: &str = "s3cr3t";

fn app(tmp: &TempDir) -> Router {
    let root = tmp.path().join("results");
    std::fs::create_dir_all(&root).unwrap();
    router(AppState {
        catalog: Catalog::new(&root),
        dispatcher: Dispatcher::new(
            Secret::from_value(SECRET),
            Clock::utc(),
            AuditRunner::new(&root, Arc::new(FakeAuditor::default())),
        ),
    })
}

fn seed(tmp: &TempDir, job: &str, files: &[&str]) {
    let dir = tmp.path().join("results").join(job);
    std::fs::create_dir_all(&dir).unwrap();
    for f in files {
        std::fs::write(dir.join(f), format!("<html>{f}</html>")).unwrap();
    }
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn submit(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/analyze")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_bytes(resp: Response) -> Vec<u8> {
    axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

async fn body_json(resp: Response) -> Value {
    serde_json::from_slice(&body_bytes(resp).await).unwrap()
}

#[tokio::test]
async fn analyze_returns_request_id() {
    let tmp = TempDir::new().unwrap();
    let resp = app(&tmp)
        .oneshot(submit(json!({"secret_key": SECRET, "urls": ["https://example.com"]})))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["message"], "Analysis started");
    let id = body["requestId"].as_str().unwrap().to_string();
    assert_eq!(id.len(), 14);

    let catalog = Catalog::new(tmp.path().join("results"));
    for _ in 0..200 {
        if catalog.list_reports(&id).map(|f| f.len()).unwrap_or(0) == 2 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("reports for {id} never appeared");
}

#[tokio::test]
async fn analyze_rejects_bad_secret() {
    let tmp = TempDir::new().unwrap();
    let resp = app(&tmp)
        .oneshot(submit(json!({"secret_key": "nope", "urls": ["https://example.com"]})))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(resp).await, json!({"error": "Invalid secret key"}));
}

#[tokio::test]
async fn analyze_rejects_missing_urls() {
    let tmp = TempDir::new().unwrap();
    for body in [json!({"secret_key": SECRET}), json!({"secret_key": SECRET, "urls": []})] {
        let resp = app(&tmp).oneshot(submit(body)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(resp).await, json!({"error": "URLs not provided"}));
    }
}

#[tokio::test]
async fn index_lists_jobs_newest_first() {
    let tmp = TempDir::new().unwrap();
    seed(&tmp, "20240301101530", &[]);
    seed(&tmp, "20240302090000", &[]);

    let resp = app(&tmp).oneshot(get("/")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let html = String::from_utf8(body_bytes(resp).await).unwrap();
    let newer = html.find("03월 02일 09시 00분 결과").unwrap();
    let older = html.find("03월 01일 10시 15분 결과").unwrap();
    assert!(newer < older);
    assert!(html.contains("/delete/20240301101530"));
}

#[tokio::test]
async fn job_page_links_reports() {
    let tmp = TempDir::new().unwrap();
    seed(&tmp, "20240301101530", &["example.com_desktop.html"]);

    let resp = app(&tmp)
        .oneshot(get("/requests/20240301101530"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let html = String::from_utf8(body_bytes(resp).await).unwrap();
    assert!(html.contains("/report/20240301101530/example.com_desktop.html"));

    let missing = app(&tmp).oneshot(get("/requests/19990101000000")).await.unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn report_is_served_raw() {
    let tmp = TempDir::new().unwrap();
    seed(&tmp, "20240301101530", &["example.com_desktop.html"]);

    let resp = app(&tmp)
        .oneshot(get("/report/20240301101530/example.com_desktop.html"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers()[header::CONTENT_TYPE],
        "text/html; charset=utf-8"
    );
    assert_eq!(
        body_bytes(resp).await,
        b"<html>example.com_desktop.html</html>"
    );
}

#[tokio::test]
async fn report_traversal_is_rejected() {
    let tmp = TempDir::new().unwrap();
    seed(&tmp, "20240301101530", &["example.com_desktop.html"]);
    std::fs::write(tmp.path().join("outside.html"), "secret").unwrap();

    let resp = app(&tmp)
        .oneshot(get("/report/20240301101530/..%2F..%2Foutside.html"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn delete_redirects_then_reports_not_found() {
    let tmp = TempDir::new().unwrap();
    seed(&tmp, "20240301101530", &["example.com_desktop.html"]);
    let app = app(&tmp);

    let resp = app
        .clone()
        .oneshot(get("/delete/20240301101530"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(resp.headers()[header::LOCATION], "/");
    assert!(!tmp.path().join("results/20240301101530").exists());

    let again = app.oneshot(get("/delete/20240301101530")).await.unwrap();
    assert_eq!(again.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        body_json(again).await,
        json!({"error": "Request ID or file not found"})
    );
}

//! In-process bulk mutation tests.

#![allow(clippy::unwrap_used)]

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use rust_decimal::Decimal;
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

use haberdash_admin::state::AppState;
use haberdash_integration_tests::{MockPlatform, admin_config};

fn admin_app(platform: &MockPlatform) -> Router {
    let backup_dir = std::env::temp_dir().join(format!("haberdash-it-{}", Uuid::new_v4()));
    let state = AppState::new(admin_config(&platform.url(), backup_dir));
    haberdash_admin::routes::routes().with_state(state)
}

async fn request(app: &Router, method: &str, path: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder()
        .method(method)
        .uri(path)
        .header("content-type", "application/json");

    let request = match body {
        Some(body) => builder.body(Body::from(body.to_string())).unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn test_commit_requires_backup_then_succeeds() {
    let platform = MockPlatform::start().await;
    let ids: Vec<Uuid> = (0..3)
        .map(|i| platform.add_product(&format!("Linen Blazer {i}"), Decimal::new(22000, 2)))
        .collect();
    let app = admin_app(&platform);

    // Select all three and halve their prices.
    let (status, _) = request(&app, "POST", "/products/bulk/select", Some(json!({ "ids": ids }))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = request(
        &app,
        "POST",
        "/products/bulk/apply",
        Some(json!({ "price": { "mode": "adjust_percent", "value": "-50" } })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["applied_to"], 3);

    // Commit is refused outright before a backup exists.
    let (status, body) = request(&app, "POST", "/products/bulk/commit", None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "backup_required");
    assert_eq!(platform.update_calls(), 0);

    // Back up, then the same commit goes through.
    let (status, body) = request(&app, "POST", "/products/bulk/backup", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["kind"], "platform_table");
    assert_eq!(platform.backup_inserts(), 1);

    let (status, body) = request(&app, "POST", "/products/bulk/commit", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["succeeded"].as_array().unwrap().len(), 3);
    assert_eq!(platform.update_calls(), 3);

    // Clean run: nothing left staged or selected.
    let (_, body) = request(&app, "GET", "/products/bulk", None).await;
    assert_eq!(body["staged"], 0);
    assert_eq!(body["selected"], 0);
}

#[tokio::test]
async fn test_partial_failure_reported_per_id_and_kept_staged() {
    let platform = MockPlatform::start().await;
    let ids: Vec<Uuid> = (0..5)
        .map(|i| platform.add_product(&format!("Oxford Shirt {i}"), Decimal::new(4500, 2)))
        .collect();
    let failing = ids[2];
    platform.fail_updates_for(failing);
    let app = admin_app(&platform);

    request(&app, "POST", "/products/bulk/select", Some(json!({ "ids": ids }))).await;
    request(
        &app,
        "POST",
        "/products/bulk/apply",
        Some(json!({ "category": "Clearance" })),
    )
    .await;
    request(&app, "POST", "/products/bulk/backup", None).await;

    let (status, body) = request(&app, "POST", "/products/bulk/commit", None).await;

    // Exactly N-1 successes and the one named failure.
    assert_eq!(status, StatusCode::MULTI_STATUS);
    assert_eq!(body["succeeded"].as_array().unwrap().len(), 4);
    let failed = body["failed"].as_array().unwrap();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0]["id"], json!(failing));
    assert_eq!(platform.update_calls(), 5);

    // The failed id stays staged for a selective retry.
    let (_, body) = request(&app, "GET", "/products/bulk", None).await;
    assert_eq!(body["staged"], 1);
}

#[tokio::test]
async fn test_csv_export_and_import_round_trip() {
    let platform = MockPlatform::start().await;
    platform.add_product("Herringbone Vest", Decimal::new(8900, 2));
    let app = admin_app(&platform);

    // Export the catalog.
    let export_request = Request::builder()
        .method("GET")
        .uri("/products/export.csv")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(export_request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .headers()
            .get("content-type")
            .unwrap()
            .to_str()
            .unwrap()
            .starts_with("text/csv")
    );
    let csv = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let csv = String::from_utf8(csv.to_vec()).unwrap();
    assert!(csv.contains("Herringbone Vest"));

    // Import it back with one malformed row appended.
    let mut tampered = csv.clone();
    tampered.push_str("\"not-a-uuid\",\"x\",\"\",\"9.99\",\"\",\"\",\"active\"\n");

    let import_request = Request::builder()
        .method("POST")
        .uri("/products/import")
        .header("content-type", "text/csv")
        .body(Body::from(tampered))
        .unwrap();
    let response = app.clone().oneshot(import_request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let summary: Value = serde_json::from_slice(&bytes).unwrap();

    // The good row stages; the malformed one is skipped, not fatal.
    assert_eq!(summary["staged"], 1);
    assert_eq!(summary["skipped"], 1);

    let (_, body) = request(&app, "GET", "/products/bulk", None).await;
    assert_eq!(body["staged"], 1);
}

#[tokio::test]
async fn test_backup_falls_back_to_local_export() {
    let platform = MockPlatform::start().await;
    platform.add_product("Wool Overcoat", Decimal::new(39900, 2));
    platform.fail_backups();
    let app = admin_app(&platform);

    let (status, body) = request(&app, "POST", "/products/bulk/backup", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["kind"], "local_export");
    let path = body["path"].as_str().unwrap();
    assert!(path.contains("products_backup_"));
    tokio::fs::remove_file(path).await.unwrap();
}

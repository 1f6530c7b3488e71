//! In-process checkout submission tests.
//!
//! The real checkout router runs against an in-process mock platform;
//! no external services are required.

#![allow(clippy::unwrap_used)]

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

use haberdash_checkout::state::AppState;
use haberdash_integration_tests::{MockPlatform, MockVariant, checkout_config};

fn checkout_app(platform: &MockPlatform) -> Router {
    let state = AppState::new(checkout_config(&platform.url()));
    haberdash_checkout::routes::routes().with_state(state)
}

/// POST a JSON body, tagging the request with a caller IP for the rate
/// limiter.
async fn post_json(app: &Router, path: &str, ip: &str, body: &Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(path)
        .header("content-type", "application/json")
        .header("x-forwarded-for", ip)
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

fn submission(variant_id: Uuid, quantity: u32, remembered: &str) -> Value {
    json!({
        "items": [{
            "product_id": Uuid::new_v4(),
            "variant_id": variant_id,
            "quantity": quantity,
            "unit_price": remembered,
        }],
        "contact": {
            "email": "shopper@example.com",
            "first_name": "Avery",
            "last_name": "Quinn",
            "address_line1": "12 Canal St",
            "city": "Kalamazoo",
            "state": "MI",
            "postal_code": "49007",
            "country": "US"
        }
    })
}

fn in_stock_variant(price: &str, available: i64) -> MockVariant {
    MockVariant {
        product_id: Uuid::new_v4(),
        price: price.parse::<Decimal>().unwrap(),
        available,
        active: true,
    }
}

#[tokio::test]
async fn test_small_drift_submits_and_returns_session_url() {
    let platform = MockPlatform::start().await;
    // Live price 101.00 vs remembered 100.00: 1% drift, tolerated.
    let variant_id = platform.add_variant(in_stock_variant("101.00", 10));
    let app = checkout_app(&platform);

    let (status, body) = post_json(
        &app,
        "/checkout",
        "10.1.0.1",
        &submission(variant_id, 2, "100.00"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["url"].as_str().unwrap().starts_with("https://pay.example.com/"));
    assert_eq!(platform.session_calls(), 1);
}

#[tokio::test]
async fn test_large_drift_blocks_submission() {
    let platform = MockPlatform::start().await;
    // Live price 110.00 vs remembered 100.00: 10% drift, blocked.
    let variant_id = platform.add_variant(in_stock_variant("110.00", 10));
    let app = checkout_app(&platform);

    let (status, body) = post_json(
        &app,
        "/checkout",
        "10.1.0.2",
        &submission(variant_id, 2, "100.00"),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "price_drift");
    assert_eq!(platform.session_calls(), 0);
}

#[tokio::test]
async fn test_insufficient_inventory_blocks_submission() {
    let platform = MockPlatform::start().await;
    let variant_id = platform.add_variant(in_stock_variant("100.00", 2));
    let app = checkout_app(&platform);

    let (status, body) = post_json(
        &app,
        "/checkout",
        "10.1.0.3",
        &submission(variant_id, 5, "100.00"),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "insufficient_inventory");
    assert_eq!(platform.session_calls(), 0);
}

#[tokio::test]
async fn test_unknown_variant_rejected() {
    let platform = MockPlatform::start().await;
    let app = checkout_app(&platform);

    let (status, body) = post_json(
        &app,
        "/checkout",
        "10.1.0.4",
        &submission(Uuid::new_v4(), 1, "100.00"),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "unknown_variant");
}

#[tokio::test]
async fn test_invalid_form_reports_every_field() {
    let platform = MockPlatform::start().await;
    let variant_id = platform.add_variant(in_stock_variant("100.00", 10));
    let app = checkout_app(&platform);

    let mut body = submission(variant_id, 1, "100.00");
    body["contact"] = json!({
        "email": "not-an-email",
        "first_name": "",
        "last_name": "",
        "address_line1": "",
        "city": "",
        "state": "",
        "postal_code": "",
    });

    let (status, response) = post_json(&app, "/checkout", "10.1.0.5", &body).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response["error"], "invalid_form");
    // All seven invalid fields come back at once.
    assert_eq!(response["fields"].as_array().unwrap().len(), 7);
    assert_eq!(platform.session_calls(), 0);
}

#[tokio::test]
async fn test_expired_cart_rejected() {
    let platform = MockPlatform::start().await;
    let variant_id = platform.add_variant(in_stock_variant("100.00", 10));
    let app = checkout_app(&platform);

    let mut body = submission(variant_id, 1, "100.00");
    body["opened_at"] = json!((Utc::now() - Duration::minutes(31)).to_rfc3339());

    let (status, response) = post_json(&app, "/checkout", "10.1.0.6", &body).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(response["error"], "cart_expired");
    assert_eq!(platform.session_calls(), 0);
}

#[tokio::test]
async fn test_rate_limit_trips_within_burst() {
    let platform = MockPlatform::start().await;
    let variant_id = platform.add_variant(in_stock_variant("100.00", 100));
    let app = checkout_app(&platform);

    let body = submission(variant_id, 1, "100.00");
    let mut saw_429 = false;

    // The checkout limiter allows a burst of 5 from one IP; a rapid
    // volley from the same address must hit 429 well before 15.
    for _ in 0..15 {
        let (status, _) = post_json(&app, "/checkout", "10.9.9.9", &body).await;
        if status == StatusCode::TOO_MANY_REQUESTS {
            saw_429 = true;
            break;
        }
    }

    assert!(saw_429, "rate limit never tripped");
}

//! Integration test support for Haberdash.
//!
//! # Test Categories
//!
//! - In-process tests: the real service routers run against
//!   [`MockPlatform`], an in-process commerce platform double listening
//!   on a loopback port. These run in any environment.
//! - Live tests (`#[ignore]`-gated): probe deployed services via
//!   `CHECKOUT_BASE_URL` / `ADMIN_BASE_URL`.

#![allow(clippy::unwrap_used)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch, post},
};
use rust_decimal::Decimal;
use secrecy::SecretString;
use serde_json::{Value, json};
use uuid::Uuid;

use haberdash_admin::config::AdminConfig;
use haberdash_checkout::config::{CheckoutConfig, CheckoutPolicy};

/// Webhook signing secret used by in-process tests.
pub const TEST_WEBHOOK_SECRET: &str = "k9#mQ2$vX7!pL4@nR8*wF3^jB6&hT1%d";

/// Base URL for a deployed checkout service (live tests).
#[must_use]
pub fn checkout_base_url() -> String {
    std::env::var("CHECKOUT_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

/// Base URL for a deployed admin service (live tests).
#[must_use]
pub fn admin_base_url() -> String {
    std::env::var("ADMIN_BASE_URL").unwrap_or_else(|_| "http://localhost:3001".to_string())
}

/// A seeded variant on the mock platform.
#[derive(Debug, Clone)]
pub struct MockVariant {
    pub product_id: Uuid,
    pub price: Decimal,
    pub available: i64,
    pub active: bool,
}

#[derive(Default)]
struct MockState {
    variants: Mutex<HashMap<Uuid, MockVariant>>,
    products: Mutex<Vec<Value>>,
    failing_update: Mutex<Option<Uuid>>,
    fail_backups: AtomicBool,
    session_calls: AtomicUsize,
    update_calls: AtomicUsize,
    backup_inserts: AtomicUsize,
    paid_sessions: Mutex<Vec<String>>,
}

/// An in-process commerce platform double.
///
/// Serves the same REST surface the real platform does, on a loopback
/// port, with hooks to seed state and observe calls.
pub struct MockPlatform {
    state: Arc<MockState>,
    addr: SocketAddr,
}

impl MockPlatform {
    /// Bind a loopback port and start serving.
    pub async fn start() -> Self {
        let state = Arc::new(MockState::default());

        let app = Router::new()
            .route("/api/v1/variants/{id}", get(get_variant))
            .route("/api/v1/variants/{id}/inventory", get(get_inventory))
            .route("/api/v1/checkout/sessions", post(create_session))
            .route("/api/v1/orders/{session_id}/paid", post(mark_paid))
            .route("/api/v1/products", get(list_products))
            .route("/api/v1/products/{id}", patch(update_product))
            .route("/api/v1/products/backups", post(insert_backup))
            .route("/api/v1/changes", get(list_changes))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { state, addr }
    }

    /// The platform base URL (without the `/api/v1` suffix).
    #[must_use]
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Seed a variant; returns its id.
    pub fn add_variant(&self, variant: MockVariant) -> Uuid {
        let id = Uuid::new_v4();
        self.state.variants.lock().unwrap().insert(id, variant);
        id
    }

    /// Seed a catalog product row; returns its id.
    pub fn add_product(&self, name: &str, price: Decimal) -> Uuid {
        let id = Uuid::new_v4();
        self.state.products.lock().unwrap().push(json!({
            "id": id,
            "name": name,
            "price": price,
            "category": "Suits",
            "status": "active",
        }));
        id
    }

    /// Updates for this product id fail with a rejection.
    pub fn fail_updates_for(&self, id: Uuid) {
        *self.state.failing_update.lock().unwrap() = Some(id);
    }

    /// Backup inserts fail, forcing the local-export fallback.
    pub fn fail_backups(&self) {
        self.state.fail_backups.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn session_calls(&self) -> usize {
        self.state.session_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn update_calls(&self) -> usize {
        self.state.update_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn backup_inserts(&self) -> usize {
        self.state.backup_inserts.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn paid_sessions(&self) -> Vec<String> {
        self.state.paid_sessions.lock().unwrap().clone()
    }
}

/// A checkout service config pointed at the mock platform.
#[must_use]
pub fn checkout_config(platform_url: &str) -> CheckoutConfig {
    CheckoutConfig {
        host: "127.0.0.1".parse().unwrap(),
        port: 0,
        base_url: "http://localhost:3000".to_string(),
        platform: haberdash_checkout::config::PlatformConfig {
            url: platform_url.to_string(),
            api_version: "v1".to_string(),
            service_key: SecretString::from("test-service-key"),
        },
        policy: CheckoutPolicy::default(),
        webhook_secret: SecretString::from(TEST_WEBHOOK_SECRET),
        sentry_dsn: None,
    }
}

/// An admin service config pointed at the mock platform.
#[must_use]
pub fn admin_config(platform_url: &str, backup_export_dir: PathBuf) -> AdminConfig {
    AdminConfig {
        host: "127.0.0.1".parse().unwrap(),
        port: 0,
        platform: haberdash_admin::config::PlatformConfig {
            url: platform_url.to_string(),
            api_version: "v1".to_string(),
            service_key: SecretString::from("test-service-key"),
        },
        currency: haberdash_core::CurrencyCode::USD,
        backup_export_dir,
        change_feed_interval: std::time::Duration::from_secs(60),
        sentry_dsn: None,
    }
}

// =============================================================================
// Mock platform handlers
// =============================================================================

async fn get_variant(State(state): State<Arc<MockState>>, Path(id): Path<Uuid>) -> Response {
    let variants = state.variants.lock().unwrap();
    let Some(variant) = variants.get(&id) else {
        return (StatusCode::NOT_FOUND, Json(json!({ "error": "variant not found" })))
            .into_response();
    };

    let status = if variant.active { "active" } else { "archived" };
    Json(json!({
        "id": id,
        "price": variant.price,
        "processor_price_id": "price_mock_1",
        "product": {
            "id": variant.product_id,
            "name": "Midnight Navy Two-Piece Suit",
            "status": status,
        },
    }))
    .into_response()
}

async fn get_inventory(State(state): State<Arc<MockState>>, Path(id): Path<Uuid>) -> Response {
    let variants = state.variants.lock().unwrap();
    let Some(variant) = variants.get(&id) else {
        return (StatusCode::NOT_FOUND, Json(json!({ "error": "variant not found" })))
            .into_response();
    };

    Json(json!({ "available": variant.available })).into_response()
}

async fn create_session(State(state): State<Arc<MockState>>, Json(_body): Json<Value>) -> Response {
    let n = state.session_calls.fetch_add(1, Ordering::SeqCst) + 1;
    Json(json!({
        "session_id": format!("cs_test_{n}"),
        "url": format!("https://pay.example.com/cs_test_{n}"),
    }))
    .into_response()
}

async fn mark_paid(State(state): State<Arc<MockState>>, Path(session_id): Path<String>) -> Response {
    state.paid_sessions.lock().unwrap().push(session_id);
    Json(json!({})).into_response()
}

async fn list_products(State(state): State<Arc<MockState>>) -> Response {
    Json(state.products.lock().unwrap().clone()).into_response()
}

async fn update_product(
    State(state): State<Arc<MockState>>,
    Path(id): Path<Uuid>,
    Json(_patch): Json<Value>,
) -> Response {
    state.update_calls.fetch_add(1, Ordering::SeqCst);

    if *state.failing_update.lock().unwrap() == Some(id) {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "error": "row locked by another writer" })),
        )
            .into_response();
    }

    Json(json!({})).into_response()
}

async fn insert_backup(State(state): State<Arc<MockState>>, Json(_body): Json<Value>) -> Response {
    if state.fail_backups.load(Ordering::SeqCst) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "backup table missing" })),
        )
            .into_response();
    }

    state.backup_inserts.fetch_add(1, Ordering::SeqCst);
    Json(json!({})).into_response()
}

async fn list_changes(State(_state): State<Arc<MockState>>) -> Response {
    Json(json!([])).into_response()
}

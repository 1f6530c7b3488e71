//! Route definitions for the admin service.

pub mod bulk;
pub mod products;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Build the service router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(products::list))
        .route("/products/export.csv", get(products::export_csv))
        .route("/products/import", post(products::import_csv))
        .route("/products/bulk", get(bulk::workspace))
        .route("/products/bulk/select", post(bulk::select))
        .route("/products/bulk/stage", post(bulk::stage))
        .route("/products/bulk/apply", post(bulk::apply))
        .route("/products/bulk/backup", post(bulk::backup))
        .route("/products/bulk/commit", post(bulk::commit))
}

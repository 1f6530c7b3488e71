//! Product listing, CSV export, and CSV import handlers.

use axum::{
    Json,
    extract::{Query, State},
    http::header,
    response::IntoResponse,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use haberdash_core::{Price, ProductId, ProductStatus};

use crate::csvio;
use crate::error::Result;
use crate::platform::AdminPlatformApi;
use crate::platform::types::ProductRow;
use crate::state::AppState;

/// Query parameters for the product list.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub q: Option<String>,
}

/// A product as rendered for the editor grid.
#[derive(Debug, Serialize)]
pub struct ProductView {
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    /// Price pre-formatted in the store currency (e.g. `$249.00`).
    pub price_display: String,
    pub category: Option<String>,
    pub image_url: Option<String>,
    pub status: ProductStatus,
}

impl ProductView {
    fn from_row(row: ProductRow, currency: haberdash_core::CurrencyCode) -> Self {
        Self {
            price_display: Price::new(row.price, currency).display(),
            id: row.id,
            name: row.name,
            description: row.description,
            price: row.price,
            category: row.category,
            image_url: row.image_url,
            status: row.status,
        }
    }
}

/// GET /products - list products for the editor grid.
#[instrument(skip(state))]
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<ProductView>>> {
    let rows = state
        .platform()
        .list_products(params.q.as_deref())
        .await?;

    let currency = state.config().currency;
    let views = rows
        .into_iter()
        .map(|row| ProductView::from_row(row, currency))
        .collect();

    Ok(Json(views))
}

/// GET /products/export.csv - download the catalog as CSV.
///
/// Operators use this both as a working export and as a manual recovery
/// artifact alongside the backup gate.
#[instrument(skip(state))]
pub async fn export_csv(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let rows = state.platform().list_products(None).await?;
    let body = csvio::export_products(&rows);

    tracing::info!(rows = rows.len(), "Catalog exported to CSV");

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"products_export.csv\"",
            ),
        ],
        body,
    ))
}

/// Import result summary.
#[derive(Debug, Serialize)]
pub struct ImportSummary {
    /// Records staged into the pending change set.
    pub staged: usize,
    /// Malformed rows dropped.
    pub skipped: usize,
}

/// POST /products/import - stage edits from an uploaded CSV.
///
/// Imported rows land in the pending change set like any other staged
/// edit; the backup gate and commit flow still apply before anything is
/// written.
#[instrument(skip(state, body))]
pub async fn import_csv(
    State(state): State<AppState>,
    body: String,
) -> Json<ImportSummary> {
    let outcome = csvio::parse_import(&body);

    let staged = outcome.rows.len();
    let mut workspace = state.workspace().lock().await;
    for row in outcome.rows {
        workspace.changes.stage(row.id, row.patch);
    }

    if outcome.skipped > 0 {
        tracing::warn!(skipped = outcome.skipped, "Import dropped malformed rows");
    }

    Json(ImportSummary {
        staged,
        skipped: outcome.skipped,
    })
}

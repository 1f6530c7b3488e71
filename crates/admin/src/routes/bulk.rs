//! Bulk editing handlers: selection, staging, operators, backup, commit.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::instrument;

use haberdash_core::ProductId;

use crate::bulk::{
    self, BackupArtifact, CommitError, PriceOperator, apply_category, apply_price_operator,
    price_index,
};
use crate::error::Result;
use crate::platform::AdminPlatformApi;
use crate::platform::types::ProductPatch;
use crate::state::AppState;

/// Replace-selection request body.
#[derive(Debug, Deserialize)]
pub struct SelectInput {
    pub ids: Vec<ProductId>,
}

/// Single-record staging request body.
#[derive(Debug, Deserialize)]
pub struct StageInput {
    pub id: ProductId,
    #[serde(flatten)]
    pub patch: ProductPatch,
}

/// Bulk operator request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyInput {
    /// A price operation over the selection.
    Price(PriceOperator),
    /// Overwrite the category for the selection.
    Category(String),
}

/// Current workspace summary.
#[derive(Debug, Serialize)]
pub struct WorkspaceSummary {
    pub selected: usize,
    pub staged: usize,
    pub backup_confirmed: bool,
}

/// GET /products/bulk - summarize the editing workspace.
#[instrument(skip(state))]
pub async fn workspace(State(state): State<AppState>) -> Json<WorkspaceSummary> {
    let workspace = state.workspace().lock().await;
    Json(WorkspaceSummary {
        selected: workspace.selection.len(),
        staged: workspace.changes.len(),
        backup_confirmed: state.backup_gate().is_confirmed(),
    })
}

/// POST /products/bulk/select - rebuild the selection from checkboxes.
#[instrument(skip(state, input), fields(ids = input.ids.len()))]
pub async fn select(
    State(state): State<AppState>,
    Json(input): Json<SelectInput>,
) -> Json<WorkspaceSummary> {
    let mut workspace = state.workspace().lock().await;
    workspace.selection.replace(input.ids);

    Json(WorkspaceSummary {
        selected: workspace.selection.len(),
        staged: workspace.changes.len(),
        backup_confirmed: state.backup_gate().is_confirmed(),
    })
}

/// POST /products/bulk/stage - stage a single-record field edit.
#[instrument(skip(state, input), fields(product_id = %input.id))]
pub async fn stage(
    State(state): State<AppState>,
    Json(input): Json<StageInput>,
) -> Response {
    if input.patch.is_empty() {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "error": "empty_patch", "message": "No fields to stage" })),
        )
            .into_response();
    }

    let mut workspace = state.workspace().lock().await;
    workspace.changes.stage(input.id, input.patch);

    Json(json!({ "staged": workspace.changes.len() })).into_response()
}

/// POST /products/bulk/apply - fan an operator out over the selection.
#[instrument(skip(state, input))]
pub async fn apply(
    State(state): State<AppState>,
    Json(input): Json<ApplyInput>,
) -> Result<Response> {
    let mut workspace = state.workspace().lock().await;
    let workspace = &mut *workspace;

    if workspace.selection.is_empty() {
        return Ok((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "error": "empty_selection", "message": "Select records first" })),
        )
            .into_response());
    }

    let staged = match input {
        ApplyInput::Price(operator) => {
            // Operators derive from current prices, so load the rows.
            let rows = state.platform().list_products(None).await?;
            let prices = price_index(&rows);
            apply_price_operator(&mut workspace.changes, &workspace.selection, &prices, operator)
        }
        ApplyInput::Category(category) => {
            apply_category(&mut workspace.changes, &workspace.selection, &category)
        }
    };

    Ok(Json(json!({
        "applied_to": staged,
        "staged": workspace.changes.len(),
    }))
    .into_response())
}

/// POST /products/bulk/backup - produce a recovery artifact, opening the
/// gate for commit.
#[instrument(skip(state))]
pub async fn backup(State(state): State<AppState>) -> Result<Json<BackupArtifact>> {
    let artifact = bulk::create_backup(
        state.platform(),
        state.backup_gate(),
        &state.config().backup_export_dir,
    )
    .await?;

    Ok(Json(artifact))
}

/// POST /products/bulk/commit - drain staged edits in batches.
///
/// Partial failure is a surfaced outcome, not an error: the response
/// lists exactly which ids failed (207 Multi-Status) so the operator can
/// re-stage just those. The selection is cleared only on a clean run.
#[instrument(skip(state))]
pub async fn commit(State(state): State<AppState>) -> Response {
    let mut workspace = state.workspace().lock().await;
    let workspace = &mut *workspace;

    let result = bulk::commit(
        state.platform(),
        &mut workspace.changes,
        state.backup_gate(),
        |progress| {
            tracing::info!(progress = %format!("{:.0}%", progress * 100.0), "Bulk commit progress");
        },
    )
    .await;

    let report = match result {
        Ok(report) => report,
        Err(e @ CommitError::BackupRequired) => {
            return (
                StatusCode::CONFLICT,
                Json(json!({ "error": "backup_required", "message": e.to_string() })),
            )
                .into_response();
        }
        Err(e @ CommitError::NothingStaged) => {
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "error": "nothing_staged", "message": e.to_string() })),
            )
                .into_response();
        }
    };

    // Fresh rows for whoever reloads the grid next.
    state.platform().invalidate_products().await;

    let status = if report.is_clean() {
        workspace.selection.clear();
        StatusCode::OK
    } else {
        StatusCode::MULTI_STATUS
    };

    (status, Json(report)).into_response()
}

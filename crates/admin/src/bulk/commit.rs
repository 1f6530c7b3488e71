//! Committing staged edits in fixed-size batches.
//!
//! A commit is explicitly not transactional: a failed id never aborts
//! the run, outcomes accumulate per id, and partial application is a
//! surfaced result rather than a hidden one. The backup gate is the sole
//! safeguard against irrecoverable mistakes.

use serde::Serialize;
use thiserror::Error;
use tracing::instrument;

use haberdash_core::ProductId;

use crate::platform::AdminPlatformApi;

use super::backup::BackupGate;
use super::changes::PendingChanges;

/// Fixed batch size matching the platform's comfortable update fan-out.
pub const BATCH_SIZE: usize = 10;

/// Commit refused before any network call.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommitError {
    /// No backup artifact exists for this session.
    #[error("create a backup before committing bulk changes")]
    BackupRequired,

    /// Nothing staged to commit.
    #[error("no staged changes to commit")]
    NothingStaged,
}

/// One id whose update failed, with the platform's reason.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FailedUpdate {
    pub id: ProductId,
    pub message: String,
}

/// Per-id outcomes of a commit run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CommitReport {
    pub succeeded: Vec<ProductId>,
    pub failed: Vec<FailedUpdate>,
}

impl CommitReport {
    /// Whether every staged update went through.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Commit staged edits with the standard batch size.
///
/// # Errors
///
/// Fails fast with [`CommitError`] if the backup gate is closed or
/// nothing is staged; in both cases no network call is made.
pub async fn commit<P: AdminPlatformApi>(
    platform: &P,
    changes: &mut PendingChanges,
    gate: &BackupGate,
    on_progress: impl FnMut(f64),
) -> Result<CommitReport, CommitError> {
    commit_in_batches(platform, changes, gate, BATCH_SIZE, on_progress).await
}

/// Commit staged edits, `batch_size` ids per batch.
///
/// Batches run strictly in id order; within a batch each id's update is
/// issued sequentially. After every batch the progress callback receives
/// the completed fraction, which is monotonically non-decreasing and
/// reaches 1.0 on the final batch.
///
/// Succeeded ids are removed from the pending set; failed ids stay
/// staged so the operator can re-commit just those.
///
/// # Errors
///
/// See [`commit`].
#[instrument(skip(platform, changes, gate, on_progress), fields(staged = changes.len()))]
pub async fn commit_in_batches<P: AdminPlatformApi>(
    platform: &P,
    changes: &mut PendingChanges,
    gate: &BackupGate,
    batch_size: usize,
    mut on_progress: impl FnMut(f64),
) -> Result<CommitReport, CommitError> {
    if !gate.is_confirmed() {
        return Err(CommitError::BackupRequired);
    }

    let entries = changes.snapshot();
    if entries.is_empty() {
        return Err(CommitError::NothingStaged);
    }

    let batch_size = batch_size.max(1);
    let total = entries.len();
    let mut report = CommitReport::default();
    let mut processed = 0usize;

    for batch in entries.chunks(batch_size) {
        for (id, patch) in batch {
            match platform.update_product(*id, patch).await {
                Ok(()) => report.succeeded.push(*id),
                Err(e) => {
                    tracing::warn!(product_id = %id, error = %e, "Bulk update failed");
                    report.failed.push(FailedUpdate {
                        id: *id,
                        message: e.to_string(),
                    });
                }
            }
            processed += 1;
        }

        #[allow(clippy::cast_precision_loss)] // Batch counts stay far below f64 precision
        on_progress(processed as f64 / total as f64);
    }

    for id in &report.succeeded {
        changes.remove(*id);
    }

    tracing::info!(
        succeeded = report.succeeded.len(),
        failed = report.failed.len(),
        "Bulk commit completed"
    );

    Ok(report)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;
    use uuid::Uuid;

    use super::*;
    use crate::bulk::testing::MockAdminPlatform;
    use crate::platform::types::ProductPatch;

    fn staged(n: usize) -> (PendingChanges, Vec<ProductId>) {
        let mut changes = PendingChanges::default();
        let mut ids = Vec::new();
        for _ in 0..n {
            let id = ProductId::new(Uuid::new_v4());
            changes.stage(
                id,
                ProductPatch {
                    price: Some(Decimal::new(5000, 2)),
                    ..ProductPatch::default()
                },
            );
            ids.push(id);
        }
        ids.sort();
        (changes, ids)
    }

    fn open_gate() -> BackupGate {
        let gate = BackupGate::default();
        gate.confirm();
        gate
    }

    #[tokio::test]
    async fn test_backup_required_makes_no_network_call() {
        let platform = MockAdminPlatform::new();
        let (mut changes, _ids) = staged(3);
        let gate = BackupGate::default();

        let err = commit(&platform, &mut changes, &gate, |_| {})
            .await
            .unwrap_err();

        assert_eq!(err, CommitError::BackupRequired);
        assert_eq!(platform.update_calls(), 0);
        assert_eq!(changes.len(), 3);

        // Opening the gate and retrying succeeds.
        gate.confirm();
        let report = commit(&platform, &mut changes, &gate, |_| {})
            .await
            .unwrap();
        assert_eq!(report.succeeded.len(), 3);
        assert!(changes.is_empty());
    }

    #[tokio::test]
    async fn test_nothing_staged_is_an_error() {
        let platform = MockAdminPlatform::new();
        let mut changes = PendingChanges::default();

        let err = commit(&platform, &mut changes, &open_gate(), |_| {})
            .await
            .unwrap_err();
        assert_eq!(err, CommitError::NothingStaged);
        assert_eq!(platform.update_calls(), 0);
    }

    #[tokio::test]
    async fn test_one_failure_does_not_abort_remaining_batches() {
        let (mut changes, ids) = staged(25);
        let failing = ids[7];
        let platform = MockAdminPlatform::new().with_failing_update(failing);

        let report = commit(&platform, &mut changes, &open_gate(), |_| {})
            .await
            .unwrap();

        // Exactly N-1 successes and 1 named failure.
        assert_eq!(report.succeeded.len(), 24);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].id, failing);
        assert!(!report.is_clean());

        // Later batches still ran.
        assert_eq!(platform.update_calls(), 25);

        // The failed id stays staged for a selective retry.
        assert_eq!(changes.len(), 1);
        assert!(changes.get(failing).is_some());
    }

    #[tokio::test]
    async fn test_progress_reports_per_batch() {
        let (mut changes, _ids) = staged(2);
        let platform = MockAdminPlatform::new();

        let mut progress = Vec::new();
        commit_in_batches(&platform, &mut changes, &open_gate(), 1, |p| {
            progress.push(p);
        })
        .await
        .unwrap();

        // Batch size 1 over two ids: 50% then 100%.
        assert_eq!(progress, vec![0.5, 1.0]);
    }

    #[tokio::test]
    async fn test_progress_is_monotonic_with_standard_batching() {
        let (mut changes, _ids) = staged(23);
        let platform = MockAdminPlatform::new();

        let mut progress = Vec::new();
        commit(&platform, &mut changes, &open_gate(), |p| progress.push(p))
            .await
            .unwrap();

        assert_eq!(progress.len(), 3); // 10 + 10 + 3
        assert!(progress.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(progress.last().copied(), Some(1.0));
    }

    #[tokio::test]
    async fn test_updates_issue_in_id_order() {
        let (mut changes, ids) = staged(12);
        let platform = MockAdminPlatform::new();

        commit(&platform, &mut changes, &open_gate(), |_| {})
            .await
            .unwrap();

        assert_eq!(platform.updated_ids(), ids);
    }
}

//! The bulk mutation flow: stage edits to many records, then commit them
//! safely.
//!
//! - [`changes`] - the pending change set and checkbox selection
//! - [`operators`] - pure bulk operators fanning out over the selection
//! - [`backup`] - the gate requiring a recovery artifact before writes
//! - [`commit`] - batched, non-transactional commit with per-id outcomes

pub mod backup;
pub mod changes;
pub mod commit;
pub mod operators;

pub use backup::{BackupArtifact, BackupError, BackupGate, create_backup};
pub use changes::{PendingChanges, Selection};
pub use commit::{BATCH_SIZE, CommitError, CommitReport, FailedUpdate, commit};
pub use operators::{PriceOperator, apply_category, apply_price_operator, price_index};

/// The operator's editing workspace: what is selected and what is staged.
///
/// One workspace per process - the admin console is a single-operator
/// surface behind the private network, like the rest of this service.
#[derive(Debug, Default)]
pub struct BulkWorkspace {
    pub selection: Selection,
    pub changes: PendingChanges,
}

#[cfg(test)]
pub mod testing;

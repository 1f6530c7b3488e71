//! Staged-but-not-yet-committed edits.

use std::collections::{BTreeMap, HashSet};

use haberdash_core::ProductId;

use crate::platform::types::ProductPatch;

/// The set of record ids the operator has checked for bulk actions.
///
/// Rebuilt wholesale from UI events; nothing else owns it.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    ids: HashSet<ProductId>,
}

impl Selection {
    /// Replace the selection with the given ids.
    pub fn replace(&mut self, ids: impl IntoIterator<Item = ProductId>) {
        self.ids = ids.into_iter().collect();
    }

    /// Iterate the selected ids (unordered).
    pub fn iter(&self) -> impl Iterator<Item = ProductId> + '_ {
        self.ids.iter().copied()
    }

    /// Number of selected records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether nothing is selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Drop every selected id.
    pub fn clear(&mut self) {
        self.ids.clear();
    }
}

/// Staged per-record field edits, keyed by record id.
///
/// Each id appears at most once; staging a field that is already staged
/// for that id overwrites it, while untouched fields survive. Iteration
/// is in id order, which keeps commit batches deterministic.
#[derive(Debug, Clone, Default)]
pub struct PendingChanges {
    entries: BTreeMap<ProductId, ProductPatch>,
}

impl PendingChanges {
    /// Stage a partial update for one record, merging per field with
    /// anything already staged for it.
    ///
    /// Staging the same patch twice leaves the entry identical to
    /// staging it once. An empty patch stages nothing.
    pub fn stage(&mut self, id: ProductId, patch: ProductPatch) {
        if patch.is_empty() {
            return;
        }

        self.entries.entry(id).or_default().merge(patch);
    }

    /// The staged patch for a record, if any.
    #[must_use]
    pub fn get(&self, id: ProductId) -> Option<&ProductPatch> {
        self.entries.get(&id)
    }

    /// Iterate staged entries in id order.
    pub fn iter(&self) -> impl Iterator<Item = (ProductId, &ProductPatch)> {
        self.entries.iter().map(|(id, patch)| (*id, patch))
    }

    /// Snapshot the staged entries in id order, for draining by commit.
    #[must_use]
    pub fn snapshot(&self) -> Vec<(ProductId, ProductPatch)> {
        self.entries
            .iter()
            .map(|(id, patch)| (*id, patch.clone()))
            .collect()
    }

    /// Remove the entry for a record (after its update succeeded).
    pub fn remove(&mut self, id: ProductId) {
        self.entries.remove(&id);
    }

    /// Number of records with staged edits.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is staged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Discard every staged edit.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

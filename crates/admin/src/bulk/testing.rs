//! Test doubles shared by the bulk and events tests.

#![allow(clippy::unwrap_used)]

use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use rust_decimal::Decimal;
use uuid::Uuid;

use haberdash_core::{ProductId, ProductStatus};

use crate::platform::types::{ChangeEvent, ProductPatch, ProductRow};
use crate::platform::{AdminPlatformApi, AdminPlatformError};

/// In-memory admin platform double with call counting.
pub struct MockAdminPlatform {
    products: Vec<ProductRow>,
    events: Vec<ChangeEvent>,
    failing_updates: HashSet<ProductId>,
    fail_backups: bool,
    update_calls: AtomicUsize,
    backup_inserts: AtomicUsize,
    updated_ids: Mutex<Vec<ProductId>>,
}

impl MockAdminPlatform {
    pub fn new() -> Self {
        Self {
            products: Vec::new(),
            events: Vec::new(),
            failing_updates: HashSet::new(),
            fail_backups: false,
            update_calls: AtomicUsize::new(0),
            backup_inserts: AtomicUsize::new(0),
            updated_ids: Mutex::new(Vec::new()),
        }
    }

    /// Seed `n` active products with synthetic names and prices.
    #[must_use]
    pub fn with_products(mut self, n: usize) -> Self {
        for i in 0..n {
            self.products.push(ProductRow {
                id: ProductId::new(Uuid::new_v4()),
                name: format!("Oxford Shirt {i}"),
                description: None,
                price: Decimal::new(4500 + i64::try_from(i).unwrap() * 100, 2),
                category: Some("Shirts".to_string()),
                image_url: None,
                status: ProductStatus::Active,
            });
        }
        self
    }

    /// Updates for this id fail with a rejection.
    #[must_use]
    pub fn with_failing_update(mut self, id: ProductId) -> Self {
        self.failing_updates.insert(id);
        self
    }

    /// Backup inserts fail, forcing the local-export fallback.
    #[must_use]
    pub fn with_failing_backups(mut self) -> Self {
        self.fail_backups = true;
        self
    }

    /// Seed audit-feed events.
    #[must_use]
    pub fn with_events(mut self, events: Vec<ChangeEvent>) -> Self {
        self.events = events;
        self
    }

    pub fn update_calls(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }

    pub fn backup_inserts(&self) -> usize {
        self.backup_inserts.load(Ordering::SeqCst)
    }

    pub fn updated_ids(&self) -> Vec<ProductId> {
        self.updated_ids.lock().unwrap().clone()
    }
}

impl AdminPlatformApi for MockAdminPlatform {
    async fn list_products(
        &self,
        _query: Option<&str>,
    ) -> Result<Vec<ProductRow>, AdminPlatformError> {
        Ok(self.products.clone())
    }

    async fn update_product(
        &self,
        id: ProductId,
        _patch: &ProductPatch,
    ) -> Result<(), AdminPlatformError> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        self.updated_ids.lock().unwrap().push(id);

        if self.failing_updates.contains(&id) {
            return Err(AdminPlatformError::Rejected(
                "row locked by another writer".to_string(),
            ));
        }
        Ok(())
    }

    async fn insert_backup(
        &self,
        _label: &str,
        _rows: &[ProductRow],
    ) -> Result<(), AdminPlatformError> {
        if self.fail_backups {
            return Err(AdminPlatformError::Status {
                status: 500,
                message: "backup table missing".to_string(),
            });
        }
        self.backup_inserts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn changes_since(&self, cursor: u64) -> Result<Vec<ChangeEvent>, AdminPlatformError> {
        Ok(self
            .events
            .iter()
            .filter(|e| e.cursor() > cursor)
            .cloned()
            .collect())
    }
}

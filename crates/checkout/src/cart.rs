//! Cart state for a single browsing session.
//!
//! Remembered unit prices are captured when a line is added and are
//! advisory only: submission re-reads live prices and inventory from the
//! platform before anything is charged.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use haberdash_core::{CartKey, ProductId, VariantId};

/// Errors that can occur when building cart state.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CartError {
    /// Line quantity must be at least one.
    #[error("quantity must be at least 1")]
    ZeroQuantity,
}

/// One selected line: a product, an optional variant, and a quantity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLine {
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    quantity: u32,
    /// Unit price shown when the item was added.
    pub unit_price: Decimal,
    pub customization: BTreeMap<String, String>,
}

impl CartLine {
    /// Create a cart line.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::ZeroQuantity`] if `quantity` is zero.
    pub fn new(
        product_id: ProductId,
        variant_id: Option<VariantId>,
        quantity: u32,
        unit_price: Decimal,
        customization: BTreeMap<String, String>,
    ) -> Result<Self, CartError> {
        if quantity == 0 {
            return Err(CartError::ZeroQuantity);
        }

        Ok(Self {
            product_id,
            variant_id,
            quantity,
            unit_price,
            customization,
        })
    }

    /// The line quantity, always >= 1.
    #[must_use]
    pub const fn quantity(&self) -> u32 {
        self.quantity
    }

    /// Line total at the remembered price.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// The cart held for the duration of a browsing session.
///
/// `opened_at` starts the soft-expiration window checked at submission;
/// `key` identifies the cart to the in-flight submission guard.
#[derive(Debug, Clone)]
pub struct Cart {
    key: CartKey,
    lines: Vec<CartLine>,
    opened_at: DateTime<Utc>,
}

impl Cart {
    /// Create an empty cart, opened now.
    #[must_use]
    pub fn new() -> Self {
        Self::with_opened_at(Utc::now())
    }

    /// Create an empty cart with an explicit open timestamp.
    #[must_use]
    pub fn with_opened_at(opened_at: DateTime<Utc>) -> Self {
        Self {
            key: CartKey::new(Uuid::new_v4()),
            lines: Vec::new(),
            opened_at,
        }
    }

    /// The cart's identity for in-flight tracking.
    #[must_use]
    pub const fn key(&self) -> CartKey {
        self.key
    }

    /// When the cart was opened.
    #[must_use]
    pub const fn opened_at(&self) -> DateTime<Utc> {
        self.opened_at
    }

    /// The cart lines in insertion order.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Add a line, merging with an existing line for the same product
    /// and variant by summing quantities (the remembered price of the
    /// first add wins).
    pub fn add(&mut self, line: CartLine) {
        if let Some(existing) = self
            .lines
            .iter_mut()
            .find(|l| l.product_id == line.product_id && l.variant_id == line.variant_id)
        {
            existing.quantity = existing.quantity.saturating_add(line.quantity);
            return;
        }

        self.lines.push(line);
    }

    /// Clear all lines. Called after a successful submission so that a
    /// back-navigation cannot resurrect a stale cart.
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Subtotal at remembered prices (display only).
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    /// Number of lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

impl Default for Cart {
    fn default() -> Self {
        Self::new()
    }
}

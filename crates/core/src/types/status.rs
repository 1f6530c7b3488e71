//! Status enums shared between the checkout and admin services.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a catalog product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    Active,
    Draft,
    Archived,
}

impl ProductStatus {
    /// Whether the product can currently be purchased.
    #[must_use]
    pub const fn is_sellable(&self) -> bool {
        matches!(self, Self::Active)
    }
}

/// Payment status of an order as reported by the processor webhook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Expired,
    Refunded,
}

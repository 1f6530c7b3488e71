//! Typed entities decoded at the platform API boundary.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use haberdash_core::{OrderId, PaymentStatus, ProductId, ProductStatus, VariantId};

/// A catalog product as the bulk editor sees it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductRow {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Current price in the store currency.
    pub price: Decimal,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    pub status: ProductStatus,
}

/// A partial field update for one product.
///
/// Only the populated fields travel on the wire; the platform leaves
/// everything else untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl ProductPatch {
    /// Whether the patch touches no fields at all.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.price.is_none()
            && self.category.is_none()
            && self.name.is_none()
            && self.image_url.is_none()
    }

    /// Overlay `other` onto `self`: fields populated in `other` replace
    /// the corresponding fields here, untouched fields survive.
    pub fn merge(&mut self, other: Self) {
        if other.price.is_some() {
            self.price = other.price;
        }
        if other.category.is_some() {
            self.category = other.category;
        }
        if other.name.is_some() {
            self.name = other.name;
        }
        if other.image_url.is_some() {
            self.image_url = other.image_url;
        }
    }
}

/// What happened to a record in the audit feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeOp {
    Insert,
    Update,
    Delete,
}

/// One typed event from the platform's audit feed, tagged by source table.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "table", rename_all = "snake_case")]
pub enum ChangeEvent {
    Inventory {
        cursor: u64,
        variant_id: VariantId,
        available: i64,
        occurred_at: DateTime<Utc>,
    },
    Orders {
        cursor: u64,
        order_id: OrderId,
        payment_status: PaymentStatus,
        occurred_at: DateTime<Utc>,
    },
    Products {
        cursor: u64,
        product_id: ProductId,
        op: ChangeOp,
        occurred_at: DateTime<Utc>,
    },
}

impl ChangeEvent {
    /// Feed position of this event; the poller resumes past it.
    #[must_use]
    pub const fn cursor(&self) -> u64 {
        match self {
            Self::Inventory { cursor, .. }
            | Self::Orders { cursor, .. }
            | Self::Products { cursor, .. } => *cursor,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_patch_merge_overlays_touched_fields_only() {
        let mut patch = ProductPatch {
            price: Some(Decimal::new(5000, 2)),
            category: Some("Suits".to_string()),
            ..ProductPatch::default()
        };

        patch.merge(ProductPatch {
            price: Some(Decimal::new(4500, 2)),
            ..ProductPatch::default()
        });

        assert_eq!(patch.price, Some(Decimal::new(4500, 2)));
        assert_eq!(patch.category.as_deref(), Some("Suits"));
    }

    #[test]
    fn test_patch_serializes_populated_fields_only() {
        let patch = ProductPatch {
            price: Some(Decimal::new(9999, 2)),
            ..ProductPatch::default()
        };

        let json = serde_json::to_string(&patch).unwrap();
        assert!(json.contains("price"));
        assert!(!json.contains("category"));
        assert!(!json.contains("image_url"));
    }

    #[test]
    fn test_change_event_decodes_by_table_tag() {
        let json = r#"{
            "table": "inventory",
            "cursor": 42,
            "variant_id": "0be9d2c6-5cb1-4f3e-9d28-3a1c6f6e7a01",
            "available": 0,
            "occurred_at": "2026-08-06T12:00:00Z"
        }"#;

        let event: ChangeEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.cursor(), 42);
        assert!(matches!(event, ChangeEvent::Inventory { available: 0, .. }));
    }
}

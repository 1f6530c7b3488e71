//! Typed entities decoded at the platform API boundary.
//!
//! Raw platform responses never travel past the client: every payload is
//! decoded into one of these structs (or rejected as malformed) before
//! the rest of the service sees it.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use haberdash_core::{CheckoutSessionId, ProductId, ProductStatus, VariantId};

/// A purchasable variant as reported by the platform, with its parent
/// product embedded.
#[derive(Debug, Clone, Deserialize)]
pub struct VariantRecord {
    pub id: VariantId,
    /// Live price in the store currency.
    pub price: Decimal,
    /// Price handle at the payment processor, when the variant has been
    /// synced there.
    pub processor_price_id: Option<String>,
    pub product: ProductSummary,
}

/// Display-level product data embedded in variant lookups.
///
/// Safe to cache: nothing here is re-verified at submission time.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductSummary {
    pub id: ProductId,
    pub name: String,
    pub status: ProductStatus,
}

/// Live inventory for a variant.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct InventoryLevel {
    pub available: i64,
}

/// One line of the cart snapshot sent to the session-creation function.
#[derive(Debug, Clone, Serialize)]
pub struct SessionLineItem {
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processor_price_id: Option<String>,
    pub quantity: u32,
    /// Unit price after revalidation (always the live price).
    pub unit_price: Decimal,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub customization: BTreeMap<String, String>,
}

/// Customer identity and shipping address forwarded to the processor.
#[derive(Debug, Clone, Serialize)]
pub struct CustomerDetails {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub address: Address,
}

/// A shipping address.
#[derive(Debug, Clone, Serialize)]
pub struct Address {
    pub line1: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
}

/// Request body for the platform's session-creation function.
#[derive(Debug, Clone, Serialize)]
pub struct SessionRequest {
    pub items: Vec<SessionLineItem>,
    pub customer_email: String,
    pub success_url: String,
    pub cancel_url: String,
    pub customer_details: CustomerDetails,
}

/// Response from the session-creation function.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionCreated {
    pub session_id: CheckoutSessionId,
    /// Hosted checkout URL the browser is redirected to.
    pub url: String,
}

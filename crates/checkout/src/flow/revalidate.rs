//! Cart revalidation against live platform state.
//!
//! Remembered prices and availability are never trusted at submission:
//! every variant-bearing line re-reads the live price and inventory
//! immediately before the session is created, because other shoppers and
//! operators mutate both concurrently.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::instrument;

use haberdash_core::{ProductId, VariantId};

use crate::cart::Cart;
use crate::config::CheckoutPolicy;
use crate::platform::types::SessionLineItem;
use crate::platform::{PlatformApi, PlatformError};

/// Why a cart cannot be submitted as-is.
///
/// Every variant names the offending item so the UI can point at it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CartRejection {
    /// The soft expiration window elapsed since the cart was opened.
    #[error("cart expired after {ttl_minutes} minutes, refresh and try again")]
    Expired { ttl_minutes: i64 },

    /// A referenced variant no longer exists on the platform.
    #[error("item is no longer available")]
    UnknownVariant { variant_id: VariantId },

    /// The parent product is no longer sellable.
    #[error("{product_name} is no longer available")]
    Unavailable {
        product_id: ProductId,
        product_name: String,
    },

    /// Requested quantity exceeds live availability.
    #[error("only {available} of {product_name} available (requested {requested})")]
    InsufficientInventory {
        variant_id: VariantId,
        product_name: String,
        requested: u32,
        available: i64,
    },

    /// Live price moved past the tolerance band since the item was added.
    #[error("price of {product_name} changed from {remembered} to {live}, please re-confirm")]
    PriceDrift {
        variant_id: VariantId,
        product_name: String,
        remembered: Decimal,
        live: Decimal,
    },
}

/// Revalidation failure: either a cart-specific rejection or an
/// infrastructure failure, folded into one type so callers have a single
/// failure path regardless of cause.
#[derive(Debug, Error)]
pub enum RevalidateError {
    #[error(transparent)]
    Rejected(CartRejection),
    #[error(transparent)]
    Platform(PlatformError),
}

impl From<CartRejection> for RevalidateError {
    fn from(rejection: CartRejection) -> Self {
        Self::Rejected(rejection)
    }
}

/// A cart line confirmed against live state and repriced to it.
#[derive(Debug, Clone)]
pub struct RepricedLine {
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    pub quantity: u32,
    /// The live unit price; within tolerance the line is silently
    /// repriced rather than rejected.
    pub unit_price: Decimal,
    pub processor_price_id: Option<String>,
    pub customization: std::collections::BTreeMap<String, String>,
}

impl RepricedLine {
    /// Convert into the wire shape for the session-creation function.
    #[must_use]
    pub fn into_session_item(self) -> SessionLineItem {
        SessionLineItem {
            product_id: self.product_id,
            variant_id: self.variant_id,
            processor_price_id: self.processor_price_id,
            quantity: self.quantity,
            unit_price: self.unit_price,
            customization: self.customization,
        }
    }
}

/// Whether the live price has drifted past tolerance from the remembered
/// price, measured against the live price.
#[must_use]
pub fn drift_exceeds(remembered: Decimal, live: Decimal, tolerance: Decimal) -> bool {
    if live.is_zero() {
        return !remembered.is_zero();
    }
    ((live - remembered).abs() / live) > tolerance
}

/// Re-verify every line of the cart against live platform state.
///
/// # Errors
///
/// Returns the first [`CartRejection`] encountered (expiration is checked
/// before any network call), or the platform error if a live read fails.
#[instrument(skip(platform, cart, policy), fields(lines = cart.len()))]
pub async fn revalidate_cart<P: PlatformApi>(
    platform: &P,
    cart: &Cart,
    policy: &CheckoutPolicy,
    now: DateTime<Utc>,
) -> Result<Vec<RepricedLine>, RevalidateError> {
    if now - cart.opened_at() > policy.cart_ttl {
        return Err(CartRejection::Expired {
            ttl_minutes: policy.cart_ttl.num_minutes(),
        }
        .into());
    }

    let mut repriced = Vec::with_capacity(cart.len());

    for line in cart.lines() {
        let Some(variant_id) = line.variant_id else {
            // No variant to verify against; the remembered price rides
            // through and the platform prices the line server-side.
            repriced.push(RepricedLine {
                product_id: line.product_id,
                variant_id: None,
                quantity: line.quantity(),
                unit_price: line.unit_price,
                processor_price_id: None,
                customization: line.customization.clone(),
            });
            continue;
        };

        let variant = match platform.variant(variant_id).await {
            Ok(variant) => variant,
            Err(PlatformError::NotFound(_)) => {
                return Err(CartRejection::UnknownVariant { variant_id }.into());
            }
            Err(e) => return Err(RevalidateError::Platform(e)),
        };

        if !variant.product.status.is_sellable() {
            return Err(CartRejection::Unavailable {
                product_id: variant.product.id,
                product_name: variant.product.name,
            }
            .into());
        }

        let available = platform
            .available_inventory(variant_id)
            .await
            .map_err(RevalidateError::Platform)?;

        if i64::from(line.quantity()) > available {
            return Err(CartRejection::InsufficientInventory {
                variant_id,
                product_name: variant.product.name,
                requested: line.quantity(),
                available,
            }
            .into());
        }

        if drift_exceeds(
            line.unit_price,
            variant.price,
            policy.price_drift_tolerance,
        ) {
            return Err(CartRejection::PriceDrift {
                variant_id,
                product_name: variant.product.name,
                remembered: line.unit_price,
                live: variant.price,
            }
            .into());
        }

        repriced.push(RepricedLine {
            product_id: variant.product.id,
            variant_id: Some(variant_id),
            quantity: line.quantity(),
            unit_price: variant.price,
            processor_price_id: variant.processor_price_id,
            customization: line.customization.clone(),
        });
    }

    Ok(repriced)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::flow::testing::{MockPlatform, cart_with_line, policy, variant_record};

    #[test]
    fn test_drift_threshold_is_strict() {
        let tolerance = Decimal::new(5, 2);

        // Exactly 5% is tolerated.
        assert!(!drift_exceeds(
            Decimal::new(9500, 2),
            Decimal::new(10000, 2),
            tolerance
        ));
        // Just past 5% is not.
        assert!(drift_exceeds(
            Decimal::new(9499, 2),
            Decimal::new(10000, 2),
            tolerance
        ));
        // Drift is symmetric.
        assert!(drift_exceeds(
            Decimal::new(10600, 2),
            Decimal::new(10000, 2),
            tolerance
        ));
        // Zero live price only matches a zero remembered price.
        assert!(drift_exceeds(Decimal::ONE, Decimal::ZERO, tolerance));
        assert!(!drift_exceeds(Decimal::ZERO, Decimal::ZERO, tolerance));
    }

    #[tokio::test]
    async fn test_one_percent_drift_repriced_to_live() {
        let (cart, variant_id) = cart_with_line(2, Decimal::new(10000, 2));
        let platform = MockPlatform::new()
            .with_variant(variant_record(variant_id, Decimal::new(10100, 2)))
            .with_inventory(variant_id, 10);

        let repriced = revalidate_cart(&platform, &cart, &policy(), chrono::Utc::now())
            .await
            .unwrap();

        assert_eq!(repriced.len(), 1);
        // Ok at 1% drift, and the live price wins.
        assert_eq!(repriced[0].unit_price, Decimal::new(10100, 2));
    }

    #[tokio::test]
    async fn test_ten_percent_drift_rejected() {
        let (cart, variant_id) = cart_with_line(2, Decimal::new(10000, 2));
        let platform = MockPlatform::new()
            .with_variant(variant_record(variant_id, Decimal::new(11000, 2)))
            .with_inventory(variant_id, 10);

        let err = revalidate_cart(&platform, &cart, &policy(), chrono::Utc::now())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            RevalidateError::Rejected(CartRejection::PriceDrift { .. })
        ));
    }

    #[tokio::test]
    async fn test_insufficient_inventory_iff_requested_exceeds_available() {
        for (requested, available, expect_rejection) in
            [(3_u32, 2_i64, true), (3, 3, false), (2, 3, false)]
        {
            let (cart, variant_id) = cart_with_line(requested, Decimal::new(5000, 2));
            let platform = MockPlatform::new()
                .with_variant(variant_record(variant_id, Decimal::new(5000, 2)))
                .with_inventory(variant_id, available);

            let result = revalidate_cart(&platform, &cart, &policy(), chrono::Utc::now()).await;

            if expect_rejection {
                assert!(matches!(
                    result.unwrap_err(),
                    RevalidateError::Rejected(CartRejection::InsufficientInventory {
                        requested: r,
                        available: a,
                        ..
                    }) if r == requested && a == available
                ));
            } else {
                assert!(result.is_ok(), "requested {requested} of {available}");
            }
        }
    }

    #[tokio::test]
    async fn test_expired_cart_rejected_before_any_network_call() {
        let (cart, _variant_id) = cart_with_line(1, Decimal::new(5000, 2));
        let platform = MockPlatform::new(); // would fail any lookup

        let later = cart.opened_at() + chrono::Duration::minutes(31);
        let err = revalidate_cart(&platform, &cart, &policy(), later)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            RevalidateError::Rejected(CartRejection::Expired { ttl_minutes: 30 })
        ));
        assert_eq!(platform.variant_lookups(), 0);
    }

    #[tokio::test]
    async fn test_unknown_variant_rejected() {
        let (cart, _variant_id) = cart_with_line(1, Decimal::new(5000, 2));
        let platform = MockPlatform::new();

        let err = revalidate_cart(&platform, &cart, &policy(), chrono::Utc::now())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            RevalidateError::Rejected(CartRejection::UnknownVariant { .. })
        ));
    }

    #[tokio::test]
    async fn test_inactive_product_rejected() {
        let (cart, variant_id) = cart_with_line(1, Decimal::new(5000, 2));
        let mut record = variant_record(variant_id, Decimal::new(5000, 2));
        record.product.status = haberdash_core::ProductStatus::Archived;
        let platform = MockPlatform::new()
            .with_variant(record)
            .with_inventory(variant_id, 10);

        let err = revalidate_cart(&platform, &cart, &policy(), chrono::Utc::now())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            RevalidateError::Rejected(CartRejection::Unavailable { .. })
        ));
    }
}

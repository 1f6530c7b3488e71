//! Bulk operators: pure fan-out from a selection into the pending set.
//!
//! No operator here touches the network; they only stage edits.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Deserialize;

use haberdash_core::ProductId;

use crate::platform::types::{ProductPatch, ProductRow};

use super::changes::{PendingChanges, Selection};

/// How a bulk price action derives the new price from the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "mode", content = "value", rename_all = "snake_case")]
pub enum PriceOperator {
    /// Set every selected price to a fixed value.
    Set(Decimal),
    /// Adjust by a percentage (e.g. `-15` for 15% off).
    AdjustPercent(Decimal),
    /// Increase by an absolute amount.
    IncreaseBy(Decimal),
    /// Decrease by an absolute amount.
    DecreaseBy(Decimal),
}

impl PriceOperator {
    /// Apply the operator to a current price.
    ///
    /// The result is clamped at zero (a $10,000 decrease on a $20 item
    /// stages $0, not a negative price) and rounded to cents.
    #[must_use]
    pub fn apply(&self, current: Decimal) -> Decimal {
        let raw = match self {
            Self::Set(value) => *value,
            Self::AdjustPercent(percent) => {
                current * (Decimal::ONE + *percent / Decimal::ONE_HUNDRED)
            }
            Self::IncreaseBy(amount) => current + *amount,
            Self::DecreaseBy(amount) => current - *amount,
        };

        raw.max(Decimal::ZERO).round_dp(2)
    }
}

/// Stage a price operation for every selected product.
///
/// `current_prices` comes from the loaded product rows; ids in the
/// selection with no known row are skipped (they have nothing to derive
/// a price from). Returns how many products were staged.
pub fn apply_price_operator(
    changes: &mut PendingChanges,
    selection: &Selection,
    current_prices: &HashMap<ProductId, Decimal>,
    operator: PriceOperator,
) -> usize {
    let mut staged = 0;

    for id in selection.iter() {
        let Some(current) = current_prices.get(&id) else {
            continue;
        };

        changes.stage(
            id,
            ProductPatch {
                price: Some(operator.apply(*current)),
                ..ProductPatch::default()
            },
        );
        staged += 1;
    }

    staged
}

/// Overwrite the category for every selected product.
pub fn apply_category(
    changes: &mut PendingChanges,
    selection: &Selection,
    category: &str,
) -> usize {
    for id in selection.iter() {
        changes.stage(
            id,
            ProductPatch {
                category: Some(category.to_string()),
                ..ProductPatch::default()
            },
        );
    }

    selection.len()
}

/// Index loaded rows by id for operator application.
#[must_use]
pub fn price_index(rows: &[ProductRow]) -> HashMap<ProductId, Decimal> {
    rows.iter().map(|row| (row.id, row.price)).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use uuid::Uuid;

    use super::*;

    fn dec(cents: i64) -> Decimal {
        Decimal::new(cents, 2)
    }

    #[test]
    fn test_set_fixed_value() {
        assert_eq!(PriceOperator::Set(dec(7999)).apply(dec(12000)), dec(7999));
    }

    #[test]
    fn test_adjust_percent() {
        // +10% of $200.00
        assert_eq!(
            PriceOperator::AdjustPercent(Decimal::from(10)).apply(dec(20000)),
            dec(22000)
        );
        // -15% of $80.00
        assert_eq!(
            PriceOperator::AdjustPercent(Decimal::from(-15)).apply(dec(8000)),
            dec(6800)
        );
    }

    #[test]
    fn test_increase_and_decrease() {
        assert_eq!(PriceOperator::IncreaseBy(dec(500)).apply(dec(2000)), dec(2500));
        assert_eq!(PriceOperator::DecreaseBy(dec(500)).apply(dec(2000)), dec(1500));
    }

    #[test]
    fn test_result_never_negative() {
        // "decrease by $10,000" on a $20 item clamps to $0.
        assert_eq!(
            PriceOperator::DecreaseBy(Decimal::from(10_000)).apply(dec(2000)),
            Decimal::ZERO
        );
        assert_eq!(
            PriceOperator::AdjustPercent(Decimal::from(-150)).apply(dec(2000)),
            Decimal::ZERO
        );
        assert_eq!(
            PriceOperator::Set(Decimal::from(-5)).apply(dec(2000)),
            Decimal::ZERO
        );
    }

    #[test]
    fn test_rounds_to_cents() {
        // 33% off $9.99 = $6.6933
        assert_eq!(
            PriceOperator::AdjustPercent(Decimal::from(-33)).apply(dec(999)),
            dec(669)
        );
    }

    #[test]
    fn test_fan_out_over_selection() {
        let a = ProductId::new(Uuid::new_v4());
        let b = ProductId::new(Uuid::new_v4());
        let unknown = ProductId::new(Uuid::new_v4());

        let prices = HashMap::from([(a, dec(10000)), (b, dec(20000))]);

        let mut selection = Selection::default();
        selection.replace([a, b, unknown]);

        let mut changes = PendingChanges::default();
        let staged = apply_price_operator(
            &mut changes,
            &selection,
            &prices,
            PriceOperator::AdjustPercent(Decimal::from(-50)),
        );

        assert_eq!(staged, 2);
        assert_eq!(changes.get(a).unwrap().price, Some(dec(5000)));
        assert_eq!(changes.get(b).unwrap().price, Some(dec(10000)));
        assert!(changes.get(unknown).is_none());
    }

    #[test]
    fn test_category_fan_out() {
        let a = ProductId::new(Uuid::new_v4());
        let mut selection = Selection::default();
        selection.replace([a]);

        let mut changes = PendingChanges::default();
        apply_category(&mut changes, &selection, "Fall 2026");

        assert_eq!(
            changes.get(a).unwrap().category.as_deref(),
            Some("Fall 2026")
        );
    }

    #[test]
    fn test_operator_deserializes_from_tagged_json() {
        let op: PriceOperator =
            serde_json::from_str(r#"{"mode": "decrease_by", "value": "10.00"}"#).unwrap();
        assert_eq!(op, PriceOperator::DecreaseBy(dec(1000)));
    }
}

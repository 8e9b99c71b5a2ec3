//! Input validation for stock movements.
//!
//! Validation is whole-request: any violation rejects the movement before a
//! single row is planned, let alone written.

use std::collections::HashMap;

use rust_decimal::Decimal;
use strata_shared::types::ItemId;

use super::error::StockLedgerError;
use super::types::AdjustmentLine;

/// Validates that a movement has at least one detail line.
pub fn require_lines<T>(lines: &[T]) -> Result<(), StockLedgerError> {
    if lines.is_empty() {
        return Err(StockLedgerError::EmptyMovement);
    }
    Ok(())
}

/// Validates a required-positive quantity.
pub fn require_positive_qty(item_id: ItemId, quantity: Decimal) -> Result<(), StockLedgerError> {
    if quantity <= Decimal::ZERO {
        return Err(StockLedgerError::NonPositiveQuantity { item_id, quantity });
    }
    Ok(())
}

/// Validates that a rate is not negative (zero is allowed).
pub fn require_non_negative_rate(item_id: ItemId, rate: Decimal) -> Result<(), StockLedgerError> {
    if rate < Decimal::ZERO {
        return Err(StockLedgerError::NegativeRate { item_id, rate });
    }
    Ok(())
}

/// Validates an adjustment line: both quantities must be non-negative, at
/// least one must be positive, and the rate must not be negative.
pub fn validate_adjustment_line(line: &AdjustmentLine) -> Result<(), StockLedgerError> {
    if line.received_qty < Decimal::ZERO {
        return Err(StockLedgerError::NonPositiveQuantity {
            item_id: line.item_id,
            quantity: line.received_qty,
        });
    }
    if line.issued_qty < Decimal::ZERO {
        return Err(StockLedgerError::NonPositiveQuantity {
            item_id: line.item_id,
            quantity: line.issued_qty,
        });
    }
    if line.received_qty.is_zero() && line.issued_qty.is_zero() {
        return Err(StockLedgerError::EmptyAdjustmentLine {
            item_id: line.item_id,
        });
    }
    require_non_negative_rate(line.item_id, line.rate)
}

/// Sums requested quantities per item across all lines of a request.
#[must_use]
pub fn aggregate_requested(
    lines: impl Iterator<Item = (ItemId, Decimal)>,
) -> HashMap<ItemId, Decimal> {
    let mut totals: HashMap<ItemId, Decimal> = HashMap::new();
    for (item_id, quantity) in lines {
        *totals.entry(item_id).or_insert(Decimal::ZERO) += quantity;
    }
    totals
}

/// Whole-request over-issue check: for each item, the total requested
/// quantity must not exceed the available closing stock.
///
/// Items are checked in id order so the reported violation is deterministic
/// when more than one item is short.
pub fn validate_available<F>(
    requested: &HashMap<ItemId, Decimal>,
    available: F,
) -> Result<(), StockLedgerError>
where
    F: Fn(ItemId) -> Decimal,
{
    let mut items: Vec<_> = requested.iter().collect();
    items.sort_by_key(|(item_id, _)| item_id.into_inner());

    for (item_id, total) in items {
        let on_hand = available(*item_id);
        if *total > on_hand {
            return Err(StockLedgerError::OverIssue {
                item_id: *item_id,
                requested: *total,
                available: on_hand,
            });
        }
    }
    Ok(())
}

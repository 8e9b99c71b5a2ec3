//! Decimal rounding rules for stock quantities, values, and rates.
//!
//! CRITICAL: rounding is applied at every intermediate step of a costing
//! computation, not only at the final result. Historical balances were
//! produced with exactly these rounding points; moving or removing one
//! changes every balance computed after it.

use rust_decimal::{Decimal, RoundingStrategy};

/// Decimal places for stock quantities.
pub const QTY_DP: u32 = 4;
/// Decimal places for stock values (money).
pub const VALUE_DP: u32 = 2;
/// Decimal places for unit rates.
pub const RATE_DP: u32 = 4;

/// Rounds a stock quantity to 4 decimal places (half away from zero).
#[must_use]
pub fn round_qty(qty: Decimal) -> Decimal {
    qty.round_dp_with_strategy(QTY_DP, RoundingStrategy::MidpointAwayFromZero)
}

/// Rounds a stock value to 2 decimal places (half away from zero).
#[must_use]
pub fn round_value(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(VALUE_DP, RoundingStrategy::MidpointAwayFromZero)
}

/// Rounds a unit rate to 4 decimal places (half away from zero).
#[must_use]
pub fn round_rate(rate: Decimal) -> Decimal {
    rate.round_dp_with_strategy(RATE_DP, RoundingStrategy::MidpointAwayFromZero)
}

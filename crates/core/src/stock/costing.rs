//! The weighted-average costing engine.
//!
//! Pure functions that compute the next stock position from a prior position
//! and a single movement. All arithmetic follows the rounding contract in
//! `strata_shared::types::rounding`: every intermediate product and sum is
//! rounded before it feeds the next step. Historical balances depend on
//! these exact rounding points.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strata_shared::types::rounding::{round_qty, round_rate, round_value};

/// Stock, value, and rate after a costing step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostedPosition {
    /// Quantity on hand, 4 decimal places.
    pub closing_stock: Decimal,
    /// Value on hand, 2 decimal places.
    pub closing_value: Decimal,
    /// Derived unit rate, 4 decimal places.
    pub unit_rate: Decimal,
}

impl CostedPosition {
    /// The empty position, used when no balance exists for a pair yet.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            closing_stock: Decimal::ZERO,
            closing_value: Decimal::ZERO,
            unit_rate: Decimal::ZERO,
        }
    }
}

/// The weighted-average costing engine.
///
/// Stateless; every function maps `(prior position | none, movement)` to a
/// new position.
pub struct CostingEngine;

impl CostingEngine {
    /// Applies a receive movement.
    ///
    /// When no prior balance exists for the pair, or the site had no ledger
    /// history at all when the request started (`site_has_history == false`),
    /// the position is bootstrapped from this receipt alone — any prior
    /// position is discarded. Otherwise the receipt is averaged into the
    /// prior position and the unit rate becomes total value / total stock
    /// (unchanged if the resulting stock is zero).
    #[must_use]
    pub fn receive(
        prior: Option<&CostedPosition>,
        qty: Decimal,
        rate: Decimal,
        site_has_history: bool,
    ) -> CostedPosition {
        let qty = round_qty(qty);
        let rate = round_rate(rate);
        let incoming_value = round_value(qty * rate);

        match prior {
            Some(prior) if site_has_history => {
                let closing_stock = round_qty(prior.closing_stock + qty);
                let closing_value = round_value(prior.closing_value + incoming_value);
                let unit_rate = if closing_stock.is_zero() {
                    prior.unit_rate
                } else {
                    round_rate(closing_value / closing_stock)
                };
                CostedPosition {
                    closing_stock,
                    closing_value,
                    unit_rate,
                }
            }
            _ => CostedPosition {
                closing_stock: qty,
                closing_value: incoming_value,
                unit_rate: rate,
            },
        }
    }

    /// Applies a consumption issue at the position's own unit rate.
    ///
    /// Stock is clamped at zero — it never goes negative on this path — and
    /// the value is recomputed from the clamped stock. The unit rate is left
    /// unchanged. Callers are expected to have validated availability; the
    /// clamp is the one documented place a value is silently limited.
    #[must_use]
    pub fn issue_at_average(prior: Option<&CostedPosition>, qty: Decimal) -> CostedPosition {
        let qty = round_qty(qty);
        let prior = prior.copied().unwrap_or_else(CostedPosition::empty);

        let closing_stock = round_qty((prior.closing_stock - qty).max(Decimal::ZERO));
        let closing_value = round_value(closing_stock * prior.unit_rate);
        CostedPosition {
            closing_stock,
            closing_value,
            unit_rate: prior.unit_rate,
        }
    }

    /// Applies an adjustment issue at a caller-supplied rate.
    ///
    /// Stock is NOT clamped and may go negative; the issued value is removed
    /// from the position and the unit rate is recomputed from the resulting
    /// stock and value (zero if the stock lands exactly on zero).
    #[must_use]
    pub fn issue_at_rate(
        prior: Option<&CostedPosition>,
        qty: Decimal,
        rate: Decimal,
    ) -> CostedPosition {
        let qty = round_qty(qty);
        let rate = round_rate(rate);
        let prior = prior.copied().unwrap_or_else(CostedPosition::empty);

        let issued_value = round_value(qty * rate);
        let closing_stock = round_qty(prior.closing_stock - qty);
        let closing_value = round_value(prior.closing_value - issued_value);
        let unit_rate = if closing_stock.is_zero() {
            Decimal::ZERO
        } else {
            round_rate(closing_value / closing_stock)
        };
        CostedPosition {
            closing_stock,
            closing_value,
            unit_rate,
        }
    }
}

//! Stock balance snapshots.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strata_shared::types::rounding::round_value;
use strata_shared::types::{ItemId, SiteId};

/// Current stock position for one (site, item) pair.
///
/// This is the derived cache over the stock ledger: created on the pair's
/// first movement, mutated on every subsequent one, never deleted. Replaying
/// the site's ledger entries in commit order reproduces it exactly (see
/// `stock::replay`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockBalance {
    /// The site this balance belongs to.
    pub site_id: SiteId,
    /// The item this balance tracks.
    pub item_id: ItemId,
    /// Quantity on hand, 4 decimal places. Negative only after a Stock
    /// Adjustment over-issue.
    pub closing_stock: Decimal,
    /// Value on hand, 2 decimal places.
    pub closing_value: Decimal,
    /// Derived unit rate, 4 decimal places.
    pub unit_rate: Decimal,
    /// Audit tag of the movement that last touched this balance.
    pub last_movement: String,
}

impl StockBalance {
    /// Returns true if `closing_value` is within rounding tolerance of
    /// `closing_stock × unit_rate`.
    ///
    /// The tolerance scales with the stock quantity: the rate is stored at
    /// 4 decimal places, so the reconstructed product can drift from the
    /// stored value by up to half a rate unit per unit of stock.
    #[must_use]
    pub fn is_value_consistent(&self) -> bool {
        let expected = round_value(self.closing_stock * self.unit_rate);
        let tolerance = Decimal::new(1, 2) + self.closing_stock.abs() * Decimal::new(1, 4);
        (self.closing_value - expected).abs() <= tolerance
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn balance(stock: Decimal, value: Decimal, rate: Decimal) -> StockBalance {
        StockBalance {
            site_id: SiteId::new(),
            item_id: ItemId::new(),
            closing_stock: stock,
            closing_value: value,
            unit_rate: rate,
            last_movement: String::new(),
        }
    }

    #[test]
    fn test_consistent_balance() {
        assert!(balance(dec!(150), dec!(1800.00), dec!(12)).is_value_consistent());
    }

    #[test]
    fn test_consistent_with_rate_rounding_drift() {
        // 3 units at a true rate of 10/3: value 10.00, rate stored as 3.3333.
        assert!(balance(dec!(3), dec!(10.00), dec!(3.3333)).is_value_consistent());
    }

    #[test]
    fn test_negative_stock_is_still_checked() {
        // -3 units at rate 10: value must be -30 within tolerance.
        assert!(balance(dec!(-3), dec!(-30.00), dec!(10)).is_value_consistent());
        assert!(!balance(dec!(-3), dec!(30.00), dec!(10)).is_value_consistent());
    }

    #[test]
    fn test_inconsistent_balance() {
        assert!(!balance(dec!(100), dec!(900.00), dec!(10)).is_value_consistent());
    }
}

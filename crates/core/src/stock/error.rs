//! Stock ledger error types.
//!
//! Validation failures reject a whole movement before anything is written;
//! the persistence layer wraps these in its own error type and adds
//! referential, concurrency, and database variants.

use rust_decimal::Decimal;
use thiserror::Error;

use strata_shared::types::ItemId;

/// Errors raised while validating and planning a stock movement.
#[derive(Debug, Error)]
pub enum StockLedgerError {
    /// Movement has no detail lines.
    #[error("Movement must have at least one line")]
    EmptyMovement,

    /// A required quantity is zero or negative.
    #[error("Quantity for item {item_id} must be positive, got {quantity}")]
    NonPositiveQuantity {
        /// The offending item.
        item_id: ItemId,
        /// The submitted quantity.
        quantity: Decimal,
    },

    /// A rate is negative.
    #[error("Rate for item {item_id} cannot be negative, got {rate}")]
    NegativeRate {
        /// The offending item.
        item_id: ItemId,
        /// The submitted rate.
        rate: Decimal,
    },

    /// An adjustment line neither receives nor issues anything.
    #[error("Adjustment line for item {item_id} must receive or issue a quantity")]
    EmptyAdjustmentLine {
        /// The offending item.
        item_id: ItemId,
    },

    /// The request issues more than the available closing stock.
    #[error("Requested {requested} of item {item_id} exceeds available stock {available}")]
    OverIssue {
        /// The offending item.
        item_id: ItemId,
        /// Total quantity requested across all lines of the request.
        requested: Decimal,
        /// Closing stock available at validation time.
        available: Decimal,
    },

    /// A transfer names the same site as source and destination.
    #[error("Transfer source and destination sites must differ")]
    SameSiteTransfer,
}

impl StockLedgerError {
    /// Returns the stable machine-readable code for this error.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::EmptyMovement => "EMPTY_MOVEMENT",
            Self::NonPositiveQuantity { .. } => "NON_POSITIVE_QUANTITY",
            Self::NegativeRate { .. } => "NEGATIVE_RATE",
            Self::EmptyAdjustmentLine { .. } => "EMPTY_ADJUSTMENT_LINE",
            Self::OverIssue { .. } => "OVER_ISSUE",
            Self::SameSiteTransfer => "SAME_SITE_TRANSFER",
        }
    }
}

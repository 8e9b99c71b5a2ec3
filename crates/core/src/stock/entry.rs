//! Stock ledger entry domain types.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strata_shared::types::{ItemId, SiteId, StockDocumentId, StockEntryId};

/// Document type that originated a stock movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentType {
    /// Opening balance entry for a site.
    OpeningStock,
    /// Material received from outside (vendor delivery).
    InwardReceipt,
    /// Material transferred from one site to another.
    OutwardTransfer,
    /// Material consumed at a site.
    DailyConsumption,
    /// Manual correction (receive and/or issue).
    StockAdjustment,
}

impl DocumentType {
    /// Human-readable label, as stored on ledger rows.
    #[must_use]
    pub const fn as_label(self) -> &'static str {
        match self {
            Self::OpeningStock => "OPENING STOCK",
            Self::InwardReceipt => "INWARD RECEIPT",
            Self::OutwardTransfer => "OUTWARD TRANSFER",
            Self::DailyConsumption => "DAILY CONSUMPTION",
            Self::StockAdjustment => "STOCK ADJUSTMENT",
        }
    }
}

impl std::fmt::Display for DocumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_label())
    }
}

impl std::str::FromStr for DocumentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OPENING STOCK" => Ok(Self::OpeningStock),
            "INWARD RECEIPT" => Ok(Self::InwardReceipt),
            "OUTWARD TRANSFER" => Ok(Self::OutwardTransfer),
            "DAILY CONSUMPTION" => Ok(Self::DailyConsumption),
            "STOCK ADJUSTMENT" => Ok(Self::StockAdjustment),
            _ => Err(format!("Unknown document type: {s}")),
        }
    }
}

/// A single immutable row in the stock ledger.
///
/// Every quantity movement against a (site, item) balance is recorded as one
/// entry. Exactly one of `received_qty` / `issued_qty` is set; a submitted
/// line that both receives and issues (Stock Adjustment) produces two rows.
/// Entries are never edited or deleted; corrections are new movements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockEntry {
    /// Unique identifier for this entry.
    pub id: StockEntryId,
    /// The site this entry belongs to.
    pub site_id: SiteId,
    /// The item this entry moves.
    pub item_id: ItemId,
    /// Transaction date of the originating document.
    pub entry_date: NaiveDate,
    /// The kind of document that originated this entry.
    pub document_type: DocumentType,
    /// The originating document.
    pub document_id: StockDocumentId,
    /// Quantity received, if this is a receive row.
    pub received_qty: Option<Decimal>,
    /// Quantity issued, if this is an issue row.
    pub issued_qty: Option<Decimal>,
    /// Unit rate used for this entry.
    pub unit_rate: Decimal,
}

impl StockEntry {
    /// Signed quantity effect of this entry (positive for receive, negative
    /// for issue).
    #[must_use]
    pub fn quantity_delta(&self) -> Decimal {
        self.received_qty.unwrap_or(Decimal::ZERO) - self.issued_qty.unwrap_or(Decimal::ZERO)
    }
}

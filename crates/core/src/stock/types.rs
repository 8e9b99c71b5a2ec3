//! Movement inputs and the resolved movement plan.
//!
//! A movement input mirrors the submitted document: header fields plus
//! detail lines. Planning validates the input against current balances and
//! resolves it into a [`MovementPlan`] — the exact ledger rows and balance
//! updates the transaction coordinator must commit atomically.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use strata_shared::types::{ItemId, SiteId, StockDocumentId, UserId};

use super::entry::DocumentType;

/// One requested consumption line.
#[derive(Debug, Clone)]
pub struct ConsumptionLine {
    /// The item being consumed.
    pub item_id: ItemId,
    /// Quantity to consume (must be positive).
    pub quantity: Decimal,
}

/// Input for submitting a Daily Consumption document.
#[derive(Debug, Clone)]
pub struct DailyConsumptionInput {
    /// The consuming site.
    pub site_id: SiteId,
    /// Transaction date.
    pub entry_date: NaiveDate,
    /// Sequence code allocated by the document numbering collaborator.
    pub document_code: String,
    /// Optional free-text remarks.
    pub remarks: Option<String>,
    /// The consumption lines (at least one).
    pub lines: Vec<ConsumptionLine>,
    /// Acting user, for audit stamping.
    pub created_by: UserId,
}

/// One receive line (Opening Stock / Inward Receipt).
#[derive(Debug, Clone)]
pub struct ReceiptLine {
    /// The item being received.
    pub item_id: ItemId,
    /// Quantity received (must be positive).
    pub quantity: Decimal,
    /// Unit rate for this receipt (must not be negative).
    pub rate: Decimal,
}

/// Input for submitting an Opening Stock document.
#[derive(Debug, Clone)]
pub struct OpeningStockInput {
    /// The site being opened.
    pub site_id: SiteId,
    /// Transaction date.
    pub entry_date: NaiveDate,
    /// Sequence code allocated by the document numbering collaborator.
    pub document_code: String,
    /// Optional free-text remarks.
    pub remarks: Option<String>,
    /// The opening lines (at least one).
    pub lines: Vec<ReceiptLine>,
    /// Acting user, for audit stamping.
    pub created_by: UserId,
}

/// Input for submitting an Inward Receipt document.
#[derive(Debug, Clone)]
pub struct InwardReceiptInput {
    /// The receiving site.
    pub site_id: SiteId,
    /// Transaction date.
    pub entry_date: NaiveDate,
    /// Sequence code allocated by the document numbering collaborator.
    pub document_code: String,
    /// Optional free-text remarks (vendor reference, challan number, …).
    pub remarks: Option<String>,
    /// The receipt lines (at least one).
    pub lines: Vec<ReceiptLine>,
    /// Acting user, for audit stamping.
    pub created_by: UserId,
}

/// One adjustment line; either or both quantities may be nonzero.
#[derive(Debug, Clone)]
pub struct AdjustmentLine {
    /// The item being corrected.
    pub item_id: ItemId,
    /// Quantity received by this correction (≥ 0).
    pub received_qty: Decimal,
    /// Quantity issued by this correction (≥ 0).
    pub issued_qty: Decimal,
    /// Unit rate applied to both sides of this line (must not be negative).
    pub rate: Decimal,
    /// Caller-supplied line amount, stored verbatim for audit.
    pub amount: Decimal,
    /// Optional per-line remark.
    pub remark: Option<String>,
}

/// Input for submitting a Stock Adjustment document.
#[derive(Debug, Clone)]
pub struct StockAdjustmentInput {
    /// The site being corrected.
    pub site_id: SiteId,
    /// Transaction date.
    pub entry_date: NaiveDate,
    /// Sequence code allocated by the document numbering collaborator.
    pub document_code: String,
    /// Optional free-text remarks.
    pub remarks: Option<String>,
    /// The adjustment lines (at least one).
    pub lines: Vec<AdjustmentLine>,
    /// Acting user, for audit stamping.
    pub created_by: UserId,
}

/// One requested transfer line.
#[derive(Debug, Clone)]
pub struct TransferLine {
    /// The item being transferred.
    pub item_id: ItemId,
    /// Quantity to transfer (must be positive).
    pub quantity: Decimal,
}

/// Input for submitting an Outward Transfer document.
#[derive(Debug, Clone)]
pub struct OutwardTransferInput {
    /// The site material leaves.
    pub source_site_id: SiteId,
    /// The site material arrives at. Must differ from the source.
    pub dest_site_id: SiteId,
    /// Transaction date.
    pub entry_date: NaiveDate,
    /// Sequence code allocated by the document numbering collaborator.
    pub document_code: String,
    /// Optional free-text remarks.
    pub remarks: Option<String>,
    /// The transfer lines (at least one).
    pub lines: Vec<TransferLine>,
    /// Acting user, for audit stamping.
    pub created_by: UserId,
}

/// Header of the document a movement plan will create.
#[derive(Debug, Clone)]
pub struct PlannedDocument {
    /// Pre-generated document id, shared by all rows of the plan.
    pub id: StockDocumentId,
    /// Sequence code from the numbering collaborator.
    pub document_code: String,
    /// The kind of document.
    pub document_type: DocumentType,
    /// Primary site (source site for transfers).
    pub site_id: SiteId,
    /// Destination site, for transfers only.
    pub dest_site_id: Option<SiteId>,
    /// Transaction date.
    pub entry_date: NaiveDate,
    /// Value effect of the movement (see planning rules per document type).
    pub total_amount: Decimal,
    /// Optional free-text remarks.
    pub remarks: Option<String>,
    /// Acting user, for audit stamping.
    pub created_by: UserId,
}

/// A detail line to store on the planned document.
#[derive(Debug, Clone)]
pub struct PlannedLine {
    /// The item on this line.
    pub item_id: ItemId,
    /// Quantity received on this line.
    pub received_qty: Decimal,
    /// Quantity issued on this line.
    pub issued_qty: Decimal,
    /// Rate resolved for this line.
    pub rate: Decimal,
    /// Line amount.
    pub amount: Decimal,
    /// Optional per-line remark.
    pub remark: Option<String>,
}

/// A ledger row the coordinator must append.
#[derive(Debug, Clone)]
pub struct PlannedEntry {
    /// The site this row belongs to.
    pub site_id: SiteId,
    /// The item this row moves.
    pub item_id: ItemId,
    /// Transaction date.
    pub entry_date: NaiveDate,
    /// The kind of document that originated this row.
    pub document_type: DocumentType,
    /// Quantity received, if this is a receive row.
    pub received_qty: Option<Decimal>,
    /// Quantity issued, if this is an issue row.
    pub issued_qty: Option<Decimal>,
    /// Unit rate used for this row.
    pub unit_rate: Decimal,
}

/// A balance upsert the coordinator must apply.
///
/// One update per (site, item) pair touched by the movement, carrying the
/// pair's final position after all of the request's lines.
#[derive(Debug, Clone)]
pub struct BalanceUpdate {
    /// The site of the balance row.
    pub site_id: SiteId,
    /// The item of the balance row.
    pub item_id: ItemId,
    /// New quantity on hand.
    pub closing_stock: Decimal,
    /// New value on hand.
    pub closing_value: Decimal,
    /// New derived unit rate.
    pub unit_rate: Decimal,
    /// Audit tag identifying this movement.
    pub last_movement: String,
}

/// The resolved, validated effect of one submitted movement.
///
/// Everything in a plan commits atomically or not at all: the document
/// header, its detail lines, the ledger appends, and the balance upserts.
#[derive(Debug, Clone)]
pub struct MovementPlan {
    /// The document header to create.
    pub document: PlannedDocument,
    /// The detail lines to store on the document.
    pub lines: Vec<PlannedLine>,
    /// The ledger rows to append, in order.
    pub entries: Vec<PlannedEntry>,
    /// The balance rows to upsert.
    pub balances: Vec<BalanceUpdate>,
}

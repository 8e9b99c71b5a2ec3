//! Movement planning for the five stock document types.
//!
//! Planning is pure: a movement input plus a view of the current balances
//! resolves into a [`MovementPlan`] (ledger rows + balance updates) or a
//! validation error. Nothing is written here; the transaction coordinator in
//! the persistence layer commits a plan atomically or not at all.
//!
//! The bootstrap flag (`site_has_history`) is supplied by the caller,
//! computed once per request as "does this site have any ledger rows at
//! all", before any detail line is processed. It deliberately is not
//! re-evaluated between lines.

use rust_decimal::Decimal;
use strata_shared::types::rounding::{round_qty, round_rate, round_value};
use strata_shared::types::{ItemId, SiteId, StockDocumentId, UserId};

use super::costing::{CostedPosition, CostingEngine};
use super::entry::DocumentType;
use super::error::StockLedgerError;
use super::types::{
    BalanceUpdate, DailyConsumptionInput, InwardReceiptInput, MovementPlan, OpeningStockInput,
    OutwardTransferInput, PlannedDocument, PlannedEntry, PlannedLine, ReceiptLine,
    StockAdjustmentInput,
};
use super::validation;

/// Working view of the balances a request touches.
///
/// Lines apply in order within one request; later lines must see the
/// positions produced by earlier ones, while untouched pairs fall back to
/// the stored balances. Insertion order is preserved so the resulting
/// balance updates are deterministic.
struct WorkingBalances<B> {
    lookup: B,
    touched: Vec<(SiteId, ItemId, CostedPosition)>,
}

impl<B> WorkingBalances<B>
where
    B: Fn(SiteId, ItemId) -> Option<CostedPosition>,
{
    fn new(lookup: B) -> Self {
        Self {
            lookup,
            touched: Vec::new(),
        }
    }

    fn position(&self, site_id: SiteId, item_id: ItemId) -> Option<CostedPosition> {
        self.touched
            .iter()
            .find(|(site, item, _)| *site == site_id && *item == item_id)
            .map(|(_, _, position)| *position)
            .or_else(|| (self.lookup)(site_id, item_id))
    }

    fn record(&mut self, site_id: SiteId, item_id: ItemId, position: CostedPosition) {
        if let Some(slot) = self
            .touched
            .iter_mut()
            .find(|(site, item, _)| *site == site_id && *item == item_id)
        {
            slot.2 = position;
        } else {
            self.touched.push((site_id, item_id, position));
        }
    }

    fn into_updates(self, label: &str) -> Vec<BalanceUpdate> {
        self.touched
            .into_iter()
            .map(|(site_id, item_id, position)| BalanceUpdate {
                site_id,
                item_id,
                closing_stock: position.closing_stock,
                closing_value: position.closing_value,
                unit_rate: position.unit_rate,
                last_movement: label.to_string(),
            })
            .collect()
    }
}

/// Audit tag stored on every balance a movement touches.
fn movement_label(document_type: DocumentType, document_code: &str) -> String {
    format!("{document_type} {document_code}")
}

/// Movement planners for the stock ledger.
///
/// This service contains pure business logic with no database dependencies.
/// Callers provide a balance lookup over the current store and, where
/// receives are involved, the per-request bootstrap flag.
pub struct StockLedgerService;

impl StockLedgerService {
    /// Plans a Daily Consumption movement.
    ///
    /// Validation is whole-request and runs before anything is planned:
    /// every quantity must be positive, and per item the total requested
    /// quantity across all lines must not exceed the closing stock at
    /// validation time. Each line then issues at the balance's current unit
    /// rate; stock is clamped at zero by the costing engine.
    pub fn plan_daily_consumption<B>(
        input: &DailyConsumptionInput,
        balance_lookup: B,
    ) -> Result<MovementPlan, StockLedgerError>
    where
        B: Fn(SiteId, ItemId) -> Option<CostedPosition>,
    {
        validation::require_lines(&input.lines)?;
        for line in &input.lines {
            validation::require_positive_qty(line.item_id, line.quantity)?;
        }

        let requested = validation::aggregate_requested(
            input.lines.iter().map(|line| (line.item_id, line.quantity)),
        );
        validation::validate_available(&requested, |item_id| {
            balance_lookup(input.site_id, item_id)
                .map_or(Decimal::ZERO, |position| position.closing_stock)
        })?;

        let label = movement_label(DocumentType::DailyConsumption, &input.document_code);
        let mut working = WorkingBalances::new(&balance_lookup);
        let mut lines = Vec::with_capacity(input.lines.len());
        let mut entries = Vec::with_capacity(input.lines.len());
        let mut total_amount = Decimal::ZERO;

        for line in &input.lines {
            let prior = working.position(input.site_id, line.item_id);
            // Ledger rate is the balance's unit rate at validation time.
            let rate = prior.map_or(Decimal::ZERO, |position| position.unit_rate);
            let amount = round_value(line.quantity * rate);
            total_amount += amount;

            entries.push(PlannedEntry {
                site_id: input.site_id,
                item_id: line.item_id,
                entry_date: input.entry_date,
                document_type: DocumentType::DailyConsumption,
                received_qty: None,
                issued_qty: Some(round_qty(line.quantity)),
                unit_rate: rate,
            });
            lines.push(PlannedLine {
                item_id: line.item_id,
                received_qty: Decimal::ZERO,
                issued_qty: line.quantity,
                rate,
                amount,
                remark: None,
            });

            let next = CostingEngine::issue_at_average(prior.as_ref(), line.quantity);
            working.record(input.site_id, line.item_id, next);
        }

        Ok(MovementPlan {
            document: PlannedDocument {
                id: StockDocumentId::new(),
                document_code: input.document_code.clone(),
                document_type: DocumentType::DailyConsumption,
                site_id: input.site_id,
                dest_site_id: None,
                entry_date: input.entry_date,
                total_amount,
                remarks: input.remarks.clone(),
                created_by: input.created_by,
            },
            lines,
            entries,
            balances: working.into_updates(&label),
        })
    }

    /// Plans an Opening Stock movement.
    pub fn plan_opening_stock<B>(
        input: &OpeningStockInput,
        site_has_history: bool,
        balance_lookup: B,
    ) -> Result<MovementPlan, StockLedgerError>
    where
        B: Fn(SiteId, ItemId) -> Option<CostedPosition>,
    {
        Self::plan_receipts(
            DocumentType::OpeningStock,
            input.site_id,
            input.entry_date,
            &input.document_code,
            input.remarks.as_deref(),
            input.created_by,
            &input.lines,
            site_has_history,
            balance_lookup,
        )
    }

    /// Plans an Inward Receipt movement.
    pub fn plan_inward_receipt<B>(
        input: &InwardReceiptInput,
        site_has_history: bool,
        balance_lookup: B,
    ) -> Result<MovementPlan, StockLedgerError>
    where
        B: Fn(SiteId, ItemId) -> Option<CostedPosition>,
    {
        Self::plan_receipts(
            DocumentType::InwardReceipt,
            input.site_id,
            input.entry_date,
            &input.document_code,
            input.remarks.as_deref(),
            input.created_by,
            &input.lines,
            site_has_history,
            balance_lookup,
        )
    }

    /// Shared planner for receive-only documents.
    #[allow(clippy::too_many_arguments)]
    fn plan_receipts<B>(
        document_type: DocumentType,
        site_id: SiteId,
        entry_date: chrono::NaiveDate,
        document_code: &str,
        remarks: Option<&str>,
        created_by: UserId,
        receipt_lines: &[ReceiptLine],
        site_has_history: bool,
        balance_lookup: B,
    ) -> Result<MovementPlan, StockLedgerError>
    where
        B: Fn(SiteId, ItemId) -> Option<CostedPosition>,
    {
        validation::require_lines(receipt_lines)?;
        for line in receipt_lines {
            validation::require_positive_qty(line.item_id, line.quantity)?;
            validation::require_non_negative_rate(line.item_id, line.rate)?;
        }

        let label = movement_label(document_type, document_code);
        let mut working = WorkingBalances::new(balance_lookup);
        let mut lines = Vec::with_capacity(receipt_lines.len());
        let mut entries = Vec::with_capacity(receipt_lines.len());
        let mut total_amount = Decimal::ZERO;

        for line in receipt_lines {
            let prior = working.position(site_id, line.item_id);
            let amount = round_value(line.quantity * line.rate);
            total_amount += amount;

            entries.push(PlannedEntry {
                site_id,
                item_id: line.item_id,
                entry_date,
                document_type,
                received_qty: Some(round_qty(line.quantity)),
                issued_qty: None,
                unit_rate: round_rate(line.rate),
            });
            lines.push(PlannedLine {
                item_id: line.item_id,
                received_qty: line.quantity,
                issued_qty: Decimal::ZERO,
                rate: line.rate,
                amount,
                remark: None,
            });

            // The bootstrap flag holds for the whole request, not per line.
            let next =
                CostingEngine::receive(prior.as_ref(), line.quantity, line.rate, site_has_history);
            working.record(site_id, line.item_id, next);
        }

        Ok(MovementPlan {
            document: PlannedDocument {
                id: StockDocumentId::new(),
                document_code: document_code.to_string(),
                document_type,
                site_id,
                dest_site_id: None,
                entry_date,
                total_amount,
                remarks: remarks.map(str::to_string),
                created_by,
            },
            lines,
            entries,
            balances: working.into_updates(&label),
        })
    }

    /// Plans a Stock Adjustment movement.
    ///
    /// Per line, in order: the receive side first (Receive algorithm), then
    /// the issue side against the post-receive position (adjustment-variant
    /// Issue at the line's rate). The resulting stock may go negative; that
    /// is accepted, not an error.
    pub fn plan_stock_adjustment<B>(
        input: &StockAdjustmentInput,
        site_has_history: bool,
        balance_lookup: B,
    ) -> Result<MovementPlan, StockLedgerError>
    where
        B: Fn(SiteId, ItemId) -> Option<CostedPosition>,
    {
        validation::require_lines(&input.lines)?;
        for line in &input.lines {
            validation::validate_adjustment_line(line)?;
        }

        let label = movement_label(DocumentType::StockAdjustment, &input.document_code);
        let mut working = WorkingBalances::new(balance_lookup);
        let mut lines = Vec::with_capacity(input.lines.len());
        let mut entries = Vec::new();
        let mut total_amount = Decimal::ZERO;

        for line in &input.lines {
            if line.received_qty > Decimal::ZERO {
                let prior = working.position(input.site_id, line.item_id);
                total_amount += round_value(line.received_qty * line.rate);
                entries.push(PlannedEntry {
                    site_id: input.site_id,
                    item_id: line.item_id,
                    entry_date: input.entry_date,
                    document_type: DocumentType::StockAdjustment,
                    received_qty: Some(round_qty(line.received_qty)),
                    issued_qty: None,
                    unit_rate: round_rate(line.rate),
                });
                let next = CostingEngine::receive(
                    prior.as_ref(),
                    line.received_qty,
                    line.rate,
                    site_has_history,
                );
                working.record(input.site_id, line.item_id, next);
            }

            if line.issued_qty > Decimal::ZERO {
                // Issues against the post-receive position from this line.
                let prior = working.position(input.site_id, line.item_id);
                total_amount -= round_value(line.issued_qty * line.rate);
                entries.push(PlannedEntry {
                    site_id: input.site_id,
                    item_id: line.item_id,
                    entry_date: input.entry_date,
                    document_type: DocumentType::StockAdjustment,
                    received_qty: None,
                    issued_qty: Some(round_qty(line.issued_qty)),
                    unit_rate: round_rate(line.rate),
                });
                let next =
                    CostingEngine::issue_at_rate(prior.as_ref(), line.issued_qty, line.rate);
                working.record(input.site_id, line.item_id, next);
            }

            lines.push(PlannedLine {
                item_id: line.item_id,
                received_qty: line.received_qty,
                issued_qty: line.issued_qty,
                rate: line.rate,
                amount: line.amount,
                remark: line.remark.clone(),
            });
        }

        Ok(MovementPlan {
            document: PlannedDocument {
                id: StockDocumentId::new(),
                document_code: input.document_code.clone(),
                document_type: DocumentType::StockAdjustment,
                site_id: input.site_id,
                dest_site_id: None,
                entry_date: input.entry_date,
                total_amount,
                remarks: input.remarks.clone(),
                created_by: input.created_by,
            },
            lines,
            entries,
            balances: working.into_updates(&label),
        })
    }

    /// Plans an Outward Transfer movement.
    ///
    /// The one movement spanning two balance rows: an issue at the source
    /// site and a receive at the destination site, in one plan so the
    /// coordinator commits both or neither. The source issues at its
    /// balance's unit rate (with whole-request availability validation); the
    /// destination receives the same quantity at that rate under its own
    /// bootstrap flag.
    pub fn plan_outward_transfer<B>(
        input: &OutwardTransferInput,
        dest_site_has_history: bool,
        balance_lookup: B,
    ) -> Result<MovementPlan, StockLedgerError>
    where
        B: Fn(SiteId, ItemId) -> Option<CostedPosition>,
    {
        if input.source_site_id == input.dest_site_id {
            return Err(StockLedgerError::SameSiteTransfer);
        }
        validation::require_lines(&input.lines)?;
        for line in &input.lines {
            validation::require_positive_qty(line.item_id, line.quantity)?;
        }

        let requested = validation::aggregate_requested(
            input.lines.iter().map(|line| (line.item_id, line.quantity)),
        );
        validation::validate_available(&requested, |item_id| {
            balance_lookup(input.source_site_id, item_id)
                .map_or(Decimal::ZERO, |position| position.closing_stock)
        })?;

        let label = movement_label(DocumentType::OutwardTransfer, &input.document_code);
        let mut working = WorkingBalances::new(&balance_lookup);
        let mut lines = Vec::with_capacity(input.lines.len());
        let mut entries = Vec::with_capacity(input.lines.len() * 2);
        let mut total_amount = Decimal::ZERO;

        for line in &input.lines {
            let source_prior = working.position(input.source_site_id, line.item_id);
            let rate = source_prior.map_or(Decimal::ZERO, |position| position.unit_rate);
            let amount = round_value(line.quantity * rate);
            total_amount += amount;

            entries.push(PlannedEntry {
                site_id: input.source_site_id,
                item_id: line.item_id,
                entry_date: input.entry_date,
                document_type: DocumentType::OutwardTransfer,
                received_qty: None,
                issued_qty: Some(round_qty(line.quantity)),
                unit_rate: rate,
            });
            entries.push(PlannedEntry {
                site_id: input.dest_site_id,
                item_id: line.item_id,
                entry_date: input.entry_date,
                document_type: DocumentType::OutwardTransfer,
                received_qty: Some(round_qty(line.quantity)),
                issued_qty: None,
                unit_rate: rate,
            });
            lines.push(PlannedLine {
                item_id: line.item_id,
                received_qty: Decimal::ZERO,
                issued_qty: line.quantity,
                rate,
                amount,
                remark: None,
            });

            let source_next = CostingEngine::issue_at_average(source_prior.as_ref(), line.quantity);
            working.record(input.source_site_id, line.item_id, source_next);

            let dest_prior = working.position(input.dest_site_id, line.item_id);
            let dest_next = CostingEngine::receive(
                dest_prior.as_ref(),
                line.quantity,
                rate,
                dest_site_has_history,
            );
            working.record(input.dest_site_id, line.item_id, dest_next);
        }

        Ok(MovementPlan {
            document: PlannedDocument {
                id: StockDocumentId::new(),
                document_code: input.document_code.clone(),
                document_type: DocumentType::OutwardTransfer,
                site_id: input.source_site_id,
                dest_site_id: Some(input.dest_site_id),
                entry_date: input.entry_date,
                total_amount,
                remarks: input.remarks.clone(),
                created_by: input.created_by,
            },
            lines,
            entries,
            balances: working.into_updates(&label),
        })
    }
}

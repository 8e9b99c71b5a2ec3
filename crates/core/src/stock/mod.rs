//! Per-site, per-item stock ledger and weighted-average costing.
//!
//! This module implements the core stock functionality:
//! - Immutable ledger entries (receive and issue rows)
//! - Balance snapshots (the derived cache over the ledger)
//! - The weighted-average costing engine
//! - Movement planning for the five stock document types
//! - Whole-request input validation
//! - Ledger replay for audit and cache rebuild
//! - Error types for stock operations

pub mod balance;
pub mod costing;
pub mod entry;
pub mod error;
pub mod replay;
pub mod service;
pub mod types;
pub mod validation;

#[cfg(test)]
mod costing_props;

pub use balance::StockBalance;
pub use costing::{CostedPosition, CostingEngine};
pub use entry::{DocumentType, StockEntry};
pub use error::StockLedgerError;
pub use replay::{RebuiltBalance, rebuild_pair, rebuild_site_balances};
pub use service::StockLedgerService;
pub use types::{
    AdjustmentLine, BalanceUpdate, ConsumptionLine, DailyConsumptionInput, InwardReceiptInput,
    MovementPlan, OpeningStockInput, OutwardTransferInput, PlannedDocument, PlannedEntry,
    PlannedLine, ReceiptLine, StockAdjustmentInput, TransferLine,
};

//! `SeaORM` entity definitions for the stock ledger schema.

pub mod items;
pub mod sites;
pub mod stock_balances;
pub mod stock_document_lines;
pub mod stock_documents;
pub mod stock_entries;

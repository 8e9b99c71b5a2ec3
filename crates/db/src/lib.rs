//! Database layer for the Strata stock ledger.
//!
//! This crate provides:
//! - `SeaORM` entity definitions for the stock schema
//! - The movement repository (the transaction coordinator)
//! - Balance and ledger read/rebuild repositories
//! - Database migrations

pub mod entities;
pub mod migration;
pub mod repositories;

pub use repositories::{BalanceRepository, LedgerRepository, MovementRepository};

use sea_orm::{Database, DatabaseConnection, DbErr};

/// Establishes a connection to the database.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    Database::connect(database_url).await
}

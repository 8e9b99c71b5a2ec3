//! Repositories for stock ledger data access.

pub mod balance;
pub mod ledger;
pub mod movement;

pub use balance::BalanceRepository;
pub use ledger::LedgerRepository;
pub use movement::{MovementError, MovementRepository, PostedMovement};

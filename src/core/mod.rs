//! Core business logic module
//!
//! This module contains the session reconciliation and settlement
//! components:
//! - `traits` - Trait abstractions for interchangeable store implementations
//! - `tariff` - Fee computation policies
//! - `ledger` - In-memory session ledger and transaction history
//! - `balances` - In-memory balance table
//! - `settlement` - Settlement protocol driver and terminal link seam
//! - `reconciler` - Event handling orchestration

pub mod balances;
pub mod ledger;
pub mod reconciler;
pub mod settlement;
pub mod tariff;
pub mod traits;

pub use balances::MemoryBalances;
pub use ledger::{MemoryLedger, MemoryTransactionLog};
pub use reconciler::{Reconciler, SettlementOutcome};
pub use settlement::{ChargeOutcome, SettlementDriver, TerminalLink, ACK_TOKEN};
pub use tariff::{duration_hours, Tariff};
pub use traits::{BalanceStore, LedgerStore, TransactionLog};

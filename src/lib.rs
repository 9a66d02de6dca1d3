//! Parking Settlement Engine Library
//! # Overview
//!
//! This library reconciles vehicle/RFID parking sessions against
//! payment-capable observations and settles fees against a physical
//! payment terminal, confirming each charge before any record is written.
//!
//! # Architecture
//!
//! The system is organized into several key components:
//!
//! - [`types`] - Core data types (Session, ParkingEvent, errors)
//! - [`cli`] - CLI argument parsing
//! - [`core`] - Business logic components:
//!   - [`core::reconciler`] - Event handling orchestration
//!   - [`core::ledger`] - Session ledger and transaction history
//!   - [`core::tariff`] - Fee computation policies
//!   - [`core::settlement`] - Terminal charge protocol driver
//! - [`io`] - CSV persistence, event feed parsing, terminal links
//! - [`controller`] - The single-threaded run loop
//!
//! # Settlement Sequence
//!
//! For each payment-capable observation the engine:
//!
//! 1. Matches the most recent open session for the identity.
//! 2. Computes the fee from elapsed time under the configured tariff.
//! 3. Refuses to charge if the reported balance cannot cover the fee.
//! 4. Sends one `CHARGE <amount>` command and waits, bounded, for the
//!    terminal's acknowledgement.
//! 5. Only on acknowledgement: closes the session, debits the balance,
//!    and appends to the immutable transaction history.
//!
//! Terminal confirmation strictly before ledger mutation means an
//! interruption at any point leaves the stores consistent: an unconfirmed
//! session simply remains open and retryable.

// Module declarations
pub mod cli;
pub mod controller;
pub mod core;
pub mod io;
pub mod types;

pub use controller::Controller;
pub use crate::core::{
    BalanceStore, ChargeOutcome, LedgerStore, Reconciler, SettlementDriver, SettlementOutcome,
    Tariff, TerminalLink, TransactionLog,
};
pub use io::{AckLink, CsvBalanceStore, CsvLedgerStore, CsvTransactionLog, EventReader, LineLink};
pub use types::{ParkingEvent, Session, SessionId, SettlementError, TransactionRecord};

//! Core traits for session storage, balance tracking, and transaction history
//!
//! This module defines the trait abstractions that allow the in-memory and
//! CSV-backed store implementations to be used interchangeably. The
//! in-memory implementations are the canonical semantics; the CSV-backed
//! ones add durable persistence with whole-file atomic replacement.

use crate::types::{Session, SessionId, SettlementError, TransactionRecord};
use chrono::NaiveDateTime;
use rust_decimal::Decimal;

/// Durable table of parking sessions
///
/// The session table is the single source of truth for open/closed state.
/// Sessions are appended by entry observations, mutated exactly once by a
/// confirmed settlement, and never deleted.
pub trait LedgerStore {
    /// Append a new open session for `identity`
    ///
    /// Never fails except on a storage I/O error, which is fatal to the
    /// calling operation only.
    fn record_entry(
        &mut self,
        identity: &str,
        entry_time: NaiveDateTime,
    ) -> Result<SessionId, SettlementError>;

    /// Find the most recently recorded unpaid session for `identity`
    ///
    /// Sessions are scanned in reverse insertion order; the first unpaid
    /// match wins. `None` means "no session to settle", not an error -
    /// multiple unpaid sessions may coexist and only the latest is
    /// eligible. This is the sole matching rule: no session token comes
    /// back from the device, so matching is by identity alone.
    fn find_open_session(&self, identity: &str) -> Option<Session>;

    /// Atomically set `exit_time`, `amount` and `paid = true`
    ///
    /// # Errors
    ///
    /// - [`SettlementError::AlreadySettled`] if the session is already
    ///   paid (guards against duplicate settlement).
    /// - [`SettlementError::UnknownSession`] if the handle does not exist.
    /// - [`SettlementError::Storage`] if the backing store cannot be
    ///   rewritten; the previous table stays fully intact.
    fn settle_session(
        &mut self,
        id: SessionId,
        exit_time: NaiveDateTime,
        amount: Decimal,
    ) -> Result<(), SettlementError>;

    /// All sessions in insertion order, for inspection and output
    fn sessions(&self) -> Vec<Session>;
}

/// Append-only history of confirmed settlements
///
/// Records are appended only after the terminal has acknowledged the
/// charge, and are never mutated or deleted.
pub trait TransactionLog {
    /// Append one settled transaction record
    fn append(&mut self, record: &TransactionRecord) -> Result<(), SettlementError>;
}

/// Running balance per identity
///
/// Unknown identities are registered at a configured starting balance on
/// first observation. Balances are debited by successful settlement only;
/// this engine never credits them.
pub trait BalanceStore {
    /// Current balance for `identity`, registering it at the starting
    /// balance if unknown
    fn balance_or_default(&mut self, identity: &str) -> Result<Decimal, SettlementError>;

    /// Debit `amount` from the identity's balance
    ///
    /// Returns the new balance. The identity must already be registered.
    fn debit(&mut self, identity: &str, amount: Decimal) -> Result<Decimal, SettlementError>;
}

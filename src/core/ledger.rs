//! In-memory session ledger
//!
//! This module provides [`MemoryLedger`], the canonical in-memory
//! implementation of the [`LedgerStore`] contract, and
//! [`MemoryTransactionLog`], its append-only history counterpart. Both are
//! used directly in tests and embedded by the CSV-backed stores in
//! [`crate::io::csv_store`], which add durable persistence on top.
//!
//! # Matching Policy
//!
//! Multiple unpaid sessions may coexist for one identity. Lookup scans the
//! identity's sessions in reverse insertion order and returns the first
//! unpaid one: the most recent open session wins. This is the explicit
//! matching policy, not an accident of implementation.

use crate::core::traits::{LedgerStore, TransactionLog};
use crate::types::{Session, SessionId, SettlementError, TransactionRecord};
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use std::collections::HashMap;

/// In-memory session table with a per-identity index
///
/// Session handles are the insertion index, so they stay stable for the
/// lifetime of the ledger. Sessions are never removed.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    /// All sessions in insertion order
    sessions: Vec<Session>,
    /// Identity -> positions in `sessions`, in insertion order
    by_identity: HashMap<String, Vec<usize>>,
}

impl MemoryLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        MemoryLedger {
            sessions: Vec::new(),
            by_identity: HashMap::new(),
        }
    }

    /// Rebuild a ledger from previously stored sessions
    ///
    /// Handles are reassigned from insertion order, so callers must load
    /// rows in their original order.
    pub fn from_sessions(rows: Vec<Session>) -> Self {
        let mut ledger = MemoryLedger::new();
        for mut session in rows {
            let index = ledger.sessions.len();
            session.id = index as SessionId;
            ledger
                .by_identity
                .entry(session.identity.clone())
                .or_default()
                .push(index);
            ledger.sessions.push(session);
        }
        ledger
    }

    /// Number of sessions in the ledger
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether the ledger holds no sessions
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl LedgerStore for MemoryLedger {
    fn record_entry(
        &mut self,
        identity: &str,
        entry_time: NaiveDateTime,
    ) -> Result<SessionId, SettlementError> {
        let index = self.sessions.len();
        let id = index as SessionId;
        self.sessions.push(Session::open(id, identity, entry_time));
        self.by_identity
            .entry(identity.to_string())
            .or_default()
            .push(index);
        Ok(id)
    }

    fn find_open_session(&self, identity: &str) -> Option<Session> {
        let positions = self.by_identity.get(identity)?;
        positions
            .iter()
            .rev()
            .map(|&index| &self.sessions[index])
            .find(|session| !session.paid)
            .cloned()
    }

    fn settle_session(
        &mut self,
        id: SessionId,
        exit_time: NaiveDateTime,
        amount: Decimal,
    ) -> Result<(), SettlementError> {
        let session = self
            .sessions
            .get_mut(id as usize)
            .ok_or_else(|| SettlementError::unknown_session(id))?;

        if session.paid {
            return Err(SettlementError::already_settled(id));
        }

        session.exit_time = Some(exit_time);
        session.amount = Some(amount);
        session.paid = true;
        Ok(())
    }

    fn sessions(&self) -> Vec<Session> {
        self.sessions.clone()
    }
}

/// In-memory append-only transaction history
#[derive(Debug, Default)]
pub struct MemoryTransactionLog {
    records: Vec<TransactionRecord>,
}

impl MemoryTransactionLog {
    /// Create an empty history
    pub fn new() -> Self {
        MemoryTransactionLog {
            records: Vec::new(),
        }
    }

    /// All records in append order
    pub fn records(&self) -> &[TransactionRecord] {
        &self.records
    }
}

impl TransactionLog for MemoryTransactionLog {
    fn append(&mut self, record: &TransactionRecord) -> Result<(), SettlementError> {
        self.records.push(record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 6, 1)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn test_record_entry_creates_open_session() {
        let mut ledger = MemoryLedger::new();

        let id = ledger.record_entry("RAB123C", at(8, 0)).unwrap();

        let session = ledger.find_open_session("RAB123C").unwrap();
        assert_eq!(session.id, id);
        assert_eq!(session.identity, "RAB123C");
        assert_eq!(session.entry_time, at(8, 0));
        assert!(!session.paid);
        assert_eq!(session.exit_time, None);
        assert_eq!(session.amount, None);
    }

    #[test]
    fn test_find_open_session_unknown_identity() {
        let ledger = MemoryLedger::new();
        assert_eq!(ledger.find_open_session("UNKNOWN"), None);
    }

    #[test]
    fn test_find_open_session_returns_most_recent_unpaid() {
        let mut ledger = MemoryLedger::new();

        // Paid session at T0, then two unpaid entries at T1 and T3.
        let first = ledger.record_entry("RAB123C", at(8, 0)).unwrap();
        ledger
            .settle_session(first, at(9, 0), Decimal::from(200))
            .unwrap();
        ledger.record_entry("RAB123C", at(10, 0)).unwrap();
        let latest = ledger.record_entry("RAB123C", at(12, 0)).unwrap();

        let found = ledger.find_open_session("RAB123C").unwrap();
        assert_eq!(found.id, latest);
        assert_eq!(found.entry_time, at(12, 0));
    }

    #[test]
    fn test_find_open_session_skips_paid_sessions() {
        let mut ledger = MemoryLedger::new();

        let id = ledger.record_entry("RAB123C", at(8, 0)).unwrap();
        ledger
            .settle_session(id, at(9, 0), Decimal::from(200))
            .unwrap();

        assert_eq!(ledger.find_open_session("RAB123C"), None);
    }

    #[test]
    fn test_settle_session_sets_all_fields() {
        let mut ledger = MemoryLedger::new();
        let id = ledger.record_entry("CARD01", at(8, 0)).unwrap();

        ledger
            .settle_session(id, at(9, 30), Decimal::from(300))
            .unwrap();

        let session = &ledger.sessions()[id as usize];
        assert!(session.paid);
        assert_eq!(session.exit_time, Some(at(9, 30)));
        assert_eq!(session.amount, Some(Decimal::from(300)));
        // Entry time untouched by settlement.
        assert_eq!(session.entry_time, at(8, 0));
    }

    #[test]
    fn test_settle_session_twice_is_conflict() {
        let mut ledger = MemoryLedger::new();
        let id = ledger.record_entry("CARD01", at(8, 0)).unwrap();

        ledger
            .settle_session(id, at(9, 0), Decimal::from(200))
            .unwrap();

        // Duplicate acknowledgement delivery must not re-settle.
        let result = ledger.settle_session(id, at(10, 0), Decimal::from(400));
        assert_eq!(result, Err(SettlementError::already_settled(id)));

        // First settlement untouched.
        let session = &ledger.sessions()[id as usize];
        assert_eq!(session.exit_time, Some(at(9, 0)));
        assert_eq!(session.amount, Some(Decimal::from(200)));
    }

    #[test]
    fn test_settle_unknown_session() {
        let mut ledger = MemoryLedger::new();
        let result = ledger.settle_session(99, at(9, 0), Decimal::from(200));
        assert_eq!(result, Err(SettlementError::unknown_session(99)));
    }

    #[test]
    fn test_identities_do_not_interfere() {
        let mut ledger = MemoryLedger::new();
        ledger.record_entry("AAA111A", at(8, 0)).unwrap();
        ledger.record_entry("BBB222B", at(8, 30)).unwrap();

        assert_eq!(
            ledger.find_open_session("AAA111A").unwrap().identity,
            "AAA111A"
        );
        assert_eq!(
            ledger.find_open_session("BBB222B").unwrap().identity,
            "BBB222B"
        );
    }

    #[test]
    fn test_from_sessions_rebuilds_index() {
        let mut original = MemoryLedger::new();
        let first = original.record_entry("RAB123C", at(8, 0)).unwrap();
        original
            .settle_session(first, at(9, 0), Decimal::from(200))
            .unwrap();
        original.record_entry("RAB123C", at(10, 0)).unwrap();

        let rebuilt = MemoryLedger::from_sessions(original.sessions());

        assert_eq!(rebuilt.len(), 2);
        let open = rebuilt.find_open_session("RAB123C").unwrap();
        assert_eq!(open.entry_time, at(10, 0));
        assert!(!open.paid);
    }

    #[test]
    fn test_memory_transaction_log_appends_in_order() {
        let mut log = MemoryTransactionLog::new();

        let record = TransactionRecord {
            identity: "RAB123C".to_string(),
            entry_time: at(8, 0),
            exit_time: at(9, 30),
            duration_hours: Decimal::new(150, 2),
            amount_paid: Decimal::from(300),
        };
        log.append(&record).unwrap();
        log.append(&record).unwrap();

        assert_eq!(log.records().len(), 2);
        assert_eq!(log.records()[0], record);
    }
}

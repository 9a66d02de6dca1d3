//! Session and transaction record types for the parking settlement engine
//!
//! This module defines the parking session (the open-to-close occupancy
//! record for an identity) and the immutable transaction record produced
//! by a confirmed settlement.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;

/// Stable handle for a session issued by the ledger store
///
/// Handles are assigned in insertion order and never reused.
pub type SessionId = u64;

/// One vehicle/card occupancy of the parking facility
///
/// A session is created by an entry observation and mutated exactly once,
/// atomically, by a confirmed settlement. Sessions are never deleted.
///
/// # Invariants
///
/// - `entry_time` is immutable after creation.
/// - `paid` transitions false -> true at most once and never reverts.
/// - `exit_time` and `amount` are set together with `paid`, exactly once.
/// - Multiple unpaid sessions may coexist for one identity; only the most
///   recently recorded one is eligible for settlement.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    /// Handle assigned by the ledger store
    pub id: SessionId,

    /// Vehicle plate string or RFID card UID, the natural key
    pub identity: String,

    /// Time the entry was observed
    pub entry_time: NaiveDateTime,

    /// Time of settlement, empty while the session is open
    pub exit_time: Option<NaiveDateTime>,

    /// Whether the session has been settled
    pub paid: bool,

    /// Amount charged at settlement, empty while the session is open
    pub amount: Option<Decimal>,
}

impl Session {
    /// Create a new open session
    ///
    /// The session starts unpaid with no exit time or amount.
    pub fn open(id: SessionId, identity: impl Into<String>, entry_time: NaiveDateTime) -> Self {
        Session {
            id,
            identity: identity.into(),
            entry_time,
            exit_time: None,
            paid: false,
            amount: None,
        }
    }
}

/// Immutable record of a confirmed settlement
///
/// Created only after the payment terminal has acknowledged the charge.
/// Transaction records are append-only and are never mutated or deleted.
/// The ledger's session table remains the single source of truth for
/// open/closed state; this record is derived history.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRecord {
    /// Identity the settlement applies to
    pub identity: String,

    /// Entry time of the settled session
    pub entry_time: NaiveDateTime,

    /// Exit time recorded at settlement
    pub exit_time: NaiveDateTime,

    /// Elapsed occupancy in hours, rounded to two decimals
    pub duration_hours: Decimal,

    /// Amount debited for the session
    pub amount_paid: Decimal,
}

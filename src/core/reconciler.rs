//! Session reconciliation
//!
//! The [`Reconciler`] is the orchestrator: it consumes typed parking
//! events, matches payment-capable observations against the ledger's open
//! sessions, computes the fee, drives the settlement protocol, and - only
//! after the terminal has acknowledged - updates the ledger, debits the
//! balance table, and appends to the transaction history.
//!
//! # Ordering Guarantee
//!
//! The ledger is mutated strictly after terminal confirmation. An
//! interruption at any earlier point leaves the session correctly unpaid;
//! restart-safety comes from never mutating before confirmation, not from
//! rollback.
//!
//! # Matching Policy
//!
//! The device echoes no session token, so settlement matches by identity
//! alone: the most recently recorded open session for the identity is the
//! one settled. This heuristic is the explicit, sole matching rule.

use crate::core::settlement::{ChargeOutcome, SettlementDriver, TerminalLink};
use crate::core::tariff::{duration_hours, Tariff};
use crate::core::traits::{BalanceStore, LedgerStore, TransactionLog};
use crate::types::{ParkingEvent, SessionId, SettlementError, TransactionRecord};
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use std::fmt;

/// Terminal result of handling one event
///
/// Every event produces exactly one outcome, so the operator can always
/// tell settled, insufficient balance, no session, and device failure
/// apart.
#[derive(Debug, Clone, PartialEq)]
pub enum SettlementOutcome {
    /// A new session was opened for the identity
    EntryRecorded {
        identity: String,
        session: SessionId,
    },
    /// The session was settled and recorded
    Settled {
        identity: String,
        amount: Decimal,
        duration_hours: Decimal,
        remaining_balance: Decimal,
    },
    /// No open session exists for the identity; nothing was done
    NoOpenSession { identity: String },
    /// Reported balance below the amount due; no charge was sent
    InsufficientBalance {
        identity: String,
        balance: Decimal,
        due: Decimal,
    },
    /// The terminal timed out or rejected the charge; nothing was mutated
    DeviceFailure { identity: String, reason: String },
}

impl fmt::Display for SettlementOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettlementOutcome::EntryRecorded { identity, session } => {
                write!(f, "entry recorded for '{}' (session {})", identity, session)
            }
            SettlementOutcome::Settled {
                identity,
                amount,
                duration_hours,
                remaining_balance,
            } => write!(
                f,
                "settled '{}': charged {} for {} h, balance {}",
                identity, amount, duration_hours, remaining_balance
            ),
            SettlementOutcome::NoOpenSession { identity } => {
                write!(f, "no open session for '{}'", identity)
            }
            SettlementOutcome::InsufficientBalance {
                identity,
                balance,
                due,
            } => write!(
                f,
                "insufficient balance for '{}': balance {}, due {}",
                identity, balance, due
            ),
            SettlementOutcome::DeviceFailure { identity, reason } => {
                write!(f, "device failure settling '{}': {}", identity, reason)
            }
        }
    }
}

/// Orchestrates event handling across ledger, tariff, driver, and history
///
/// Stores are trait parameters so the in-memory and CSV-backed
/// implementations interchange. The reconciler is single-threaded; the
/// driver's bounded wait is its only suspension point.
pub struct Reconciler<L, T, B>
where
    L: LedgerStore,
    T: TransactionLog,
    B: BalanceStore,
{
    ledger: L,
    history: T,
    balances: B,
    tariff: Tariff,
    driver: SettlementDriver,
}

impl<L, T, B> Reconciler<L, T, B>
where
    L: LedgerStore,
    T: TransactionLog,
    B: BalanceStore,
{
    /// Create a reconciler over the given stores and policy
    pub fn new(ledger: L, history: T, balances: B, tariff: Tariff, driver: SettlementDriver) -> Self {
        Reconciler {
            ledger,
            history,
            balances,
            tariff,
            driver,
        }
    }

    /// Read access to the ledger store
    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Read access to the transaction history
    pub fn history(&self) -> &T {
        &self.history
    }

    /// Read access to the balance table
    pub fn balances(&self) -> &B {
        &self.balances
    }

    /// Handle one event at wall-clock time `now`
    ///
    /// Entry observations open a session (registering the identity in the
    /// balance table if unknown). Payment-capable observations run the
    /// settlement sequence. Session matching misses and failed settlement
    /// preconditions are outcomes, not errors; only storage and link
    /// failures surface as `Err`.
    pub fn handle_event(
        &mut self,
        link: &mut dyn TerminalLink,
        event: ParkingEvent,
        now: NaiveDateTime,
    ) -> Result<SettlementOutcome, SettlementError> {
        match event {
            ParkingEvent::EntryObserved { identity, time } => self.handle_entry(&identity, time),
            ParkingEvent::PaymentCapableObserved { identity, balance } => {
                self.handle_payment(link, &identity, balance, now)
            }
        }
    }

    /// Open a session for an observed entry
    fn handle_entry(
        &mut self,
        identity: &str,
        time: NaiveDateTime,
    ) -> Result<SettlementOutcome, SettlementError> {
        // First sighting of a card registers it at the starting balance.
        self.balances.balance_or_default(identity)?;
        let session = self.ledger.record_entry(identity, time)?;
        Ok(SettlementOutcome::EntryRecorded {
            identity: identity.to_string(),
            session,
        })
    }

    /// Run the settlement sequence for a payment-capable observation
    fn handle_payment(
        &mut self,
        link: &mut dyn TerminalLink,
        identity: &str,
        reported_balance: Decimal,
        now: NaiveDateTime,
    ) -> Result<SettlementOutcome, SettlementError> {
        // 1. Match the most recent open session for this identity.
        let session = match self.ledger.find_open_session(identity) {
            Some(session) => session,
            None => {
                return Ok(SettlementOutcome::NoOpenSession {
                    identity: identity.to_string(),
                })
            }
        };

        // 2. Compute the amount due.
        let amount_due = self.tariff.fee(session.entry_time, now);

        // 3. Refuse to send a charge the balance cannot honor.
        if reported_balance < amount_due {
            return Ok(SettlementOutcome::InsufficientBalance {
                identity: identity.to_string(),
                balance: reported_balance,
                due: amount_due,
            });
        }

        // 4. Terminal confirmation strictly before any mutation.
        match self.driver.charge(link, amount_due)? {
            ChargeOutcome::Acknowledged => {}
            ChargeOutcome::TimedOut => {
                return Ok(SettlementOutcome::DeviceFailure {
                    identity: identity.to_string(),
                    reason: SettlementError::protocol_timeout(
                        self.driver.ack_timeout().as_secs(),
                    )
                    .to_string(),
                })
            }
            ChargeOutcome::Rejected(token) => {
                return Ok(SettlementOutcome::DeviceFailure {
                    identity: identity.to_string(),
                    reason: SettlementError::protocol_rejected(&token).to_string(),
                })
            }
        }

        // 5. Acknowledged: close the session, debit, append history.
        self.ledger.settle_session(session.id, now, amount_due)?;
        self.balances.balance_or_default(identity)?;
        let remaining_balance = self.balances.debit(identity, amount_due)?;

        let hours = duration_hours(session.entry_time, now);
        self.history.append(&TransactionRecord {
            identity: identity.to_string(),
            entry_time: session.entry_time,
            exit_time: now,
            duration_hours: hours,
            amount_paid: amount_due,
        })?;

        Ok(SettlementOutcome::Settled {
            identity: identity.to_string(),
            amount: amount_due,
            duration_hours: hours,
            remaining_balance,
        })
    }
}

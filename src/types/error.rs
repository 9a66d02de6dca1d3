//! Error types for the parking settlement engine
//!
//! This module defines all errors that can occur while reconciling parking
//! sessions and settling payments. Errors are designed to be descriptive
//! and user-friendly for operator-facing output.
//!
//! # Error Categories
//!
//! - **Session matching**: no open session for an identity (informational,
//!   never fatal - the reconciler reports it and moves on).
//! - **Settlement preconditions**: insufficient reported balance.
//! - **Protocol failures**: the terminal timed out or rejected a charge.
//!   These abort the settlement with no store mutation; the attempt is
//!   safely retryable.
//! - **Storage**: conflicts (double settlement) and I/O failures. I/O
//!   failures are fatal to the current operation but must never corrupt
//!   the backing files.
//! - **Parsing**: malformed feed lines, recoverable (line is skipped).

use crate::types::SessionId;
use rust_decimal::Decimal;
use thiserror::Error;

/// Main error type for the settlement engine
///
/// Each variant carries the context needed to diagnose the failure from a
/// log line alone.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SettlementError {
    /// No open session exists for the identity
    ///
    /// Informational: the reconciler reports "no open session" and takes
    /// no further action.
    #[error("no open session for identity '{identity}'")]
    NoOpenSession {
        /// Identity that had no open session
        identity: String,
    },

    /// Reported balance is below the amount due
    ///
    /// The settlement is aborted before any charge is sent; the session
    /// stays open.
    #[error("insufficient balance for '{identity}': balance {balance}, due {due}")]
    InsufficientBalance {
        /// Identity that could not pay
        identity: String,
        /// Balance reported by the device
        balance: Decimal,
        /// Amount the tariff computed
        due: Decimal,
    },

    /// The terminal did not respond within the bounded wait window
    ///
    /// No store mutation has happened; the session remains unpaid and the
    /// attempt may be retried.
    #[error("terminal did not acknowledge within {waited_secs}s")]
    ProtocolTimeout {
        /// Length of the wait window in seconds
        waited_secs: u64,
    },

    /// The terminal answered with a non-success token
    ///
    /// Treated identically to a timeout for ledger purposes (no mutation),
    /// but the distinguishing token is preserved for the log.
    #[error("terminal rejected charge with token '{token}'")]
    ProtocolRejected {
        /// The token the terminal returned instead of the success token
        token: String,
    },

    /// The session was already settled
    ///
    /// Idempotency guard against duplicate settlement, e.g. a retried
    /// acknowledgement. The store is left unchanged.
    #[error("session {session} is already settled")]
    AlreadySettled {
        /// Handle of the already-paid session
        session: SessionId,
    },

    /// The session handle does not exist in the ledger
    #[error("unknown session {session}")]
    UnknownSession {
        /// Handle that was not found
        session: SessionId,
    },

    /// Backing store could not be read or written
    ///
    /// Fatal to the current operation. Mutations are applied via
    /// whole-file replace, so a failure here never leaves a partially
    /// written table behind.
    #[error("storage error: {message}")]
    Storage {
        /// Description of the storage failure
        message: String,
    },

    /// The terminal link could not be used
    #[error("terminal link error: {message}")]
    Link {
        /// Description of the link failure
        message: String,
    },

    /// A device feed line could not be parsed
    ///
    /// Recoverable: the line is skipped and the loop continues.
    #[error("parse error{}: {message}", line.map(|l| format!(" at line {}", l)).unwrap_or_default())]
    Parse {
        /// Feed line number where the error occurred (if known)
        line: Option<u64>,
        /// Description of the parsing error
        message: String,
    },

    /// A balance token could not be parsed as a number
    #[error("invalid balance value '{value}'")]
    InvalidBalance {
        /// The malformed balance token
        value: String,
    },
}

impl From<std::io::Error> for SettlementError {
    fn from(error: std::io::Error) -> Self {
        SettlementError::Storage {
            message: error.to_string(),
        }
    }
}

impl From<csv::Error> for SettlementError {
    fn from(error: csv::Error) -> Self {
        let line = error.position().map(|pos| pos.line());
        SettlementError::Parse {
            line,
            message: error.to_string(),
        }
    }
}

// Helper constructors for common errors

impl SettlementError {
    /// Create a NoOpenSession error
    pub fn no_open_session(identity: &str) -> Self {
        SettlementError::NoOpenSession {
            identity: identity.to_string(),
        }
    }

    /// Create an InsufficientBalance error
    pub fn insufficient_balance(identity: &str, balance: Decimal, due: Decimal) -> Self {
        SettlementError::InsufficientBalance {
            identity: identity.to_string(),
            balance,
            due,
        }
    }

    /// Create a ProtocolTimeout error
    pub fn protocol_timeout(waited_secs: u64) -> Self {
        SettlementError::ProtocolTimeout { waited_secs }
    }

    /// Create a ProtocolRejected error
    pub fn protocol_rejected(token: &str) -> Self {
        SettlementError::ProtocolRejected {
            token: token.to_string(),
        }
    }

    /// Create an AlreadySettled error
    pub fn already_settled(session: SessionId) -> Self {
        SettlementError::AlreadySettled { session }
    }

    /// Create an UnknownSession error
    pub fn unknown_session(session: SessionId) -> Self {
        SettlementError::UnknownSession { session }
    }

    /// Create a Storage error
    pub fn storage(message: impl Into<String>) -> Self {
        SettlementError::Storage {
            message: message.into(),
        }
    }

    /// Create a Link error
    pub fn link(message: impl Into<String>) -> Self {
        SettlementError::Link {
            message: message.into(),
        }
    }

    /// Create a Parse error with a feed line number
    pub fn parse(line: Option<u64>, message: impl Into<String>) -> Self {
        SettlementError::Parse {
            line,
            message: message.into(),
        }
    }

    /// Create an InvalidBalance error
    pub fn invalid_balance(value: &str) -> Self {
        SettlementError::InvalidBalance {
            value: value.to_string(),
        }
    }
}

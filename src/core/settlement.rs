//! Settlement protocol driver
//!
//! This module drives the request/acknowledge exchange with the payment
//! terminal for a single charge. The driver owns no link itself; the link
//! is an explicitly owned resource object passed in per attempt, never a
//! process-wide singleton.
//!
//! # Protocol
//!
//! Per settlement attempt the driver walks the state machine
//!
//! ```text
//! Idle -> ChargeSent -> { Acknowledged | TimedOut | Rejected }
//! ```
//!
//! - `Idle -> ChargeSent`: exactly one `CHARGE <amount>` line is written
//!   to the link.
//! - `Acknowledged`: the terminal answered with the success token within
//!   the bounded wait window.
//! - `TimedOut`: no response of any kind within the window. The session
//!   stays unpaid and the attempt may be retried.
//! - `Rejected`: any non-success token. Identical to a timeout for ledger
//!   purposes, but the token is kept for the log.
//!
//! Only `Acknowledged` permits any store mutation. Terminal confirmation
//! strictly before ledger mutation is the core correctness guarantee: a
//! payment the physical terminal never completed is never recorded, and an
//! interruption while waiting leaves the ledger already correct.

use crate::types::SettlementError;
use rust_decimal::Decimal;
use std::time::{Duration, Instant};

/// Success token the terminal returns for a completed charge
pub const ACK_TOKEN: &str = "DONE";

/// Byte link to the payment terminal
///
/// Newline-framed text in both directions. Implementations decide how the
/// bounded read is realized (reader thread, scripted queue, ...).
pub trait TerminalLink {
    /// Write one line to the terminal
    fn send_line(&mut self, line: &str) -> Result<(), SettlementError>;

    /// Read one line, waiting at most `wait`
    ///
    /// `Ok(None)` means nothing arrived within the window (timeout or the
    /// device went away); both leave the caller free to retry later.
    fn recv_line(&mut self, wait: Duration) -> Result<Option<String>, SettlementError>;
}

impl TerminalLink for Box<dyn TerminalLink> {
    fn send_line(&mut self, line: &str) -> Result<(), SettlementError> {
        (**self).send_line(line)
    }

    fn recv_line(&mut self, wait: Duration) -> Result<Option<String>, SettlementError> {
        (**self).recv_line(wait)
    }
}

/// Terminal response to a single charge attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChargeOutcome {
    /// Success token received; the charge was applied by the terminal
    Acknowledged,
    /// No response within the wait window
    TimedOut,
    /// Non-success token received, preserved for the log
    Rejected(String),
}

/// Drives one charge exchange per call
#[derive(Debug, Clone)]
pub struct SettlementDriver {
    ack_timeout: Duration,
}

impl SettlementDriver {
    /// Create a driver with the given acknowledgement window
    pub fn new(ack_timeout: Duration) -> Self {
        SettlementDriver { ack_timeout }
    }

    /// Length of the acknowledgement window
    pub fn ack_timeout(&self) -> Duration {
        self.ack_timeout
    }

    /// Send `CHARGE <amount>` and wait for the terminal's verdict
    ///
    /// Exactly one charge command is written per call. Blank lines read
    /// before the deadline are skipped without consuming the attempt; the
    /// first non-blank line decides the outcome.
    ///
    /// # Errors
    ///
    /// Returns an error only for link-level failures (write failed, read
    /// failed). Timeouts and rejections are outcomes, not errors.
    pub fn charge(
        &self,
        link: &mut dyn TerminalLink,
        amount: Decimal,
    ) -> Result<ChargeOutcome, SettlementError> {
        // Idle -> ChargeSent
        link.send_line(&format!("CHARGE {}", amount))?;

        // ChargeSent -> { Acknowledged | TimedOut | Rejected }
        let deadline = Instant::now() + self.ack_timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(ChargeOutcome::TimedOut);
            }

            match link.recv_line(remaining)? {
                None => return Ok(ChargeOutcome::TimedOut),
                Some(line) => {
                    let token = line.trim();
                    if token.is_empty() {
                        continue;
                    }
                    if token == ACK_TOKEN {
                        return Ok(ChargeOutcome::Acknowledged);
                    }
                    return Ok(ChargeOutcome::Rejected(token.to_string()));
                }
            }
        }
    }
}

//! Event source adapter
//!
//! Translates raw device feed lines into typed [`ParkingEvent`]s through a
//! streaming iterator. The reconciler never sees the wire format.
//!
//! # Accepted Line Forms
//!
//! Two gate-side devices exist, so four line forms are understood:
//!
//! - `ENTRY:<identity>` - an entry observation
//! - `CARD_UID:<identity>` - an entry observation from the RFID reader
//!   (UIDs are uppercased, matching the reader firmware)
//! - `PLATE:<identity>|BALANCE:<n>` - a payment-capable observation
//! - the two-line ANPR form, `Plate Number: <identity>` followed by
//!   `Balance     : <n>`, accumulated across lines
//!
//! Blank lines are skipped. Malformed lines yield recoverable parse
//! errors with their line number; the iterator continues afterwards.

use crate::types::{ParkingEvent, SettlementError};
use chrono::Local;
use rust_decimal::Decimal;
use std::io::BufRead;
use std::str::FromStr;

/// Streaming reader over a raw device feed
///
/// Yields `Result<ParkingEvent, SettlementError>` per meaningful line,
/// one event at a time without buffering the feed.
#[derive(Debug)]
pub struct EventReader<R: BufRead> {
    lines: std::io::Lines<R>,
    line_num: u64,
    /// Plate seen on a `Plate Number:` line, waiting for its balance line
    pending_plate: Option<String>,
}

impl<R: BufRead> EventReader<R> {
    /// Create a reader over any buffered byte source
    pub fn new(reader: R) -> Self {
        EventReader {
            lines: reader.lines(),
            line_num: 0,
            pending_plate: None,
        }
    }

    /// Parse one non-blank line
    ///
    /// `Ok(None)` means the line was consumed but completes no event yet
    /// (the first half of the two-line ANPR form).
    fn parse_line(&mut self, line: &str) -> Result<Option<ParkingEvent>, SettlementError> {
        if let Some(identity) = line.strip_prefix("ENTRY:") {
            return self.entry_event(identity.trim().to_string());
        }

        if let Some(identity) = line.strip_prefix("CARD_UID:") {
            return self.entry_event(identity.trim().to_uppercase());
        }

        if let Some(rest) = line.strip_prefix("PLATE:") {
            let (identity, balance) = rest.split_once("|BALANCE:").ok_or_else(|| {
                SettlementError::parse(Some(self.line_num), "missing BALANCE token")
            })?;
            let identity = identity.trim();
            if identity.is_empty() {
                return Err(SettlementError::parse(Some(self.line_num), "empty identity"));
            }
            return Ok(Some(ParkingEvent::PaymentCapableObserved {
                identity: identity.to_string(),
                balance: parse_balance(balance)?,
            }));
        }

        if let Some(plate) = line.strip_prefix("Plate Number:") {
            self.pending_plate = Some(plate.trim().to_string());
            return Ok(None);
        }

        if line.starts_with("Balance") {
            let balance = line.split_once(':').map(|(_, v)| v).ok_or_else(|| {
                SettlementError::parse(Some(self.line_num), "missing balance value")
            })?;
            let identity = self.pending_plate.take().ok_or_else(|| {
                SettlementError::parse(Some(self.line_num), "balance line without a plate")
            })?;
            return Ok(Some(ParkingEvent::PaymentCapableObserved {
                identity,
                balance: parse_balance(balance)?,
            }));
        }

        Err(SettlementError::parse(
            Some(self.line_num),
            format!("unrecognized line '{}'", line),
        ))
    }

    fn entry_event(&self, identity: String) -> Result<Option<ParkingEvent>, SettlementError> {
        if identity.is_empty() {
            return Err(SettlementError::parse(Some(self.line_num), "empty identity"));
        }
        Ok(Some(ParkingEvent::EntryObserved {
            identity,
            time: Local::now().naive_local(),
        }))
    }
}

fn parse_balance(value: &str) -> Result<Decimal, SettlementError> {
    let value = value.trim();
    Decimal::from_str(value).map_err(|_| SettlementError::invalid_balance(value))
}

impl<R: BufRead> Iterator for EventReader<R> {
    type Item = Result<ParkingEvent, SettlementError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(SettlementError::from(e))),
            };
            self.line_num += 1;

            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            match self.parse_line(line) {
                Ok(Some(event)) => return Some(Ok(event)),
                Ok(None) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

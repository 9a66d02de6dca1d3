//! CSV-backed store implementations
//!
//! Durable counterparts of the in-memory stores, persisting to three CSV
//! tables under a data directory:
//!
//! - `parking_records.csv` - sessions (`UID,EntryTime,ExitTime,Paid,Amount`)
//! - `transactions.csv` - settled history
//!   (`UID,EntryTime,ExitTime,DurationHours,Paid,AmountPaid`), append-only
//! - `rfid_balances.csv` - running balances (`UID,Balance`)
//!
//! # Atomicity
//!
//! The session and balance tables are rewritten in full on every mutation:
//! the new table is written to a temporary file and atomically renamed
//! over the old one, so no reader ever observes a half-written table and
//! a failed write leaves the previous table fully intact. The transaction
//! history is strictly append-only with its header written once.
//!
//! # Timestamps
//!
//! Times are stored as ISO-8601 `%Y-%m-%dT%H:%M:%S`. The space-separated
//! `%Y-%m-%d %H:%M:%S` form found in older record files is accepted on
//! read.

use crate::core::ledger::MemoryLedger;
use crate::core::traits::{BalanceStore, LedgerStore, TransactionLog};
use crate::types::{Session, SessionId, SettlementError, TransactionRecord};
use chrono::NaiveDateTime;
use csv::{ReaderBuilder, Trim, Writer, WriterBuilder};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::str::FromStr;

const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
const LEGACY_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const SESSION_HEADER: [&str; 5] = ["UID", "EntryTime", "ExitTime", "Paid", "Amount"];
const TRANSACTION_HEADER: [&str; 6] = [
    "UID",
    "EntryTime",
    "ExitTime",
    "DurationHours",
    "Paid",
    "AmountPaid",
];
const BALANCE_HEADER: [&str; 2] = ["UID", "Balance"];

fn format_time(time: NaiveDateTime) -> String {
    time.format(TIME_FORMAT).to_string()
}

fn parse_time(value: &str) -> Result<NaiveDateTime, SettlementError> {
    NaiveDateTime::parse_from_str(value, TIME_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(value, LEGACY_TIME_FORMAT))
        .map_err(|_| SettlementError::storage(format!("invalid timestamp '{}'", value)))
}

fn parse_amount(value: &str) -> Result<Decimal, SettlementError> {
    Decimal::from_str(value)
        .map_err(|_| SettlementError::storage(format!("invalid amount '{}'", value)))
}

/// Write a whole CSV table to `path` in one observable step
///
/// Rows are written to `<path>.tmp` and renamed over the target, so the
/// previous table survives any failure before the rename.
fn atomic_write<F>(path: &Path, header: &[&str], write_rows: F) -> Result<(), SettlementError>
where
    F: FnOnce(&mut Writer<File>) -> Result<(), SettlementError>,
{
    let tmp = path.with_extension("csv.tmp");
    {
        let file = File::create(&tmp)?;
        let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
        writer.write_record(header).map_err(SettlementError::from)?;
        write_rows(&mut writer)?;
        writer.flush()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

/// One row of `parking_records.csv`
///
/// Fields stay strings so the table round-trips exactly as written.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SessionRow {
    #[serde(rename = "UID")]
    uid: String,
    #[serde(rename = "EntryTime")]
    entry_time: String,
    #[serde(rename = "ExitTime")]
    exit_time: String,
    #[serde(rename = "Paid")]
    paid: String,
    #[serde(rename = "Amount")]
    amount: String,
}

impl SessionRow {
    fn from_session(session: &Session) -> Self {
        SessionRow {
            uid: session.identity.clone(),
            entry_time: format_time(session.entry_time),
            exit_time: session.exit_time.map(format_time).unwrap_or_default(),
            paid: if session.paid { "1" } else { "0" }.to_string(),
            amount: session
                .amount
                .map(|a| a.to_string())
                .unwrap_or_default(),
        }
    }

    fn into_session(self, id: SessionId) -> Result<Session, SettlementError> {
        let paid = match self.paid.trim() {
            "1" => true,
            "0" | "" => false,
            other => {
                return Err(SettlementError::storage(format!(
                    "invalid paid flag '{}' for '{}'",
                    other, self.uid
                )))
            }
        };
        let exit_time = match self.exit_time.trim() {
            "" => None,
            value => Some(parse_time(value)?),
        };
        let amount = match self.amount.trim() {
            "" => None,
            value => Some(parse_amount(value)?),
        };
        Ok(Session {
            id,
            identity: self.uid,
            entry_time: parse_time(self.entry_time.trim())?,
            exit_time,
            paid,
            amount,
        })
    }
}

/// CSV-backed session ledger
///
/// Embeds a [`MemoryLedger`] as the working index and rewrites the whole
/// backing file atomically on each mutation. A failed rewrite restores the
/// in-memory index to the on-disk state, so memory and disk never diverge.
#[derive(Debug)]
pub struct CsvLedgerStore {
    path: PathBuf,
    ledger: MemoryLedger,
}

impl CsvLedgerStore {
    /// Open the session table at `path`, creating an empty one (header
    /// only) if the file does not exist
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SettlementError> {
        let path = path.into();
        if !path.exists() {
            atomic_write(&path, &SESSION_HEADER, |_| Ok(()))?;
            return Ok(CsvLedgerStore {
                path,
                ledger: MemoryLedger::new(),
            });
        }

        let file = File::open(&path)?;
        let mut reader = ReaderBuilder::new().trim(Trim::All).from_reader(file);
        let mut sessions = Vec::new();
        for (index, row) in reader.deserialize::<SessionRow>().enumerate() {
            let row = row.map_err(|e| {
                SettlementError::storage(format!("{}: {}", path.display(), e))
            })?;
            sessions.push(row.into_session(index as SessionId)?);
        }
        Ok(CsvLedgerStore {
            path,
            ledger: MemoryLedger::from_sessions(sessions),
        })
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) -> Result<(), SettlementError> {
        let sessions = self.ledger.sessions();
        atomic_write(&self.path, &SESSION_HEADER, move |writer| {
            for session in &sessions {
                writer
                    .serialize(SessionRow::from_session(session))
                    .map_err(SettlementError::from)?;
            }
            Ok(())
        })
    }
}

impl LedgerStore for CsvLedgerStore {
    fn record_entry(
        &mut self,
        identity: &str,
        entry_time: NaiveDateTime,
    ) -> Result<SessionId, SettlementError> {
        let backup = self.ledger.sessions();
        let id = self.ledger.record_entry(identity, entry_time)?;
        if let Err(e) = self.persist() {
            self.ledger = MemoryLedger::from_sessions(backup);
            return Err(e);
        }
        Ok(id)
    }

    fn find_open_session(&self, identity: &str) -> Option<Session> {
        self.ledger.find_open_session(identity)
    }

    fn settle_session(
        &mut self,
        id: SessionId,
        exit_time: NaiveDateTime,
        amount: Decimal,
    ) -> Result<(), SettlementError> {
        let backup = self.ledger.sessions();
        self.ledger.settle_session(id, exit_time, amount)?;
        if let Err(e) = self.persist() {
            self.ledger = MemoryLedger::from_sessions(backup);
            return Err(e);
        }
        Ok(())
    }

    fn sessions(&self) -> Vec<Session> {
        self.ledger.sessions()
    }
}

/// Append-only CSV transaction history
///
/// The header is written once when the file is created; every confirmed
/// settlement appends exactly one row.
#[derive(Debug)]
pub struct CsvTransactionLog {
    path: PathBuf,
}

impl CsvTransactionLog {
    /// Open the history at `path`, creating it (header only) if missing
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SettlementError> {
        let path = path.into();
        if !path.exists() {
            atomic_write(&path, &TRANSACTION_HEADER, |_| Ok(()))?;
        }
        Ok(CsvTransactionLog { path })
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read all records back, for inspection and tests
    pub fn records(&self) -> Result<Vec<TransactionRecord>, SettlementError> {
        let file = File::open(&self.path)?;
        let mut reader = ReaderBuilder::new().trim(Trim::All).from_reader(file);
        let mut records = Vec::new();
        for row in reader.records() {
            let row = row.map_err(SettlementError::from)?;
            if row.len() != TRANSACTION_HEADER.len() {
                return Err(SettlementError::storage(format!(
                    "{}: malformed history row",
                    self.path.display()
                )));
            }
            records.push(TransactionRecord {
                identity: row[0].to_string(),
                entry_time: parse_time(&row[1])?,
                exit_time: parse_time(&row[2])?,
                duration_hours: parse_amount(&row[3])?,
                amount_paid: parse_amount(&row[5])?,
            });
        }
        Ok(records)
    }
}

impl TransactionLog for CsvTransactionLog {
    fn append(&mut self, record: &TransactionRecord) -> Result<(), SettlementError> {
        let file = OpenOptions::new().append(true).open(&self.path)?;
        let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
        writer
            .write_record([
                record.identity.as_str(),
                &format_time(record.entry_time),
                &format_time(record.exit_time),
                &record.duration_hours.to_string(),
                "1",
                &record.amount_paid.to_string(),
            ])
            .map_err(SettlementError::from)?;
        writer.flush()?;
        Ok(())
    }
}

/// CSV-backed balance table
///
/// Rows are kept in file order; the table is rewritten atomically on
/// registration and on each debit.
#[derive(Debug)]
pub struct CsvBalanceStore {
    path: PathBuf,
    rows: Vec<(String, Decimal)>,
    index: HashMap<String, usize>,
    starting_balance: Decimal,
}

impl CsvBalanceStore {
    /// Open the balance table at `path`, creating it (header only) if
    /// missing
    pub fn open(
        path: impl Into<PathBuf>,
        starting_balance: Decimal,
    ) -> Result<Self, SettlementError> {
        let path = path.into();
        let mut rows = Vec::new();
        let mut index = HashMap::new();

        if path.exists() {
            let file = File::open(&path)?;
            let mut reader = ReaderBuilder::new().trim(Trim::All).from_reader(file);
            for row in reader.records() {
                let row = row.map_err(SettlementError::from)?;
                if row.len() != BALANCE_HEADER.len() {
                    return Err(SettlementError::storage(format!(
                        "{}: malformed balance row",
                        path.display()
                    )));
                }
                let identity = row[0].to_string();
                let balance = parse_amount(&row[1])?;
                index.insert(identity.clone(), rows.len());
                rows.push((identity, balance));
            }
        } else {
            atomic_write(&path, &BALANCE_HEADER, |_| Ok(()))?;
        }

        Ok(CsvBalanceStore {
            path,
            rows,
            index,
            starting_balance,
        })
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current balance without registering unknown identities
    pub fn get(&self, identity: &str) -> Option<Decimal> {
        self.index.get(identity).map(|&i| self.rows[i].1)
    }

    fn persist(&self) -> Result<(), SettlementError> {
        atomic_write(&self.path, &BALANCE_HEADER, |writer| {
            for (identity, balance) in &self.rows {
                writer
                    .write_record([identity.as_str(), &balance.to_string()])
                    .map_err(SettlementError::from)?;
            }
            Ok(())
        })
    }
}

impl BalanceStore for CsvBalanceStore {
    fn balance_or_default(&mut self, identity: &str) -> Result<Decimal, SettlementError> {
        if let Some(&i) = self.index.get(identity) {
            return Ok(self.rows[i].1);
        }
        self.index.insert(identity.to_string(), self.rows.len());
        self.rows
            .push((identity.to_string(), self.starting_balance));
        if let Err(e) = self.persist() {
            self.index.remove(identity);
            self.rows.pop();
            return Err(e);
        }
        Ok(self.starting_balance)
    }

    fn debit(&mut self, identity: &str, amount: Decimal) -> Result<Decimal, SettlementError> {
        let &i = self.index.get(identity).ok_or_else(|| {
            SettlementError::storage(format!("no balance registered for '{}'", identity))
        })?;
        let previous = self.rows[i].1;
        self.rows[i].1 = previous - amount;
        if let Err(e) = self.persist() {
            self.rows[i].1 = previous;
            return Err(e);
        }
        Ok(self.rows[i].1)
    }
}

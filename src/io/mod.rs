//! I/O module
//!
//! Handles CSV persistence, the device event feed, and the terminal link.
//!
//! # Components
//!
//! - `csv_store` - CSV-backed ledger, history, and balance stores
//! - `event_reader` - streaming adapter from raw feed lines to typed events
//! - `terminal` - terminal link implementations for the settlement driver

pub mod csv_store;
pub mod event_reader;
pub mod terminal;

pub use csv_store::{CsvBalanceStore, CsvLedgerStore, CsvTransactionLog};
pub use event_reader::EventReader;
pub use terminal::{AckLink, LineLink};

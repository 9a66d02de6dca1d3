//! Parking Settlement Engine CLI
//!
//! Command-line entry point for the gate controller.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- events.txt
//! cargo run -- --data-dir /var/lib/parking --terminal /dev/ttyUSB0 -
//! cargo run -- --tariff linear --rate 200 events.txt
//! ```
//!
//! The program consumes device feed lines from the given file (or stdin
//! with `-`), reconciles them against the CSV tables under the data
//! directory, and prints one status line per event to stdout. When a
//! terminal device path is given, charges are settled over it; otherwise
//! every charge is auto-acknowledged.
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: Fatal error (unreadable store, missing event file, bad device path)

use parking_settlement_engine::cli::{self, CliArgs};
use parking_settlement_engine::controller::Controller;
use parking_settlement_engine::core::{Reconciler, SettlementDriver, TerminalLink};
use parking_settlement_engine::io::csv_store::{CsvBalanceStore, CsvLedgerStore, CsvTransactionLog};
use parking_settlement_engine::io::terminal::{AckLink, LineLink};
use parking_settlement_engine::types::SettlementError;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader};
use std::process;

fn main() {
    let args = cli::parse_args();

    if let Err(e) = run(&args) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(args: &CliArgs) -> Result<(), SettlementError> {
    fs::create_dir_all(&args.data_dir)?;

    let ledger = CsvLedgerStore::open(args.data_dir.join("parking_records.csv"))?;
    let history = CsvTransactionLog::open(args.data_dir.join("transactions.csv"))?;
    let balances = CsvBalanceStore::open(
        args.data_dir.join("rfid_balances.csv"),
        args.starting_balance,
    )?;

    let reconciler = Reconciler::new(
        ledger,
        history,
        balances,
        args.to_tariff(),
        SettlementDriver::new(args.ack_timeout()),
    );

    // Terminal link as an owned resource for the life of the run loop.
    let link: Box<dyn TerminalLink> = match &args.terminal {
        Some(path) => {
            let reader = File::open(path)
                .map_err(|e| SettlementError::link(format!("{}: {}", path.display(), e)))?;
            let writer = OpenOptions::new()
                .write(true)
                .open(path)
                .map_err(|e| SettlementError::link(format!("{}: {}", path.display(), e)))?;
            Box::new(LineLink::spawn(reader, writer))
        }
        None => Box::new(AckLink::new()),
    };

    let mut controller = Controller::new(reconciler, link);
    let stdout = io::stdout();
    let mut status = stdout.lock();

    if args.events_from_stdin() {
        let stdin = io::stdin();
        controller.run(stdin.lock(), &mut status)
    } else {
        let file = File::open(&args.events).map_err(|e| {
            SettlementError::storage(format!(
                "failed to open events file '{}': {}",
                args.events.display(),
                e
            ))
        })?;
        controller.run(BufReader::new(file), &mut status)
    }
}

//! End-to-end integration tests
//!
//! These tests exercise the complete pipeline - event feed parsing,
//! session reconciliation, the settlement protocol, and CSV persistence -
//! over temporary data directories. The terminal is a [`LineLink`] over
//! in-memory byte streams: a pre-scripted response stream stands in for a
//! responsive terminal, an empty stream for a dead one.

use chrono::{NaiveDate, NaiveDateTime};
use parking_settlement_engine::core::{
    LedgerStore, Reconciler, SettlementDriver, SettlementOutcome, Tariff,
};
use parking_settlement_engine::io::csv_store::{
    CsvBalanceStore, CsvLedgerStore, CsvTransactionLog,
};
use parking_settlement_engine::io::terminal::LineLink;
use parking_settlement_engine::types::ParkingEvent;
use parking_settlement_engine::Controller;
use rust_decimal::Decimal;
use std::fs;
use std::io::{self, Cursor};
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;

fn at(h: u32, m: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 6, 1)
        .unwrap()
        .and_hms_opt(h, m, 0)
        .unwrap()
}

fn open_reconciler(
    dir: &Path,
    tariff: Tariff,
) -> Reconciler<CsvLedgerStore, CsvTransactionLog, CsvBalanceStore> {
    let ledger = CsvLedgerStore::open(dir.join("parking_records.csv")).unwrap();
    let history = CsvTransactionLog::open(dir.join("transactions.csv")).unwrap();
    let balances =
        CsvBalanceStore::open(dir.join("rfid_balances.csv"), Decimal::new(50000, 2)).unwrap();
    Reconciler::new(
        ledger,
        history,
        balances,
        tariff,
        SettlementDriver::new(Duration::from_millis(200)),
    )
}

fn stepped() -> Tariff {
    Tariff::Stepped {
        minimum_charge: Decimal::from(100),
        step: Decimal::from(100),
    }
}

/// Terminal that answers every charge with the success token
fn responsive_terminal() -> LineLink<io::Sink> {
    LineLink::spawn(Cursor::new(b"DONE\nDONE\nDONE\n".to_vec()), io::sink())
}

/// Terminal that never answers
fn dead_terminal() -> LineLink<io::Sink> {
    LineLink::spawn(Cursor::new(Vec::new()), io::sink())
}

fn entry(identity: &str, time: NaiveDateTime) -> ParkingEvent {
    ParkingEvent::EntryObserved {
        identity: identity.to_string(),
        time,
    }
}

fn payment(identity: &str, balance: i64) -> ParkingEvent {
    ParkingEvent::PaymentCapableObserved {
        identity: identity.to_string(),
        balance: Decimal::from(balance),
    }
}

#[test]
fn stepped_settlement_after_ninety_minutes() {
    let dir = TempDir::new().unwrap();
    let mut reconciler = open_reconciler(dir.path(), stepped());
    let mut link = responsive_terminal();

    reconciler
        .handle_event(&mut link, entry("RAB123C", at(8, 0)), at(8, 0))
        .unwrap();
    let outcome = reconciler
        .handle_event(&mut link, payment("RAB123C", 500), at(9, 30))
        .unwrap();

    // 100 minimum + 100 per started half hour past 30 min = 300.
    assert_eq!(
        outcome,
        SettlementOutcome::Settled {
            identity: "RAB123C".to_string(),
            amount: Decimal::from(300),
            duration_hours: Decimal::new(150, 2),
            remaining_balance: Decimal::new(20000, 2),
        }
    );

    // Session table shows the closed session.
    let records = fs::read_to_string(dir.path().join("parking_records.csv")).unwrap();
    assert_eq!(
        records,
        "UID,EntryTime,ExitTime,Paid,Amount\n\
         RAB123C,2025-06-01T08:00:00,2025-06-01T09:30:00,1,300\n"
    );

    // Exactly one history row, with the 1.50 h duration.
    let history = fs::read_to_string(dir.path().join("transactions.csv")).unwrap();
    assert_eq!(
        history,
        "UID,EntryTime,ExitTime,DurationHours,Paid,AmountPaid\n\
         RAB123C,2025-06-01T08:00:00,2025-06-01T09:30:00,1.50,1,300\n"
    );

    // Balance registered at the default and debited by the charge.
    let balances = fs::read_to_string(dir.path().join("rfid_balances.csv")).unwrap();
    assert_eq!(balances, "UID,Balance\nRAB123C,200.00\n");
}

#[test]
fn terminal_timeout_leaves_stores_untouched() {
    let dir = TempDir::new().unwrap();
    let mut reconciler = open_reconciler(dir.path(), stepped());

    let mut link = responsive_terminal();
    reconciler
        .handle_event(&mut link, entry("CARD01", at(8, 0)), at(8, 0))
        .unwrap();

    let sessions_before = fs::read(dir.path().join("parking_records.csv")).unwrap();
    let balances_before = fs::read(dir.path().join("rfid_balances.csv")).unwrap();

    let mut link = dead_terminal();
    let outcome = reconciler
        .handle_event(&mut link, payment("CARD01", 500), at(9, 30))
        .unwrap();

    assert!(matches!(outcome, SettlementOutcome::DeviceFailure { .. }));

    // Byte-for-byte unchanged ledger and balances, empty history.
    let sessions_after = fs::read(dir.path().join("parking_records.csv")).unwrap();
    let balances_after = fs::read(dir.path().join("rfid_balances.csv")).unwrap();
    assert_eq!(sessions_before, sessions_after);
    assert_eq!(balances_before, balances_after);

    let history = fs::read_to_string(dir.path().join("transactions.csv")).unwrap();
    assert_eq!(history, "UID,EntryTime,ExitTime,DurationHours,Paid,AmountPaid\n");
}

#[test]
fn insufficient_balance_keeps_session_open() {
    let dir = TempDir::new().unwrap();
    let mut reconciler = open_reconciler(dir.path(), stepped());
    let mut link = responsive_terminal();

    reconciler
        .handle_event(&mut link, entry("CARD01", at(8, 0)), at(8, 0))
        .unwrap();
    // Due is 300; one unit short must be rejected before any charge.
    let outcome = reconciler
        .handle_event(&mut link, payment("CARD01", 299), at(9, 30))
        .unwrap();

    assert_eq!(
        outcome,
        SettlementOutcome::InsufficientBalance {
            identity: "CARD01".to_string(),
            balance: Decimal::from(299),
            due: Decimal::from(300),
        }
    );
    assert!(reconciler.ledger().find_open_session("CARD01").is_some());
}

#[test]
fn settlement_survives_controller_restart() {
    let dir = TempDir::new().unwrap();

    {
        let mut reconciler = open_reconciler(dir.path(), stepped());
        let mut link = responsive_terminal();
        reconciler
            .handle_event(&mut link, entry("RAB123C", at(8, 0)), at(8, 0))
            .unwrap();
        // Controller stops here; the open session is already durable.
    }

    let mut reconciler = open_reconciler(dir.path(), stepped());
    let mut link = responsive_terminal();
    let outcome = reconciler
        .handle_event(&mut link, payment("RAB123C", 500), at(9, 30))
        .unwrap();

    assert!(matches!(outcome, SettlementOutcome::Settled { .. }));
}

#[test]
fn most_recent_open_session_is_settled() {
    let dir = TempDir::new().unwrap();

    // Seed a paid session and two unpaid entries for one identity.
    fs::write(
        dir.path().join("parking_records.csv"),
        "UID,EntryTime,ExitTime,Paid,Amount\n\
         CARD01,2025-06-01T06:00:00,2025-06-01T07:00:00,1,200\n\
         CARD01,2025-06-01T07:30:00,,0,\n\
         CARD01,2025-06-01T09:00:00,,0,\n",
    )
    .unwrap();

    let mut reconciler = open_reconciler(dir.path(), stepped());
    let mut link = responsive_terminal();
    let outcome = reconciler
        .handle_event(&mut link, payment("CARD01", 500), at(9, 15))
        .unwrap();

    // The 09:00 entry is the one settled: 15 minutes, minimum charge.
    match outcome {
        SettlementOutcome::Settled { amount, .. } => assert_eq!(amount, Decimal::from(100)),
        other => panic!("expected Settled, got {:?}", other),
    }

    let records = fs::read_to_string(dir.path().join("parking_records.csv")).unwrap();
    let lines: Vec<_> = records.lines().collect();
    // 07:30 entry still open, 09:00 entry closed at 09:15.
    assert_eq!(lines[2], "CARD01,2025-06-01T07:30:00,,0,");
    assert_eq!(lines[3], "CARD01,2025-06-01T09:00:00,2025-06-01T09:15:00,1,100");
}

#[test]
fn duplicate_payment_observation_settles_once() {
    let dir = TempDir::new().unwrap();
    let mut reconciler = open_reconciler(dir.path(), stepped());
    let mut link = responsive_terminal();

    reconciler
        .handle_event(&mut link, entry("CARD01", at(8, 0)), at(8, 0))
        .unwrap();
    reconciler
        .handle_event(&mut link, payment("CARD01", 500), at(9, 30))
        .unwrap();

    // Second observation finds no open session; nothing is re-charged.
    let outcome = reconciler
        .handle_event(&mut link, payment("CARD01", 500), at(9, 31))
        .unwrap();
    assert_eq!(
        outcome,
        SettlementOutcome::NoOpenSession {
            identity: "CARD01".to_string()
        }
    );

    let history = fs::read_to_string(dir.path().join("transactions.csv")).unwrap();
    assert_eq!(history.lines().count(), 2, "header plus exactly one record");
}

#[test]
fn linear_tariff_full_pipeline() {
    let dir = TempDir::new().unwrap();
    let mut reconciler = open_reconciler(
        dir.path(),
        Tariff::Linear {
            rate_per_hour: Decimal::from(200),
        },
    );
    let mut link = responsive_terminal();

    reconciler
        .handle_event(&mut link, entry("RAB123C", at(8, 0)), at(8, 0))
        .unwrap();
    let outcome = reconciler
        .handle_event(&mut link, payment("RAB123C", 500), at(9, 30))
        .unwrap();

    match outcome {
        SettlementOutcome::Settled { amount, .. } => assert_eq!(amount, Decimal::from(300)),
        other => panic!("expected Settled, got {:?}", other),
    }
}

#[test]
fn controller_run_loop_over_feed() {
    let dir = TempDir::new().unwrap();
    let reconciler = open_reconciler(dir.path(), stepped());
    let mut controller = Controller::new(reconciler, responsive_terminal());

    // Entry and immediate payment through the raw feed: minimum charge.
    let feed = "CARD_UID:card01\nPLATE:CARD01|BALANCE:500\n";
    let mut status = Vec::new();
    controller.run(Cursor::new(feed), &mut status).unwrap();

    let status = String::from_utf8(status).unwrap();
    let lines: Vec<_> = status.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("entry recorded for 'CARD01'"));
    assert!(lines[1].contains("charged 100"), "got: {}", lines[1]);

    let history = fs::read_to_string(dir.path().join("transactions.csv")).unwrap();
    assert_eq!(history.lines().count(), 2);
}

#[test]
fn rejected_charge_is_reported_and_retryable() {
    let dir = TempDir::new().unwrap();
    let mut reconciler = open_reconciler(dir.path(), stepped());

    let mut link = responsive_terminal();
    reconciler
        .handle_event(&mut link, entry("CARD01", at(8, 0)), at(8, 0))
        .unwrap();

    // Terminal declines the charge.
    let mut link = LineLink::spawn(Cursor::new(b"ERR:DECLINED\n".to_vec()), io::sink());
    let outcome = reconciler
        .handle_event(&mut link, payment("CARD01", 500), at(9, 30))
        .unwrap();
    match outcome {
        SettlementOutcome::DeviceFailure { reason, .. } => {
            assert!(reason.contains("ERR:DECLINED"));
        }
        other => panic!("expected DeviceFailure, got {:?}", other),
    }

    // Retry against a working terminal settles normally.
    let mut link = responsive_terminal();
    let outcome = reconciler
        .handle_event(&mut link, payment("CARD01", 500), at(9, 30))
        .unwrap();
    assert!(matches!(outcome, SettlementOutcome::Settled { .. }));
}

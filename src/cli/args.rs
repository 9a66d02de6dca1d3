use crate::core::Tariff;
use clap::{Parser, ValueEnum};
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::time::Duration;

/// Reconcile parking sessions and settle payments against a terminal
#[derive(Parser, Debug)]
#[command(name = "parking-settlement-engine")]
#[command(about = "Reconcile parking sessions and settle payments", long_about = None)]
pub struct CliArgs {
    /// Device event feed
    #[arg(value_name = "EVENTS", help = "Event feed file, or '-' for stdin")]
    pub events: PathBuf,

    /// Directory holding the CSV tables
    #[arg(
        long = "data-dir",
        value_name = "DIR",
        default_value = "data",
        help = "Directory for parking_records.csv, transactions.csv and rfid_balances.csv"
    )]
    pub data_dir: PathBuf,

    /// Fee policy to apply
    #[arg(
        long = "tariff",
        value_enum,
        value_name = "TARIFF",
        default_value = "stepped",
        help = "Fee policy: 'linear' hourly rate or 'stepped' with a minimum charge"
    )]
    pub tariff: TariffKind,

    /// Hourly rate for the linear tariff
    #[arg(long = "rate", value_name = "AMOUNT", default_value = "200")]
    pub rate: Decimal,

    /// Minimum charge for the stepped tariff (first 30 minutes)
    #[arg(long = "minimum", value_name = "AMOUNT", default_value = "100")]
    pub minimum: Decimal,

    /// Charge per started 30-minute block past the minimum window
    #[arg(long = "step", value_name = "AMOUNT", default_value = "100")]
    pub step: Decimal,

    /// Balance assigned to an identity on first observation
    #[arg(
        long = "starting-balance",
        value_name = "AMOUNT",
        default_value = "500.00"
    )]
    pub starting_balance: Decimal,

    /// Seconds to wait for the terminal's acknowledgement
    #[arg(long = "ack-timeout-secs", value_name = "SECS", default_value = "5")]
    pub ack_timeout_secs: u64,

    /// Terminal device path
    #[arg(
        long = "terminal",
        value_name = "PATH",
        help = "Terminal device path; omitted, every charge is auto-acknowledged"
    )]
    pub terminal: Option<PathBuf>,
}

/// Available fee policies
#[derive(Clone, Debug, ValueEnum)]
pub enum TariffKind {
    Linear,
    Stepped,
}

impl CliArgs {
    /// Build the configured tariff from the parsed arguments
    pub fn to_tariff(&self) -> Tariff {
        match self.tariff {
            TariffKind::Linear => Tariff::Linear {
                rate_per_hour: self.rate,
            },
            TariffKind::Stepped => Tariff::Stepped {
                minimum_charge: self.minimum,
                step: self.step,
            },
        }
    }

    /// Acknowledgement window as a [`Duration`]
    pub fn ack_timeout(&self) -> Duration {
        Duration::from_secs(self.ack_timeout_secs)
    }

    /// Whether the event feed should be read from stdin
    pub fn events_from_stdin(&self) -> bool {
        self.events.as_os_str() == "-"
    }
}

//! Fee calculation policies
//!
//! This module provides the [`Tariff`] enum with the two fee policies the
//! facility operates: a linear hourly rate and a stepped rate with a
//! minimum charge. Fee computation is a pure function of entry time and
//! the current time, with second-level precision.
//!
//! # Properties
//!
//! - Fees are monotonic non-decreasing in elapsed time for a fixed tariff.
//! - Fees are never negative; zero or negative elapsed time floors to the
//!   tariff's zero-duration fee (0 for linear, the minimum charge for
//!   stepped - a vehicle that enters and leaves immediately still pays
//!   the minimum).

use chrono::NaiveDateTime;
use rust_decimal::{Decimal, RoundingStrategy};

/// Seconds covered by the stepped tariff's minimum charge
const MINIMUM_WINDOW_SECS: i64 = 30 * 60;

/// Seconds per billing step after the minimum window
const STEP_WINDOW_SECS: i64 = 30 * 60;

/// Fee-computation policy
///
/// Both variants are legitimate operator policies and are selected at
/// configuration time.
#[derive(Debug, Clone, PartialEq)]
pub enum Tariff {
    /// Exact elapsed hours multiplied by an hourly rate
    ///
    /// Hours are computed as exact elapsed seconds / 3600; the product is
    /// rounded to whole currency units (midpoint away from zero). No
    /// rounding is applied to the hours before multiplication.
    Linear {
        /// Rate charged per hour
        rate_per_hour: Decimal,
    },

    /// Flat minimum for the first 30 minutes, then a step per started
    /// 30-minute block
    ///
    /// `minimum_charge + step * ceil((elapsed - 30min) / 30min)` once the
    /// minimum window is exceeded.
    Stepped {
        /// Charge covering the first 30 minutes
        minimum_charge: Decimal,
        /// Charge added per started 30-minute block past the minimum
        step: Decimal,
    },
}

impl Tariff {
    /// Compute the amount due for a stay from `entry` until `now`
    ///
    /// Negative elapsed time (clock skew) is treated as zero elapsed time.
    pub fn fee(&self, entry: NaiveDateTime, now: NaiveDateTime) -> Decimal {
        let elapsed_secs = now.signed_duration_since(entry).num_seconds().max(0);

        match self {
            Tariff::Linear { rate_per_hour } => {
                let hours = Decimal::from(elapsed_secs) / Decimal::from(3600);
                (hours * *rate_per_hour)
                    .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            }
            Tariff::Stepped {
                minimum_charge,
                step,
            } => {
                if elapsed_secs <= MINIMUM_WINDOW_SECS {
                    return *minimum_charge;
                }
                let over = elapsed_secs - MINIMUM_WINDOW_SECS;
                // Ceiling division: every started block is billed in full.
                let blocks = (over + STEP_WINDOW_SECS - 1) / STEP_WINDOW_SECS;
                *minimum_charge + *step * Decimal::from(blocks)
            }
        }
    }
}

/// Elapsed occupancy in hours, rounded to two decimals
///
/// Used for transaction records. Negative elapsed time floors to zero.
pub fn duration_hours(entry: NaiveDateTime, exit: NaiveDateTime) -> Decimal {
    let elapsed_secs = exit.signed_duration_since(entry).num_seconds().max(0);
    let mut hours = (Decimal::from(elapsed_secs) / Decimal::from(3600)).round_dp(2);
    // Fixed two-decimal scale so records always read e.g. "1.50".
    hours.rescale(2);
    hours
}

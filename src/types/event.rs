//! Typed events consumed by the session reconciler
//!
//! The event source adapter translates raw device lines into these values;
//! the reconciler never sees the wire format.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;

/// An observation delivered by the gate-side device feed
#[derive(Debug, Clone, PartialEq)]
pub enum ParkingEvent {
    /// A vehicle or card was observed entering the facility
    ///
    /// Opens a new session for the identity at the observation time.
    EntryObserved {
        /// Plate or card UID
        identity: String,
        /// Time the entry was observed
        time: NaiveDateTime,
    },

    /// An identity was observed together with a reported balance
    ///
    /// This is the payment-capable observation: the reconciler matches it
    /// against the most recent open session for the identity and attempts
    /// settlement.
    PaymentCapableObserved {
        /// Plate or card UID
        identity: String,
        /// Balance reported by the device alongside the identity
        balance: Decimal,
    },
}

impl ParkingEvent {
    /// Identity the event applies to
    pub fn identity(&self) -> &str {
        match self {
            ParkingEvent::EntryObserved { identity, .. } => identity,
            ParkingEvent::PaymentCapableObserved { identity, .. } => identity,
        }
    }
}

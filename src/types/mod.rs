//! Types module
//!
//! Contains core data structures used throughout the application.
//! This module organizes types into logical submodules:
//! - `session`: Parking sessions and settled transaction records
//! - `event`: Typed device observations consumed by the reconciler
//! - `error`: Error types for the settlement engine

pub mod error;
pub mod event;
pub mod session;

pub use error::SettlementError;
pub use event::ParkingEvent;
pub use session::{Session, SessionId, TransactionRecord};

//! Controller run loop
//!
//! Single-threaded orchestration of the full pipeline: the event feed is
//! consumed one event at a time, each event goes through the
//! [`Reconciler`], and one status line per event is written to the status
//! sink. Recoverable failures (malformed feed lines, storage conflicts)
//! are reported to stderr and the loop continues with the next event -
//! an unresponsive terminal or a bad line must never take the gate down.
//!
//! The settlement driver's bounded wait for the terminal acknowledgement
//! is the loop's only suspension point. Because the model is one loop per
//! controller instance, no two settlements for the same identity are ever
//! in flight at once.

use crate::core::reconciler::Reconciler;
use crate::core::settlement::TerminalLink;
use crate::core::traits::{BalanceStore, LedgerStore, TransactionLog};
use crate::io::event_reader::EventReader;
use crate::types::SettlementError;
use chrono::Local;
use std::io::{BufRead, Write};

/// Owns the reconciler and the terminal link for one controller instance
pub struct Controller<L, T, B, K>
where
    L: LedgerStore,
    T: TransactionLog,
    B: BalanceStore,
    K: TerminalLink,
{
    reconciler: Reconciler<L, T, B>,
    link: K,
}

impl<L, T, B, K> Controller<L, T, B, K>
where
    L: LedgerStore,
    T: TransactionLog,
    B: BalanceStore,
    K: TerminalLink,
{
    /// Create a controller over a reconciler and its terminal link
    pub fn new(reconciler: Reconciler<L, T, B>, link: K) -> Self {
        Controller { reconciler, link }
    }

    /// Read access to the reconciler and its stores
    pub fn reconciler(&self) -> &Reconciler<L, T, B> {
        &self.reconciler
    }

    /// Consume the event feed to exhaustion
    ///
    /// Writes one status line per handled event to `status`. Feed parse
    /// errors and recoverable settlement errors go to stderr; only a
    /// failure to write the status sink itself aborts the loop.
    pub fn run<R: BufRead>(
        &mut self,
        events: R,
        status: &mut dyn Write,
    ) -> Result<(), SettlementError> {
        for result in EventReader::new(events) {
            match result {
                Ok(event) => {
                    let now = Local::now().naive_local();
                    match self.reconciler.handle_event(&mut self.link, event, now) {
                        Ok(outcome) => {
                            writeln!(status, "{}", outcome)
                                .map_err(|e| SettlementError::storage(e.to_string()))?;
                        }
                        Err(e) => eprintln!("settlement error: {}", e),
                    }
                }
                Err(e) => eprintln!("event feed error: {}", e),
            }
        }
        Ok(())
    }
}

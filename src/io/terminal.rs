//! Terminal link implementations
//!
//! Concrete [`TerminalLink`]s for the settlement protocol driver:
//!
//! - [`LineLink`] - newline-framed link over any byte stream pair (a tty
//!   device file on Linux, or an in-memory script under test). A reader
//!   thread feeds a channel so receives can be bounded without the
//!   underlying stream supporting timeouts.
//! - [`AckLink`] - acknowledges every charge immediately. Selected
//!   explicitly on the CLI when no terminal device is configured; useful
//!   for dry runs and demos, never a silent default for a real terminal.

use crate::core::settlement::{TerminalLink, ACK_TOKEN};
use crate::types::SettlementError;
use std::io::{BufRead, BufReader, Read, Write};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;

/// Newline-framed link over a reader/writer pair
///
/// The reader half runs on a dedicated thread for the life of the link;
/// lines arrive through a channel so [`TerminalLink::recv_line`] can wait
/// with a deadline. End of stream is reported as "no response", which the
/// driver classifies as a timeout - either way nothing was acknowledged.
pub struct LineLink<W: Write> {
    incoming: Receiver<std::io::Result<String>>,
    writer: W,
}

impl<W: Write> LineLink<W> {
    /// Spawn the reader thread and wrap the writer half
    pub fn spawn<R: Read + Send + 'static>(reader: R, writer: W) -> Self {
        let (tx, incoming) = mpsc::channel();
        thread::spawn(move || {
            for line in BufReader::new(reader).lines() {
                let stop = line.is_err();
                if tx.send(line).is_err() || stop {
                    break;
                }
            }
        });
        LineLink { incoming, writer }
    }
}

impl<W: Write> TerminalLink for LineLink<W> {
    fn send_line(&mut self, line: &str) -> Result<(), SettlementError> {
        writeln!(self.writer, "{}", line).map_err(|e| SettlementError::link(e.to_string()))?;
        self.writer
            .flush()
            .map_err(|e| SettlementError::link(e.to_string()))
    }

    fn recv_line(&mut self, wait: Duration) -> Result<Option<String>, SettlementError> {
        match self.incoming.recv_timeout(wait) {
            Ok(Ok(line)) => Ok(Some(line)),
            Ok(Err(e)) => Err(SettlementError::link(e.to_string())),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            // Reader thread is gone (EOF or broken device): no response.
            Err(RecvTimeoutError::Disconnected) => Ok(None),
        }
    }
}

/// Link that acknowledges every charge immediately
///
/// Stands in for the terminal when none is attached. Sent lines are kept
/// so operators (and tests) can inspect what would have gone out.
#[derive(Debug, Default)]
pub struct AckLink {
    sent: Vec<String>,
}

impl AckLink {
    /// Create an auto-acknowledging link
    pub fn new() -> Self {
        AckLink { sent: Vec::new() }
    }

    /// All lines sent over this link, in order
    pub fn sent(&self) -> &[String] {
        &self.sent
    }
}

impl TerminalLink for AckLink {
    fn send_line(&mut self, line: &str) -> Result<(), SettlementError> {
        self.sent.push(line.to_string());
        Ok(())
    }

    fn recv_line(&mut self, _wait: Duration) -> Result<Option<String>, SettlementError> {
        Ok(Some(ACK_TOKEN.to_string()))
    }
}

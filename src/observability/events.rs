//! Observable scan-engine events
//!
//! Events are explicit and typed; the monitor renders them as one
//! human-readable line each. Wording is informational, not a contract.

use std::fmt;
use std::path::Path;
use std::time::Duration;

/// Observable events in the life of a file handle and its scans
#[derive(Debug)]
pub enum ScanEvent<'a> {
    /// File handle opened lazily for a first scan
    HandleOpened {
        /// Per-process handle serial
        handle_id: u64,
        /// Effective file path
        path: &'a Path,
    },
    /// File handle closed after the last scan released it
    HandleClosed {
        /// Per-process handle serial
        handle_id: u64,
    },
    /// Cache-invalidating seek before a pull
    SeekPerformed {
        /// Target byte offset
        offset: u64,
    },
    /// First row of a scan reached the consumer
    FirstRow {
        /// Wall-clock time since the scan was built
        elapsed: Duration,
    },
    /// A scan finished (exhaustion, early termination, or drop)
    ScanComplete {
        /// Wall-clock time since the scan was built
        elapsed: Duration,
        /// Candidate records examined
        records_scanned: u64,
        /// Rows that matched and were yielded
        rows_yielded: u64,
    },
    /// A predicate can never match (between with lo > hi, in with no values)
    DegeneratePredicate {
        /// Constrained column
        column: &'a str,
        /// What makes the predicate unsatisfiable
        reason: &'a str,
    },
}

impl fmt::Display for ScanEvent<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanEvent::HandleOpened { handle_id, path } => {
                write!(f, "opened handle #{} for {}", handle_id, path.display())
            }
            ScanEvent::HandleClosed { handle_id } => {
                write!(f, "closed handle #{}", handle_id)
            }
            ScanEvent::SeekPerformed { offset } => {
                write!(f, "seek to byte {} (cache invalidated)", offset)
            }
            ScanEvent::FirstRow { elapsed } => {
                write!(f, "first row after {:.3}ms", elapsed.as_secs_f64() * 1000.0)
            }
            ScanEvent::ScanComplete {
                elapsed,
                records_scanned,
                rows_yielded,
            } => write!(
                f,
                "scan complete in {:.3}ms: {} of {} records matched",
                elapsed.as_secs_f64() * 1000.0,
                rows_yielded,
                records_scanned
            ),
            ScanEvent::DegeneratePredicate { column, reason } => {
                write!(f, "degenerate predicate on '{}': {}", column, reason)
            }
        }
    }
}

//! The scan engine
//!
//! Everything between a validated schema and a stream of matching rows:
//! comparators with their three-valued verdicts, query compilation into a
//! sorted-prefix-aware comparator list, the shared row cache and file handle,
//! and the pull-driven scan iterator itself.

mod cache;
mod compare;
mod compile;
mod errors;
mod handle;
mod iterator;

/// One parsed record: exactly column-count string fields
pub type Row = Vec<String>;

pub use cache::RowCache;
pub use compare::{Comparator, Verdict};
pub use compile::{CompiledQuery, RowJudgment};
pub use errors::{ScanError, ScanErrorCode, ScanResult, Severity};
pub use iterator::{FileScan, FileTable, ScanStats};

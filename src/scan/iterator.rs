//! The scan iterator
//!
//! [`FileTable`] pairs a schema with the shared handle state; [`FileScan`] is
//! the lazy, forward-only stream of matching rows it produces. A scan
//! compiles its query once, picks a starting position (from the shared cache
//! when a strictly-below row is still cached, from the file start otherwise),
//! and then pulls rows until exhaustion or until the sorted prefix proves no
//! further row can match.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use regex::Regex;

use crate::observability::{monitor, ScanEvent};
use crate::query::Query;
use crate::schema::FileSchema;

use super::compile::{CompiledQuery, RowJudgment};
use super::errors::ScanResult;
use super::handle::TableState;
use super::Row;

/// Splits one record into exactly `column_count` fields.
///
/// The split is bounded: surplus delimiters stay inside the last field.
/// Short records are padded with empty fields.
fn split_record(pattern: &Regex, record: &str, column_count: usize) -> Row {
    let mut fields: Vec<String> = pattern
        .splitn(record, column_count)
        .map(str::to_string)
        .collect();
    fields.resize(column_count, String::new());
    fields
}

/// Counters a scan accumulates while running
#[derive(Debug, Clone, Copy, Default)]
pub struct ScanStats {
    /// Candidate records examined, from cache or file
    pub records_scanned: u64,
    /// Candidates served from the cache without touching the file
    pub records_from_cache: u64,
    /// Rows that matched and were yielded
    pub rows_yielded: u64,
    /// Whether the scan started from a cached position instead of offset 0
    pub resumed_from_cache: bool,
    /// Whether the sorted prefix ended the scan before end of file
    pub early_terminated: bool,
}

/// A queryable flat file: one schema plus the state shared by its scans.
pub struct FileTable {
    schema: Arc<FileSchema>,
    state: Arc<Mutex<TableState>>,
}

impl FileTable {
    /// Wraps a validated schema into a scannable table
    pub fn new(schema: FileSchema) -> Self {
        let capacity = schema.cache_size();
        Self {
            schema: Arc::new(schema),
            state: Arc::new(Mutex::new(TableState::new(capacity))),
        }
    }

    /// The schema this table serves
    pub fn schema(&self) -> &FileSchema {
        &self.schema
    }

    /// Number of scans created but not yet released
    pub fn live_scans(&self) -> usize {
        self.lock().live_scans
    }

    /// Whether the underlying file handle is currently open
    pub fn is_open(&self) -> bool {
        self.lock().is_open()
    }

    fn lock(&self) -> MutexGuard<'_, TableState> {
        self.state.lock().expect("table state poisoned")
    }

    /// Builds a scan for a query.
    ///
    /// Compiles the query, opens the file handle if needed (creating a
    /// missing file empty), and picks the starting position. Configuration
    /// and query problems, and open failures, surface here - before any row
    /// is yielded.
    pub fn scan(&self, query: &Query) -> ScanResult<FileScan> {
        let compiled = CompiledQuery::compile(&self.schema, query)?;
        let pattern = self.schema.delimiter_pattern()?.clone();
        let path = self.schema.path()?.to_path_buf();

        let mut state = self.lock();
        state.ensure_open(&path)?;
        let fingerprint = state.register_scan();

        // Look for a cached row strictly before the target region: newest
        // slot first, older on Above or on plain equality. Resuming after a
        // strictly-below row replays any run of equal sort keys, so
        // non-unique sort columns lose nothing.
        let mut cache_index = 0;
        let mut resumed_from_cache = false;
        if compiled.last_sorted().is_some() {
            for slot in (0..state.cache.len()).rev() {
                let below = state
                    .cache
                    .get(slot)
                    .map(|row| compiled.strictly_below(row))
                    .unwrap_or(false);
                if below {
                    cache_index = slot + 1;
                    resumed_from_cache = true;
                    state.last_fingerprint = fingerprint;
                    break;
                }
            }
        }
        drop(state);

        Ok(FileScan {
            schema: Arc::clone(&self.schema),
            state: Arc::clone(&self.state),
            compiled,
            pattern,
            fingerprint,
            resume_offset: 0,
            cache_index,
            stats: ScanStats {
                resumed_from_cache,
                ..ScanStats::default()
            },
            started: Instant::now(),
            first_row_seen: false,
            done: false,
            released: false,
        })
    }
}

/// A live scan: a lazy, forward-only stream of matching rows.
///
/// Dropping the scan releases it; the last release closes the file handle
/// and clears the cache.
pub struct FileScan {
    schema: Arc<FileSchema>,
    state: Arc<Mutex<TableState>>,
    compiled: CompiledQuery,
    pattern: Regex,
    /// Identity of this scan on the shared handle
    fingerprint: u64,
    /// Offset to reseat to when another scan moved the file pointer
    resume_offset: u64,
    /// Next cache slot to consume
    cache_index: usize,
    stats: ScanStats,
    started: Instant,
    first_row_seen: bool,
    done: bool,
    released: bool,
}

impl std::fmt::Debug for FileScan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileScan")
            .field("fingerprint", &self.fingerprint)
            .field("resume_offset", &self.resume_offset)
            .field("cache_index", &self.cache_index)
            .field("stats", &self.stats)
            .field("first_row_seen", &self.first_row_seen)
            .field("done", &self.done)
            .field("released", &self.released)
            .finish()
    }
}

impl FileScan {
    /// Counters accumulated so far
    pub fn stats(&self) -> ScanStats {
        self.stats
    }

    fn pull(&mut self) -> ScanResult<Option<Row>> {
        let state = Arc::clone(&self.state);
        let mut state = state.lock().expect("table state poisoned");

        // Another scan read since our last pull: reseat the file where we
        // left off and start the cache over.
        if state.last_fingerprint != self.fingerprint {
            state.reseat(self.resume_offset)?;
            if self.resume_offset == 0 && self.schema.skip_first_line() {
                state.read_record(self.schema.record_separator())?;
            }
            self.cache_index = 0;
            state.last_fingerprint = self.fingerprint;
        }

        loop {
            let cached = state.cache.get(self.cache_index).cloned();
            let row = match cached {
                Some(row) => {
                    self.cache_index += 1;
                    self.stats.records_from_cache += 1;
                    row
                }
                None => match state.read_record(self.schema.record_separator())? {
                    None => return Ok(None),
                    Some(record) => {
                        let row =
                            split_record(&self.pattern, &record, self.schema.column_count());
                        state.cache.append(row.clone());
                        self.cache_index = state.cache.len();
                        row
                    }
                },
            };
            self.stats.records_scanned += 1;

            match self.compiled.judge(&row) {
                RowJudgment::Terminate => {
                    self.stats.early_terminated = true;
                    return Ok(None);
                }
                RowJudgment::Discard => continue,
                RowJudgment::Matched => {
                    self.resume_offset = state.position();
                    self.stats.rows_yielded += 1;
                    let mut out = row;
                    for constant in self.schema.constant_values() {
                        out.push(constant.value.clone());
                    }
                    return Ok(Some(out));
                }
            }
        }
    }

    /// Marks the scan finished and releases it exactly once.
    fn finish(&mut self) {
        if self.done {
            return;
        }
        self.done = true;
        monitor::emit(&ScanEvent::ScanComplete {
            elapsed: self.started.elapsed(),
            records_scanned: self.stats.records_scanned,
            rows_yielded: self.stats.rows_yielded,
        });
        self.release();
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        let mut state = self.state.lock().expect("table state poisoned");
        state.release_scan();
    }
}

impl Iterator for FileScan {
    type Item = ScanResult<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.pull() {
            Ok(Some(row)) => {
                if !self.first_row_seen {
                    self.first_row_seen = true;
                    monitor::emit(&ScanEvent::FirstRow {
                        elapsed: self.started.elapsed(),
                    });
                }
                Some(Ok(row))
            }
            Ok(None) => {
                self.finish();
                None
            }
            Err(err) => {
                self.finish();
                Some(Err(err))
            }
        }
    }
}

impl Drop for FileScan {
    fn drop(&mut self) {
        self.finish();
    }
}

//! File handle management shared by all scans over one schema
//!
//! The handle opens lazily on the first scan and closes when the last live
//! scan releases it. Every scan carries a globally-monotonic fingerprint; the
//! handle remembers which fingerprint read last, which is how a returning
//! scan detects that another one moved the file pointer in between.

use std::fs::File;
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::observability::{monitor, ScanEvent};

use super::cache::RowCache;
use super::errors::{ScanError, ScanResult};

static NEXT_FINGERPRINT: AtomicU64 = AtomicU64::new(1);
static NEXT_HANDLE_ID: AtomicU64 = AtomicU64::new(1);

/// Hands out process-unique, strictly increasing scan fingerprints
pub(crate) fn next_fingerprint() -> u64 {
    NEXT_FINGERPRINT.fetch_add(1, Ordering::SeqCst)
}

/// Shared per-schema scan state: the handle, the cache, and the bookkeeping
/// that coordinates interleaved scans.
pub(crate) struct TableState {
    reader: Option<BufReader<File>>,
    /// Byte offset the next read starts at
    offset: u64,
    /// Serial of the current open handle, for telemetry
    handle_id: u64,
    /// Scans created but not yet released
    pub(crate) live_scans: usize,
    /// Fingerprint of the scan that last moved the file pointer
    pub(crate) last_fingerprint: u64,
    /// Rows read most recently, ending at `offset`
    pub(crate) cache: RowCache,
}

impl TableState {
    pub(crate) fn new(cache_capacity: usize) -> Self {
        Self {
            reader: None,
            offset: 0,
            handle_id: 0,
            live_scans: 0,
            last_fingerprint: 0,
            cache: RowCache::new(cache_capacity),
        }
    }

    /// Opens the file if it is not already open.
    ///
    /// A missing file is created empty first, then opened read-only.
    pub(crate) fn ensure_open(&mut self, path: &Path) -> ScanResult<()> {
        if self.reader.is_some() {
            return Ok(());
        }
        if !path.exists() {
            File::create(path).map_err(|e| {
                ScanError::io_error(format!("failed to create {}", path.display()), e)
            })?;
        }
        let file = File::open(path)
            .map_err(|e| ScanError::io_error(format!("failed to open {}", path.display()), e))?;
        self.reader = Some(BufReader::new(file));
        self.offset = 0;
        self.handle_id = NEXT_HANDLE_ID.fetch_add(1, Ordering::SeqCst);
        monitor::emit(&ScanEvent::HandleOpened {
            handle_id: self.handle_id,
            path,
        });
        Ok(())
    }

    /// True while a file handle is open
    pub(crate) fn is_open(&self) -> bool {
        self.reader.is_some()
    }

    /// Byte offset of the next read
    pub(crate) fn position(&self) -> u64 {
        self.offset
    }

    /// Registers a new scan and returns its fingerprint
    pub(crate) fn register_scan(&mut self) -> u64 {
        self.live_scans += 1;
        next_fingerprint()
    }

    /// Releases one scan; the last release closes the handle.
    pub(crate) fn release_scan(&mut self) {
        self.live_scans = self.live_scans.saturating_sub(1);
        if self.live_scans == 0 {
            self.close();
        }
    }

    /// Seeks to an absolute offset and invalidates the cache.
    ///
    /// The two always travel together: after a seek the cached window no
    /// longer ends at the file position.
    pub(crate) fn reseat(&mut self, offset: u64) -> ScanResult<()> {
        let reader = self
            .reader
            .as_mut()
            .ok_or_else(|| ScanError::io_state("file handle is not open"))?;
        reader
            .seek(SeekFrom::Start(offset))
            .map_err(|e| ScanError::io_error(format!("failed to seek to offset {}", offset), e))?;
        self.offset = offset;
        self.cache.invalidate();
        monitor::emit(&ScanEvent::SeekPerformed { offset });
        Ok(())
    }

    /// Reads one record, delimited by `separator`, advancing the offset past
    /// the separator. The separator is stripped from the returned record.
    ///
    /// Returns `Ok(None)` at end of file.
    pub(crate) fn read_record(&mut self, separator: &str) -> ScanResult<Option<String>> {
        let reader = match self.reader.as_mut() {
            Some(reader) => reader,
            None => return Ok(None),
        };
        let sep = separator.as_bytes();
        let mut buf: Vec<u8> = Vec::new();

        if sep.len() == 1 {
            let n = reader
                .read_until(sep[0], &mut buf)
                .map_err(|e| ScanError::io_error("record read failed", e))?;
            if n == 0 {
                return Ok(None);
            }
            self.offset += n as u64;
            if buf.last() == Some(&sep[0]) {
                buf.pop();
            }
        } else {
            loop {
                let mut byte = [0u8; 1];
                let n = reader
                    .read(&mut byte)
                    .map_err(|e| ScanError::io_error("record read failed", e))?;
                if n == 0 {
                    if buf.is_empty() {
                        return Ok(None);
                    }
                    break;
                }
                self.offset += 1;
                buf.push(byte[0]);
                if buf.ends_with(sep) {
                    buf.truncate(buf.len() - sep.len());
                    break;
                }
            }
        }

        Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
    }

    /// Closes the handle and clears the cache.
    pub(crate) fn close(&mut self) {
        if self.reader.take().is_some() {
            monitor::emit(&ScanEvent::HandleClosed {
                handle_id: self.handle_id,
            });
        }
        self.offset = 0;
        self.last_fingerprint = 0;
        self.cache.invalidate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn fixture(contents: &str) -> (TempDir, std::path::PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.csv");
        let mut file = File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        (dir, path)
    }

    #[test]
    fn test_fingerprints_are_strictly_increasing() {
        let a = next_fingerprint();
        let b = next_fingerprint();
        let c = next_fingerprint();
        assert!(a < b && b < c);
    }

    #[test]
    fn test_missing_file_created_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent.csv");
        let mut state = TableState::new(4);
        state.ensure_open(&path).unwrap();
        assert!(path.exists());
        assert_eq!(state.read_record("\n").unwrap(), None);
    }

    #[test]
    fn test_read_records_tracks_offset() {
        let (_dir, path) = fixture("1,Alice\n2,Bob\n");
        let mut state = TableState::new(4);
        state.ensure_open(&path).unwrap();

        assert_eq!(state.read_record("\n").unwrap().unwrap(), "1,Alice");
        assert_eq!(state.position(), 8);
        assert_eq!(state.read_record("\n").unwrap().unwrap(), "2,Bob");
        assert_eq!(state.read_record("\n").unwrap(), None);
    }

    #[test]
    fn test_final_record_without_separator() {
        let (_dir, path) = fixture("1,Alice\n2,Bob");
        let mut state = TableState::new(4);
        state.ensure_open(&path).unwrap();
        state.read_record("\n").unwrap();
        assert_eq!(state.read_record("\n").unwrap().unwrap(), "2,Bob");
        assert_eq!(state.read_record("\n").unwrap(), None);
    }

    #[test]
    fn test_multibyte_separator() {
        let (_dir, path) = fixture("1,Alice::2,Bob::");
        let mut state = TableState::new(4);
        state.ensure_open(&path).unwrap();
        assert_eq!(state.read_record("::").unwrap().unwrap(), "1,Alice");
        assert_eq!(state.position(), 9);
        assert_eq!(state.read_record("::").unwrap().unwrap(), "2,Bob");
        assert_eq!(state.read_record("::").unwrap(), None);
    }

    #[test]
    fn test_reseat_rewinds_and_invalidates() {
        let (_dir, path) = fixture("1,Alice\n2,Bob\n");
        let mut state = TableState::new(4);
        state.ensure_open(&path).unwrap();
        state.read_record("\n").unwrap();
        state.cache.append(vec!["1".into(), "Alice".into()]);

        state.reseat(0).unwrap();
        assert_eq!(state.position(), 0);
        assert!(state.cache.is_empty());
        assert_eq!(state.read_record("\n").unwrap().unwrap(), "1,Alice");
    }

    #[test]
    fn test_last_release_closes_handle() {
        let (_dir, path) = fixture("1,Alice\n");
        let mut state = TableState::new(4);
        state.ensure_open(&path).unwrap();
        let first = state.register_scan();
        let second = state.register_scan();
        assert!(first < second);
        assert_eq!(state.live_scans, 2);

        state.release_scan();
        assert!(state.is_open());
        state.release_scan();
        assert!(!state.is_open());
        assert!(state.cache.is_empty());
        assert_eq!(state.live_scans, 0);
    }
}

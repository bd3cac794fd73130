//! Process-wide scan monitor
//!
//! When enabled, scan-engine events are written synchronously to a
//! configurable text sink, one timestamped line per event. Disabled (the
//! default), emission is a single atomic load.

use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use once_cell::sync::Lazy;

use super::events::ScanEvent;

static ENABLED: AtomicBool = AtomicBool::new(false);

/// Replacement sink; `None` writes to stderr
static SINK: Lazy<Mutex<Option<Box<dyn Write + Send>>>> = Lazy::new(|| Mutex::new(None));

/// Turns event emission on
pub fn enable() {
    ENABLED.store(true, Ordering::SeqCst);
}

/// Turns event emission off
pub fn disable() {
    ENABLED.store(false, Ordering::SeqCst);
}

/// Whether the monitor is currently emitting
pub fn is_enabled() -> bool {
    ENABLED.load(Ordering::SeqCst)
}

/// Redirects emission to the given sink; `None` restores stderr.
pub fn set_sink(sink: Option<Box<dyn Write + Send>>) {
    let mut guard = SINK.lock().expect("monitor sink poisoned");
    *guard = sink;
}

/// Emits one event line when the monitor is enabled.
///
/// Emission is synchronous and unbuffered; a failing sink is ignored rather
/// than allowed to disturb the scan.
pub fn emit(event: &ScanEvent<'_>) {
    if !is_enabled() {
        return;
    }
    let line = format!(
        "[{}] flatdb: {}\n",
        chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ"),
        event
    );
    let mut guard = SINK.lock().expect("monitor sink poisoned");
    match guard.as_mut() {
        Some(sink) => {
            let _ = sink.write_all(line.as_bytes());
            let _ = sink.flush();
        }
        None => {
            let mut stderr = io::stderr();
            let _ = stderr.write_all(line.as_bytes());
            let _ = stderr.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex as StdMutex};

    /// Sink that collects emitted bytes for inspection
    #[derive(Clone, Default)]
    pub struct CaptureSink(Arc<StdMutex<Vec<u8>>>);

    impl CaptureSink {
        pub fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl Write for CaptureSink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    // Monitor state is process-wide; tests touching it serialize here.
    static GUARD: StdMutex<()> = StdMutex::new(());

    #[test]
    fn test_disabled_monitor_emits_nothing() {
        let _lock = GUARD.lock().unwrap();
        let sink = CaptureSink::default();
        set_sink(Some(Box::new(sink.clone())));
        disable();

        emit(&ScanEvent::SeekPerformed { offset: 9 });
        assert!(sink.contents().is_empty());

        set_sink(None);
    }

    #[test]
    fn test_enabled_monitor_writes_timestamped_line() {
        let _lock = GUARD.lock().unwrap();
        let sink = CaptureSink::default();
        set_sink(Some(Box::new(sink.clone())));
        enable();

        emit(&ScanEvent::SeekPerformed { offset: 1234 });

        let text = sink.contents();
        assert!(text.contains("flatdb:"));
        assert!(text.contains("seek to byte 1234"));
        assert!(text.ends_with('\n'));

        disable();
        set_sink(None);
    }
}

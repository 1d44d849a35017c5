//! Lightweight lifecycle instrumentation.
//!
//! Hosts can point the trace log at a file to record lifecycle events
//! (`tab.show`, `tab.async.stale`, `nav.follow`, ...). Discarded stale
//! results are traced here and nowhere else; they are an expected race
//! outcome, not an error.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{LazyLock, Mutex};
use std::time::Instant;

static TIMING: AtomicBool = AtomicBool::new(false);
static EVENT_LOG: LazyLock<Mutex<EventLog>> = LazyLock::new(|| Mutex::new(EventLog::new()));

/// RAII timer that prints elapsed wall time on drop when timing is enabled.
#[derive(Debug)]
pub struct Scope {
    name: &'static str,
    start: Instant,
}

impl Drop for Scope {
    fn drop(&mut self) {
        if !timing_enabled() {
            return;
        }
        let elapsed_ms = self.start.elapsed().as_secs_f64() * 1000.0;
        eprintln!("[tabnav] {}: {:.2} ms", self.name, elapsed_ms);
    }
}

#[derive(Debug)]
struct EventLog {
    enabled: bool,
    start: Instant,
    writer: Option<BufWriter<File>>,
}

impl EventLog {
    fn new() -> Self {
        Self {
            enabled: false,
            start: Instant::now(),
            writer: None,
        }
    }
}

/// Enable or disable scope timing output on stderr.
pub fn set_timing_enabled(enabled: bool) {
    TIMING.store(enabled, Ordering::Relaxed);
}

pub fn timing_enabled() -> bool {
    TIMING.load(Ordering::Relaxed)
}

/// Start a named timing scope.
pub fn scope(name: &'static str) -> Scope {
    Scope {
        name,
        start: Instant::now(),
    }
}

/// Route lifecycle events to `path`, or disable event logging with `None`.
///
/// # Errors
///
/// Returns an error if the log file cannot be created or written.
pub fn set_event_log_path(path: Option<&Path>) -> std::io::Result<()> {
    let mut log = EVENT_LOG.lock().expect("event log lock poisoned");
    if let Some(path) = path {
        let file = File::create(path)?;
        log.enabled = true;
        log.start = Instant::now();
        log.writer = Some(BufWriter::new(file));
        if let Some(writer) = log.writer.as_mut() {
            writeln!(writer, "tabnav lifecycle trace start")?;
            writer.flush()?;
        }
    } else {
        log.enabled = false;
        log.writer = None;
    }
    Ok(())
}

pub fn event_log_enabled() -> bool {
    EVENT_LOG.lock().expect("event log lock poisoned").enabled
}

/// Record a lifecycle event. No-op unless an event log path is set.
pub fn log_event(name: &str, detail: impl AsRef<str>) {
    let mut log = EVENT_LOG.lock().expect("event log lock poisoned");
    if !log.enabled {
        return;
    }
    let elapsed_ms = log.start.elapsed().as_secs_f64() * 1000.0;
    if let Some(writer) = log.writer.as_mut() {
        let _ = writeln!(
            writer,
            "[{elapsed_ms:>10.3} ms] {name}: {}",
            detail.as_ref()
        );
        let _ = writer.flush();
    }
}

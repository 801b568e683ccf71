// Global logging sink for hosts without a console
//
// Keeps the most recent records in a fixed ring so a frontend can replay
// them after a format run (e.g. onto a screen once the device work is done).

use core::fmt::Write;
use core::sync::atomic::{AtomicUsize, Ordering};

use heapless::{Deque, String};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use spin::Mutex;

const MAX_LOG_ENTRIES: usize = 64;
const MAX_LINE_LEN: usize = 96;

/// Writer that drops whatever no longer fits in the line.
struct Truncate<'a>(&'a mut String<MAX_LINE_LEN>);

impl Write for Truncate<'_> {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        for c in s.chars() {
            if self.0.push(c).is_err() {
                break;
            }
        }
        Ok(())
    }
}

struct Entry {
    level: Level,
    line: String<MAX_LINE_LEN>,
}

/// Fixed-capacity in-memory logger. Oldest records are dropped first.
pub struct RingLogger {
    entries: Mutex<Deque<Entry, MAX_LOG_ENTRIES>>,
    total: AtomicUsize,
}

static RING_LOGGER: RingLogger = RingLogger::new();

impl RingLogger {
    pub const fn new() -> Self {
        Self {
            entries: Mutex::new(Deque::new()),
            total: AtomicUsize::new(0),
        }
    }

    /// Replay retained records, oldest first.
    pub fn for_each(&self, mut f: impl FnMut(Level, &str)) {
        let entries = self.entries.lock();
        for entry in entries.iter() {
            f(entry.level, entry.line.as_str());
        }
    }

    /// Number of retained records.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of records ever logged, including evicted ones.
    pub fn total(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

impl Log for RingLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let mut line = String::new();
        let _ = write!(Truncate(&mut line), "{}", record.args());

        let mut entries = self.entries.lock();
        if entries.is_full() {
            entries.pop_front();
        }
        let _ = entries.push_back(Entry {
            level: record.level(),
            line,
        });
        self.total.fetch_add(1, Ordering::SeqCst);
    }

    fn flush(&self) {}
}

/// Install the global ring logger.
pub fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
    log::set_logger(&RING_LOGGER)?;
    log::set_max_level(level);
    Ok(())
}

pub fn logger() -> &'static RingLogger {
    &RING_LOGGER
}

pub fn for_each(f: impl FnMut(Level, &str)) {
    RING_LOGGER.for_each(f)
}

pub fn log_count() -> usize {
    RING_LOGGER.total()
}

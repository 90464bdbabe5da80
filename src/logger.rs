//! Minimal `log` backend shared by the client and server binaries.
//!
//! Everything goes to stderr; stdout is reserved for results.

use log::{Level, LevelFilter, Log, Metadata, Record};

static LOGGER: Logger = Logger;

struct Logger;

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }
    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        if record.level() == Level::Info {
            eprintln!("{}", record.args());
        } else {
            eprintln!("[{:<5}] {}", record.level(), record.args());
        }
    }
    fn flush(&self) {}
}

/// Install the logger. Calling it twice keeps the first installation.
pub fn init(level: LevelFilter) {
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}

/// `Debug` when verbose output was requested, `Info` otherwise.
pub fn level(verbose: bool) -> LevelFilter {
    if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    }
}

//! A logging module that prints log records to stderr with colour coding.
//!
//! This module provides a custom logger `LockLogger` for the `log` facade used
//! throughout the crate. Each record is tagged with its level and the name of
//! the thread that emitted it, which for tournament participants is
//! `participant-<id>`.

use std::io::Write;

use log::{Level, LevelFilter, Log, Metadata, Record};
use spin::Once;

/// ANSI color codes for terminal output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    Red = 31,
    Green = 32,
    Blue = 34,
    BrightBlack = 90,
    BrightYellow = 93,
}

/// # Initialization
/// Installs the logger with the level named by the `LOG` environment
/// variable, read at runtime and falling back to the value `LOG` had at
/// build time:
/// - "ERROR" -> `LevelFilter::Error`
/// - "WARN" -> `LevelFilter::Warn`
/// - "INFO" -> `LevelFilter::Info`
/// - "DEBUG" -> `LevelFilter::Debug`
/// - "TRACE" -> `LevelFilter::Trace`
/// - Any other value -> `LevelFilter::Off`
///
/// Calling it more than once is harmless; only the first call installs
/// anything. If another logger was installed first, that one stays.
pub fn init() {
    static INIT: Once = Once::new();
    static LOGGER: LockLogger = LockLogger;

    INIT.call_once(|| {
        let level = std::env::var("LOG").ok();
        let level = level.as_deref().or(option_env!("LOG"));
        if log::set_logger(&LOGGER).is_ok() {
            log::set_max_level(level_filter(level));
        }
    });
}

fn level_filter(name: Option<&str>) -> LevelFilter {
    match name {
        Some("ERROR") => LevelFilter::Error,
        Some("WARN") => LevelFilter::Warn,
        Some("INFO") => LevelFilter::Info,
        Some("DEBUG") => LevelFilter::Debug,
        Some("TRACE") => LevelFilter::Trace,
        _ => LevelFilter::Off,
    }
}

struct LockLogger;

impl Log for LockLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let current = std::thread::current();
        let name = current.name().unwrap_or("-");
        let color = level_to_color(record.level());

        // a failed write to stderr has nowhere to be reported
        let _ = writeln!(
            std::io::stderr().lock(),
            "\x1B[{}m[TOURNEY][{:>5}][{}] {}\x1B[0m",
            color as u8,
            record.level(),
            name,
            record.args(),
        );
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

fn level_to_color(level: Level) -> Color {
    match level {
        Level::Error => Color::Red,
        Level::Warn => Color::BrightYellow,
        Level::Info => Color::Blue,
        Level::Debug => Color::Green,
        Level::Trace => Color::BrightBlack,
    }
}

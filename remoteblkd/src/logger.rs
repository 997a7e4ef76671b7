/// Stderr logger with per-level colors, installed once at startup.
///
/// Level comes from `RUST_LOG` (defaults to `info`).
use std::io::Write;
use std::str::FromStr;

use log::LevelFilter;

struct Logger;

static LOGGER: Logger = Logger;

pub fn init() {
    let level = std::env::var("RUST_LOG")
        .ok()
        .and_then(|s| LevelFilter::from_str(&s).ok())
        .unwrap_or(LevelFilter::Info);

    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}

impl log::Log for Logger {
    fn enabled(&self, _metadata: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        use log::Level::*;

        let color_code: u8 = match record.level() {
            Error => 31,
            Warn => 93,
            Info => 34,
            Debug => 32,
            Trace => 90,
        };

        let mut err = std::io::stderr().lock();
        let _ = writeln!(
            err,
            "\x1b[{}m[{:>5}] {}\x1b[0m",
            color_code,
            record.level(),
            record.args(),
        );
    }

    fn flush(&self) {}
}

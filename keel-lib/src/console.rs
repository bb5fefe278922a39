// Copyright 2026 The Keel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Console
//!
//! A `log` sink that writes one prefixed line per record to stderr.
//!
//! ```text
//! [INFO] loaded 3 shaders
//! [WARNING] swapchain out of date
//! ```

use std::io::Write;

use log::{Level, LevelFilter, Log, Metadata, Record};

pub struct Console;

static CONSOLE: Console = Console;

/// Installs the console logger and sets the max level.  Calling it again only changes the level,
/// and if some other logger was installed first the records go there.
pub fn init(level: LevelFilter) {
    if log::set_logger(&CONSOLE).is_err() {
        log::debug!("logger already installed, updating level to {level}");
    }
    log::set_max_level(level);
}

pub fn prefix(level: Level) -> &'static str {
    match level {
        Level::Error => "[ERROR] ",
        Level::Warn => "[WARNING] ",
        Level::Info => "[INFO] ",
        Level::Debug => "[DEBUG] ",
        Level::Trace => "[TRACE] ",
    }
}

fn write_record(out: &mut impl Write, record: &Record) -> std::io::Result<()> {
    writeln!(out, "{}{}", prefix(record.level()), record.args())
}

impl Log for Console {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        // Nowhere left to report a failed write to stderr.
        let _ = write_record(&mut std::io::stderr().lock(), record);
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Simple stderr backend for the [`log`] crate.
//!
//! Records are filtered by [`log::max_level`], so the level can still be changed after the logger is installed (for
//! example once the configuration file has been read).

use std::io::{self, Write};

use log::{Metadata, Record};

/// A simple logging backend that writes to stderr.
#[derive(Default)]
pub struct StderrLogger;

impl StderrLogger {
    /// Constructs a new [`StderrLogger`].
    #[must_use = "Has no effect if the result is unused"]
    pub const fn new() -> Self {
        Self
    }
}

impl log::Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let level = record.level();
            let target = record.target();
            let file = record.file().unwrap_or_default();
            let line = record.line().unwrap_or_default();
            let args = record.args();
            let _ = writeln!(
                io::stderr().lock(),
                "[{level} {target} {file}:{line}] - {args}"
            );
        }
    }

    fn flush(&self) {
        let _ = io::stderr().flush();
    }
}

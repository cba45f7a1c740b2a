// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Parses single lines of `efibootmgr -v` output into a [`ParsedLine`].
//!
//! The currently supported lines are as follows:
//! - Boot entries (`Boot0001* Linux\tHD(...)/File(\vmlinuz)...`)
//! - `BootOrder`, `BootNext` and `BootCurrent`
//! - `Timeout`
//!
//! Anything else is [`ParsedLine::Unrecognized`]. Parsing a line never fails, so that one odd line can not stop
//! the rest of the output from being read.

use crate::config::types::BootNum;

/// The boot entry line parser.
pub mod entry;

/// The `Key: value` line parser.
pub mod variable;

/// A boot entry line, as it was printed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntryLine {
    /// The boot number of the entry.
    pub num: BootNum,

    /// If the entry was marked with an asterisk.
    pub active: bool,

    /// The name of the entry.
    pub name: String,

    /// The path inside of the `File(...)` node, or empty if there was none.
    pub path: String,

    /// The text after the device path, still encoded.
    pub params: String,
}

/// The result of parsing one line of `efibootmgr -v` output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParsedLine {
    /// A boot entry.
    Entry(EntryLine),

    /// The firmware boot priority list.
    BootOrder(Vec<BootNum>),

    /// The boot entry used for the next boot only.
    BootNext(BootNum),

    /// The boot entry the running system was booted from.
    BootCurrent(BootNum),

    /// The firmware boot menu timeout in seconds.
    Timeout(u16),

    /// A line that matched none of the above.
    Unrecognized,
}

/// Parses one line of `efibootmgr -v` output.
#[must_use = "Has no effect if the result is unused"]
pub fn parse_line(line: &str) -> ParsedLine {
    if let Some(entry) = entry::parse_entry_line(line) {
        return ParsedLine::Entry(entry);
    }

    variable::parse_variable_line(line).unwrap_or(ParsedLine::Unrecognized)
}

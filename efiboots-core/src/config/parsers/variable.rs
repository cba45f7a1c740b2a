// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! A parser for the `Key: value` lines of `efibootmgr` output.
//!
//! Example lines:
//!
//! ```text
//! BootCurrent: 0001
//! BootNext: 0003
//! Timeout: 2 seconds
//! BootOrder: 0001,0003,0000
//! ```

use log::{debug, warn};

use crate::config::{
    parsers::ParsedLine,
    types::{BootNum, parse_timeout},
};

/// Parses a `Key: value` line, returning [`None`] if the key is unknown or the value does not parse.
#[must_use = "Has no effect if the result is unused"]
pub fn parse_variable_line(line: &str) -> Option<ParsedLine> {
    let (key, value) = line.split_once(':')?;
    let value = value.trim();

    let parsed = match key.trim() {
        "BootOrder" => ParsedLine::BootOrder(parse_boot_order(value)?),
        "BootNext" => ParsedLine::BootNext(BootNum::new(value).ok()?),
        "BootCurrent" => ParsedLine::BootCurrent(BootNum::new(value).ok()?),
        "Timeout" => ParsedLine::Timeout(parse_timeout(value.split_whitespace().next()?).ok()?),
        _ => return None,
    };
    debug!(target: "parser", "{parsed:?}");
    Some(parsed)
}

/// Parses a comma separated list of boot numbers.
///
/// Empty items are skipped, so an empty `BootOrder` is an empty list. Any invalid item makes the whole list invalid.
fn parse_boot_order(value: &str) -> Option<Vec<BootNum>> {
    value
        .split(',')
        .map(str::trim)
        .filter(|x| !x.is_empty())
        .map(|x| {
            BootNum::new(x)
                .map_err(|e| warn!(target: "parser", "Invalid BootOrder item: {e}"))
                .ok()
        })
        .collect()
}

// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! A parser for the boot entry lines of `efibootmgr -v`.
//!
//! Example line (the name and the device path are separated by a tab):
//!
//! ```text
//! Boot0001* Linux Boot Manager	HD(1,GPT,0f6b6ad8-...,0x800,0x100000)/File(\EFI\systemd\systemd-bootx64.efi)r.o.o.t.=.
//! ```
//!
//! The grammar is `Boot<HEX>[*] <NAME>\t<SUFFIX>`. If the suffix contains a `File(<PATH>)` node, then the text after
//! it is the parameters. Otherwise, the path is empty and the parameters are whatever follows the last closing
//! parenthesis of the device path.

use log::debug;

use crate::config::{parsers::EntryLine, types::BootNum};

/// The prefix of every boot entry line.
const ENTRY_PREFIX: &str = "Boot";

/// The device path node that holds the loader path.
const FILE_NODE: &str = "/File(";

/// Parses a boot entry line, returning [`None`] if the line is not one.
#[must_use = "Has no effect if the result is unused"]
pub fn parse_entry_line(line: &str) -> Option<EntryLine> {
    let rest = line.strip_prefix(ENTRY_PREFIX)?;

    let hex_len = rest
        .find(|x: char| !matches!(x, '0'..='9' | 'A'..='F'))
        .unwrap_or(rest.len());
    if hex_len == 0 {
        return None;
    }
    let (num, rest) = rest.split_at(hex_len);

    let (active, rest) = match rest.strip_prefix('*') {
        Some(rest) => (true, rest),
        // efibootmgr prints a space in place of the missing asterisk
        None => (
            false,
            rest.strip_prefix(' ')
                .filter(|x| x.starts_with(' '))
                .unwrap_or(rest),
        ),
    };

    let (name, suffix) = rest.strip_prefix(' ')?.split_once('\t')?;
    if name.is_empty() {
        return None;
    }

    let (path, params) = split_suffix(suffix)?;

    let entry = EntryLine {
        num: BootNum::new(num).ok()?,
        active,
        name: name.to_owned(),
        path: path.to_owned(),
        params: params.to_owned(),
    };
    debug!(target: "parser", "Entry: {entry:?}");
    Some(entry)
}

/// Splits the device path suffix of an entry line into the loader path and the raw parameters.
///
/// Returns [`None`] if the suffix does not look like a device path at all (there is no closing parenthesis).
fn split_suffix(suffix: &str) -> Option<(&str, &str)> {
    if let Some(idx) = suffix.rfind(FILE_NODE)
        && idx > 0
    {
        let file = &suffix[idx + FILE_NODE.len()..];
        if let Some((path, params)) = file.split_once(')')
            && !path.is_empty()
        {
            return Some((path, params));
        }
    }

    let idx = suffix.rfind(')')?;
    Some(("", &suffix[idx + 1..]))
}

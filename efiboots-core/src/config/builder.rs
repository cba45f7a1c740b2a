// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Boot entry and boot configuration builders.
//!
//! [`ConfigurationBuilder`] folds the [`ParsedLine`]s of one `efibootmgr -v` invocation into a [`BootConfiguration`].
//! `BootCurrent` and `BootNext` may show up anywhere in the output, so the per entry flags that depend on them are
//! only resolved in [`ConfigurationBuilder::build`].

use log::warn;

use crate::config::{
    BootConfiguration, BootEntry,
    decode::decode_efibootmgr,
    parsers::{EntryLine, ParsedLine, parse_line},
    types::BootNum,
};

/// A builder to configure a [`BootEntry`]
///
/// # Example
///
/// ```
/// use efiboots_core::config::{builder::BootEntryBuilder, types::BootNum};
///
/// let num = BootNum::new("0001").expect("0001 is a valid boot number");
/// let entry = BootEntryBuilder::new(num, "Linux")
///     .loader_path("\\vmlinuz-linux")
///     .parameters("root=/dev/sda2 rw")
///     .active(true)
///     .build();
/// assert!(entry.active);
/// ```
#[must_use = "Has no effect if the result is unused"]
pub struct BootEntryBuilder {
    /// The inner [`BootEntry`] that the builder operates on.
    entry: BootEntry,
}

impl BootEntryBuilder {
    /// Constructs a new inactive [`BootEntry`] with no loader or parameters.
    pub fn new(num: BootNum, name: impl Into<String>) -> Self {
        Self {
            entry: BootEntry {
                num,
                name: name.into(),
                loader_path: String::new(),
                parameters: String::new(),
                active: false,
                is_current: false,
                is_next: false,
            },
        }
    }

    /// Sets the loader path of a [`BootEntry`].
    pub fn loader_path(mut self, loader_path: impl Into<String>) -> Self {
        self.entry.loader_path = loader_path.into();
        self
    }

    /// Sets the parameters of a [`BootEntry`].
    ///
    /// These should already be decoded.
    pub fn parameters(mut self, parameters: impl Into<String>) -> Self {
        self.entry.parameters = parameters.into();
        self
    }

    /// Sets if a [`BootEntry`] is active.
    pub const fn active(mut self, active: bool) -> Self {
        self.entry.active = active;
        self
    }

    /// Sets if a [`BootEntry`] is the one that was booted from.
    pub const fn current(mut self, current: bool) -> Self {
        self.entry.is_current = current;
        self
    }

    /// Sets if a [`BootEntry`] is the one used for the next boot.
    pub const fn next(mut self, next: bool) -> Self {
        self.entry.is_next = next;
        self
    }

    /// Builds a [`BootEntry`]
    #[must_use = "Has no effect if the result is unused"]
    pub fn build(self) -> BootEntry {
        self.entry
    }
}

impl From<EntryLine> for BootEntryBuilder {
    fn from(value: EntryLine) -> Self {
        let parameters = decode_efibootmgr(&value.params);
        Self::new(value.num, value.name)
            .loader_path(value.path)
            .parameters(parameters)
            .active(value.active)
    }
}

/// Folds parsed lines into a [`BootConfiguration`].
#[derive(Default)]
#[must_use = "Has no effect if the result is unused"]
pub struct ConfigurationBuilder {
    /// The entries seen so far, in listing order.
    entries: Vec<BootEntry>,

    /// The last `BootOrder` seen.
    boot_order: Vec<BootNum>,

    /// The last `BootNext` seen.
    boot_next: Option<BootNum>,

    /// The last `BootCurrent` seen.
    boot_current: Option<BootNum>,

    /// The last `Timeout` seen.
    timeout: Option<u16>,

    /// The amount of lines that were not recognized.
    unrecognized: usize,
}

impl ConfigurationBuilder {
    /// Constructs a new, empty [`ConfigurationBuilder`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses and folds every line of an `efibootmgr -v` output. Blank lines are skipped.
    pub fn push_output(&mut self, output: &str) {
        for line in output.lines() {
            if line.trim().is_empty() {
                continue;
            }
            match parse_line(line) {
                ParsedLine::Unrecognized => {
                    warn!(target: "parser", "line didn't match: {line:?}");
                    self.unrecognized += 1;
                }
                parsed => self.push(parsed),
            }
        }
    }

    /// Folds one [`ParsedLine`] into the configuration.
    ///
    /// A later `BootOrder`, `BootNext`, `BootCurrent` or `Timeout` replaces an earlier one. An entry whose boot number
    /// was already seen is dropped.
    pub fn push(&mut self, line: ParsedLine) {
        match line {
            ParsedLine::Entry(entry) => {
                if self.entries.iter().any(|x| x.num == entry.num) {
                    warn!(target: "parser", "Boot{} is listed more than once, ignoring the duplicate", entry.num);
                } else {
                    self.entries.push(BootEntryBuilder::from(entry).build());
                }
            }
            ParsedLine::BootOrder(order) => self.boot_order = order,
            ParsedLine::BootNext(num) => self.boot_next = Some(num),
            ParsedLine::BootCurrent(num) => self.boot_current = Some(num),
            ParsedLine::Timeout(timeout) => self.timeout = Some(timeout),
            ParsedLine::Unrecognized => self.unrecognized += 1,
        }
    }

    /// Gets the amount of lines that were dropped because they were not recognized.
    #[must_use = "Has no effect if the result is unused"]
    pub fn unrecognized(&self) -> usize {
        self.unrecognized
    }

    /// Builds the [`BootConfiguration`], resolving the current and next flags of every entry.
    #[must_use = "Has no effect if the result is unused"]
    pub fn build(self) -> BootConfiguration {
        let mut entries = self.entries;
        for entry in &mut entries {
            entry.is_current = self.boot_current.as_ref() == Some(&entry.num);
            entry.is_next = self.boot_next.as_ref() == Some(&entry.num);
        }

        BootConfiguration {
            entries,
            boot_order: self.boot_order,
            boot_next: self.boot_next,
            boot_current: self.boot_current,
            timeout: self.timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::config::types::TypeError;

    /// Output of `efibootmgr -v` on a machine with Windows and Linux installed.
    const OUTPUT: &str = "BootCurrent: 0001
Timeout: 1 seconds
BootOrder: 0001,0000,0002
Boot0000* Windows Boot Manager\tHD(1,GPT,9ab3f4c2-...,0x800,0x82000)/File(\\EFI\\Microsoft\\Boot\\bootmgfw.efi)WINDOWSx.B.C.D.
Boot0001* Linux Boot Manager\tHD(1,GPT,9ab3f4c2-...,0x800,0x82000)/File(\\EFI\\systemd\\systemd-bootx64.efi)
Boot0002  UEFI: PXE IPv4\tPciRoot(0x0)/Pci(0x1c,0x0)/MAC(001122334455,0)/IPv4(0.0.0.0)
BootNext: 0002
";

    #[test]
    fn test_basic_configuration() -> Result<(), TypeError> {
        let mut builder = ConfigurationBuilder::new();
        builder.push_output(OUTPUT);
        assert_eq!(builder.unrecognized(), 0);
        let config = builder.build();

        assert_eq!(config.entries.len(), 3);
        assert_eq!(
            config.boot_order,
            vec![BootNum::new("0001")?, BootNum::new("0000")?, BootNum::new("0002")?]
        );
        assert_eq!(config.timeout, Some(1));
        assert_eq!(config.entries[0].parameters, "WINDOWSxBCD");
        assert!(config.entries[1].is_current);
        // BootNext comes after the entries, but is still resolved
        assert!(config.entries[2].is_next);
        assert!(!config.entries[2].active);
        assert_eq!(config.entries.iter().filter(|x| x.is_next).count(), 1);
        Ok(())
    }

    #[test]
    fn test_garbage_lines_are_counted() {
        let mut builder = ConfigurationBuilder::new();
        builder.push_output("EFI variables are not supported on this system.\n\nBootOrder: 0000\nnonsense\n");
        assert_eq!(builder.unrecognized(), 2);
        assert_eq!(builder.build().boot_order.len(), 1);
    }

    #[test]
    fn test_duplicate_entries() {
        let mut builder = ConfigurationBuilder::new();
        builder.push_output("Boot0000* A\tHD(1)\nBoot0000* B\tHD(1)\n");
        let config = builder.build();
        assert_eq!(config.entries.len(), 1);
        assert_eq!(config.entries[0].name, "A");
    }

    #[test]
    fn test_entry_builder() -> Result<(), TypeError> {
        let entry = BootEntryBuilder::new(BootNum::new("0004")?, "Shell")
            .loader_path("\\shellx64.efi")
            .current(true)
            .next(true)
            .build();
        assert_eq!(entry.loader_path, "\\shellx64.efi");
        assert!(entry.parameters.is_empty());
        assert!(!entry.active);
        assert!(entry.is_current && entry.is_next);
        Ok(())
    }

    proptest! {
        #[test]
        fn doesnt_panic(x in any::<String>()) {
            let _ = BootConfiguration::parse(&x);
        }

        #[test]
        fn garbage_does_not_hide_entries(garbage in prop::collection::vec("[^\\n]*", 0..8)) {
            let mut output = garbage.join("\n");
            output.push_str("\nBoot0009* Kept\tHD(1)/File(\\k.efi)\n");
            let config = BootConfiguration::parse(&output);
            prop_assert!(config.entries.iter().any(|x| x.name == "Kept"));
        }
    }
}

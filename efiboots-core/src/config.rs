// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Provides [`BootEntry`] and [`BootConfiguration`], the model of the firmware boot configuration.
//!
//! A [`BootConfiguration`] is an immutable snapshot of one `efibootmgr -v` invocation. It keeps the entries in the
//! order the firmware listed them, and the boot priority as a separate list of [`BootNum`]s.

use crate::config::{builder::ConfigurationBuilder, types::BootNum};

pub mod builder;
pub mod decode;
pub mod parsers;
pub mod store;
pub mod types;

/// One boot option in NVRAM.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BootEntry {
    /// The boot number, unique within a [`BootConfiguration`].
    pub num: BootNum,

    /// The description of the boot option.
    pub name: String,

    /// The path to the loader inside of the ESP, empty if the boot option has no file.
    pub loader_path: String,

    /// The decoded load option parameters, possibly empty.
    pub parameters: String,

    /// If the boot option shows up in the firmware boot menu.
    pub active: bool,

    /// If this is the boot option the running system was booted from.
    pub is_current: bool,

    /// If this is the boot option that will be used for the next boot only.
    pub is_next: bool,
}

/// A snapshot of the firmware boot configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BootConfiguration {
    /// The boot entries, in the order they were listed.
    pub entries: Vec<BootEntry>,

    /// The boot priority list.
    pub boot_order: Vec<BootNum>,

    /// The boot entry used for the next boot only.
    pub boot_next: Option<BootNum>,

    /// The boot entry the running system was booted from.
    pub boot_current: Option<BootNum>,

    /// The firmware boot menu timeout in seconds.
    pub timeout: Option<u16>,
}

impl BootConfiguration {
    /// Parses the complete output of `efibootmgr -v`.
    ///
    /// This never fails, lines that could not be parsed are logged and skipped.
    #[must_use = "Has no effect if the result is unused"]
    pub fn parse(output: &str) -> Self {
        let mut builder = ConfigurationBuilder::new();
        builder.push_output(output);
        builder.build()
    }

    /// Gets a [`BootEntry`] by its boot number.
    #[must_use = "Has no effect if the result is unused"]
    pub fn entry(&self, num: &BootNum) -> Option<&BootEntry> {
        self.entries.iter().find(|x| &x.num == num)
    }

    /// Checks if there is a [`BootEntry`] with a boot number.
    #[must_use = "Has no effect if the result is unused"]
    pub fn contains(&self, num: &BootNum) -> bool {
        self.entry(num).is_some()
    }
}

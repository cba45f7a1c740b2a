// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! `newtype` definitions for fields of [`super::BootEntry`]
//!
//! At the moment, this includes the following type definitions:
//! - [`BootNum`] (constructor enforces hex digits only, and will uppercase; placeholders are built separately)
//!
//! It also provides [`parse_timeout`], the shared validation for user supplied timeouts.

use core::{fmt, ops::Deref, str::FromStr};

use thiserror::Error;

use crate::system::helper::{check_boot_num_valid, check_placeholder_valid};

/// The prefix of every boot number that was created locally and not yet written to NVRAM.
pub const PLACEHOLDER_PREFIX: &str = "NEW";

/// Errors that may happen from invalid inputs to the respective constructors.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum TypeError {
    /// The boot number was invalid.
    #[error("\"{0}\" is not a valid boot number")]
    BootNum(String),

    /// The timeout was invalid.
    #[error("\"{0}\" is not a valid timeout in seconds")]
    Timeout(String),
}

/// A newtype wrapper around a boot number, as printed by `efibootmgr` (such as `0001`).
///
/// Entries that only exist in the working copy carry a placeholder boot number of the form `NEW<n>`. Since a
/// placeholder always contains the non hex character `N`, it can never collide with a real boot number.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BootNum(String);

impl BootNum {
    /// Creates a new [`BootNum`] from its hexadecimal representation.
    ///
    /// # Errors
    ///
    /// May return an `Error` if the boot number is empty or contains anything other than hex digits.
    pub fn new(num: &str) -> Result<Self, TypeError> {
        if check_boot_num_valid(num) {
            Ok(Self(num.to_ascii_uppercase()))
        } else {
            Err(TypeError::BootNum(num.to_owned()))
        }
    }

    /// Creates the placeholder boot number `NEW<n>`.
    #[must_use = "Has no effect if the result is unused"]
    pub fn placeholder(n: usize) -> Self {
        Self(format!("{PLACEHOLDER_PREFIX}{n}"))
    }

    /// Checks if the boot number is a placeholder for an entry that has not been created yet.
    #[must_use = "Has no effect if the result is unused"]
    pub fn is_placeholder(&self) -> bool {
        self.0.starts_with(PLACEHOLDER_PREFIX)
    }
}

impl FromStr for BootNum {
    type Err = TypeError;

    /// Parses either a real boot number or a placeholder, as a user would type it.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if check_placeholder_valid(s) {
            Ok(Self(s.to_ascii_uppercase()))
        } else {
            Self::new(s)
        }
    }
}

impl Deref for BootNum {
    type Target = String;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Display for BootNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Parses a timeout in seconds.
///
/// `efibootmgr` stores the timeout as a 16 bit value, so anything that does not fit is rejected.
///
/// # Errors
///
/// May return an `Error` if the value is not a non-negative integer that fits in 16 bits.
pub fn parse_timeout(value: &str) -> Result<u16, TypeError> {
    value
        .trim()
        .parse()
        .map_err(|_| TypeError::Timeout(value.to_owned()))
}

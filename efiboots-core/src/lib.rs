// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! The `efiboots` library crate.
//!
//! This reads the UEFI boot configuration through `efibootmgr -v`, parses it into a [`config::BootConfiguration`],
//! lets a frontend stage edits on a [`config::store::BootStore`], and converts those edits into the `efibootmgr`
//! invocations that make NVRAM match the edited state.
//!
//! The frontend shipped with this repository is a command line one, found in `efiboots-cli`. Other frontends only
//! have to drive the [`config::store::BootStore`] and hand it an [`system::efibootmgr::NvramBackend`].
//!
//! ## MSRV
//!
//! The minimum supported rust version is 1.88.0.

/// The primary result type that wraps around [`crate::error::BootError`].
pub type BootResult<T> = Result<T, crate::error::BootError>;

pub mod boot;
pub mod config;
pub mod error;
pub mod system;

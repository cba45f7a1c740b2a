// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Provides [`BootError`], which encapsulates other errors

use thiserror::Error;

/// An `Error` resulting from the program.
#[derive(Error, Debug)]
pub enum BootError {
    /// A value did not have the shape of a boot number or a timeout.
    #[error("Type Error: {0}")]
    TypeError(#[from] crate::config::types::TypeError),

    /// An edit could not be staged on the boot store.
    #[error("Edit Error: {0}")]
    StoreError(#[from] crate::config::store::StoreError),

    /// An external command could not be run, or it failed.
    #[error("Command Error: {0}")]
    CommandError(#[from] crate::system::command::CommandError),

    /// The EFI System Partition could not be determined.
    #[error("ESP Error: {0}")]
    EspError(#[from] crate::system::esp::EspError),

    /// Writing the staged changes to NVRAM failed.
    #[error("Commit Error: {0}")]
    CommitError(#[from] crate::system::efibootmgr::CommitError),

    /// The configuration file could not be read.
    #[error("Config File Error: {0}")]
    ConfigFileError(#[from] crate::boot::config::ConfigFileError),
}

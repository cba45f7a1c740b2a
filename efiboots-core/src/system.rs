// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! System re-exports

pub mod command;
pub mod efibootmgr;
pub mod esp;
pub mod helper;
pub mod log_backend;

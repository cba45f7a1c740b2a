// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Everything needed to turn staged edits into NVRAM writes.
//!
//! [`plan::Plan`] holds the `efibootmgr` invocations for one commit, and [`config::ManagerConfig`] holds the settings
//! that decide how those invocations are run.

pub mod config;
pub mod plan;

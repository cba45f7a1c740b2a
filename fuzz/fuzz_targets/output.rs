// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

#![no_main]

use efiboots_core::config::{BootConfiguration, store::BootStore};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    let config = BootConfiguration::parse(data);
    let entries = config.entries.len();
    let store = BootStore::new(config);
    assert_eq!(store.order().len(), entries);
});

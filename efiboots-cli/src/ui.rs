// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Renders the boot store as plain text.

use core::fmt::Write;

use efiboots_core::config::{
    BootConfiguration,
    store::{BootStore, Row},
};

/// The headers of the table, in column order.
const HEADERS: [&str; 8] = [
    "Current",
    "Num",
    "Name",
    "Path",
    "Parameters",
    "Active",
    "Next",
    "Staged",
];

/// Renders a checkmark cell.
const fn mark(value: bool) -> &'static str {
    if value { "*" } else { "" }
}

/// Gets the cells of one row, in column order.
fn cells<'a>(row: &Row<'a>) -> [&'a str; 8] {
    let staged = if row.added {
        "add"
    } else if row.removed {
        "remove"
    } else {
        ""
    };
    [
        mark(row.is_current),
        row.num.as_str(),
        row.name,
        row.loader_path,
        row.parameters,
        mark(row.active),
        mark(row.is_next),
        staged,
    ]
}

/// Renders rows as a table with left aligned columns.
#[must_use = "Has no effect if the result is unused"]
pub fn render_table(rows: &[Row<'_>]) -> String {
    let rows: Vec<[&str; 8]> = rows.iter().map(cells).collect();

    let mut widths = HEADERS.map(|x| x.chars().count());
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    for row in core::iter::once(&HEADERS).chain(&rows) {
        let line = row
            .iter()
            .zip(widths)
            .map(|(cell, width)| format!("{cell:width$}"))
            .collect::<Vec<_>>()
            .join("  ");
        let _ = writeln!(out, "{}", line.trim_end());
    }
    out
}

/// Renders the working copy of a [`BootStore`], followed by its boot variables.
#[must_use = "Has no effect if the result is unused"]
pub fn render_store(store: &BootStore) -> String {
    let mut out = render_table(&store.rows());
    let order = store
        .committed_order()
        .map(|x| x.as_str())
        .collect::<Vec<_>>()
        .join(",");
    let _ = writeln!(out, "\nBootOrder: {order}");
    let _ = writeln!(
        out,
        "BootNext: {}",
        store.next().map_or("none", |x| x.as_str())
    );
    if let Some(timeout) = store.timeout() {
        let _ = writeln!(out, "Timeout: {timeout} seconds");
    }
    if store.pending_changes() {
        let _ = writeln!(out, "\nThere are pending changes, use commit to apply them");
    }
    out
}

/// Renders a [`BootConfiguration`] as read from NVRAM.
#[must_use = "Has no effect if the result is unused"]
pub fn render_configuration(config: &BootConfiguration) -> String {
    render_store(&BootStore::new(config.clone()))
}

#[cfg(test)]
mod tests {
    use efiboots_core::config::types::BootNum;

    use super::*;

    #[test]
    fn test_render() {
        let store = BootStore::new(BootConfiguration::parse(
            "BootCurrent: 0001\nTimeout: 3 seconds\nBootOrder: 0001\nBoot0001* Linux Boot Manager\tHD(1)/File(\\EFI\\systemd\\systemd-bootx64.efi)\n",
        ));
        let out = render_store(&store);
        let mut lines = out.lines();
        assert_eq!(
            lines.next(),
            Some("Current  Num   Name                Path                              Parameters  Active  Next  Staged")
        );
        assert_eq!(
            lines.next(),
            Some("*        0001  Linux Boot Manager  \\EFI\\systemd\\systemd-bootx64.efi              *")
        );
        assert!(out.contains("BootOrder: 0001\n"));
        assert!(out.contains("BootNext: none\n"));
        assert!(out.contains("Timeout: 3 seconds\n"));
        assert!(!out.contains("pending"));
    }

    #[test]
    fn test_staged_rows() -> anyhow::Result<()> {
        let mut store = BootStore::new(BootConfiguration::parse(
            "BootOrder: 0001,0002\nBoot0001* One\tHD(1)/File(\\one.efi)\nBoot0002* Two\tHD(1)/File(\\two.efi)\n",
        ));
        store.add_entry("New", "\\new.efi", "")?;
        store.remove_entry(&BootNum::new("0002")?)?;

        let out = render_table(&store.rows());
        assert_eq!(
            out.lines().collect::<Vec<_>>(),
            vec![
                "Current  Num   Name  Path      Parameters  Active  Next  Staged",
                "         NEW0  New   \\new.efi              *             add",
                "         0001  One   \\one.efi              *",
                "         0002  Two   \\two.efi              *             remove",
            ]
        );
        Ok(())
    }
}

// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Provides [`BootStore`], the editable model of the firmware boot configuration.
//!
//! A [`BootStore`] keeps the last loaded [`BootConfiguration`] as its baseline, and a working copy that edits are
//! staged on. Nothing is written to NVRAM until [`BootStore::commit`] is called, which hands a [`Plan`] to a
//! [`NvramBackend`] and then reloads the baseline from it. The baseline is reloaded after a failed commit as well,
//! keeping only the edits that NVRAM does not reflect yet, so a retry never repeats a command that already ran.
//!
//! Edits that refer to an existing entry are kept as one [`EditIntent`] per boot number, so an entry can never be
//! staged for activation and deactivation at the same time. Entries that do not exist yet are kept as
//! [`Addition`]s with a placeholder boot number (`NEW<n>`). The firmware picks the real boot number on creation, so
//! a placeholder can only be moved or removed, and must be committed before anything else can refer to it.

use log::{info, warn};
use thiserror::Error;

use crate::{
    BootResult,
    boot::plan::{Plan, PlannedCommand},
    config::{BootConfiguration, BootEntry, types::BootNum},
    system::{
        efibootmgr::{CommitError, NvramBackend},
        esp::EspTarget,
    },
};

/// Errors that may result from staging an edit.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum StoreError {
    /// The boot number is not part of the working copy.
    #[error("There is no boot entry {0}")]
    UnknownEntry(BootNum),

    /// A new entry was given an empty label.
    #[error("The label of a new boot entry must not be empty")]
    EmptyLabel,

    /// The boot number belongs to an entry that has not been created yet.
    #[error("Boot entry {0} has not been created yet, commit it first")]
    Uncommitted(BootNum),
}

/// The direction to move an entry in the boot order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Towards the front of the boot order (higher priority).
    Up,

    /// Towards the back of the boot order (lower priority).
    Down,
}

/// A staged change to an entry that exists in the baseline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditIntent {
    /// Delete the entry.
    Remove,

    /// Mark the entry as active.
    Activate,

    /// Mark the entry as inactive.
    Deactivate,
}

/// An entry staged for creation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Addition {
    /// The placeholder boot number of the entry.
    pub num: BootNum,

    /// The name of the entry.
    pub label: String,

    /// The path to the loader inside of the ESP.
    pub loader_path: String,

    /// The load option parameters.
    pub parameters: String,
}

/// One row of the working copy, as a frontend would display it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Row<'a> {
    /// The boot number, or a placeholder if the entry is staged for creation.
    pub num: &'a BootNum,

    /// The name of the entry.
    pub name: &'a str,

    /// The path to the loader.
    pub loader_path: &'a str,

    /// The decoded load option parameters.
    pub parameters: &'a str,

    /// If the entry will be active after a commit.
    pub active: bool,

    /// If the entry was booted from.
    pub is_current: bool,

    /// If the entry will be used for the next boot.
    pub is_next: bool,

    /// If the entry is staged for creation.
    pub added: bool,

    /// If the entry is staged for deletion.
    pub removed: bool,
}

/// The editable model of the firmware boot configuration.
#[derive(Clone, Debug, Default)]
pub struct BootStore {
    /// The last loaded configuration.
    baseline: BootConfiguration,

    /// The boot order of the baseline, after reconciliation.
    baseline_order: Vec<BootNum>,

    /// The working boot order, including placeholders.
    order: Vec<BootNum>,

    /// The working `BootNext`.
    next: Option<BootNum>,

    /// The working `Timeout`.
    timeout: Option<u16>,

    /// The entries staged for creation, in staging order.
    additions: Vec<Addition>,

    /// The staged changes to existing entries, in staging order.
    intents: Vec<(BootNum, EditIntent)>,
}

impl BootStore {
    /// Creates a new [`BootStore`] with a [`BootConfiguration`] as its baseline.
    #[must_use = "Has no effect if the result is unused"]
    pub fn new(snapshot: BootConfiguration) -> Self {
        let mut store = Self::default();
        store.refresh(snapshot);
        store
    }

    /// Replaces the baseline, and resets the working copy to it. Every staged edit is dropped.
    pub fn refresh(&mut self, snapshot: BootConfiguration) {
        self.baseline_order = reconcile_order(&snapshot);
        self.order.clone_from(&self.baseline_order);
        self.next.clone_from(&snapshot.boot_next);
        self.timeout = snapshot.timeout;
        self.additions.clear();
        self.intents.clear();
        self.baseline = snapshot;
    }

    /// Drops every staged edit, going back to the baseline.
    pub fn discard(&mut self) {
        self.refresh(self.baseline.clone());
    }

    /// Gets the baseline [`BootConfiguration`].
    #[must_use = "Has no effect if the result is unused"]
    pub fn baseline(&self) -> &BootConfiguration {
        &self.baseline
    }

    /// Gets the working boot order, including placeholders.
    #[must_use = "Has no effect if the result is unused"]
    pub fn order(&self) -> &[BootNum] {
        &self.order
    }

    /// Gets the working boot order as it will be written, which excludes placeholders.
    pub fn committed_order(&self) -> impl Iterator<Item = &BootNum> {
        self.order.iter().filter(|x| !x.is_placeholder())
    }

    /// Gets the working `BootNext`.
    #[must_use = "Has no effect if the result is unused"]
    pub fn next(&self) -> Option<&BootNum> {
        self.next.as_ref()
    }

    /// Gets the working `Timeout`.
    #[must_use = "Has no effect if the result is unused"]
    pub fn timeout(&self) -> Option<u16> {
        self.timeout
    }

    /// Gets the entries staged for creation.
    #[must_use = "Has no effect if the result is unused"]
    pub fn additions(&self) -> &[Addition] {
        &self.additions
    }

    /// Gets the staged changes to existing entries, in staging order.
    pub fn staged(&self) -> impl Iterator<Item = (&BootNum, EditIntent)> {
        self.intents.iter().map(|(num, intent)| (num, *intent))
    }

    /// Gets the staged change of one existing entry.
    #[must_use = "Has no effect if the result is unused"]
    pub fn intent(&self, num: &BootNum) -> Option<EditIntent> {
        self.intents
            .iter()
            .find(|(x, _)| x == num)
            .map(|(_, intent)| *intent)
    }

    /// Moves an entry one step up or down the working boot order.
    ///
    /// Moving the first entry up or the last entry down does nothing.
    ///
    /// # Errors
    ///
    /// May return an `Error` if the entry is not in the working boot order.
    pub fn move_entry(&mut self, num: &BootNum, direction: Direction) -> Result<(), StoreError> {
        let idx = self.position(num)?;
        let other = match direction {
            Direction::Up => idx.checked_sub(1),
            Direction::Down => Some(idx + 1).filter(|&x| x < self.order.len()),
        };
        if let Some(other) = other {
            self.order.swap(idx, other);
        }
        Ok(())
    }

    /// Stages a new entry, placing it at the front of the working boot order. Returns its placeholder boot number.
    ///
    /// # Errors
    ///
    /// May return an `Error` if the label is empty.
    pub fn add_entry(
        &mut self,
        label: &str,
        loader_path: &str,
        parameters: &str,
    ) -> Result<BootNum, StoreError> {
        if label.trim().is_empty() {
            return Err(StoreError::EmptyLabel);
        }

        let mut n = self.additions.len();
        let num = loop {
            let num = BootNum::placeholder(n);
            if !self.additions.iter().any(|x| x.num == num) {
                break num;
            }
            n += 1;
        };

        self.order.insert(0, num.clone());
        self.additions.push(Addition {
            num: num.clone(),
            label: label.to_owned(),
            loader_path: loader_path.to_owned(),
            parameters: parameters.to_owned(),
        });
        Ok(num)
    }

    /// Stages the removal of an entry.
    ///
    /// If the entry is staged for creation, then the creation is cancelled instead. Any other change staged on the
    /// entry is dropped, and if the entry was the working `BootNext`, that is unset.
    ///
    /// # Errors
    ///
    /// May return an `Error` if the entry is not in the working boot order.
    pub fn remove_entry(&mut self, num: &BootNum) -> Result<(), StoreError> {
        let idx = self.position(num)?;
        self.order.remove(idx);

        if num.is_placeholder() {
            self.additions.retain(|x| &x.num != num);
            return Ok(());
        }

        self.intents.retain(|(x, _)| x != num);
        self.intents.push((num.clone(), EditIntent::Remove));
        if self.next.as_ref() == Some(num) {
            self.next = None;
        }
        Ok(())
    }

    /// Flips whether an entry will be active after a commit.
    ///
    /// Toggling the same entry twice leaves nothing staged.
    ///
    /// # Errors
    ///
    /// May return an `Error` if the entry is not in the working boot order, or if it has not been created yet.
    pub fn toggle_active(&mut self, num: &BootNum) -> Result<(), StoreError> {
        let entry = self.existing_entry(num)?;
        let wanted = if entry.active {
            EditIntent::Deactivate
        } else {
            EditIntent::Activate
        };

        if let Some(idx) = self.intents.iter().position(|(x, _)| x == num) {
            self.intents.remove(idx);
        } else {
            self.intents.push((num.clone(), wanted));
        }
        Ok(())
    }

    /// Sets or unsets the entry used for the next boot. Setting an entry replaces the previous one.
    ///
    /// # Errors
    ///
    /// May return an `Error` if the entry is not in the working boot order, or if it has not been created yet.
    pub fn set_boot_next(&mut self, num: Option<&BootNum>) -> Result<(), StoreError> {
        self.next = match num {
            Some(num) => Some(self.existing_entry(num)?.num.clone()),
            None => None,
        };
        Ok(())
    }

    /// Sets the firmware boot menu timeout in seconds.
    pub const fn set_timeout(&mut self, timeout: u16) {
        self.timeout = Some(timeout);
    }

    /// Checks if the working boot order differs from the baseline.
    ///
    /// Placeholders are ignored since they are not written to `BootOrder`, and so are entries staged for removal
    /// since deleting an entry also drops it from `BootOrder`.
    #[must_use = "Has no effect if the result is unused"]
    pub fn order_changed(&self) -> bool {
        let expected = self
            .baseline_order
            .iter()
            .filter(|x| self.intent(x) != Some(EditIntent::Remove));
        !self.committed_order().eq(expected)
    }

    /// Checks if the working `BootNext` differs from the baseline.
    #[must_use = "Has no effect if the result is unused"]
    pub fn next_changed(&self) -> bool {
        self.next != self.baseline.boot_next
    }

    /// Checks if the working `Timeout` differs from the baseline.
    #[must_use = "Has no effect if the result is unused"]
    pub fn timeout_changed(&self) -> bool {
        self.timeout != self.baseline.timeout
    }

    /// Checks if anything is staged.
    #[must_use = "Has no effect if the result is unused"]
    pub fn pending_changes(&self) -> bool {
        self.order_changed()
            || self.next_changed()
            || self.timeout_changed()
            || !self.additions.is_empty()
            || !self.intents.is_empty()
    }

    /// Gets the rows of the working copy.
    ///
    /// The rows are in working boot order, followed by the entries that are staged for removal.
    #[must_use = "Has no effect if the result is unused"]
    pub fn rows(&self) -> Vec<Row<'_>> {
        let working = self.order.iter().filter_map(|num| {
            if let Some(addition) = self.additions.iter().find(|x| &x.num == num) {
                return Some(Row {
                    num,
                    name: &addition.label,
                    loader_path: &addition.loader_path,
                    parameters: &addition.parameters,
                    active: true,
                    is_current: false,
                    is_next: false,
                    added: true,
                    removed: false,
                });
            }

            let entry = self.baseline.entry(num)?;
            Some(self.row(entry))
        });

        let removed = self
            .staged()
            .filter(|(_, intent)| *intent == EditIntent::Remove)
            .filter_map(|(num, _)| self.baseline.entry(num))
            .map(|entry| self.row(entry));

        working.chain(removed).collect()
    }

    /// Computes the [`Plan`] that would be executed by a commit.
    #[must_use = "Has no effect if the result is unused"]
    pub fn plan(&self, target: EspTarget) -> Plan {
        Plan::new(target, self)
    }

    /// Writes the staged edits to NVRAM through a [`NvramBackend`], then reloads the baseline from it.
    ///
    /// Returns the amount of commands that were executed. If nothing is staged, nothing is executed or reloaded.
    ///
    /// If a command fails, the baseline is still reloaded, and the edits that were not applied stay staged. If the
    /// baseline cannot be reloaded after every command succeeded, the staged edits are dropped, since they are all in
    /// NVRAM already.
    ///
    /// # Errors
    ///
    /// May return an `Error` if a command failed, or if the configuration could not be read back.
    pub fn commit(&mut self, backend: &mut impl NvramBackend, target: EspTarget) -> BootResult<usize> {
        let plan = self.plan(target);
        if plan.is_empty() {
            return Ok(0);
        }

        if let Err(e) = backend.apply(&plan) {
            let CommitError::Partial { completed, .. } = &e;
            let applied = plan.commands.get(..*completed).unwrap_or(&plan.commands);
            match backend.read() {
                Ok(snapshot) => self.rebase(snapshot, applied),
                Err(read) => warn!("Could not reload the boot configuration after a failed commit: {read}"),
            }
            return Err(e.into());
        }

        match backend.read() {
            Ok(snapshot) => {
                self.refresh(snapshot);
                Ok(plan.len())
            }
            Err(e) => {
                self.additions.clear();
                self.intents.clear();
                self.order.retain(|x| !x.is_placeholder());
                self.baseline_order.clone_from(&self.order);
                self.baseline.boot_next.clone_from(&self.next);
                self.baseline.timeout = self.timeout;
                Err(e)
            }
        }
    }

    /// Replaces the baseline after a commit that stopped partway, keeping the edits that are still left to do.
    ///
    /// `applied` are the commands of the plan that succeeded. Staged edits that the new baseline already reflects
    /// are dropped, and so are the additions that were created.
    fn rebase(&mut self, snapshot: BootConfiguration, applied: &[PlannedCommand]) {
        let created = applied
            .iter()
            .filter(|x| matches!(x, PlannedCommand::Create { .. }))
            .count();
        let order_done = !self.order_changed()
            || applied
                .iter()
                .any(|x| matches!(x, PlannedCommand::BootOrder(_)));
        let next_done = !self.next_changed()
            || applied
                .iter()
                .any(|x| matches!(x, PlannedCommand::BootNext(_) | PlannedCommand::DeleteBootNext));
        let timeout_done = !self.timeout_changed()
            || applied
                .iter()
                .any(|x| matches!(x, PlannedCommand::Timeout(_)));

        self.intents
            .retain(|(num, intent)| match (snapshot.entry(num), intent) {
                (None, _) => false,
                (Some(_), EditIntent::Remove) => true,
                (Some(entry), EditIntent::Activate) => !entry.active,
                (Some(entry), EditIntent::Deactivate) => entry.active,
            });
        self.additions.drain(..created.min(self.additions.len()));

        let baseline_order = reconcile_order(&snapshot);
        let removed = |num: &BootNum| self.intent(num) == Some(EditIntent::Remove);
        let placeholders = self
            .order
            .iter()
            .filter(|num| self.additions.iter().any(|x| &x.num == *num))
            .cloned();
        let committed: Vec<BootNum> = if order_done {
            baseline_order.iter().filter(|&x| !removed(x)).cloned().collect()
        } else {
            let kept: Vec<BootNum> = self
                .committed_order()
                .filter(|&x| snapshot.contains(x))
                .cloned()
                .collect();
            // entries created by the applied commands go to the front, like efibootmgr puts them
            baseline_order
                .iter()
                .filter(|&x| !kept.contains(x) && !removed(x))
                .cloned()
                .chain(kept.iter().cloned())
                .collect()
        };
        let order: Vec<BootNum> = placeholders.chain(committed).collect();
        self.order = order;

        if next_done || self.next.as_ref().is_some_and(|x| !snapshot.contains(x)) {
            self.next.clone_from(&snapshot.boot_next);
        }
        if timeout_done {
            self.timeout = snapshot.timeout;
        }

        info!(
            "Reloaded the boot configuration, {} edits and {} new entries are still staged",
            self.intents.len(),
            self.additions.len()
        );
        self.baseline_order = baseline_order;
        self.baseline = snapshot;
    }

    /// Gets the position of an entry in the working boot order.
    fn position(&self, num: &BootNum) -> Result<usize, StoreError> {
        self.order
            .iter()
            .position(|x| x == num)
            .ok_or_else(|| StoreError::UnknownEntry(num.clone()))
    }

    /// Gets a baseline entry that is still in the working boot order.
    fn existing_entry(&self, num: &BootNum) -> Result<&BootEntry, StoreError> {
        self.position(num)?;
        if num.is_placeholder() {
            return Err(StoreError::Uncommitted(num.clone()));
        }
        self.baseline
            .entry(num)
            .ok_or_else(|| StoreError::UnknownEntry(num.clone()))
    }

    /// Builds the [`Row`] of a baseline entry, applying the staged edits to it.
    fn row<'a>(&'a self, entry: &'a BootEntry) -> Row<'a> {
        let intent = self.intent(&entry.num);
        let active = match intent {
            Some(EditIntent::Activate) => true,
            Some(EditIntent::Deactivate) => false,
            _ => entry.active,
        };
        Row {
            num: &entry.num,
            name: &entry.name,
            loader_path: &entry.loader_path,
            parameters: &entry.parameters,
            active,
            is_current: entry.is_current,
            is_next: self.next.as_ref() == Some(&entry.num),
            added: false,
            removed: intent == Some(EditIntent::Remove),
        }
    }
}

/// Reconciles the `BootOrder` of a [`BootConfiguration`] with its entries.
///
/// Boot numbers that have no entry are dropped, and so are repeated ones. Entries that are missing from `BootOrder`
/// are appended in listing order. Since the entries of a [`BootConfiguration`] never share a boot number, the result
/// always contains every entry exactly once.
#[must_use = "Has no effect if the result is unused"]
pub fn reconcile_order(snapshot: &BootConfiguration) -> Vec<BootNum> {
    let mut order: Vec<BootNum> = Vec::with_capacity(snapshot.entries.len());

    for num in &snapshot.boot_order {
        if !snapshot.contains(num) {
            warn!(target: "reorder", "BootOrder contains {num}, which has no boot entry, dropping it");
        } else if order.contains(num) {
            warn!(target: "reorder", "BootOrder contains {num} more than once, dropping the duplicate");
        } else {
            order.push(num.clone());
        }
    }

    for entry in &snapshot.entries {
        if !order.contains(&entry.num) {
            warn!(target: "reorder", "Boot entry {} is missing from BootOrder, appending it", entry.num);
            order.push(entry.num.clone());
        }
    }

    order
}

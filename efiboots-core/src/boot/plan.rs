// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! The command planner.
//!
//! A [`Plan`] is the ordered list of `efibootmgr` invocations that turn the baseline of a [`BootStore`] into its
//! working copy. The commands are always emitted in the following order, so that entries are deleted and created
//! before anything that refers to them:
//!
//! 1. Deletions, in the order they were staged
//! 2. Creations, in the order they were staged
//! 3. `BootOrder`
//! 4. `BootNext`
//! 5. Activations, then deactivations, in the order they were staged
//! 6. `Timeout`

use core::fmt;

use crate::{
    config::{
        store::{BootStore, EditIntent},
        types::BootNum,
    },
    system::{esp::EspTarget, helper::shell_quote},
};

/// The program name used when a plan is rendered without an explicit program.
pub const EFIBOOTMGR: &str = "efibootmgr";

/// One `efibootmgr` invocation, without the program name and the ESP target.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlannedCommand {
    /// `--delete-bootnum --bootnum <id>`
    Delete(BootNum),

    /// `--create --label <label> --loader <loader> --unicode <parameters>`
    Create {
        /// The name of the new entry.
        label: String,

        /// The path to the loader inside of the ESP.
        loader: String,

        /// The load option parameters.
        parameters: String,
    },

    /// `--bootorder <ids>`
    BootOrder(Vec<BootNum>),

    /// `--bootnext <id>`
    BootNext(BootNum),

    /// `--delete-bootnext`
    DeleteBootNext,

    /// `--bootnum <id> --active`
    Activate(BootNum),

    /// `--bootnum <id> --inactive`
    Deactivate(BootNum),

    /// `--timeout <seconds>`
    Timeout(u16),
}

impl PlannedCommand {
    /// Gets the flags of the command as an argument vector, ready to be passed to a process without a shell.
    #[must_use = "Has no effect if the result is unused"]
    pub fn args(&self) -> Vec<String> {
        let args: Vec<&str> = match self {
            Self::Delete(num) => vec!["--delete-bootnum", "--bootnum", num.as_str()],
            Self::Create {
                label,
                loader,
                parameters,
            } => vec![
                "--create",
                "--label",
                label.as_str(),
                "--loader",
                loader.as_str(),
                "--unicode",
                parameters.as_str(),
            ],
            Self::BootOrder(order) => return vec!["--bootorder".to_owned(), join_order(order)],
            Self::BootNext(num) => vec!["--bootnext", num.as_str()],
            Self::DeleteBootNext => vec!["--delete-bootnext"],
            Self::Activate(num) => vec!["--bootnum", num.as_str(), "--active"],
            Self::Deactivate(num) => vec!["--bootnum", num.as_str(), "--inactive"],
            Self::Timeout(timeout) => return vec!["--timeout".to_owned(), timeout.to_string()],
        };
        args.into_iter().map(str::to_owned).collect()
    }
}

impl fmt::Display for PlannedCommand {
    /// Formats the flags the way they would be typed into a shell.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create {
                label,
                loader,
                parameters,
            } => write!(
                f,
                "--create --label {} --loader {} --unicode {}",
                shell_quote(label),
                shell_quote(loader),
                shell_quote(parameters)
            ),
            _ => f.write_str(&self.args().join(" ")),
        }
    }
}

/// Joins a boot order with commas, as `--bootorder` expects it.
fn join_order(order: &[BootNum]) -> String {
    order
        .iter()
        .map(|x| x.as_str())
        .collect::<Vec<_>>()
        .join(",")
}

/// An ordered list of [`PlannedCommand`]s addressed at one ESP.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Plan {
    /// The ESP every command is addressed at.
    pub target: EspTarget,

    /// The commands, in execution order.
    pub commands: Vec<PlannedCommand>,
}

impl Plan {
    /// Computes the [`Plan`] that realizes the working copy of a [`BootStore`].
    ///
    /// If the store has no pending changes, the plan is empty.
    #[must_use = "Has no effect if the result is unused"]
    pub fn new(target: EspTarget, store: &BootStore) -> Self {
        let mut commands = Vec::new();

        commands.extend(store.staged().filter_map(|(num, intent)| match intent {
            EditIntent::Remove => Some(PlannedCommand::Delete(num.clone())),
            EditIntent::Activate | EditIntent::Deactivate => None,
        }));

        commands.extend(
            store
                .additions()
                .iter()
                .map(|addition| PlannedCommand::Create {
                    label: addition.label.clone(),
                    loader: addition.loader_path.clone(),
                    parameters: addition.parameters.clone(),
                }),
        );

        if store.order_changed() {
            commands.push(PlannedCommand::BootOrder(store.committed_order().cloned().collect()));
        }

        if store.next_changed() {
            commands.push(match store.next() {
                Some(num) => PlannedCommand::BootNext(num.clone()),
                None => PlannedCommand::DeleteBootNext,
            });
        }

        commands.extend(store.staged().filter_map(|(num, intent)| match intent {
            EditIntent::Activate => Some(PlannedCommand::Activate(num.clone())),
            EditIntent::Remove | EditIntent::Deactivate => None,
        }));

        commands.extend(store.staged().filter_map(|(num, intent)| match intent {
            EditIntent::Deactivate => Some(PlannedCommand::Deactivate(num.clone())),
            EditIntent::Remove | EditIntent::Activate => None,
        }));

        if store.timeout_changed()
            && let Some(timeout) = store.timeout()
        {
            commands.push(PlannedCommand::Timeout(timeout));
        }

        Self { target, commands }
    }

    /// Checks if the plan has nothing to do.
    #[must_use = "Has no effect if the result is unused"]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Gets the amount of commands in the plan.
    #[must_use = "Has no effect if the result is unused"]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Gets the full argument vector of one command, including the ESP target but excluding the program.
    #[must_use = "Has no effect if the result is unused"]
    pub fn command_args(&self, command: &PlannedCommand) -> Vec<String> {
        let mut args = self.target.args();
        args.extend(command.args());
        args
    }

    /// Renders the plan as a shell script, one line per command, using `program` as the program name.
    #[must_use = "Has no effect if the result is unused"]
    pub fn script(&self, program: &str) -> String {
        self.commands
            .iter()
            .map(|command| format!("{program} {} {command}\n", self.target))
            .collect()
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.script(EFIBOOTMGR))
    }
}

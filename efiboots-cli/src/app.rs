// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! The main application logic.
//!
//! This is where the editing session is located, and is where the boot store, the NVRAM backend and the user
//! interact.

use std::io::{self, BufRead, Write};

use anyhow::{Context, bail};
use efiboots_core::{
    config::store::BootStore,
    system::{efibootmgr::NvramBackend, esp::EspTarget},
};
use log::{error, warn};

use crate::{
    app::command::{EditCommand, HELP, parse_command},
    ui::render_store,
};

pub mod command;

/// The prompt of the interactive session.
const PROMPT: &str = "efiboots> ";

/// The current status of the [`App`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AppState {
    /// The app is reading commands.
    Running,

    /// The app is exiting.
    Exiting,
}

/// How confirmations are answered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Confirm {
    /// Ask the user.
    Ask,

    /// Answer yes without asking.
    Yes,

    /// Only show what would be done, never write to NVRAM.
    DryRun,
}

/// The editing session.
pub struct App<B> {
    /// The editable model.
    pub store: BootStore,

    /// Reads and writes NVRAM.
    pub backend: B,

    /// The ESP that commands are addressed at.
    pub target: EspTarget,

    /// The program shown in plans.
    pub program: String,

    /// How confirmations are answered.
    pub confirm: Confirm,

    /// The current state of the [`App`].
    pub state: AppState,
}

impl<B: NvramBackend> App<B> {
    /// Starts a session by reading the boot configuration from the backend.
    ///
    /// # Errors
    ///
    /// May return an `Error` if the boot configuration could not be read.
    pub fn new(mut backend: B, target: EspTarget, program: &str, confirm: Confirm) -> anyhow::Result<Self> {
        let snapshot = backend
            .read()
            .context("Could not read the boot configuration")?;
        Ok(Self {
            store: BootStore::new(snapshot),
            backend,
            target,
            program: program.to_owned(),
            confirm,
            state: AppState::Running,
        })
    }

    /// Runs a list of commands, then commits whatever is left staged. Stops at the first error.
    ///
    /// # Errors
    ///
    /// May return an `Error` if a command could not be parsed or executed.
    pub fn run_ops(&mut self, ops: &[String], input: &mut impl BufRead) -> anyhow::Result<()> {
        for op in ops {
            let Some(command) = parse_command(op).with_context(|| format!("Invalid command \"{op}\""))? else {
                continue;
            };
            self.execute(command, input)?;
            if self.state == AppState::Exiting {
                return Ok(());
            }
        }
        self.execute(EditCommand::Commit, input)
    }

    /// Reads commands from `input` until `quit` or the end of the input.
    ///
    /// Errors of single commands are printed, and do not end the session.
    ///
    /// # Errors
    ///
    /// May return an `Error` if the input could not be read.
    pub fn run_interactive(&mut self, input: &mut impl BufRead) -> anyhow::Result<()> {
        println!("{}", render_store(&self.store));
        println!("Type help for a list of commands");

        while self.state == AppState::Running {
            print!("{PROMPT}");
            io::stdout().flush()?;

            let mut line = String::new();
            if input.read_line(&mut line)? == 0 {
                if self.store.pending_changes() {
                    warn!("Input ended with pending changes, they were not applied");
                }
                println!();
                break;
            }

            let result = parse_command(&line)
                .map_err(anyhow::Error::from)
                .and_then(|command| match command {
                    Some(command) => self.execute(command, input),
                    None => Ok(()),
                });
            if let Err(e) = result {
                println!("Error: {e:#}");
            }
        }
        Ok(())
    }

    /// Executes one command.
    ///
    /// # Errors
    ///
    /// May return an `Error` if the edit was rejected, or if NVRAM could not be read or written.
    pub fn execute(&mut self, command: EditCommand, input: &mut impl BufRead) -> anyhow::Result<()> {
        match command {
            EditCommand::Move(num, direction) => self.store.move_entry(&num, direction)?,
            EditCommand::Add {
                label,
                loader,
                parameters,
            } => {
                let num = self.store.add_entry(&label, &loader, &parameters)?;
                println!("Staged {label} as {num}");
            }
            EditCommand::Remove(num) => self.store.remove_entry(&num)?,
            EditCommand::Toggle(num) => self.store.toggle_active(&num)?,
            EditCommand::Next(num) => self.store.set_boot_next(num.as_ref())?,
            EditCommand::Timeout(timeout) => self.store.set_timeout(timeout),
            EditCommand::Plan => {
                let plan = self.store.plan(self.target.clone());
                if plan.is_empty() {
                    println!("Nothing to commit");
                } else {
                    print!("{}", plan.script(&self.program));
                }
            }
            EditCommand::List => println!("{}", render_store(&self.store)),
            EditCommand::Commit => self.commit(input)?,
            EditCommand::Discard => {
                self.store.discard();
                println!("Discarded every staged change");
            }
            EditCommand::Reload => {
                if self.store.pending_changes()
                    && !self.ask("Reloading drops every staged change. Continue?", input)?
                {
                    return Ok(());
                }
                let snapshot = self
                    .backend
                    .read()
                    .context("Could not read the boot configuration")?;
                self.store.refresh(snapshot);
                println!("{}", render_store(&self.store));
            }
            EditCommand::Help => println!("{HELP}"),
            EditCommand::Quit => {
                if !self.store.pending_changes()
                    || self.ask("There are pending changes. Quit without applying them?", input)?
                {
                    self.state = AppState::Exiting;
                }
            }
        }
        Ok(())
    }

    /// Shows the plan, and applies it after confirmation.
    ///
    /// # Errors
    ///
    /// May return an `Error` if a command failed, or if the configuration could not be read back.
    fn commit(&mut self, input: &mut impl BufRead) -> anyhow::Result<()> {
        let plan = self.store.plan(self.target.clone());
        if plan.is_empty() {
            println!("Nothing to commit");
            return Ok(());
        }

        print!("{}", plan.script(&self.program));
        if self.confirm == Confirm::DryRun {
            println!("Dry run, nothing was applied");
            return Ok(());
        }
        if !self.ask("Apply these changes?", input)? {
            println!("Nothing was applied");
            return Ok(());
        }

        match self.store.commit(&mut self.backend, self.target.clone()) {
            Ok(applied) => {
                println!("Applied {applied} commands");
                println!("{}", render_store(&self.store));
                Ok(())
            }
            Err(e) => {
                error!("{e}");
                bail!(
                    "{e}\nNVRAM may have been partially changed. Whatever was not applied is still staged, use plan to review it"
                )
            }
        }
    }

    /// Asks a yes or no question. Anything but an explicit yes is a no.
    ///
    /// # Errors
    ///
    /// May return an `Error` if the input could not be read.
    fn ask(&self, question: &str, input: &mut impl BufRead) -> anyhow::Result<bool> {
        if self.confirm == Confirm::Yes {
            return Ok(true);
        }

        print!("{question} [y/N] ");
        io::stdout().flush()?;
        let mut answer = String::new();
        input.read_line(&mut answer)?;
        Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
    }
}

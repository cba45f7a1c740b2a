// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Runs external programs.
//!
//! Every external program (`efibootmgr`, `findmnt`, `lsblk`) is run through a [`CommandRunner`], so that the code that
//! interprets their output can be tested without them. [`DuctRunner`] is the implementation that actually spawns
//! processes.

use std::io;

use log::debug;
use thiserror::Error;

/// Errors that may result from running an external program.
#[derive(Error, Debug)]
pub enum CommandError {
    /// The program could not be started at all.
    #[error("Could not run {program}: {source}")]
    Spawn {
        /// The program that was run.
        program: String,

        /// The underlying error.
        source: io::Error,
    },

    /// The program exited unsuccessfully.
    #[error("{program} failed with {status}: {stderr}")]
    Failed {
        /// The program that was run.
        program: String,

        /// The exit code, or a description if there was none.
        status: String,

        /// The captured standard error.
        stderr: String,
    },

    /// The program printed something that is not UTF-8.
    #[error("{program} printed output that is not valid UTF-8")]
    NotUtf8 {
        /// The program that was run.
        program: String,
    },
}

/// The captured result of a program that ran to completion.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// If the program exited successfully.
    pub success: bool,

    /// The exit code, if the program exited normally.
    pub code: Option<i32>,

    /// The captured standard output.
    pub stdout: Vec<u8>,

    /// The captured standard error.
    pub stderr: Vec<u8>,
}

impl CommandOutput {
    /// Converts the output into its standard output as a [`String`], requiring a successful exit.
    ///
    /// # Errors
    ///
    /// May return an `Error` if the program exited unsuccessfully, or if its output is not UTF-8.
    pub fn into_stdout(self, program: &str) -> Result<String, CommandError> {
        if !self.success {
            return Err(CommandError::Failed {
                program: program.to_owned(),
                status: self.status(),
                stderr: self.stderr_lossy(),
            });
        }
        String::from_utf8(self.stdout).map_err(|_| CommandError::NotUtf8 {
            program: program.to_owned(),
        })
    }

    /// Describes how the program exited.
    #[must_use = "Has no effect if the result is unused"]
    pub fn status(&self) -> String {
        self.code.map_or_else(
            || "no exit code".to_owned(),
            |code| format!("exit code {code}"),
        )
    }

    /// Gets the standard error, replacing anything that is not UTF-8.
    #[must_use = "Has no effect if the result is unused"]
    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).trim().to_owned()
    }
}

/// A way to run an external program to completion.
pub trait CommandRunner {
    /// Runs a program with arguments, capturing its output. An unsuccessful exit is not an error.
    ///
    /// # Errors
    ///
    /// May return an `Error` if the program could not be started.
    fn run(&mut self, program: &str, args: &[String]) -> Result<CommandOutput, CommandError>;
}

/// A [`CommandRunner`] that spawns processes with [`duct`].
#[derive(Clone, Copy, Debug, Default)]
pub struct DuctRunner;

impl CommandRunner for DuctRunner {
    fn run(&mut self, program: &str, args: &[String]) -> Result<CommandOutput, CommandError> {
        debug!("Running {program} {}", args.join(" "));
        let output = duct::cmd(program, args)
            .stdout_capture()
            .stderr_capture()
            .unchecked()
            .run()
            .map_err(|source| CommandError::Spawn {
                program: program.to_owned(),
                source,
            })?;

        Ok(CommandOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}

// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Reads and writes NVRAM through `efibootmgr`.
//!
//! Reading runs `efibootmgr -v` without privileges. Writing runs the whole [`Plan`] as one `sh -ec` script under the
//! configured privilege escalation program, so that it asks for authentication once. The script stops at the first
//! command that fails, and prints a marker line after every command that succeeded, which is how the amount of
//! applied commands is known. Commands that already ran are not undone, so after a failure the caller should read
//! NVRAM again.

use log::{debug, error, info};
use thiserror::Error;

use crate::{
    BootResult,
    boot::{config::ManagerConfig, plan::Plan},
    config::BootConfiguration,
    system::{command::CommandRunner, helper::shell_quote},
};

/// The shell that runs a plan.
const SHELL: &str = "sh";

/// The line the script prints after every command that succeeded.
const STEP_MARKER: &str = "efiboots: step done";

/// Errors that may result from writing a [`Plan`] to NVRAM.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum CommitError {
    /// A command failed, so the ones after it were not run.
    #[error("{completed} of {total} commands were applied, then `{command}` failed: {stderr}")]
    Partial {
        /// The amount of commands that succeeded.
        completed: usize,

        /// The amount of commands in the plan.
        total: usize,

        /// The command that failed.
        command: String,

        /// The diagnostic output of the failed command.
        stderr: String,
    },
}

/// Something that can read the boot configuration and write a [`Plan`] to NVRAM.
pub trait NvramBackend {
    /// Reads the current boot configuration.
    ///
    /// # Errors
    ///
    /// May return an `Error` if the configuration could not be read at all.
    fn read(&mut self) -> BootResult<BootConfiguration>;

    /// Executes every command of a [`Plan`] in order.
    ///
    /// # Errors
    ///
    /// May return an `Error` if any command failed. The commands before it have already been applied.
    fn apply(&mut self, plan: &Plan) -> Result<(), CommitError>;
}

/// The [`NvramBackend`] that runs `efibootmgr`.
pub struct Efibootmgr<R> {
    /// Runs the processes.
    runner: R,

    /// The program used to read and write NVRAM.
    program: String,

    /// The command that writes are prefixed with.
    elevate: Vec<String>,
}

impl<R: CommandRunner> Efibootmgr<R> {
    /// Creates a new [`Efibootmgr`] from the settings of a [`ManagerConfig`].
    #[must_use = "Has no effect if the result is unused"]
    pub fn new(runner: R, config: &ManagerConfig) -> Self {
        Self {
            runner,
            program: config.efibootmgr.clone(),
            elevate: config.elevate.clone(),
        }
    }

    /// Gets the program used to read and write NVRAM.
    #[must_use = "Has no effect if the result is unused"]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Gets a mutable reference to the inner [`CommandRunner`].
    pub fn runner_mut(&mut self) -> &mut R {
        &mut self.runner
    }

    /// Renders a [`Plan`] as a script that stops at the first failure and marks every command that succeeded.
    fn script(&self, plan: &Plan) -> String {
        let program = shell_quote(&self.program);
        plan.commands
            .iter()
            .map(|command| {
                let args = plan
                    .command_args(command)
                    .iter()
                    .map(|x| shell_quote(x))
                    .collect::<Vec<_>>()
                    .join(" ");
                format!("{program} {args}\necho '{STEP_MARKER}'\n")
            })
            .collect()
    }

    /// Splits the command line that runs a script into the program and its arguments, applying the escalation prefix.
    fn elevated(&self, script: String) -> (String, Vec<String>) {
        let mut args = self.elevate.clone();
        args.extend([SHELL.to_owned(), "-ec".to_owned(), script]);
        let program = args.remove(0);
        (program, args)
    }
}

impl<R: CommandRunner> NvramBackend for Efibootmgr<R> {
    fn read(&mut self) -> BootResult<BootConfiguration> {
        let output = self.runner.run(&self.program, &["-v".to_owned()])?;
        let stdout = output.into_stdout(&self.program)?;
        Ok(BootConfiguration::parse(&stdout))
    }

    fn apply(&mut self, plan: &Plan) -> Result<(), CommitError> {
        let total = plan.len();
        if total == 0 {
            return Ok(());
        }

        let (program, args) = self.elevated(self.script(plan));
        info!("Applying {total} commands with {program}");
        debug!("Script:\n{}", args.last().map_or("", String::as_str));

        let (completed, stderr) = match self.runner.run(&program, &args) {
            Ok(output) if output.success => return Ok(()),
            Ok(output) => {
                let completed = String::from_utf8_lossy(&output.stdout)
                    .lines()
                    .filter(|x| *x == STEP_MARKER)
                    .count();
                (
                    completed.min(total),
                    format!("{} ({})", output.stderr_lossy(), output.status()),
                )
            }
            Err(e) => (0, e.to_string()),
        };

        let command = plan
            .commands
            .get(completed)
            .map_or_else(|| program.clone(), ToString::to_string);
        error!("{completed} of {total} commands were applied, then `{command}` failed: {stderr}");
        Err(CommitError::Partial {
            completed,
            total,
            command,
            stderr,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::*;
    use crate::{
        boot::plan::PlannedCommand,
        config::types::BootNum,
        error::BootError,
        system::{
            command::{CommandError, CommandOutput},
            esp::EspTarget,
        },
    };

    /// A [`CommandRunner`] that records every invocation and replays scripted outputs.
    #[derive(Default)]
    struct FakeRunner {
        outputs: VecDeque<CommandOutput>,
        calls: Vec<Vec<String>>,
    }

    impl FakeRunner {
        fn push(&mut self, success: bool, stdout: &str, stderr: &str) {
            self.outputs.push_back(CommandOutput {
                success,
                code: Some(i32::from(!success)),
                stdout: stdout.as_bytes().to_vec(),
                stderr: stderr.as_bytes().to_vec(),
            });
        }
    }

    impl CommandRunner for FakeRunner {
        fn run(&mut self, program: &str, args: &[String]) -> Result<CommandOutput, CommandError> {
            let mut call = vec![program.to_owned()];
            call.extend_from_slice(args);
            self.calls.push(call);
            Ok(self.outputs.pop_front().unwrap_or_default())
        }
    }

    fn plan() -> Result<Plan, BootError> {
        Ok(Plan {
            target: EspTarget::new("/dev/sda", "1"),
            commands: vec![
                PlannedCommand::Delete(BootNum::new("0003")?),
                PlannedCommand::Timeout(4),
            ],
        })
    }

    #[test]
    fn test_read() -> Result<(), BootError> {
        let mut runner = FakeRunner::default();
        runner.push(true, "BootOrder: 0001\nBoot0001* One\tHD(1)\n", "");
        let mut backend = Efibootmgr::new(runner, &ManagerConfig::default());

        let config = backend.read()?;
        assert_eq!(config.entries.len(), 1);
        assert_eq!(backend.runner_mut().calls, vec![vec!["efibootmgr", "-v"]]);
        Ok(())
    }

    #[test]
    fn test_read_failure_is_fatal() {
        let mut runner = FakeRunner::default();
        runner.push(false, "", "EFI variables are not supported on this system.");
        let mut backend = Efibootmgr::new(runner, &ManagerConfig::default());
        assert!(matches!(
            backend.read(),
            Err(BootError::CommandError(CommandError::Failed { .. }))
        ));
    }

    #[test]
    fn test_apply_elevated() -> Result<(), BootError> {
        let mut runner = FakeRunner::default();
        runner.push(true, "efiboots: step done\nBootOrder: 0001\nefiboots: step done\n", "");
        let mut backend = Efibootmgr::new(runner, &ManagerConfig::default());

        backend.apply(&plan()?)?;
        assert_eq!(
            backend.runner_mut().calls,
            vec![vec![
                "pkexec",
                "sh",
                "-ec",
                "'efibootmgr' '--disk' '/dev/sda' '--part' '1' '--delete-bootnum' '--bootnum' '0003'\n\
                 echo 'efiboots: step done'\n\
                 'efibootmgr' '--disk' '/dev/sda' '--part' '1' '--timeout' '4'\n\
                 echo 'efiboots: step done'\n"
            ]]
        );
        Ok(())
    }

    #[test]
    fn test_apply_empty_plan() -> Result<(), BootError> {
        let mut backend = Efibootmgr::new(FakeRunner::default(), &ManagerConfig::default());
        backend.apply(&Plan {
            target: EspTarget::new("/dev/sda", "1"),
            commands: Vec::new(),
        })?;
        assert!(backend.runner_mut().calls.is_empty());
        Ok(())
    }

    #[test]
    fn test_apply_stops_at_failure() -> Result<(), BootError> {
        let mut runner = FakeRunner::default();
        runner.push(false, "", "Could not delete variable");
        let config = ManagerConfig::get_manager_config("elevate none");
        let mut backend = Efibootmgr::new(runner, &config);

        let err = backend
            .apply(&plan()?)
            .expect_err("A failing command did not stop the plan");
        assert_eq!(
            err,
            CommitError::Partial {
                completed: 0,
                total: 2,
                command: "--delete-bootnum --bootnum 0003".to_owned(),
                stderr: "Could not delete variable (exit code 1)".to_owned(),
            }
        );
        assert_eq!(backend.runner_mut().calls.len(), 1);
        assert_eq!(backend.runner_mut().calls[0][..2], ["sh", "-ec"]);
        Ok(())
    }

    #[test]
    fn test_apply_counts_completed_steps() -> Result<(), BootError> {
        let mut runner = FakeRunner::default();
        runner.push(
            false,
            "BootOrder: 0001\nBoot0001* One\nefiboots: step done\n",
            "Could not set Timeout",
        );
        let mut backend = Efibootmgr::new(runner, &ManagerConfig::default());

        let err = backend
            .apply(&plan()?)
            .expect_err("A failing command did not stop the plan");
        assert_eq!(
            err,
            CommitError::Partial {
                completed: 1,
                total: 2,
                command: "--timeout 4".to_owned(),
                stderr: "Could not set Timeout (exit code 1)".to_owned(),
            }
        );
        Ok(())
    }
}

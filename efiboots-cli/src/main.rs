// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! A command line interface frontend to `efiboots-core`.

use std::{io, path::PathBuf};

use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand};
use efiboots_core::{
    boot::config::{CONFIG_PATH, ManagerConfig},
    system::{
        command::DuctRunner,
        efibootmgr::{Efibootmgr, NvramBackend},
        esp::{EspTarget, resolve, split_device},
        log_backend::StderrLogger,
    },
};
use log::{LevelFilter, info};

use crate::{
    app::{App, Confirm},
    ui::render_configuration,
};

mod app;
mod ui;

/// The global logging instance.
static LOGGER: StderrLogger = StderrLogger::new();

/// Manage UEFI boot entries through efibootmgr.
#[derive(Parser)]
#[command(name = "efiboots", version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(long, default_value = CONFIG_PATH)]
    config: PathBuf,

    /// Disk of the ESP, skips ESP detection when given with --part
    #[arg(long, requires = "part", conflicts_with = "efi")]
    disk: Option<String>,

    /// Partition number of the ESP
    #[arg(long, requires = "disk")]
    part: Option<String>,

    /// Partition device of the ESP, such as /dev/nvme0n1p1
    #[arg(long)]
    efi: Option<String>,

    /// Log more, can be repeated
    #[arg(short, long, action = ArgAction::Count, conflicts_with = "quiet")]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, default_value_t = false)]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// The subcommands of `efiboots`.
#[derive(Subcommand)]
enum Commands {
    /// Show the boot entries
    List,

    /// Edit the boot entries
    Edit {
        /// A command to run instead of starting an interactive session, can be repeated
        #[arg(long = "op", value_name = "COMMAND")]
        ops: Vec<String>,

        /// Only show what would be run
        #[arg(long, default_value_t = false)]
        dry_run: bool,

        /// Do not ask for confirmation
        #[arg(short, long, default_value_t = false, conflicts_with = "dry_run")]
        yes: bool,
    },
}

/// Adjusts a log level by the verbosity flags.
fn log_level(base: LevelFilter, verbose: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::Error;
    }
    LevelFilter::iter()
        .skip_while(|x| *x < base)
        .nth(verbose.into())
        .unwrap_or(LevelFilter::Trace)
}

/// Gets the ESP given on the command line, falling back to the configuration file.
///
/// # Errors
///
/// May return an `Error` if a given device is not a partition device.
fn esp_override(args: &Args, config: &ManagerConfig) -> anyhow::Result<Option<EspTarget>> {
    if let (Some(disk), Some(part)) = (&args.disk, &args.part) {
        return Ok(Some(EspTarget::new(disk, part)));
    }
    if let Some(efi) = &args.efi {
        return Ok(Some(split_device(efi)?));
    }
    Ok(config.esp_override()?)
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let _ = log::set_logger(&LOGGER)
        .map(|()| log::set_max_level(log_level(LevelFilter::Warn, args.verbose, args.quiet)));

    let config = ManagerConfig::new(&args.config)?;
    log::set_max_level(log_level(config.log_level, args.verbose, args.quiet));

    let mut backend = Efibootmgr::new(DuctRunner, &config);

    match args.command {
        None | Some(Commands::List) => {
            let snapshot = backend
                .read()
                .context("Could not read the boot configuration")?;
            print!("{}", render_configuration(&snapshot));
        }
        Some(Commands::Edit {
            ref ops,
            dry_run,
            yes,
        }) => {
            let target = resolve(backend.runner_mut(), esp_override(&args, &config)?)?;
            info!("Using ESP {target}");

            let confirm = match (dry_run, yes) {
                (true, _) => Confirm::DryRun,
                (false, true) => Confirm::Yes,
                (false, false) => Confirm::Ask,
            };
            let program = backend.program().to_owned();
            let mut app = App::new(backend, target, &program, confirm)?;
            let mut input = io::stdin().lock();

            if ops.is_empty() {
                app.run_interactive(&mut input)?;
            } else {
                app.run_ops(ops, &mut input)?;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_args() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_log_level() {
        assert_eq!(log_level(LevelFilter::Warn, 0, false), LevelFilter::Warn);
        assert_eq!(log_level(LevelFilter::Warn, 2, false), LevelFilter::Debug);
        assert_eq!(log_level(LevelFilter::Info, 9, false), LevelFilter::Trace);
        assert_eq!(log_level(LevelFilter::Debug, 0, true), LevelFilter::Error);
    }

    #[test]
    fn test_esp_override() -> anyhow::Result<()> {
        let config = ManagerConfig::get_manager_config("disk /dev/sdz\npart 9");

        let args = Args::try_parse_from(["efiboots", "--efi", "/dev/nvme0n1p1", "edit"])?;
        assert_eq!(
            esp_override(&args, &config)?,
            Some(EspTarget::new("/dev/nvme0n1", "1"))
        );

        let args = Args::try_parse_from(["efiboots", "list"])?;
        assert_eq!(
            esp_override(&args, &config)?,
            Some(EspTarget::new("/dev/sdz", "9"))
        );

        assert!(Args::try_parse_from(["efiboots", "--disk", "/dev/sda", "edit"]).is_err());
        Ok(())
    }
}

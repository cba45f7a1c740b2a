// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! The edit command language of the session.
//!
//! Each line is one command, split into words with [`split_words`], so labels and parameters with spaces can be
//! quoted.

use efiboots_core::{
    config::{
        store::Direction,
        types::{BootNum, TypeError, parse_timeout},
    },
    system::helper::split_words,
};
use thiserror::Error;

/// The help text of the session.
pub const HELP: &str = "\
up ID                        move an entry up the boot order
down ID                      move an entry down the boot order
add LABEL [LOADER [PARAMS]]  stage a new entry
remove ID                    stage the removal of an entry
toggle ID                    flip whether an entry is active
next ID|none                 set or unset the entry for the next boot
timeout N                    set the boot menu timeout in seconds
plan                         show the commands a commit would run
list                         show the working copy
commit                       write the staged changes to NVRAM
discard                      drop every staged change
reload                       read NVRAM again, dropping every staged change
help                         show this help
quit                         leave the session";

/// An `Error` that may result from parsing a command.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum CommandParseError {
    /// A quote was not closed.
    #[error("Unclosed quote")]
    UnclosedQuote,

    /// The command does not exist.
    #[error("Unknown command \"{0}\", try help")]
    Unknown(String),

    /// The command is missing an argument.
    #[error("{0} is missing an argument")]
    MissingArgument(&'static str),

    /// The command was given too many arguments.
    #[error("{0} was given too many arguments")]
    TooManyArguments(&'static str),

    /// An argument is not a valid boot number or timeout.
    #[error(transparent)]
    Type(#[from] TypeError),
}

/// One command of the session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EditCommand {
    /// Move an entry in the boot order.
    Move(BootNum, Direction),

    /// Stage a new entry.
    Add {
        /// The name of the entry.
        label: String,

        /// The path to the loader.
        loader: String,

        /// The load option parameters.
        parameters: String,
    },

    /// Stage the removal of an entry.
    Remove(BootNum),

    /// Flip whether an entry is active.
    Toggle(BootNum),

    /// Set or unset the entry for the next boot.
    Next(Option<BootNum>),

    /// Set the boot menu timeout.
    Timeout(u16),

    /// Show the plan.
    Plan,

    /// Show the working copy.
    List,

    /// Write the staged changes.
    Commit,

    /// Drop every staged change.
    Discard,

    /// Read NVRAM again.
    Reload,

    /// Show the help.
    Help,

    /// Leave the session.
    Quit,
}

/// Parses one line into an [`EditCommand`]. Returns [`None`] for a blank line.
///
/// # Errors
///
/// May return an `Error` if the line is not a valid command.
pub fn parse_command(line: &str) -> Result<Option<EditCommand>, CommandParseError> {
    let words = split_words(line).ok_or(CommandParseError::UnclosedQuote)?;
    let Some((name, args)) = words.split_first() else {
        return Ok(None);
    };

    let command = match name.to_ascii_lowercase().as_str() {
        "up" => EditCommand::Move(boot_num("up", args)?, Direction::Up),
        "down" => EditCommand::Move(boot_num("down", args)?, Direction::Down),
        "add" => match args {
            [] => return Err(CommandParseError::MissingArgument("add")),
            [label, rest @ ..] if rest.len() <= 2 => EditCommand::Add {
                label: label.clone(),
                loader: rest.first().cloned().unwrap_or_default(),
                parameters: rest.get(1).cloned().unwrap_or_default(),
            },
            _ => return Err(CommandParseError::TooManyArguments("add")),
        },
        "remove" | "rm" => EditCommand::Remove(boot_num("remove", args)?),
        "toggle" => EditCommand::Toggle(boot_num("toggle", args)?),
        "next" => match single("next", args)? {
            x if x.eq_ignore_ascii_case("none") => EditCommand::Next(None),
            x => EditCommand::Next(Some(x.parse()?)),
        },
        "timeout" => EditCommand::Timeout(parse_timeout(single("timeout", args)?)?),
        other => {
            let (canonical, command) = match other {
                "plan" => ("plan", EditCommand::Plan),
                "list" | "ls" => ("list", EditCommand::List),
                "commit" => ("commit", EditCommand::Commit),
                "discard" => ("discard", EditCommand::Discard),
                "reload" => ("reload", EditCommand::Reload),
                "help" | "?" => ("help", EditCommand::Help),
                "quit" | "exit" => ("quit", EditCommand::Quit),
                _ => return Err(CommandParseError::Unknown(name.clone())),
            };
            if !args.is_empty() {
                return Err(CommandParseError::TooManyArguments(canonical));
            }
            command
        }
    };
    Ok(Some(command))
}

/// Gets the only argument of a command.
fn single<'a>(command: &'static str, args: &'a [String]) -> Result<&'a str, CommandParseError> {
    match args {
        [] => Err(CommandParseError::MissingArgument(command)),
        [arg] => Ok(arg),
        _ => Err(CommandParseError::TooManyArguments(command)),
    }
}

/// Gets the only argument of a command as a [`BootNum`], which may be a placeholder.
fn boot_num(command: &'static str, args: &[String]) -> Result<BootNum, CommandParseError> {
    Ok(single(command, args)?.parse()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(num: &str) -> BootNum {
        num.parse().expect("Failed to create a boot number in test")
    }

    #[test]
    fn test_edit_commands() -> Result<(), CommandParseError> {
        assert_eq!(
            parse_command("up 0001")?,
            Some(EditCommand::Move(num("0001"), Direction::Up))
        );
        assert_eq!(
            parse_command("DOWN new0")?,
            Some(EditCommand::Move(num("NEW0"), Direction::Down))
        );
        assert_eq!(parse_command("rm 000a")?, Some(EditCommand::Remove(num("000A"))));
        assert_eq!(parse_command("toggle 3")?, Some(EditCommand::Toggle(num("3"))));
        assert_eq!(parse_command("next none")?, Some(EditCommand::Next(None)));
        assert_eq!(
            parse_command("next 0002")?,
            Some(EditCommand::Next(Some(num("0002"))))
        );
        assert_eq!(parse_command("timeout 5")?, Some(EditCommand::Timeout(5)));
        assert_eq!(parse_command("  ")?, None);
        assert_eq!(parse_command("commit")?, Some(EditCommand::Commit));
        Ok(())
    }

    #[test]
    fn test_add() -> Result<(), CommandParseError> {
        assert_eq!(
            parse_command("add 'Arch Linux' \\vmlinuz-linux 'root=/dev/sda2 rw'")?,
            Some(EditCommand::Add {
                label: "Arch Linux".to_owned(),
                loader: "\\vmlinuz-linux".to_owned(),
                parameters: "root=/dev/sda2 rw".to_owned(),
            })
        );
        assert_eq!(
            parse_command("add Shell")?,
            Some(EditCommand::Add {
                label: "Shell".to_owned(),
                loader: String::new(),
                parameters: String::new(),
            })
        );
        Ok(())
    }

    #[test]
    fn test_invalid_commands() {
        assert_eq!(
            parse_command("frobnicate"),
            Err(CommandParseError::Unknown("frobnicate".to_owned()))
        );
        assert_eq!(
            parse_command("up"),
            Err(CommandParseError::MissingArgument("up"))
        );
        assert_eq!(
            parse_command("up 1 2"),
            Err(CommandParseError::TooManyArguments("up"))
        );
        assert_eq!(
            parse_command("add a b c d"),
            Err(CommandParseError::TooManyArguments("add"))
        );
        assert_eq!(
            parse_command("commit now"),
            Err(CommandParseError::TooManyArguments("commit"))
        );
        assert_eq!(parse_command("add 'x"), Err(CommandParseError::UnclosedQuote));
        assert!(matches!(
            parse_command("timeout -1"),
            Err(CommandParseError::Type(TypeError::Timeout(_)))
        ));
        assert!(matches!(
            parse_command("toggle zz"),
            Err(CommandParseError::Type(TypeError::BootNum(_)))
        ));
    }
}

// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Finds the EFI System Partition that `efibootmgr` should address.
//!
//! Detection tries, in order:
//! 1. `findmnt` on `/efi`, `/boot/efi` and `/boot`, taking the first `vfat` source
//! 2. `lsblk`, taking the one partition with the ESP partition type and a `vfat` filesystem
//!
//! If `lsblk` finds more than one ESP, the user has to pick one.

use core::fmt;

use log::{debug, info};
use thiserror::Error;

use crate::{
    BootResult,
    system::{command::CommandRunner, helper::split_trailing_digits},
};

/// The mount points that are checked for the ESP, in order.
const MOUNT_POINTS: [&str; 3] = ["/efi", "/boot/efi", "/boot"];

/// The partition types of an ESP, on GPT and MBR respectively.
const ESP_PART_TYPES: [&str; 3] = ["C12A7328-F81F-11D2-BA4B-00A0C93EC93B", "EF", "0XEF"];

/// The filesystem an ESP must have.
const ESP_FSTYPE: &str = "vfat";

/// Errors that may result from finding the ESP.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum EspError {
    /// More than one partition looks like an ESP.
    #[error("More than one EFI System Partition was found ({}), pick one with --efi", .0.join(", "))]
    Ambiguous(Vec<String>),

    /// No ESP was found.
    #[error(
        "Could not find an EFI System Partition. Mount it on /efi, /boot/efi or /boot, or make sure it has the ESP partition type and a vfat filesystem"
    )]
    NotFound,

    /// A device could not be split into a disk and a partition number.
    #[error("\"{0}\" is not a partition device")]
    BadDevice(String),
}

/// The disk and partition number of an ESP, as passed to `efibootmgr --disk` and `--part`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EspTarget {
    /// The disk, such as `/dev/sda`.
    pub disk: String,

    /// The partition number, such as `1`.
    pub part: String,
}

impl EspTarget {
    /// Creates a new [`EspTarget`].
    #[must_use = "Has no effect if the result is unused"]
    pub fn new(disk: &str, part: &str) -> Self {
        Self {
            disk: disk.to_owned(),
            part: part.to_owned(),
        }
    }

    /// Gets the `efibootmgr` arguments that address this ESP.
    #[must_use = "Has no effect if the result is unused"]
    pub fn args(&self) -> Vec<String> {
        vec![
            "--disk".to_owned(),
            self.disk.clone(),
            "--part".to_owned(),
            self.part.clone(),
        ]
    }
}

impl fmt::Display for EspTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "--disk {} --part {}", self.disk, self.part)
    }
}

/// Splits a partition device into its disk and partition number.
///
/// NVMe and MMC style devices separate the two with a `p` (`/dev/nvme0n1p2`), which is dropped. A `p` is only a
/// separator if the disk name ends in a digit, so `/dev/sdp1` stays on the disk `/dev/sdp`.
///
/// # Errors
///
/// May return an `Error` if the device does not end in a partition number.
pub fn split_device(device: &str) -> Result<EspTarget, EspError> {
    let device = device.trim();
    let (disk, part) =
        split_trailing_digits(device).ok_or_else(|| EspError::BadDevice(device.to_owned()))?;

    let disk = match disk.strip_suffix('p') {
        Some(stripped) if stripped.ends_with(|x: char| x.is_ascii_digit()) => stripped,
        _ => disk,
    };
    if disk.is_empty() {
        return Err(EspError::BadDevice(device.to_owned()));
    }

    debug!("Device path {device} split into {disk} and {part}");
    Ok(EspTarget::new(disk, part))
}

/// Finds the ESP, unless one is given.
///
/// # Errors
///
/// May return an `Error` if no method found an ESP, if more than one ESP was found, or if a found device could not
/// be split.
pub fn resolve(runner: &mut impl CommandRunner, esp: Option<EspTarget>) -> BootResult<EspTarget> {
    if let Some(esp) = esp {
        return Ok(esp);
    }

    for mount_point in MOUNT_POINTS {
        if let Some(source) = find_mounted(runner, mount_point) {
            let target = split_device(&source)?;
            info!("Detected ESP mounted on {mount_point}: {target}");
            return Ok(target);
        }
    }

    let mut esps = find_partitions(runner);
    match esps.len() {
        0 => Err(EspError::NotFound.into()),
        1 => {
            let source = esps.remove(0);
            let target = split_device(&source)?;
            info!("Detected ESP from the partition table: {target}");
            Ok(target)
        }
        _ => Err(EspError::Ambiguous(esps).into()),
    }
}

/// Gets the first `vfat` source mounted on a mount point.
fn find_mounted(runner: &mut impl CommandRunner, mount_point: &str) -> Option<String> {
    let args = [
        "--noheadings",
        "--output",
        "SOURCE,FSTYPE",
        "--mountpoint",
        mount_point,
    ]
    .map(str::to_owned);

    let output = runner
        .run("findmnt", &args)
        .and_then(|x| x.into_stdout("findmnt"))
        .map_err(|e| debug!("findmnt on {mount_point} failed: {e}"))
        .ok()?;

    output.lines().find_map(|line| {
        let mut fields = line.split_whitespace();
        match (fields.next(), fields.next()) {
            (Some(source), Some(ESP_FSTYPE)) => Some(source.to_owned()),
            _ => None,
        }
    })
}

/// Gets every partition that has the ESP partition type and a `vfat` filesystem.
fn find_partitions(runner: &mut impl CommandRunner) -> Vec<String> {
    let args = [
        "--noheadings",
        "--pairs",
        "--paths",
        "--output",
        "NAME,PARTTYPE,FSTYPE",
    ]
    .map(str::to_owned);

    let Ok(output) = runner
        .run("lsblk", &args)
        .and_then(|x| x.into_stdout("lsblk"))
        .map_err(|e| debug!("lsblk failed: {e}"))
    else {
        return Vec::new();
    };

    output
        .lines()
        .filter_map(|line| {
            let pairs = parse_pairs(line);
            let get = |key: &str| pairs.iter().find(|(k, _)| *k == key).map(|(_, v)| *v);
            let part_type = get("PARTTYPE")?.to_ascii_uppercase();
            (ESP_PART_TYPES.contains(&part_type.as_str()) && get("FSTYPE")? == ESP_FSTYPE)
                .then(|| get("NAME").map(str::to_owned))
                .flatten()
        })
        .collect()
}

/// Parses one line of `KEY="value"` pairs, as printed by `lsblk --pairs`.
fn parse_pairs(line: &str) -> Vec<(&str, &str)> {
    let mut pairs = Vec::new();
    let mut rest = line.trim();
    while let Some((key, after)) = rest.split_once("=\"") {
        let Some((value, after)) = after.split_once('"') else {
            break;
        };
        pairs.push((key.trim(), value));
        rest = after;
    }
    pairs
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::{
        error::BootError,
        system::command::{CommandError, CommandOutput},
    };

    /// A [`CommandRunner`] that answers with fixed outputs, keyed by the program and its last argument.
    #[derive(Default)]
    struct FakeRunner {
        outputs: HashMap<String, CommandOutput>,
    }

    impl FakeRunner {
        fn with(mut self, key: &str, stdout: &str) -> Self {
            self.outputs.insert(
                key.to_owned(),
                CommandOutput {
                    success: true,
                    code: Some(0),
                    stdout: stdout.as_bytes().to_vec(),
                    stderr: Vec::new(),
                },
            );
            self
        }
    }

    impl CommandRunner for FakeRunner {
        fn run(&mut self, program: &str, args: &[String]) -> Result<CommandOutput, CommandError> {
            let key = format!("{program} {}", args.last().map_or("", String::as_str));
            Ok(self.outputs.get(&key).cloned().unwrap_or(CommandOutput {
                success: false,
                code: Some(1),
                stdout: Vec::new(),
                stderr: Vec::new(),
            }))
        }
    }

    #[test]
    fn test_split_device() -> Result<(), EspError> {
        assert_eq!(split_device("/dev/sda1")?, EspTarget::new("/dev/sda", "1"));
        assert_eq!(split_device("/dev/nvme0n1p2")?, EspTarget::new("/dev/nvme0n1", "2"));
        assert_eq!(split_device("/dev/mmcblk0p12")?, EspTarget::new("/dev/mmcblk0", "12"));
        assert_eq!(split_device("/dev/sdp1")?, EspTarget::new("/dev/sdp", "1"));
        assert_eq!(split_device("/dev/vda"), Err(EspError::BadDevice("/dev/vda".to_owned())));
        assert!(split_device("12").is_err());
        Ok(())
    }

    #[test]
    fn test_override() -> Result<(), BootError> {
        let target = EspTarget::new("/dev/sdb", "3");
        assert_eq!(resolve(&mut FakeRunner::default(), Some(target.clone()))?, target);
        Ok(())
    }

    #[test]
    fn test_findmnt() -> Result<(), BootError> {
        let mut runner = FakeRunner::default()
            .with("findmnt /efi", "/dev/sda2 ext4\n")
            .with("findmnt /boot/efi", "/dev/nvme0n1p1 vfat\n");
        assert_eq!(resolve(&mut runner, None)?, EspTarget::new("/dev/nvme0n1", "1"));
        Ok(())
    }

    #[test]
    fn test_lsblk() -> Result<(), BootError> {
        let mut runner = FakeRunner::default().with(
            "lsblk NAME,PARTTYPE,FSTYPE",
            "NAME=\"/dev/sda\" PARTTYPE=\"\" FSTYPE=\"\"\n\
             NAME=\"/dev/sda1\" PARTTYPE=\"c12a7328-f81f-11d2-ba4b-00a0c93ec93b\" FSTYPE=\"vfat\"\n\
             NAME=\"/dev/sda2\" PARTTYPE=\"0fc63daf-8483-4772-8e79-3d69d8477de4\" FSTYPE=\"ext4\"\n",
        );
        assert_eq!(resolve(&mut runner, None)?, EspTarget::new("/dev/sda", "1"));
        Ok(())
    }

    #[test]
    fn test_ambiguous() {
        let mut runner = FakeRunner::default().with(
            "lsblk NAME,PARTTYPE,FSTYPE",
            "NAME=\"/dev/sda1\" PARTTYPE=\"0xef\" FSTYPE=\"vfat\"\n\
             NAME=\"/dev/sdb1\" PARTTYPE=\"C12A7328-F81F-11D2-BA4B-00A0C93EC93B\" FSTYPE=\"vfat\"\n",
        );
        assert!(matches!(
            resolve(&mut runner, None),
            Err(BootError::EspError(EspError::Ambiguous(esps))) if esps == ["/dev/sda1", "/dev/sdb1"]
        ));
    }

    #[test]
    fn test_not_found() {
        assert!(matches!(
            resolve(&mut FakeRunner::default(), None),
            Err(BootError::EspError(EspError::NotFound))
        ));
    }

    #[test]
    fn test_parse_pairs() {
        assert_eq!(
            parse_pairs("NAME=\"/dev/sda1\" PARTTYPE=\"ef\" FSTYPE=\"\""),
            vec![("NAME", "/dev/sda1"), ("PARTTYPE", "ef"), ("FSTYPE", "")]
        );
        assert!(parse_pairs("garbage").is_empty());
    }
}

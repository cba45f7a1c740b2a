// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Provides [`ManagerConfig`], the configuration file for the boot manager.
//!
//! This parses space separated key value pairs, the format of which is defined in
//! the [`ManagerConfig`] struct.
//!
//! Example configuration:
//!
//! ```text
//! # The program used to read and write NVRAM
//! efibootmgr /usr/bin/efibootmgr
//!
//! # The program that runs efibootmgr with elevated privileges, or none
//! elevate sudo --non-interactive
//!
//! # Skip ESP detection
//! disk /dev/nvme0n1
//! part 1
//!
//! # Or give the ESP as one device
//! efi /dev/nvme0n1p1
//!
//! # How much is logged to stderr
//! log_level info
//! ```

use std::{
    io,
    path::{Path, PathBuf},
};

use log::{LevelFilter, warn};
use thiserror::Error;

use crate::{
    BootResult,
    boot::plan::EFIBOOTMGR,
    system::esp::{EspTarget, split_device},
};

/// The default configuration path for the [`ManagerConfig`].
pub const CONFIG_PATH: &str = "/etc/efiboots.conf";

/// The default privilege escalation program.
const DEFAULT_ELEVATE: &str = "pkexec";

/// Errors that may result from reading the configuration file.
#[derive(Error, Debug)]
pub enum ConfigFileError {
    /// The file exists, but could not be read.
    #[error("Could not read {}: {source}", path.display())]
    Read {
        /// The path of the file.
        path: PathBuf,

        /// The underlying error.
        source: io::Error,
    },
}

/// The configuration file for the boot manager.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ManagerConfig {
    /// The program used to read and write NVRAM.
    pub efibootmgr: String,

    /// The command that NVRAM writes are prefixed with. Empty if they are run directly.
    pub elevate: Vec<String>,

    /// The disk of the ESP.
    pub disk: Option<String>,

    /// The partition number of the ESP.
    pub part: Option<String>,

    /// The device of the ESP, such as `/dev/sda1`.
    pub efi: Option<String>,

    /// The maximum level of log records written to stderr.
    pub log_level: LevelFilter,
}

impl ManagerConfig {
    /// Reads a [`ManagerConfig`] from a file.
    ///
    /// # Errors
    ///
    /// May return an `Error` if the file exists but could not be read. If the file does not exist, then the default
    /// [`ManagerConfig`] is returned.
    pub fn new(path: &Path) -> Result<Self, ConfigFileError> {
        match std::fs::read_to_string(path) {
            Ok(content) => Ok(Self::get_manager_config(&content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigFileError::Read {
                path: path.to_owned(),
                source,
            }),
        }
    }

    /// Parses the contents of a [`ManagerConfig`] format string.
    ///
    /// Unknown keys are skipped with a warning, and values that do not parse leave the default in place.
    #[must_use = "Has no effect if the result is unused"]
    pub fn get_manager_config(content: &str) -> Self {
        let mut config = Self::default();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (key, value) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
            let value = value.trim();
            match &*key.to_ascii_lowercase() {
                "efibootmgr" if !value.is_empty() => value.clone_into(&mut config.efibootmgr),
                "elevate" if !value.is_empty() => {
                    config.elevate = if value == "none" {
                        Vec::new()
                    } else {
                        value.split_whitespace().map(str::to_owned).collect()
                    };
                }
                "disk" if !value.is_empty() => config.disk = Some(value.to_owned()),
                "part" if !value.is_empty() => config.part = Some(value.to_owned()),
                "efi" if !value.is_empty() => config.efi = Some(value.to_owned()),
                "log_level" => match value.parse() {
                    Ok(level) => config.log_level = level,
                    Err(_) => warn!("Invalid log_level \"{value}\" in configuration file"),
                },
                _ => warn!("Skipping line in configuration file: {line}"),
            }
        }

        config
    }

    /// Gets the ESP given by the configuration, if any.
    ///
    /// `disk` and `part` only count when both are present, and take priority over `efi`.
    ///
    /// # Errors
    ///
    /// May return an `Error` if `efi` is not a partition device.
    pub fn esp_override(&self) -> BootResult<Option<EspTarget>> {
        if let (Some(disk), Some(part)) = (&self.disk, &self.part) {
            return Ok(Some(EspTarget::new(disk, part)));
        }

        match &self.efi {
            Some(efi) => Ok(Some(split_device(efi)?)),
            None => Ok(None),
        }
    }
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            efibootmgr: EFIBOOTMGR.to_owned(),
            elevate: vec![DEFAULT_ELEVATE.to_owned()],
            disk: None,
            part: None,
            efi: None,
            log_level: LevelFilter::Warn,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_config() {
        let config = r"
            # comment
            efibootmgr /usr/sbin/efibootmgr
            elevate sudo -n
            disk /dev/nvme0n1
            part 1
            efi /dev/sdb2
            log_level debug
            colour blue
        ";

        let config = ManagerConfig::get_manager_config(config);
        assert_eq!(config.efibootmgr, "/usr/sbin/efibootmgr");
        assert_eq!(config.elevate, vec!["sudo", "-n"]);
        assert_eq!(config.disk.as_deref(), Some("/dev/nvme0n1"));
        assert_eq!(config.part.as_deref(), Some("1"));
        assert_eq!(config.log_level, LevelFilter::Debug);
        assert!(matches!(
            config.esp_override(),
            Ok(Some(target)) if target == EspTarget::new("/dev/nvme0n1", "1")
        ));
    }

    #[test]
    fn test_defaults() {
        let config = ManagerConfig::get_manager_config("log_level loud\nelevate\n");
        assert_eq!(config, ManagerConfig::default());
        assert!(matches!(config.esp_override(), Ok(None)));
    }

    #[test]
    fn test_elevate_none() {
        let config = ManagerConfig::get_manager_config("elevate none");
        assert!(config.elevate.is_empty());
    }

    #[test]
    fn test_efi_override() {
        let config = ManagerConfig::get_manager_config("disk /dev/sda\nefi /dev/mmcblk0p3");
        assert!(matches!(
            config.esp_override(),
            Ok(Some(target)) if target == EspTarget::new("/dev/mmcblk0", "3")
        ));

        let config = ManagerConfig::get_manager_config("efi /dev/sda");
        assert!(config.esp_override().is_err());
    }

    #[test]
    fn test_missing_file() {
        let config = ManagerConfig::new(Path::new("/nonexistent/efiboots.conf"));
        assert!(matches!(config, Ok(config) if config == ManagerConfig::default()));
    }
}

// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Configuration layout.
//!
//! Specify the layout of the configuration file that ualt reads at startup.
//! The file is optional. Every field has a sane default that matches a
//! Debian-style system running the stock `update-alternatives` executable.

use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Error as FmtError, Formatter, Result as FmtResult},
    fs::read_to_string,
    io::ErrorKind,
    path::{Path, PathBuf},
    str::FromStr,
};
use tracing::debug;

/// Configuration file layout.
///
/// # General Layout
///
/// Split into two sections. The settings section picks the external
/// executable and the persistent overlay. The system section locates the
/// system-wide director pair that groups get imported from when the
/// persistent overlay does not know about them.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub settings: Settings,

    /// System-wide alternatives root.
    #[serde(default)]
    pub system: SystemRoot,
}

impl Config {
    /// Load configuration from target file.
    ///
    /// A missing file is not an error. Defaults are returned instead.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::Read`] if file exists but cannot be read.
    /// - Return [`ConfigError::Deserialize`] if file content is malformed.
    /// - Return [`ConfigError::ShellExpansion`] if a path cannot be expanded.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        match read_to_string(path.as_ref()) {
            Ok(data) => data.parse(),
            Err(error) if error.kind() == ErrorKind::NotFound => {
                debug!("no configuration at {:?}, using defaults", path.as_ref().display());
                Ok(Self::default())
            }
            Err(error) => Err(ConfigError::Read {
                source: error,
                path: path.as_ref().to_path_buf(),
            }),
        }
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let mut config: Config = toml::from_str(data).map_err(ConfigError::Deserialize)?;

        // INVARIANT: Perform shell expansion on every path field.
        if let Some(overlay) = config.settings.overlay.take() {
            config.settings.overlay = Some(expand(overlay)?);
        }
        config.system.altdir = expand(config.system.altdir)?;
        config.system.admindir = expand(config.system.admindir)?;

        Ok(config)
    }
}

impl Display for Config {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(
            toml::to_string_pretty(self)
                .map_err(ConfigError::Serialize)?
                .as_str(),
        )
    }
}

/// General settings.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct Settings {
    /// Name or path of the alternatives management executable.
    #[serde(default = "default_program")]
    pub program: String,

    /// Base directory of the persistent overlay.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overlay: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            program: default_program(),
            overlay: None,
        }
    }
}

/// System-wide director pair.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct SystemRoot {
    /// Directory holding the system's alternative symlinks.
    #[serde(default = "default_system_altdir")]
    pub altdir: PathBuf,

    /// Directory holding the system's administrative state.
    #[serde(default = "default_system_admindir")]
    pub admindir: PathBuf,
}

impl Default for SystemRoot {
    fn default() -> Self {
        Self {
            altdir: default_system_altdir(),
            admindir: default_system_admindir(),
        }
    }
}

fn default_program() -> String {
    "update-alternatives".into()
}

fn default_system_altdir() -> PathBuf {
    PathBuf::from("/etc/alternatives")
}

fn default_system_admindir() -> PathBuf {
    PathBuf::from("/var/lib/dpkg/alternatives")
}

fn expand(path: PathBuf) -> Result<PathBuf> {
    Ok(PathBuf::from(
        shellexpand::full(path.to_string_lossy().as_ref())
            .map_err(ConfigError::ShellExpansion)?
            .into_owned(),
    ))
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read configuration file at {:?}", path.display())]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Failed to deserialize configuration.
    #[error(transparent)]
    Deserialize(#[from] toml::de::Error),

    /// Failed to serialize configuration.
    #[error(transparent)]
    Serialize(#[from] toml::ser::Error),

    /// Failed to perform shell expansion on configuration.
    #[error(transparent)]
    ShellExpansion(#[from] shellexpand::LookupError<std::env::VarError>),
}

impl From<ConfigError> for FmtError {
    fn from(_: ConfigError) -> Self {
        FmtError
    }
}

/// Friendly result alias :3
type Result<T, E = ConfigError> = std::result::Result<T, E>;

// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Alternatives management executable.
//!
//! Ualt never touches alternatives state itself. Every change goes through
//! an external executable that understands the `update-alternatives`
//! command line, pointed at an [`OverlayRoot`] through its director pair
//! options. This module is the only place that spawns that executable.

use crate::{group::import::InstallOperation, overlay::OverlayRoot};

use std::{
    ffi::{OsStr, OsString},
    process::Command,
};
use tracing::{debug, instrument};

/// Layer of indirection for the alternatives executable.
pub trait Alternatives {
    /// Run executable against root, capturing its output.
    fn call_non_interactive(
        &self,
        root: &OverlayRoot,
        args: impl IntoIterator<Item = impl Into<OsString>>,
    ) -> Result<String>;

    /// Run executable against root through current terminal.
    ///
    /// Blocks until the executable exits. Used for verbs that may prompt the
    /// user, like `--config`.
    fn call_interactive(
        &self,
        root: &OverlayRoot,
        args: impl IntoIterator<Item = impl Into<OsString>>,
    ) -> Result<()>;

    /// Obtain query report of target group.
    fn query(&self, root: &OverlayRoot, name: &str) -> Result<String> {
        self.call_non_interactive(root, ["--query", name])
    }

    /// Install one candidate of a group along with its secondary links.
    fn install(&self, root: &OverlayRoot, operation: &InstallOperation) -> Result<()> {
        self.call_non_interactive(root, operation.to_args())?;
        Ok(())
    }

    /// Pin group to target value.
    fn set(&self, root: &OverlayRoot, name: &str, value: &str) -> Result<()> {
        self.call_non_interactive(root, ["--set", name, value])?;
        Ok(())
    }
}

/// Alternatives access through a spawned process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateAlternatives {
    program: OsString,
}

impl UpdateAlternatives {
    /// Construct new accessor for target program.
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn expand_bin_args(
        &self,
        root: &OverlayRoot,
        args: impl IntoIterator<Item = impl Into<OsString>>,
    ) -> Vec<OsString> {
        let mut bin_args = root.root_args();
        bin_args.extend(args.into_iter().map(Into::into));
        bin_args
    }
}

impl Default for UpdateAlternatives {
    fn default() -> Self {
        Self::new("update-alternatives")
    }
}

impl Alternatives for UpdateAlternatives {
    #[instrument(skip(self, root, args), level = "debug")]
    fn call_non_interactive(
        &self,
        root: &OverlayRoot,
        args: impl IntoIterator<Item = impl Into<OsString>>,
    ) -> Result<String> {
        syscall_non_interactive(&self.program, self.expand_bin_args(root, args))
    }

    #[instrument(skip(self, root, args), level = "debug")]
    fn call_interactive(
        &self,
        root: &OverlayRoot,
        args: impl IntoIterator<Item = impl Into<OsString>>,
    ) -> Result<()> {
        syscall_interactive(&self.program, self.expand_bin_args(root, args))
    }
}

fn syscall_interactive(
    cmd: impl AsRef<OsStr>,
    args: impl IntoIterator<Item = impl AsRef<OsStr>>,
) -> Result<()> {
    let status = Command::new(cmd.as_ref())
        .args(args)
        .status()
        .map_err(|err| Error::Spawn {
            source: err,
            program: cmd.as_ref().to_os_string(),
        })?;

    if !status.success() {
        return Err(Error::Failed {
            program: cmd.as_ref().to_os_string(),
            message: format!("exited with {status}"),
        });
    }

    Ok(())
}

fn syscall_non_interactive(
    cmd: impl AsRef<OsStr>,
    args: impl IntoIterator<Item = impl AsRef<OsStr>>,
) -> Result<String> {
    let args = args
        .into_iter()
        .map(|arg| arg.as_ref().to_os_string())
        .collect::<Vec<_>>();
    debug!("run {:?} {:?}", cmd.as_ref(), args);

    let output = Command::new(cmd.as_ref())
        .args(&args)
        .output()
        .map_err(|err| Error::Spawn {
            source: err,
            program: cmd.as_ref().to_os_string(),
        })?;
    let stdout = String::from_utf8_lossy(output.stdout.as_slice()).into_owned();
    let stderr = String::from_utf8_lossy(output.stderr.as_slice()).into_owned();

    if !output.status.success() {
        // INVARIANT: Chomp trailing newlines.
        let message = stderr.trim_end();
        let message = if message.is_empty() {
            format!("exited with {}", output.status)
        } else {
            message.to_string()
        };

        return Err(Error::Failed {
            program: cmd.as_ref().to_os_string(),
            message,
        });
    }

    if !stderr.is_empty() {
        debug!("stderr: {}", stderr.trim_end());
    }

    Ok(stdout)
}

/// Alternatives executable error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Executable could not be started.
    #[error("failed to run {program:?}")]
    Spawn {
        #[source]
        source: std::io::Error,
        program: OsString,
    },

    /// Executable exited unsuccessfully.
    #[error("command {program:?} failed: {message}")]
    Failed { program: OsString, message: String },
}

/// Friendly result alias :3
pub type Result<T, E = Error> = std::result::Result<T, E>;

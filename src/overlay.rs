// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Overlay roots.
//!
//! An __overlay root__ is a director pair, i.e., an alternatives directory
//! plus an administration directory, that defines one independent set of
//! alternatives state. The alternatives management executable is always
//! pointed at one of these through its `--altdir` and `--admindir` options.
//!
//! # Overlay Layout
//!
//! A user overlay keeps everything underneath a single base directory:
//!
//! ```text
//! <base>/bin/                     links to executables
//! <base>/man/                     links to manual pages
//! <base>/etc/alternatives/        alternatives directory
//! <base>/var/lib/alternatives/    administration directory
//! <base>/var/log/alternatives.log log file
//! ```
//!
//! Placing `<base>/bin` in front of `PATH`, and `<base>/man` in front of
//! `MANPATH` makes the overlay's selections win over the system's.
//!
//! The system root is the same concept rooted at `/`, using whatever
//! director pair the distribution ships.

use std::{
    ffi::OsString,
    fmt::{Display, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
};
use tracing::debug;

/// Director pair for one set of alternatives state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayRoot {
    base: PathBuf,
    altdir: PathBuf,
    admindir: PathBuf,
    log: Option<PathBuf>,
}

impl OverlayRoot {
    /// Construct user overlay rooted at target base directory.
    pub fn user(base: impl Into<PathBuf>) -> Self {
        let base = base.into();
        Self {
            altdir: base.join("etc").join("alternatives"),
            admindir: base.join("var").join("lib").join("alternatives"),
            log: Some(base.join("var").join("log").join("alternatives.log")),
            base,
        }
    }

    /// Construct system root from its director pair.
    pub fn system(altdir: impl Into<PathBuf>, admindir: impl Into<PathBuf>) -> Self {
        Self {
            base: PathBuf::from("/"),
            altdir: altdir.into(),
            admindir: admindir.into(),
            log: None,
        }
    }

    /// Base directory that relocated links are placed under.
    pub fn base(&self) -> &Path {
        self.base.as_path()
    }

    /// Alternatives directory.
    pub fn altdir(&self) -> &Path {
        self.altdir.as_path()
    }

    /// Administration directory.
    pub fn admindir(&self) -> &Path {
        self.admindir.as_path()
    }

    /// Directory that executable links are placed in.
    pub fn bin_dir(&self) -> PathBuf {
        self.base.join("bin")
    }

    /// Directory tree that manual page links are placed in.
    pub fn man_dir(&self) -> PathBuf {
        self.base.join("man")
    }

    /// Absolute location of a relativized link inside this root.
    pub fn link_path(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.base.join(relative)
    }

    /// Arguments selecting this root for the alternatives executable.
    pub fn root_args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "--altdir".into(),
            self.altdir.clone().into_os_string(),
            "--admindir".into(),
            self.admindir.clone().into_os_string(),
        ];

        if let Some(log) = &self.log {
            args.push("--log".into());
            args.push(log.clone().into_os_string());
        }

        args
    }

    /// Create every directory the overlay needs.
    ///
    /// Existing directories are left alone.
    ///
    /// # Errors
    ///
    /// - Return [`Error::CreateDir`] if any directory cannot be created.
    pub fn ensure(&self) -> Result<()> {
        let mut dirs = vec![
            self.bin_dir(),
            self.man_dir(),
            self.altdir.clone(),
            self.admindir.clone(),
        ];
        if let Some(parent) = self.log.as_ref().and_then(|log| log.parent()) {
            dirs.push(parent.to_path_buf());
        }

        for dir in dirs {
            debug!("ensure overlay directory {:?}", dir.display());
            mkdirp::mkdirp(&dir).map_err(|err| Error::CreateDir {
                source: err,
                path: dir.clone(),
            })?;
        }

        Ok(())
    }
}

impl Display for OverlayRoot {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        write!(
            fmt,
            "{} (admindir {})",
            self.altdir.display(),
            self.admindir.display()
        )
    }
}

/// Overlay error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Overlay directory cannot be created.
    #[error("failed to create overlay directory {:?}", path.display())]
    CreateDir {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
}

/// Friendly result alias :3
pub type Result<T, E = Error> = std::result::Result<T, E>;

// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Path resolution utilities.
//!
//! Determine relevent path information for external files that need to be
//! interacted with, or managed in some way.

use std::path::PathBuf;

/// Determine absolute path to user's home directory.
///
/// Does not check if the path returned actually exists.
///
/// # Errors
///
/// - Return [`NoWayHome`] if home directory path cannot be determined.
pub fn home_dir() -> Result<PathBuf> {
    dirs::home_dir().ok_or(NoWayHome)
}

/// Determine default absolute path to the persistent overlay.
///
/// Uses XDG Base Directory path `$XDG_CONFIG_HOME/ualt` as the default
/// absolute path for the user's persistent overlay. Falls back to
/// `$HOME/.config/ualt` when no configuration directory is known. Does not
/// check if the path returned actually exists.
///
/// # Errors
///
/// - Return [`NoWayHome`] if home directory path cannot be determined.
///
/// # See Also
///
/// - [XDG Base Directory](https://wiki.archlinux.org/title/XDG_Base_Directory)
pub fn default_overlay_dir() -> Result<PathBuf> {
    Ok(config_dir()?.join("ualt"))
}

/// Determine default absolute path to configuration file.
///
/// Lives next to the persistent overlay as `$XDG_CONFIG_HOME/ualt.toml`.
///
/// # Errors
///
/// - Return [`NoWayHome`] if home directory path cannot be determined.
pub fn default_config_file() -> Result<PathBuf> {
    Ok(config_dir()?.join("ualt.toml"))
}

fn config_dir() -> Result<PathBuf> {
    match dirs::config_dir() {
        Some(path) => Ok(path),
        None => Ok(home_dir()?.join(".config")),
    }
}

/// No way to determine user's home directory.
///
/// # See Also
///
/// - [`dirs::home_dir`](https://docs.rs/dirs/latest/dirs/fn.home_dir.html)
#[derive(Clone, Debug, thiserror::Error)]
#[error("cannot determine absolute path to user's home directory")]
pub struct NoWayHome;

/// Friendly result alias :3
pub type Result<T, E = NoWayHome> = std::result::Result<T, E>;

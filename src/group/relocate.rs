// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Link relocation.
//!
//! Alternatives links are always either executables or manual pages. To
//! recreate a group inside an overlay, every absolute link location must be
//! mapped onto the overlay's `bin/` or `man/` subtree. The only information
//! available to decide which is where the link's directory sits relative to
//! the active search paths for executables and manual pages.

use crate::overlay::OverlayRoot;

use std::{
    env,
    ffi::OsString,
    path::{Component, Path, PathBuf},
    process::Command,
};
use tracing::debug;

/// Active lookup paths for executables and manual pages.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SearchPaths {
    exec: Vec<PathBuf>,
    man: Vec<PathBuf>,
}

impl SearchPaths {
    /// Construct new search paths from explicit directory listings.
    pub fn new(
        exec: impl IntoIterator<Item = impl Into<PathBuf>>,
        man: impl IntoIterator<Item = impl Into<PathBuf>>,
    ) -> Self {
        Self {
            exec: exec.into_iter().map(Into::into).collect(),
            man: man.into_iter().map(Into::into).collect(),
        }
    }

    /// Determine search paths of current process.
    ///
    /// Executables come from `PATH`. Manual pages come from `MANPATH`, or
    /// from `manpath -q` when `MANPATH` is unset or empty, or from a stock
    /// listing when even that is unavailable.
    pub fn from_env() -> Self {
        let exec = split(env::var_os("PATH"));
        let mut man = split(env::var_os("MANPATH"));
        if man.is_empty() {
            man = split(manpath());
        }
        if man.is_empty() {
            debug!("no manual page search path found, using stock listing");
            man = vec!["/usr/local/share/man".into(), "/usr/share/man".into()];
        }

        Self { exec, man }
    }

    /// Search paths that an overlay root contributes itself.
    pub fn for_root(root: &OverlayRoot) -> Self {
        Self {
            exec: vec![root.bin_dir()],
            man: vec![root.man_dir()],
        }
    }

    /// Executable search path.
    pub fn exec(&self) -> &[PathBuf] {
        &self.exec
    }

    /// Manual page search path.
    pub fn man(&self) -> &[PathBuf] {
        &self.man
    }

    /// Map absolute path onto relative `bin/` or `man/` location.
    ///
    /// Paths whose directory is listed in the executable search path become
    /// `bin/<file>`. Otherwise the directory and each of its ancestors are
    /// checked against the manual page search path, and the first hit yields
    /// `man/<rest of path>`.
    ///
    /// # Errors
    ///
    /// - Return [`Unclassifiable`] if neither search path claims the path.
    pub fn relativize(&self, path: impl AsRef<Path>) -> Result<PathBuf> {
        let path = path.as_ref();
        let unclassifiable = || Unclassifiable { path: path.to_path_buf() };

        let (dir, file) = match (path.parent(), path.file_name()) {
            (Some(dir), Some(file)) => (dir, file),
            _ => return Err(unclassifiable()),
        };

        if is_shallow(dir) {
            return Err(unclassifiable());
        }

        if contains(&self.exec, dir) {
            return Ok(Path::new("bin").join(file));
        }

        for ancestor in dir.ancestors().take_while(|ancestor| !is_shallow(ancestor)) {
            if contains(&self.man, ancestor) {
                // INVARIANT: Ancestor is always a prefix of path.
                if let Ok(suffix) = path.strip_prefix(ancestor) {
                    return Ok(Path::new("man").join(suffix));
                }
            }
        }

        Err(unclassifiable())
    }
}

/// Map absolute path onto relative overlay location.
///
/// See [`SearchPaths::relativize`].
pub fn relativize(path: impl AsRef<Path>, search: &SearchPaths) -> Result<PathBuf> {
    search.relativize(path)
}

// Empty, ".", or filesystem root have nothing meaningful to relocate.
fn is_shallow(dir: &Path) -> bool {
    let mut components = dir.components();
    match (components.next(), components.next()) {
        (None, _) => true,
        (Some(Component::RootDir | Component::CurDir), None) => true,
        _ => false,
    }
}

// Path equality compares whole components, so "/usr/bin" never matches
// "/usr/bin2", and trailing separators do not matter.
fn contains(list: &[PathBuf], dir: &Path) -> bool {
    list.iter().any(|entry| entry.as_path() == dir)
}

fn split(value: Option<OsString>) -> Vec<PathBuf> {
    value
        .map(|value| {
            env::split_paths(&value)
                .filter(|path| !path.as_os_str().is_empty())
                .collect()
        })
        .unwrap_or_default()
}

fn manpath() -> Option<OsString> {
    let output = Command::new("manpath").arg("-q").output().ok()?;
    if !output.status.success() {
        return None;
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let trimmed = stdout.trim();
    (!trimmed.is_empty()).then(|| OsString::from(trimmed))
}

/// Path is neither an executable nor a manual page location.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("cannot classify {:?} as executable or manual page location", path.display())]
pub struct Unclassifiable {
    pub path: PathBuf,
}

/// Friendly result alias :3
pub type Result<T, E = Unclassifiable> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sealed_test::prelude::*;
    use simple_test_case::test_case;

    fn search() -> SearchPaths {
        SearchPaths::new(
            ["/usr/local/bin", "/usr/bin", "/bin"],
            ["/usr/local/share/man", "/usr/share/man"],
        )
    }

    #[test_case("/usr/bin/less", "bin/less"; "executable")]
    #[test_case("/bin/more", "bin/more"; "executable in root bin")]
    #[test_case("/usr/share/man/man1/less.1.gz", "man/man1/less.1.gz"; "manual page")]
    #[test_case(
        "/usr/share/man/ja/man1/less.1.gz",
        "man/ja/man1/less.1.gz";
        "localized manual page"
    )]
    #[test_case("/usr/share/man/less.1.gz", "man/less.1.gz"; "manual page at top level")]
    #[test]
    fn relativize_classifies(path: &str, expect: &str) -> anyhow::Result<()> {
        let result = search().relativize(path)?;
        pretty_assertions::assert_eq!(result, PathBuf::from(expect));

        Ok(())
    }

    #[test_case("/opt/weird/tool"; "unknown directory")]
    #[test_case("/less"; "root directory")]
    #[test_case("less"; "bare file name")]
    #[test_case("./less"; "current directory")]
    #[test_case("/"; "filesystem root")]
    #[test_case("/usr/bin2/less"; "no substring match for executables")]
    #[test_case("/usr/share/manual/man1/x.1"; "no substring match for manual pages")]
    #[test]
    fn relativize_rejects(path: &str) {
        let result = search().relativize(path);
        pretty_assertions::assert_eq!(result, Err(Unclassifiable { path: path.into() }));
    }

    #[test]
    fn relativize_with_empty_search_paths() {
        let empty = SearchPaths::default();
        assert!(relativize("/opt/weird/tool", &empty).is_err());
        assert_eq!(
            relativize("/usr/bin/less", &SearchPaths::new(["/usr/bin"], Vec::<PathBuf>::new())),
            Ok(PathBuf::from("bin/less"))
        );
        assert_eq!(
            relativize(
                "/usr/share/man/man1/less.1.gz",
                &SearchPaths::new(Vec::<PathBuf>::new(), ["/usr/share/man"])
            ),
            Ok(PathBuf::from("man/man1/less.1.gz"))
        );
    }

    #[test]
    fn relativize_ignores_trailing_separators_in_search_paths() {
        let search = SearchPaths::new(["/usr/bin/"], ["/usr/share/man/"]);
        assert_eq!(search.relativize("/usr/bin/less"), Ok(PathBuf::from("bin/less")));
        assert_eq!(
            search.relativize("/usr/share/man/man1/less.1.gz"),
            Ok(PathBuf::from("man/man1/less.1.gz"))
        );
    }

    #[test_case("bin/pager"; "executable")]
    #[test_case("man/man1/pager.1.gz"; "manual page")]
    #[test_case("man/de/man1/pager.1.gz"; "nested manual page")]
    #[test]
    fn relativize_round_trips_through_overlay(suffix: &str) -> anyhow::Result<()> {
        let root = OverlayRoot::user("/home/u/.config/my");
        let search = SearchPaths::for_root(&root);
        let result = search.relativize(root.link_path(suffix))?;
        pretty_assertions::assert_eq!(result, PathBuf::from(suffix));

        Ok(())
    }

    #[sealed_test(env = [("PATH", "/usr/bin::/bin"), ("MANPATH", "/usr/share/man:/opt/man")])]
    fn search_paths_from_env() {
        let result = SearchPaths::from_env();
        let expect = SearchPaths::new(["/usr/bin", "/bin"], ["/usr/share/man", "/opt/man"]);
        assert_eq!(result, expect);
    }

    #[sealed_test(env = [("PATH", ""), ("MANPATH", "")])]
    fn search_paths_fall_back_to_stock_manual_listing() {
        let result = SearchPaths::from_env();
        let expect = SearchPaths::new(
            Vec::<PathBuf>::new(),
            ["/usr/local/share/man", "/usr/share/man"],
        );
        assert_eq!(result, expect);
    }
}

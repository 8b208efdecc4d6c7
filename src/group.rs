// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Alternatives groups.
//!
//! A __group__ is a named set of interchangeable providers for one primary
//! link location, and zero or more secondary (slave) link locations that
//! follow the primary selection in lockstep. Each provider is a
//! __candidate__ with a priority. A group is either in _auto_ status, where
//! the highest priority candidate wins, or in _manual_ status, where the
//! user pinned a specific candidate.
//!
//! # Import Pipeline
//!
//! Groups get copied between roots in three steps:
//!
//! 1. [`report`] parses the textual query report of a group.
//! 2. [`relocate`] maps each absolute link location onto an overlay.
//! 3. [`import`] turns the relocated report into install and activate
//!    operations, and hands them to the alternatives executable.
//!
//! # See Also
//!
//! - [Man page update-alternatives][man]
//!
//! [man]: https://man7.org/linux/man-pages/man1/update-alternatives.1.html

pub mod import;
pub mod relocate;
pub mod report;

// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Personal alternatives overlays.
//!
//! Maintain alternatives group selections underneath a user writable
//! directory instead of the system's. The heavy lifting is done by the
//! system's own alternatives executable. Ualt points it at an overlay,
//! and knows how to copy groups into that overlay.

pub mod alternatives;
pub mod config;
pub mod group;
pub mod overlay;
pub mod path;

pub use alternatives::{Alternatives, UpdateAlternatives};
pub use config::Config;
pub use group::{
    import::{ImportPlan, Importer, Operation},
    relocate::SearchPaths,
    report::GroupReport,
};
pub use overlay::OverlayRoot;

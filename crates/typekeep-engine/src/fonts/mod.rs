// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Fonts — name handling, system lookup, curated mapping, resolution, and
// requirement tracking.

pub mod mapping;
pub mod names;
pub mod resolver;
pub mod system;
pub mod tracker;

pub use resolver::{FontRequest, FontResolver, ResolvedFont};
pub use system::SystemFontIndex;
pub use tracker::{FontRequirementTracker, Platform};

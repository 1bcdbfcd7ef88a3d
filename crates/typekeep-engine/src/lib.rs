// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

//! typekeep-engine — Font-preserving text replacement.
//!
//! The [`EngineManager`] runs one search/replace against a private copy of a
//! PDF with the primary [`RedactReinsert`] strategy, compares every edited
//! run's font before and after ([`correlate`]), and retries once with
//! [`StreamRewrite`] when a substitute font was drawn. The adopted result is
//! committed to the output path and an audit record is handed to the
//! injected sink.
//!
//! ```no_run
//! use std::path::Path;
//! use typekeep_audit::NullAuditSink;
//! use typekeep_core::EditConfig;
//! use typekeep_engine::EngineManager;
//!
//! let mut manager = EngineManager::new(EditConfig::default(), Box::new(NullAuditSink));
//! let outcome = manager.edit_text(
//!     Path::new("in.pdf"),
//!     Path::new("out.pdf"),
//!     "ALCANTARA",
//!     "ALCÂNTARA",
//! )?;
//! println!("{}", outcome.report());
//! # Ok::<(), typekeep_core::TypekeepError>(())
//! ```

pub mod correlate;
pub mod fonts;
pub mod manager;
pub mod preflight;
pub mod strategy;
pub mod workspace;

pub use correlate::{EditHint, correlate};
pub use fonts::{FontRequirementTracker, FontResolver, Platform, ResolvedFont, SystemFontIndex};
pub use manager::{EditOutcome, EngineManager, Phase};
pub use preflight::PreflightReport;
pub use strategy::{EditStrategy, RedactReinsert, StreamRewrite};

// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

//! typekeep-audit — Tamper-evident record keeping for text edits.
//!
//! Every edit operation produces exactly one [`AuditRecord`]: the SHA-256 of
//! the input and of the committed output, every engine attempt with its font
//! comparisons, and the engine that was finally adopted. Records are handed
//! to an [`AuditSink`] injected into the engine manager, so tests and
//! embedders choose where the trail goes.
//!
//! [`AuditRecord`]: typekeep_core::AuditRecord

pub mod audit;
pub mod integrity;

pub use audit::{AuditSink, JsonFileSink, MemoryAuditSink, NullAuditSink, SqliteAuditLog};
pub use integrity::{hash_bytes, hash_file, verify_hash};

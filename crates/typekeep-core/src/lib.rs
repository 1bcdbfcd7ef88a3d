// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Typekeep — Core types and error definitions shared across all crates.

pub mod config;
pub mod error;
pub mod human_errors;
pub mod telemetry;
pub mod types;

pub use config::{CorrelationTolerances, EditConfig, StyleOverrides};
pub use error::{Result, TypekeepError};
pub use types::*;

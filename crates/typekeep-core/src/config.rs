// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Engine configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::types::EngineId;

/// Settings for one edit operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditConfig {
    /// Pin a single strategy. When set, no secondary attempt is made.
    pub preferred_engine: Option<EngineId>,
    /// Veto the edit if any resolved font is not an exact match.
    pub strict_fonts: bool,
    /// Additional directories searched before the platform font directories.
    pub extra_font_dirs: Vec<PathBuf>,
    /// Search the platform font directories at all.
    pub use_system_fonts: bool,
    /// Persist an audit record for every operation.
    pub audit_enabled: bool,
    /// Scoring thresholds used by the fidelity checker.
    pub tolerances: CorrelationTolerances,
}

impl Default for EditConfig {
    fn default() -> Self {
        Self {
            preferred_engine: None,
            strict_fonts: false,
            extra_font_dirs: Vec::new(),
            use_system_fonts: true,
            audit_enabled: true,
            tolerances: CorrelationTolerances::default(),
        }
    }
}

/// Position/size tolerances (points) and acceptance score for matching
/// pre-edit runs to post-edit runs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CorrelationTolerances {
    pub x_exact: f32,
    pub x_near: f32,
    pub y_exact: f32,
    pub y_near: f32,
    pub size_exact: f32,
    pub size_near: f32,
    pub min_score: u32,
}

impl Default for CorrelationTolerances {
    fn default() -> Self {
        Self {
            x_exact: 1.0,
            x_near: 2.0,
            y_exact: 3.0,
            y_near: 6.0,
            size_exact: 5.0,
            size_near: 10.0,
            min_score: 30,
        }
    }
}

/// Optional style changes applied to reinserted text.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StyleOverrides {
    pub font_name: Option<String>,
    pub font_size: Option<f32>,
    /// `#rrggbb`.
    pub color: Option<String>,
}

impl StyleOverrides {
    pub fn is_empty(&self) -> bool {
        self.font_name.is_none() && self.font_size.is_none() && self.color.is_none()
    }
}

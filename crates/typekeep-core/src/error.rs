// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Typekeep.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::EngineId;

/// Top-level error type for all Typekeep operations.
#[derive(Debug, Error)]
pub enum TypekeepError {
    // -- Input errors --
    #[error("document not found: {}", .0.display())]
    DocumentNotFound(PathBuf),

    #[error("malformed PDF {}: {reason}", path.display())]
    MalformedDocument { path: PathBuf, reason: String },

    #[error("page {page} out of range (document has {page_count} pages)")]
    InvalidPage { page: usize, page_count: usize },

    #[error("text not found: {search:?}")]
    TextNotFound { search: String },

    // -- Library errors --
    #[error("PDF operation failed: {0}")]
    Pdf(String),

    #[error("font program error: {0}")]
    FontProgram(String),

    #[error("text encoding failed: {0}")]
    Encoding(String),

    // -- Policy --
    #[error("strict font mode vetoed the edit; non-exact fonts: {}", fonts.join(", "))]
    StrictFontVeto { fonts: Vec<String> },

    // -- Orchestration --
    #[error("{engine} strategy failed: {reason}")]
    Strategy { engine: EngineId, reason: String },

    #[error("no edit strategy succeeded ({attempts} attempted)")]
    NoStrategySucceeded { attempts: usize },

    // -- Persistence --
    #[error("audit sink error: {0}")]
    Audit(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, TypekeepError>;

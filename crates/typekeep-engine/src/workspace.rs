// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Per-operation scratch space and the final commit.
//
// The caller's input is copied once into a private temp directory; every
// strategy reads that copy and writes its own side file next to it. Nothing
// outside the directory is touched until the adopted file is moved to the
// output path.

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::debug;
use typekeep_core::{EngineId, Result};

const WORKING_COPY: &str = "working.pdf";

/// Scratch directory for one edit operation, removed on drop.
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
    working_copy: PathBuf,
}

impl Workspace {
    /// Create the directory and copy `input` into it.
    pub fn prepare(input: &Path) -> Result<Self> {
        let dir = tempfile::Builder::new().prefix("typekeep-").tempdir()?;
        let working_copy = dir.path().join(WORKING_COPY);
        std::fs::copy(input, &working_copy)?;
        debug!(dir = %dir.path().display(), "workspace prepared");
        Ok(Self { dir, working_copy })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// The private copy strategies read from.
    pub fn working_copy(&self) -> &Path {
        &self.working_copy
    }

    /// Side file a strategy writes to.
    pub fn output_for(&self, engine: EngineId) -> PathBuf {
        self.dir.path().join(format!("{}.pdf", engine.as_str()))
    }
}

/// Move `from` to `to`, replacing any existing file. Falls back to
/// copy-then-remove when a rename is not possible (e.g. across devices).
pub fn commit(from: &Path, to: &Path) -> Result<()> {
    if to.exists() {
        std::fs::remove_file(to)?;
    }
    if let Err(err) = std::fs::rename(from, to) {
        debug!(error = %err, "rename failed, copying instead");
        std::fs::copy(from, to)?;
        std::fs::remove_file(from)?;
    }
    Ok(())
}

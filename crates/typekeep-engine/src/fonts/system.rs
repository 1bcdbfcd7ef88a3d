// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform font directory index.
//
// Files are matched on their normalised stem only; programs are parsed
// lazily by the resolver once a candidate is chosen.

use std::path::{Path, PathBuf};

use tracing::debug;

use super::names::{detect_variants, family_root, normalize};

const FONT_EXTENSIONS: &[&str] = &["ttf", "otf"];

/// Deepest directory level searched below each root.
const MAX_DEPTH: usize = 6;

/// How specifically a file stem matched the requested name. Ordered from
/// least to most specific.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchLevel {
    /// Stem equals the family root (`arial.ttf` for `ArialNarrow-Bold`).
    FamilyRoot,
    /// Stem starts with the family root and carries every requested variant
    /// token (`arialnarrowbold.ttf`).
    FamilyVariant,
    /// Stem equals the full normalised name.
    FullName,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemMatch {
    pub path: PathBuf,
    pub level: MatchLevel,
}

#[derive(Debug, Clone)]
struct IndexedFile {
    path: PathBuf,
    stem: String,
}

/// Font files found under a set of directories, in scan order.
#[derive(Debug, Clone, Default)]
pub struct SystemFontIndex {
    files: Vec<IndexedFile>,
}

impl SystemFontIndex {
    /// An index with no files; every lookup misses.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The conventional font directories of the current platform.
    pub fn platform_dirs() -> Vec<PathBuf> {
        let mut dirs_found = Vec::new();
        if let Some(user) = dirs::font_dir() {
            dirs_found.push(user);
        }
        if let Some(home) = dirs::home_dir() {
            dirs_found.push(home.join(".fonts"));
        }

        #[cfg(target_os = "windows")]
        {
            let windir = std::env::var("WINDIR").unwrap_or_else(|_| "C:\\Windows".to_string());
            dirs_found.push(PathBuf::from(windir).join("Fonts"));
        }
        #[cfg(target_os = "macos")]
        {
            dirs_found.push(PathBuf::from("/Library/Fonts"));
            dirs_found.push(PathBuf::from("/System/Library/Fonts"));
        }
        #[cfg(all(unix, not(target_os = "macos")))]
        {
            dirs_found.push(PathBuf::from("/usr/share/fonts"));
            dirs_found.push(PathBuf::from("/usr/local/share/fonts"));
        }

        dirs_found
    }

    /// Recursively index `.ttf`/`.otf` files. Missing or unreadable
    /// directories are skipped.
    pub fn scan(roots: &[PathBuf]) -> Self {
        let mut index = Self::default();
        for root in roots {
            index.scan_dir(root, 0);
        }
        debug!(files = index.files.len(), roots = roots.len(), "font directories indexed");
        index
    }

    fn scan_dir(&mut self, dir: &Path, depth: usize) {
        if depth > MAX_DEPTH {
            return;
        }
        let Ok(entries) = std::fs::read_dir(dir) else {
            return;
        };
        let mut paths: Vec<PathBuf> = entries.filter_map(|e| e.ok().map(|e| e.path())).collect();
        // read_dir order is platform-defined; sort for reproducible lookups.
        paths.sort();

        for path in paths {
            if path.is_dir() {
                self.scan_dir(&path, depth + 1);
            } else if is_font_file(&path)
                && let Some(stem) = path.file_stem().and_then(|s| s.to_str())
            {
                self.files.push(IndexedFile {
                    stem: normalize(stem),
                    path,
                });
            }
        }
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Best file for `requested`: full name, then family plus variants, then
    /// bare family root. The first file in scan order wins within a level.
    pub fn find(&self, requested: &str) -> Option<SystemMatch> {
        let variants: Vec<&str> = detect_variants(requested)
            .iter()
            .map(|tag| tag.spellings()[0])
            .collect();
        self.find_parts(&normalize(requested), &family_root(requested), &variants)
    }

    /// A file of `family` carrying every token in `variants`, e.g. the bold
    /// face of whatever family has already resolved.
    pub fn find_variant(&self, family: &str, variants: &[&str]) -> Option<SystemMatch> {
        let root = family_root(family);
        let wanted: String = std::iter::once(root.as_str())
            .chain(variants.iter().copied())
            .collect();
        self.find_parts(&wanted, &root, variants)
            .filter(|m| m.level > MatchLevel::FamilyRoot)
    }

    fn find_parts(&self, full: &str, root: &str, variants: &[&str]) -> Option<SystemMatch> {
        let mut best: Option<SystemMatch> = None;
        for file in &self.files {
            let level = if file.stem == full {
                MatchLevel::FullName
            } else if !variants.is_empty()
                && file.stem.starts_with(root)
                && variants.iter().all(|v| file.stem[root.len()..].contains(v))
            {
                MatchLevel::FamilyVariant
            } else if file.stem == root {
                MatchLevel::FamilyRoot
            } else {
                continue;
            };

            if best.as_ref().is_none_or(|b| level > b.level) {
                best = Some(SystemMatch {
                    path: file.path.clone(),
                    level,
                });
            }
            if level == MatchLevel::FullName {
                break;
            }
        }
        best
    }
}

fn is_font_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| FONT_EXTENSIONS.iter().any(|x| e.eq_ignore_ascii_case(x)))
}

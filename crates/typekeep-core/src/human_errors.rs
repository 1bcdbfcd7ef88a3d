// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for people editing documents.
//
// Every technical error is mapped to plain English with a clear suggestion.
// The severity drives how a front end presents it.

use crate::error::TypekeepError;

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Trying again (possibly with another engine) may work.
    Recoverable,
    /// The user must do something first (install a font, fix a path).
    ActionRequired,
    /// The document or request cannot be processed as given.
    Permanent,
}

/// A human-readable error with plain English message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain English summary (shown as a heading).
    pub message: String,
    /// What the user should try (shown as body text).
    pub suggestion: String,
    /// Severity level.
    pub severity: Severity,
}

impl HumanError {
    fn new(message: impl Into<String>, suggestion: impl Into<String>, severity: Severity) -> Self {
        Self {
            message: message.into(),
            suggestion: suggestion.into(),
            severity,
        }
    }
}

/// Convert a `TypekeepError` into a `HumanError`.
pub fn humanize_error(err: &TypekeepError) -> HumanError {
    match err {
        // -- Input errors --
        TypekeepError::DocumentNotFound(path) => HumanError::new(
            "The PDF file couldn't be found.",
            format!("Check the path and try again. ({})", path.display()),
            Severity::ActionRequired,
        ),

        TypekeepError::MalformedDocument { .. } => HumanError::new(
            "There's a problem with this PDF file.",
            "The file may be damaged or encrypted. Try opening it in a PDF viewer first, or \
             re-export it.",
            Severity::Permanent,
        ),

        TypekeepError::InvalidPage { page, page_count } => HumanError::new(
            "That page doesn't exist.",
            format!("The document has {page_count} page(s); page {page} is out of range."),
            Severity::ActionRequired,
        ),

        TypekeepError::TextNotFound { search } => HumanError::new(
            "The text to replace wasn't found.",
            format!(
                "No text run contains {search:?}. Export the text objects to see the exact \
                 spelling used in the document."
            ),
            Severity::ActionRequired,
        ),

        // -- Library errors --
        TypekeepError::Pdf(_) => HumanError::new(
            "The PDF couldn't be edited.",
            "The document uses a structure the editor can't rewrite safely. The original file \
             was not changed.",
            Severity::Permanent,
        ),

        TypekeepError::FontProgram(_) => HumanError::new(
            "A font file couldn't be used.",
            "The font file may be damaged or in an unsupported format. Try installing a \
             different copy of the font.",
            Severity::ActionRequired,
        ),

        TypekeepError::Encoding(_) => HumanError::new(
            "Some characters can't be written with this font.",
            "The font in the document doesn't contain every character of the replacement text. \
             Try installing the full font.",
            Severity::Recoverable,
        ),

        // -- Policy --
        TypekeepError::StrictFontVeto { fonts } => HumanError::new(
            "The edit was stopped because some fonts aren't available exactly.",
            format!(
                "Install these fonts and run the edit again, or turn off strict font mode: {}",
                fonts.join(", ")
            ),
            Severity::ActionRequired,
        ),

        // -- Orchestration --
        TypekeepError::Strategy { engine, .. } => HumanError::new(
            "One editing method didn't work.",
            format!("The {engine} method failed; another method may still succeed."),
            Severity::Recoverable,
        ),

        TypekeepError::NoStrategySucceeded { .. } => HumanError::new(
            "The text couldn't be replaced.",
            "Every editing method failed. The original file was not changed. See the audit \
             record for details.",
            Severity::Permanent,
        ),

        // -- Persistence --
        TypekeepError::Audit(_) => HumanError::new(
            "The audit record couldn't be saved.",
            "Check that the audit location is writable and has free space.",
            Severity::ActionRequired,
        ),

        TypekeepError::Io(io_err) => {
            if io_err.kind() == std::io::ErrorKind::NotFound {
                HumanError::new(
                    "A file couldn't be found.",
                    "It may have been moved or deleted. Try choosing the file again.",
                    Severity::ActionRequired,
                )
            } else if io_err.kind() == std::io::ErrorKind::PermissionDenied {
                HumanError::new(
                    "The editor doesn't have permission to use that file.",
                    "Check the file permissions, or choose a different output location.",
                    Severity::ActionRequired,
                )
            } else {
                HumanError::new(
                    "There was a problem reading or writing a file.",
                    "Try again. If this keeps happening, your disk may be full.",
                    Severity::Recoverable,
                )
            }
        }

        TypekeepError::Serialization(_) => HumanError::new(
            "The editor had an internal data problem.",
            "Try again. If this keeps happening, please report it.",
            Severity::Recoverable,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EngineId;
    use std::path::PathBuf;

    #[test]
    fn missing_document_is_action_required() {
        let human = humanize_error(&TypekeepError::DocumentNotFound(PathBuf::from("a.pdf")));
        assert_eq!(human.severity, Severity::ActionRequired);
        assert!(human.suggestion.contains("a.pdf"));
    }

    #[test]
    fn strict_veto_lists_fonts() {
        let err = TypekeepError::StrictFontVeto {
            fonts: vec!["ArialNarrow-Bold".into(), "SegoeUI".into()],
        };
        let human = humanize_error(&err);
        assert_eq!(human.severity, Severity::ActionRequired);
        assert!(human.suggestion.contains("ArialNarrow-Bold, SegoeUI"));
    }

    #[test]
    fn strategy_failure_is_recoverable() {
        let err = TypekeepError::Strategy {
            engine: EngineId::StreamRewrite,
            reason: "no operator".into(),
        };
        assert_eq!(humanize_error(&err).severity, Severity::Recoverable);
    }

    #[test]
    fn total_failure_is_permanent() {
        let err = TypekeepError::NoStrategySucceeded { attempts: 2 };
        assert_eq!(humanize_error(&err).severity, Severity::Permanent);
    }
}

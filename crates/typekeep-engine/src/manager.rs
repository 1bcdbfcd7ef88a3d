// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Engine manager — runs edit strategies against a private copy of the
// document, verifies font fidelity after each, retries with the secondary
// strategy when the primary substituted a font, and records the operation.
//
// One operation is one pass through:
//
//   Idle ─▶ RunningPrimary ──fail─────────────────────────────▶ Failed
//                 │ success, no fallback (or pinned) ────────────▶ Done(primary)
//                 └ success with fallback ─▶ RunningSecondary ──▶ Done(secondary) if clean
//                                                             └─▶ Done(primary) otherwise

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::Utc;
use tracing::{debug, error, info, instrument, warn};
use typekeep_audit::{AuditSink, hash_file};
use typekeep_core::{
    AuditRecord, EditConfig, EditParameters, EngineAttempt, EngineId, FontComparison, Result,
    StyleOverrides, TextRun, TypekeepError,
};
use typekeep_document::PdfDocument;
use uuid::Uuid;

use crate::correlate::correlate;
use crate::fonts::{FontRequirementTracker, FontResolver, Platform};
use crate::strategy::{
    Confidence, EditRequest, EditStrategy, FontSession, RedactReinsert, StreamRewrite,
};
use crate::workspace::{Workspace, commit};

pub const OPERATION_TYPE: &str = "edit-text";

/// Where an operation is in its single traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Snapshot taken, fonts resolved, nothing run yet.
    Idle,
    RunningPrimary,
    RunningSecondary,
    /// Adopt the attempt at this index.
    Done(usize),
    Failed,
}

/// Phase after `attempt` finished in `phase`. `escalate` is false when the
/// engine is pinned or a retry could not honour the request.
pub fn next_phase(phase: Phase, attempt: &EngineAttempt, escalate: bool) -> Phase {
    match phase {
        Phase::RunningPrimary if !attempt.success() => Phase::Failed,
        Phase::RunningPrimary if attempt.any_fallback() && escalate => Phase::RunningSecondary,
        Phase::RunningPrimary => Phase::Done(0),
        Phase::RunningSecondary if attempt.is_clean() => Phase::Done(1),
        Phase::RunningSecondary => Phase::Done(0),
        done => done,
    }
}

/// Result of a committed edit.
#[derive(Debug, Clone)]
pub struct EditOutcome {
    pub output_path: PathBuf,
    /// Comparisons of the adopted attempt.
    pub comparisons: Vec<FontComparison>,
    pub audit: AuditRecord,
    /// Rendered font requirement summary.
    pub font_summary: String,
}

impl EditOutcome {
    pub fn adopted_engine(&self) -> Option<EngineId> {
        self.audit.adopted_engine
    }

    /// One line per attempt: engine, outcome, comparison count, fallback
    /// status.
    pub fn report(&self) -> String {
        let mut out = String::new();
        for attempt in &self.audit.attempts {
            let adopted = if Some(attempt.engine()) == self.audit.adopted_engine {
                " (adopted)"
            } else {
                ""
            };
            let status = if !attempt.success() {
                format!("failed: {}", attempt.error().unwrap_or("unknown error"))
            } else if attempt.any_fallback() {
                "font fallback detected".to_string()
            } else {
                "fonts preserved".to_string()
            };
            let _ = writeln!(
                out,
                "{}{}: {} comparison(s), {}, {:.1} ms",
                attempt.engine(),
                adopted,
                attempt.comparisons().len(),
                status,
                attempt.execution_time_ms()
            );
        }
        out
    }
}

/// Everything one attempt needs besides the strategy itself.
struct AttemptContext<'a> {
    workspace: &'a Workspace,
    parameters: &'a EditParameters,
    pre_runs: &'a [TextRun],
    targets: &'a [TextRun],
    target_ids: &'a [String],
}

/// Orchestrates edit strategies, fidelity checks, and the audit trail.
pub struct EngineManager {
    config: EditConfig,
    sink: Box<dyn AuditSink>,
    resolver: Option<FontResolver>,
    platform: Platform,
    primary: Box<dyn EditStrategy>,
    secondary: Box<dyn EditStrategy>,
}

impl EngineManager {
    // -- Construction ---------------------------------------------------------

    /// A manager with the default strategies. The font index is built from
    /// `config` on first use unless a resolver is injected.
    pub fn new(config: EditConfig, sink: Box<dyn AuditSink>) -> Self {
        Self {
            config,
            sink,
            resolver: None,
            platform: Platform::current(),
            primary: Box::new(RedactReinsert),
            secondary: Box::new(StreamRewrite),
        }
    }

    pub fn with_resolver(mut self, resolver: FontResolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Platform the installation guidance is written for.
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    /// Replace the strategies. The primary runs first unless the secondary
    /// is pinned. A low-confidence primary paired with a primary-confidence
    /// secondary is swapped so it only ever runs as the retry.
    pub fn with_strategies(
        mut self,
        primary: Box<dyn EditStrategy>,
        secondary: Box<dyn EditStrategy>,
    ) -> Self {
        let (primary, secondary) = if primary.confidence() == Confidence::LowConfidence
            && secondary.confidence() == Confidence::Primary
        {
            warn!(
                primary = %secondary.id(),
                secondary = %primary.id(),
                "low-confidence strategy given as primary, swapping order"
            );
            (secondary, primary)
        } else {
            (primary, secondary)
        };
        self.primary = primary;
        self.secondary = secondary;
        self
    }

    pub fn config(&self) -> &EditConfig {
        &self.config
    }

    // -- Font session ---------------------------------------------------------

    pub(crate) fn open_session(&mut self) -> FontSession {
        let resolver = self
            .resolver
            .take()
            .unwrap_or_else(|| FontResolver::from_config(&self.config));
        FontSession::new(resolver, FontRequirementTracker::for_platform(self.platform))
    }

    /// Keep the resolver (and its cache) for the next operation.
    pub(crate) fn close_session(&mut self, session: FontSession) {
        self.resolver = Some(session.resolver);
    }

    // -- Editing --------------------------------------------------------------

    /// Replace `search_text` with `replacement_text` everywhere, using the
    /// configured engine preference and strictness.
    pub fn edit_text(
        &mut self,
        document_path: &Path,
        output_path: &Path,
        search_text: &str,
        replacement_text: &str,
    ) -> Result<EditOutcome> {
        let parameters = EditParameters {
            search_text: search_text.to_string(),
            replacement_text: replacement_text.to_string(),
            style_overrides: StyleOverrides::default(),
            preferred_engine: None,
            strict_fonts: false,
        };
        self.edit_all_occurrences(document_path, output_path, parameters)
    }

    /// Edit every run containing the search text and commit the best result
    /// to `output_path`.
    ///
    /// Fails with `TextNotFound` before any attempt when nothing matches,
    /// with `StrictFontVeto` before anything is written when strict mode
    /// rejects a font, and with `NoStrategySucceeded` when no strategy
    /// produced output. An audit record is emitted in the last two cases,
    /// when committing the adopted output fails, and on success.
    ///
    /// The secondary retry is skipped when style overrides are set, since
    /// stream rewriting cannot apply them.
    #[instrument(
        skip_all,
        fields(input = %document_path.display(), search = %parameters.search_text)
    )]
    pub fn edit_all_occurrences(
        &mut self,
        document_path: &Path,
        output_path: &Path,
        mut parameters: EditParameters,
    ) -> Result<EditOutcome> {
        parameters.preferred_engine = parameters.preferred_engine.or(self.config.preferred_engine);
        parameters.strict_fonts |= self.config.strict_fonts;
        let operation_id = Uuid::new_v4();
        let started_at = Utc::now();

        // -- Idle: snapshot and validate --
        let document = PdfDocument::open(document_path)?;
        if parameters.search_text.is_empty() {
            return Err(TypekeepError::TextNotFound {
                search: parameters.search_text,
            });
        }
        let pre_runs = document.extract_text_runs()?;
        let targets: Vec<TextRun> = pre_runs
            .iter()
            .filter(|r| r.content.contains(&parameters.search_text))
            .cloned()
            .collect();
        if targets.is_empty() {
            return Err(TypekeepError::TextNotFound {
                search: parameters.search_text,
            });
        }
        let target_ids: Vec<String> = targets.iter().map(|r| r.id.clone()).collect();
        info!(%operation_id, targets = targets.len(), "edit started");

        let mut session = self.open_session();
        let inventory = document.extract_font_inventory();
        for run in &targets {
            let font_name = parameters
                .style_overrides
                .font_name
                .as_deref()
                .unwrap_or(&run.font_name);
            let text = run
                .content
                .replacen(&parameters.search_text, &parameters.replacement_text, 1);
            session.resolve_and_record(&document, &inventory, font_name, &text, run.page);
        }
        drop(document);

        let input_hash = hash_file(document_path)?;
        let font_summary = session.tracker.summary();
        let rendered_summary = session.tracker.render_summary();
        if session.tracker.has_missing_fonts() {
            warn!("{}", rendered_summary);
        }

        let mut record = AuditRecord {
            operation_id,
            operation_type: OPERATION_TYPE.to_string(),
            started_at,
            finished_at: started_at,
            input_path: document_path.to_path_buf(),
            output_path: None,
            input_hash,
            output_hash: None,
            parameters: parameters.clone(),
            attempts: Vec::new(),
            adopted_engine: None,
            final_success: false,
            any_font_fallback: false,
            font_preservation_success: false,
            font_summary,
        };

        // -- Strict veto: nothing has been written yet --
        if session.tracker.should_block(parameters.strict_fonts) {
            let fonts = session.tracker.inexact_fonts();
            self.close_session(session);
            warn!(?fonts, "strict font mode vetoed the edit");
            record.finished_at = Utc::now();
            self.persist(&record);
            return Err(TypekeepError::StrictFontVeto { fonts });
        }

        let workspace = Workspace::prepare(document_path)?;
        let context = AttemptContext {
            workspace: &workspace,
            parameters: &parameters,
            pre_runs: &pre_runs,
            targets: &targets,
            target_ids: &target_ids,
        };

        let pinned = parameters.preferred_engine;
        let (first, second): (&dyn EditStrategy, Option<&dyn EditStrategy>) = match pinned {
            Some(id) if id == self.secondary.id() => (self.secondary.as_ref(), None),
            Some(id) if id == self.primary.id() => (self.primary.as_ref(), None),
            Some(id) => {
                self.close_session(session);
                return Err(TypekeepError::Strategy {
                    engine: id,
                    reason: "no strategy with this id is configured".to_string(),
                });
            }
            None => (self.primary.as_ref(), Some(self.secondary.as_ref())),
        };
        // Stream rewriting cannot apply style overrides, so a changed
        // style is never retried there.
        let escalate = second.is_some() && parameters.style_overrides.is_empty();

        let mut attempts: Vec<EngineAttempt> = Vec::new();
        let mut phase = Phase::Idle;
        let adopted = loop {
            match phase {
                Phase::Idle => phase = Phase::RunningPrimary,
                Phase::RunningPrimary => {
                    let attempt = run_attempt(first, &context, &mut session, &self.config);
                    phase = next_phase(phase, &attempt, escalate);
                    attempts.push(attempt);
                }
                Phase::RunningSecondary => {
                    let Some(strategy) = second else {
                        phase = Phase::Done(0);
                        continue;
                    };
                    let attempt = run_attempt(strategy, &context, &mut session, &self.config);
                    phase = next_phase(phase, &attempt, escalate);
                    attempts.push(attempt);
                }
                Phase::Done(index) => break Some(index),
                Phase::Failed => break None,
            }
            debug!(?phase, "phase transition");
        };

        record.attempts = attempts;
        let adopted = adopted.and_then(|index| record.attempts.get(index));
        let Some(adopted) = adopted.cloned() else {
            self.close_session(session);
            record.finished_at = Utc::now();
            self.persist(&record);
            return Err(TypekeepError::NoStrategySucceeded {
                attempts: record.attempts.len(),
            });
        };

        // -- Commit --
        let committed = adopted
            .output_path()
            .ok_or_else(|| TypekeepError::Strategy {
                engine: adopted.engine(),
                reason: "adopted attempt has no output file".to_string(),
            })
            .and_then(|file| commit(file, output_path))
            .and_then(|()| hash_file(output_path));
        drop(workspace);
        let output_hash = match committed {
            Ok(hash) => hash,
            Err(err) => {
                error!(
                    %operation_id,
                    error = %err,
                    output = %output_path.display(),
                    "commit failed"
                );
                record.finished_at = Utc::now();
                self.persist(&record);
                self.close_session(session);
                return Err(err);
            }
        };

        record.output_path = Some(output_path.to_path_buf());
        record.output_hash = Some(output_hash);
        record.adopted_engine = Some(adopted.engine());
        record.final_success = true;
        record.any_font_fallback = adopted.any_fallback();
        record.font_preservation_success = adopted.is_clean();
        record.finished_at = Utc::now();
        self.persist(&record);
        self.close_session(session);

        info!(
            %operation_id,
            engine = %adopted.engine(),
            fallback = adopted.any_fallback(),
            output = %output_path.display(),
            "edit committed"
        );
        Ok(EditOutcome {
            output_path: output_path.to_path_buf(),
            comparisons: adopted.comparisons().to_vec(),
            audit: record,
            font_summary: rendered_summary,
        })
    }

    fn persist(&mut self, record: &AuditRecord) {
        if !self.config.audit_enabled {
            return;
        }
        if let Err(e) = self.sink.persist(record) {
            error!(error = %e, operation_id = %record.operation_id, "failed to record audit entry");
        }
    }
}

/// Run one strategy into its side file and verify the result. Failures are
/// captured in the attempt, never propagated.
fn run_attempt(
    strategy: &dyn EditStrategy,
    context: &AttemptContext<'_>,
    session: &mut FontSession,
    config: &EditConfig,
) -> EngineAttempt {
    let engine = strategy.id();
    let side_file = context.workspace.output_for(engine);
    let request = EditRequest {
        input_path: context.workspace.working_copy(),
        output_path: &side_file,
        search_text: &context.parameters.search_text,
        replacement_text: &context.parameters.replacement_text,
        targets: context.targets,
        style: &context.parameters.style_overrides,
    };

    let started = Instant::now();
    let result = strategy.apply(&request, session).and_then(|outcome| {
        let post_runs = PdfDocument::open(&outcome.output_path)?.extract_text_runs()?;
        let comparisons = correlate(
            context.pre_runs,
            &post_runs,
            context.target_ids,
            request.hint(),
            &config.tolerances,
        );
        Ok((outcome.output_path, comparisons))
    });
    let elapsed = started.elapsed().as_secs_f64() * 1000.0;

    match result {
        Ok((path, comparisons)) => {
            let attempt = EngineAttempt::succeeded(engine, path, comparisons, elapsed);
            info!(
                %engine,
                comparisons = attempt.comparisons().len(),
                fallback = attempt.any_fallback(),
                "attempt finished"
            );
            attempt
        }
        Err(err) => {
            warn!(%engine, error = %err, "attempt failed");
            EngineAttempt::failed(engine, err.to_string(), elapsed)
        }
    }
}

// crates/cat-api-contract/src/report.rs
// ============================================================================
// Module: Suite Reporting
// Description: Observers for suite progress and final results.
// Purpose: Emit structured logs and write deterministic run artifacts.
// Dependencies: serde, serde_jcs, thiserror, tracing
// ============================================================================

//! ## Overview
//! A [`Reporter`] receives suite lifecycle events from the runner.
//! [`LogReporter`] emits one structured log line per scenario.
//! [`ArtifactReporter`] writes `summary.json` (canonical JCS),
//! `summary.md`, and `transcript.json` into a run directory when the suite
//! finishes.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::Path;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::runner::ScenarioOutcome;
use crate::runner::ScenarioStatus;
use crate::runner::SuiteReport;
use crate::scenarios::ScenarioId;

/// Summary artifact file name.
pub const SUMMARY_JSON: &str = "summary.json";
/// Human-readable summary file name.
pub const SUMMARY_MARKDOWN: &str = "summary.md";
/// Transcript artifact file name.
pub const TRANSCRIPT_JSON: &str = "transcript.json";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Reporter failures.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Filesystem failure.
    #[error("report io error at {path}: {source}")]
    Io {
        /// Affected path.
        path: String,
        /// Underlying error.
        source: io::Error,
    },
    /// Serialization failure.
    #[error("report serialization failed for {path}: {message}")]
    Serialize {
        /// Target path.
        path: String,
        /// Error message.
        message: String,
    },
}

// ============================================================================
// SECTION: Reporter Trait
// ============================================================================

/// Observer of suite lifecycle events.
pub trait Reporter: Send {
    /// Called once before the first scenario with the selected plan.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError`] when the reporter cannot record the event.
    fn suite_started(&mut self, plan: &[ScenarioId]) -> Result<(), ReportError> {
        let _ = plan;
        Ok(())
    }

    /// Called after each scenario completes.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError`] when the reporter cannot record the event.
    fn scenario_finished(&mut self, outcome: &ScenarioOutcome) -> Result<(), ReportError>;

    /// Called once with the aggregated report.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError`] when the reporter cannot record the event.
    fn suite_finished(&mut self, report: &SuiteReport) -> Result<(), ReportError>;
}

// ============================================================================
// SECTION: Log Reporter
// ============================================================================

/// Emits structured `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn suite_started(&mut self, plan: &[ScenarioId]) -> Result<(), ReportError> {
        tracing::info!(scenarios = plan.len(), "contract suite started");
        Ok(())
    }

    fn scenario_finished(&mut self, outcome: &ScenarioOutcome) -> Result<(), ReportError> {
        let scenario = outcome.scenario.as_str();
        let detail = outcome.detail.as_deref().unwrap_or_default();
        match outcome.status {
            ScenarioStatus::Passed => {
                tracing::info!(scenario, duration_ms = outcome.duration_ms, "scenario passed");
            }
            ScenarioStatus::Skipped => {
                tracing::warn!(scenario, reason = detail, "scenario skipped");
            }
            ScenarioStatus::Failed => {
                tracing::error!(scenario, duration_ms = outcome.duration_ms, reason = detail, "scenario failed");
            }
        }
        Ok(())
    }

    fn suite_finished(&mut self, report: &SuiteReport) -> Result<(), ReportError> {
        tracing::info!(
            passed = report.count(ScenarioStatus::Passed),
            failed = report.count(ScenarioStatus::Failed),
            skipped = report.count(ScenarioStatus::Skipped),
            duration_ms = report.duration_ms,
            "contract suite finished"
        );
        Ok(())
    }
}

// ============================================================================
// SECTION: Artifact Reporter
// ============================================================================

/// Totals by status.
#[derive(Debug, Serialize)]
struct Totals {
    /// Passed scenarios.
    passed: usize,
    /// Failed scenarios.
    failed: usize,
    /// Skipped scenarios.
    skipped: usize,
}

/// Serialized summary shape.
#[derive(Debug, Serialize)]
struct Summary<'a> {
    /// Overall result label.
    status: &'static str,
    /// Target base URL.
    base_url: &'a str,
    /// Run start in epoch milliseconds.
    started_at_ms: u64,
    /// Run duration in milliseconds.
    duration_ms: u64,
    /// Totals by status.
    totals: Totals,
    /// Per-scenario outcomes.
    outcomes: &'a [ScenarioOutcome],
}

/// Writes run artifacts under a root directory.
#[derive(Debug, Clone)]
pub struct ArtifactReporter {
    /// Artifact root directory.
    root: PathBuf,
}

impl ArtifactReporter {
    /// Creates the artifact root if needed.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Io`] when the directory cannot be created.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, ReportError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|source| ReportError::Io {
            path: root.display().to_string(),
            source,
        })?;
        Ok(Self {
            root,
        })
    }

    /// Returns the artifact root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Writes a JSON artifact using canonical JCS serialization.
    fn write_json<T: Serialize>(&self, name: &str, value: &T) -> Result<PathBuf, ReportError> {
        let path = self.root.join(name);
        let bytes = serde_jcs::to_vec(value).map_err(|err| ReportError::Serialize {
            path: path.display().to_string(),
            message: err.to_string(),
        })?;
        write_file(&path, &bytes)?;
        Ok(path)
    }
}

impl Reporter for ArtifactReporter {
    fn scenario_finished(&mut self, _outcome: &ScenarioOutcome) -> Result<(), ReportError> {
        Ok(())
    }

    fn suite_finished(&mut self, report: &SuiteReport) -> Result<(), ReportError> {
        let summary = Summary {
            status: if report.passed() { "passed" } else { "failed" },
            base_url: &report.base_url,
            started_at_ms: report.started_at_ms,
            duration_ms: report.duration_ms,
            totals: Totals {
                passed: report.count(ScenarioStatus::Passed),
                failed: report.count(ScenarioStatus::Failed),
                skipped: report.count(ScenarioStatus::Skipped),
            },
            outcomes: &report.outcomes,
        };
        self.write_json(SUMMARY_JSON, &summary)?;
        self.write_json(TRANSCRIPT_JSON, &report.transcript)?;
        write_file(&self.root.join(SUMMARY_MARKDOWN), render_markdown(report).as_bytes())?;
        tracing::debug!(root = %self.root.display(), "wrote contract artifacts");
        Ok(())
    }
}

/// Writes bytes to `path`.
fn write_file(path: &Path, bytes: &[u8]) -> Result<(), ReportError> {
    fs::write(path, bytes).map_err(|source| ReportError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Renders the human-readable summary.
#[must_use]
pub fn render_markdown(report: &SuiteReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Cat API contract run");
    let _ = writeln!(out);
    let _ = writeln!(out, "- Target: {}", report.base_url);
    let _ = writeln!(
        out,
        "- Result: {} passed, {} failed, {} skipped in {} ms",
        report.count(ScenarioStatus::Passed),
        report.count(ScenarioStatus::Failed),
        report.count(ScenarioStatus::Skipped),
        report.duration_ms
    );
    let _ = writeln!(out);
    let _ = writeln!(out, "| Group | Scenario | Status | Duration (ms) | Detail |");
    let _ = writeln!(out, "| --- | --- | --- | --- | --- |");
    for outcome in &report.outcomes {
        let detail = outcome.detail.as_deref().unwrap_or("").replace('|', "\\|").replace('\n', " ");
        let _ = writeln!(
            out,
            "| {} | {} | {} | {} | {} |",
            outcome.group.title(),
            outcome.scenario.as_str(),
            outcome.status.as_str(),
            outcome.duration_ms,
            detail
        );
    }
    out
}

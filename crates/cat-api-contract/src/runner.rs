// crates/cat-api-contract/src/runner.rs
// ============================================================================
// Module: Suite Runner
// Description: Sequential execution of the scenario catalog.
// Purpose: Run selected scenarios in order, thread state, and collect outcomes.
// Dependencies: serde, tracing
// ============================================================================

//! ## Overview
//! [`SuiteRunner`] executes [`ScenarioId::ALL`] in order, filtered by an
//! optional group selection. Scenarios run one at a time against the live
//! service. A scenario that needs the uploaded image id is recorded as
//! skipped when no id is stored. A failure never aborts the run: every
//! selected scenario produces exactly one [`ScenarioOutcome`].
//!
//! Reporters observe the run. Reporter errors are logged and do not affect
//! outcomes.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::time::Instant;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;
use tracing::Instrument;

use crate::client::ImageApiClient;
use crate::client::TranscriptEntry;
use crate::client::millis;
use crate::config::ContractConfig;
use crate::report::ReportError;
use crate::report::Reporter;
use crate::scenarios::ScenarioContext;
use crate::scenarios::ScenarioError;
use crate::scenarios::ScenarioGroup;
use crate::scenarios::ScenarioId;
use crate::scenarios::SuiteSchemas;
use crate::scenarios::SuiteState;
use crate::scenarios::run_scenario;

/// Detail recorded for scenarios skipped for lack of an uploaded image.
pub const SKIP_NO_IMAGE: &str = "no uploaded image id available";

// ============================================================================
// SECTION: Outcomes
// ============================================================================

/// Result class of one scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioStatus {
    /// Every expectation held.
    Passed,
    /// A request or expectation failed.
    Failed,
    /// A precondition was unmet; no request was made.
    Skipped,
}

impl ScenarioStatus {
    /// Stable label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }
}

/// Outcome of one scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScenarioOutcome {
    /// Scenario identifier.
    pub scenario: ScenarioId,
    /// Owning group.
    pub group: ScenarioGroup,
    /// Result class.
    pub status: ScenarioStatus,
    /// Failure or skip reason.
    pub detail: Option<String>,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
}

/// Aggregated results of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SuiteReport {
    /// Target base URL.
    pub base_url: String,
    /// Run start, milliseconds since the Unix epoch.
    pub started_at_ms: u64,
    /// Total run duration in milliseconds.
    pub duration_ms: u64,
    /// Outcomes in execution order.
    pub outcomes: Vec<ScenarioOutcome>,
    /// Every HTTP exchange made during the run.
    pub transcript: Vec<TranscriptEntry>,
}

impl SuiteReport {
    /// Counts outcomes with `status`.
    #[must_use]
    pub fn count(&self, status: ScenarioStatus) -> usize {
        self.outcomes.iter().filter(|outcome| outcome.status == status).count()
    }

    /// Returns true when no scenario failed.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.count(ScenarioStatus::Failed) == 0
    }

    /// Returns the outcome for `scenario`, if it was selected.
    #[must_use]
    pub fn outcome(&self, scenario: ScenarioId) -> Option<&ScenarioOutcome> {
        self.outcomes.iter().find(|outcome| outcome.scenario == scenario)
    }
}

// ============================================================================
// SECTION: Runner
// ============================================================================

/// Executes the scenario catalog.
pub struct SuiteRunner {
    /// Run configuration.
    config: ContractConfig,
    /// Authenticated client.
    client: ImageApiClient,
    /// Compiled schemas.
    schemas: SuiteSchemas,
    /// Selected groups; `None` selects all.
    groups: Option<BTreeSet<ScenarioGroup>>,
    /// Attached reporters.
    reporters: Vec<Box<dyn Reporter>>,
}

impl SuiteRunner {
    /// Builds a runner with a client derived from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError`] when the client or schemas cannot be built.
    pub fn new(config: ContractConfig) -> Result<Self, ScenarioError> {
        let client = ImageApiClient::new(&config)?;
        Self::with_client(config, client)
    }

    /// Builds a runner around an existing client.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError::Schema`] when the schemas fail to compile.
    pub fn with_client(config: ContractConfig, client: ImageApiClient) -> Result<Self, ScenarioError> {
        Ok(Self {
            config,
            client,
            schemas: SuiteSchemas::compile()?,
            groups: None,
            reporters: Vec::new(),
        })
    }

    /// Restricts execution to `groups`. An empty selection selects all.
    #[must_use]
    pub fn with_groups<I>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = ScenarioGroup>,
    {
        let selected: BTreeSet<ScenarioGroup> = groups.into_iter().collect();
        self.groups = if selected.is_empty() { None } else { Some(selected) };
        self
    }

    /// Attaches a reporter.
    #[must_use]
    pub fn with_reporter(mut self, reporter: Box<dyn Reporter>) -> Self {
        self.reporters.push(reporter);
        self
    }

    /// Returns the client used for requests.
    #[must_use]
    pub const fn client(&self) -> &ImageApiClient {
        &self.client
    }

    /// Returns the selected scenarios in execution order.
    #[must_use]
    pub fn plan(&self) -> Vec<ScenarioId> {
        plan_for(self.groups.as_ref())
    }

    /// Runs the selected scenarios and returns the aggregated report.
    pub async fn run(&mut self) -> SuiteReport {
        let plan = self.plan();
        let started_at_ms = now_millis();
        let run_started = Instant::now();
        self.notify(|reporter| reporter.suite_started(&plan));

        let mut state = SuiteState::default();
        let mut outcomes = Vec::with_capacity(plan.len());
        for id in plan {
            let span = tracing::info_span!("scenario", scenario = id.as_str(), group = id.group().as_str());
            let outcome = self.run_one(id, &mut state).instrument(span).await;
            self.notify(|reporter| reporter.scenario_finished(&outcome));
            outcomes.push(outcome);
        }

        let report = SuiteReport {
            base_url: self.config.base_url.to_string(),
            started_at_ms,
            duration_ms: millis(run_started.elapsed()),
            outcomes,
            transcript: self.client.transcript(),
        };
        self.notify(|reporter| reporter.suite_finished(&report));
        report
    }

    /// Runs one scenario and classifies its result.
    async fn run_one(&self, id: ScenarioId, state: &mut SuiteState) -> ScenarioOutcome {
        let started = Instant::now();
        let (status, detail) = if id.requires_image() && state.image_id.is_none() {
            (ScenarioStatus::Skipped, Some(SKIP_NO_IMAGE.to_string()))
        } else {
            let ctx = ScenarioContext {
                client: &self.client,
                config: &self.config,
                schemas: &self.schemas,
            };
            match run_scenario(id, ctx, state).await {
                Ok(()) => (ScenarioStatus::Passed, None),
                Err(err) => (ScenarioStatus::Failed, Some(err.to_string())),
            }
        };
        ScenarioOutcome {
            scenario: id,
            group: id.group(),
            status,
            detail,
            duration_ms: millis(started.elapsed()),
        }
    }

    /// Invokes `event` on every reporter, logging failures.
    fn notify<F>(&mut self, mut event: F)
    where
        F: FnMut(&mut Box<dyn Reporter>) -> Result<(), ReportError>,
    {
        for reporter in &mut self.reporters {
            if let Err(err) = event(reporter) {
                tracing::warn!(error = %err, "reporter failed");
            }
        }
    }
}

/// Filters the catalog by group selection.
fn plan_for(groups: Option<&BTreeSet<ScenarioGroup>>) -> Vec<ScenarioId> {
    ScenarioId::ALL
        .into_iter()
        .filter(|id| groups.is_none_or(|selected| selected.contains(&id.group())))
        .collect()
}

/// Current time in milliseconds since the Unix epoch.
fn now_millis() -> u64 {
    millis(SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default())
}

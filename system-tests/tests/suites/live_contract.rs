// system-tests/tests/suites/live_contract.rs
// ============================================================================
// Module: Live Contract Tests
// Description: Full contract run against the configured image service.
// Purpose: Verify the real service honors every scenario.
// Dependencies: system-tests helpers, cat-api-contract
// ============================================================================

//! ## Overview
//! Loads configuration from the environment exactly as the CLI does, runs the
//! whole catalog, and fails with every failing scenario listed. Relative
//! fixture paths resolve from the workspace root, and the fixture must exist
//! before any request is sent. The run is
//! bounded by the configured per-request timeout times the catalog size.

use std::time::Duration;

use cat_api_contract::ArtifactReporter;
use cat_api_contract::ContractConfig;
use cat_api_contract::LogReporter;
use cat_api_contract::ScenarioId;
use cat_api_contract::ScenarioStatus;
use cat_api_contract::SuiteRunner;
use helpers::artifacts::TestReporter;
use helpers::fixtures::resolve_live_fixture;
use helpers::timeouts::within;

use crate::helpers;

#[tokio::test(flavor = "multi_thread")]
async fn live_service_honors_contract() -> Result<(), Box<dyn std::error::Error>> {
    let mut reporter = TestReporter::new("live_service_honors_contract")?;
    let mut config = ContractConfig::load(None)?;
    resolve_live_fixture(&mut config).await?;
    let budget = config.timeout.saturating_mul(u32::try_from(ScenarioId::ALL.len())?);
    let artifacts = ArtifactReporter::new(reporter.artifacts().contract_dir())?;
    let mut runner = SuiteRunner::new(config)?
        .with_reporter(Box::new(LogReporter))
        .with_reporter(Box::new(artifacts));
    let report = within(budget.max(Duration::from_secs(60)), runner.run()).await?;

    let failures: Vec<String> = report
        .outcomes
        .iter()
        .filter(|outcome| outcome.status != ScenarioStatus::Passed)
        .map(|outcome| {
            format!(
                "{} {}: {}",
                outcome.scenario,
                outcome.status.as_str(),
                outcome.detail.as_deref().unwrap_or_default()
            )
        })
        .collect();
    if !failures.is_empty() {
        reporter.finish("fail", failures.clone())?;
        return Err(failures.join("\n").into());
    }
    reporter.finish("pass", vec![format!("{} scenarios passed", report.outcomes.len())])?;
    Ok(())
}

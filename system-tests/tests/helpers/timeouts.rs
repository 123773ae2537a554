// system-tests/tests/helpers/timeouts.rs
// ============================================================================
// Module: System Test Timeouts
// Description: Centralized timeout configuration with env overrides.
// Purpose: Keep system-test timeouts consistent and configurable across suites.
// ============================================================================

use std::future::Future;
use std::time::Duration;

use system_tests::config::SystemTestConfig;

/// Returns the effective timeout, honoring `CAT_API_SYSTEM_TEST_TIMEOUT_SEC` when set.
/// The override acts as a minimum to avoid shortening explicitly longer test timeouts.
pub fn resolve_timeout(requested: Duration) -> Result<Duration, String> {
    let config = SystemTestConfig::load()?;
    Ok(config.timeout.map_or(requested, |minimum| requested.max(minimum)))
}

/// Awaits `future`, failing when it outlives the resolved timeout.
pub async fn within<F: Future>(requested: Duration, future: F) -> Result<F::Output, String> {
    let limit = resolve_timeout(requested)?;
    tokio::time::timeout(limit, future)
        .await
        .map_err(|_| format!("operation exceeded {} ms", limit.as_millis()))
}

// system-tests/tests/helpers/fixtures.rs
// ============================================================================
// Module: Upload Fixtures
// Description: Workspace-anchored locations of upload images.
// Purpose: Keep fixture resolution independent of the test working directory.
// Dependencies: cat-api-contract
// ============================================================================

//! ## Overview
//! Cargo runs integration tests from the package root, so relative fixture
//! paths are resolved against the workspace root instead.

use std::path::PathBuf;

use cat_api_contract::ContractConfig;
use cat_api_contract::Fixture;

/// Synthetic JPEG accepted by the stub. The real service rejects it.
pub const STUB_FIXTURE: &str = "fixtures/stub-upload.jpg";

/// Returns the workspace root.
pub fn workspace_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("..")
}

/// Returns the absolute path of the stub upload image.
pub fn stub_fixture_path() -> PathBuf {
    workspace_root().join(STUB_FIXTURE)
}

/// Anchors the configured fixture on the workspace root and checks it loads.
pub async fn resolve_live_fixture(config: &mut ContractConfig) -> Result<(), String> {
    config.anchor_fixture(&workspace_root());
    Fixture::load(&config.fixture_path).await.map(|_| ()).map_err(|err| {
        format!(
            "{err}; live runs upload a real cat photo: place one at {} or set CAT_API_FIXTURE",
            config.fixture_path.display()
        )
    })
}

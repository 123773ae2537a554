// system-tests/tests/helpers/mod.rs
// ============================================================================
// Module: System Test Helpers
// Description: Shared helpers for contract system-tests.
// Purpose: Provide the image API stub, fixtures, artifact utilities, and timeouts.
// Dependencies: system-tests, cat-api-contract, axum
// ============================================================================

//! ## Overview
//! Shared helpers for contract system-tests.
//! Invariants:
//! - Stub servers bind loopback ephemeral ports and shut down on drop.
//! - Artifacts are written with canonical JSON.

#![allow(dead_code, reason = "Shared helpers are reused across multiple test suites.")]

pub mod artifacts;
pub mod fixtures;
pub mod image_api_stub;
pub mod timeouts;

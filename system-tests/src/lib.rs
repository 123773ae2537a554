// system-tests/src/lib.rs
// ============================================================================
// Module: Cat API Contract System Tests Library
// Description: Shared configuration for end-to-end contract suites.
// Purpose: Provide common settings for the system-test binaries.
// Dependencies: std
// ============================================================================

//! ## Overview
//! This crate hosts shared configuration used by the contract system-test
//! binaries in `system-tests/tests`. The stub suite runs the full scenario
//! catalog against an in-process image API; the live suite targets the real
//! service and requires `CAT_API_KEY`.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

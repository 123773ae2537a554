// crates/cat-api-contract/src/lib.rs
// ============================================================================
// Module: Cat API Contract Library
// Description: Contract checks for a remote image-hosting HTTP API.
// Purpose: Provide configuration, client, expectations, and the scenario suite.
// Dependencies: reqwest, jsonschema, regex, serde, thiserror, tokio, tracing
// ============================================================================

//! ## Overview
//! This crate validates the observable behavior of The Cat API image
//! endpoints: upload, lookup, listing, deletion, pagination, filtering, and
//! latency. Scenarios run strictly in catalog order through
//! [`SuiteRunner`], sharing one [`ImageApiClient`] and the id of the image
//! uploaded by the first scenario.
//!
//! Security posture: the API key is loaded from the environment only, is never
//! logged, and configuration fails closed when it is absent.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod client;
pub mod config;
pub mod expect;
pub mod fixture;
pub mod matcher;
pub mod report;
pub mod runner;
pub mod scenarios;
pub mod schema;

// ============================================================================
// SECTION: Re-exports
// ============================================================================

pub use client::ApiResponse;
pub use client::ClientError;
pub use client::ImageApiClient;
pub use client::ImageId;
pub use client::ListQuery;
pub use client::TranscriptEntry;
pub use config::ApiKey;
pub use config::ConfigError;
pub use config::ContractConfig;
pub use config::ContractEnv;
pub use expect::AssertionError;
pub use expect::Expectations;
pub use fixture::Fixture;
pub use fixture::FixtureError;
pub use matcher::JsonPattern;
pub use matcher::PatternError;
pub use report::ArtifactReporter;
pub use report::LogReporter;
pub use report::ReportError;
pub use report::Reporter;
pub use runner::ScenarioOutcome;
pub use runner::ScenarioStatus;
pub use runner::SuiteReport;
pub use runner::SuiteRunner;
pub use scenarios::ScenarioError;
pub use scenarios::ScenarioGroup;
pub use scenarios::ScenarioId;
pub use scenarios::SuiteState;

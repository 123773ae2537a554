// crates/cat-api-contract/src/scenarios.rs
// ============================================================================
// Module: Scenario Catalog
// Description: Ordered contract scenarios for the image API.
// Purpose: Define each scenario's request and expectations in one place.
// Dependencies: reqwest, serde, serde_json, thiserror, tracing
// ============================================================================

//! ## Overview
//! Scenarios are identified by [`ScenarioId`] and grouped by
//! [`ScenarioGroup`]. [`ScenarioId::ALL`] is the canonical execution order:
//! the upload scenario stores the new image id in [`SuiteState`], and the
//! lookup and deletion scenarios consume it. Reordering the catalog changes
//! what later scenarios observe.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::client::ApiResponse;
use crate::client::ClientError;
use crate::client::ImageApiClient;
use crate::client::ImageId;
use crate::client::ListQuery;
use crate::config::ContractConfig;
use crate::expect::AssertionError;
use crate::expect::Expectations;
use crate::fixture::Fixture;
use crate::fixture::FixtureError;
use crate::matcher::JsonPattern;
use crate::matcher::PatternError;
use crate::schema::CompiledSchema;
use crate::schema::image_list_schema;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Shape of ids returned by upload.
const UPLOAD_ID_PATTERN: &str = r"^[a-zA-Z0-9]+$";
/// Shape of ids returned by listing (listing ids may contain dashes).
const LIST_ID_PATTERN: &str = r"^[a-zA-Z0-9-]+$";
/// Absolute HTTP(S) URL prefix.
const URL_PATTERN: &str = r"^https?://";
/// An id the service never assigns.
pub const UNKNOWN_IMAGE_ID: &str = "id_inexistente";
/// Body message returned by a successful delete.
const DELETE_SUCCESS_MESSAGE: &str = "SUCCESS";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Reasons a scenario did not pass.
#[derive(Debug, Error)]
pub enum ScenarioError {
    /// The upload fixture could not be loaded.
    #[error(transparent)]
    Fixture(#[from] FixtureError),
    /// The request did not complete.
    #[error(transparent)]
    Client(#[from] ClientError),
    /// A scenario pattern failed to compile.
    #[error(transparent)]
    Pattern(#[from] PatternError),
    /// A response schema failed to compile.
    #[error("schema compilation failed: {0}")]
    Schema(String),
    /// The response violated an expectation.
    #[error(transparent)]
    Assertion(#[from] AssertionError),
    /// The upload response carried no usable id.
    #[error("upload response has no non-empty string id")]
    MissingImageId,
}

// ============================================================================
// SECTION: Groups
// ============================================================================

/// Scenario groups in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioGroup {
    /// Image upload.
    Upload,
    /// Lookup by id.
    FetchById,
    /// Listing.
    Listing,
    /// Deletion.
    Deletion,
    /// Lookup after deletion.
    DeletedLookup,
    /// Response headers.
    Headers,
    /// Pagination parameters.
    Pagination,
    /// Listing filters.
    Filters,
    /// Listing latency.
    Performance,
}

impl ScenarioGroup {
    /// All groups in execution order.
    pub const ALL: [Self; 9] = [
        Self::Upload,
        Self::FetchById,
        Self::Listing,
        Self::Deletion,
        Self::DeletedLookup,
        Self::Headers,
        Self::Pagination,
        Self::Filters,
        Self::Performance,
    ];

    /// Stable slug.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Upload => "upload",
            Self::FetchById => "fetch_by_id",
            Self::Listing => "listing",
            Self::Deletion => "deletion",
            Self::DeletedLookup => "deleted_lookup",
            Self::Headers => "headers",
            Self::Pagination => "pagination",
            Self::Filters => "filters",
            Self::Performance => "performance",
        }
    }

    /// Human-readable, numbered title.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Upload => "1. Image upload",
            Self::FetchById => "2. Image lookup by id",
            Self::Listing => "3. Image listing",
            Self::Deletion => "4. Image deletion",
            Self::DeletedLookup => "5. Deleted image lookup",
            Self::Headers => "6. Response headers",
            Self::Pagination => "7. Pagination",
            Self::Filters => "8. Filters",
            Self::Performance => "9. Performance",
        }
    }
}

impl fmt::Display for ScenarioGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScenarioGroup {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL.into_iter().find(|group| group.as_str() == normalized).ok_or_else(|| {
            let known: Vec<&str> = Self::ALL.iter().map(|group| group.as_str()).collect();
            format!("unknown scenario group {raw}; expected one of {}", known.join(", "))
        })
    }
}

// ============================================================================
// SECTION: Scenario Identifiers
// ============================================================================

/// Scenario identifiers in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioId {
    /// Upload the fixture and store its id.
    UploadValidImage,
    /// Upload with no file attached.
    UploadWithoutFile,
    /// Fetch the uploaded image.
    GetUploadedImage,
    /// Fetch an id that does not exist.
    GetUnknownImage,
    /// List images and validate their shape.
    ListImages,
    /// Delete the uploaded image.
    DeleteUploadedImage,
    /// Delete the uploaded image again.
    DeleteDeletedImage,
    /// Fetch the deleted image.
    GetDeletedImage,
    /// Check the listing content type.
    ListContentType,
    /// List with `page`/`limit`.
    ListPaginated,
    /// List with `mime_types`.
    ListFilteredByMime,
    /// List within the latency budget.
    ListResponseTime,
}

impl ScenarioId {
    /// Canonical execution order.
    pub const ALL: [Self; 12] = [
        Self::UploadValidImage,
        Self::UploadWithoutFile,
        Self::GetUploadedImage,
        Self::GetUnknownImage,
        Self::ListImages,
        Self::DeleteUploadedImage,
        Self::DeleteDeletedImage,
        Self::GetDeletedImage,
        Self::ListContentType,
        Self::ListPaginated,
        Self::ListFilteredByMime,
        Self::ListResponseTime,
    ];

    /// Stable slug.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UploadValidImage => "upload_valid_image",
            Self::UploadWithoutFile => "upload_without_file",
            Self::GetUploadedImage => "get_uploaded_image",
            Self::GetUnknownImage => "get_unknown_image",
            Self::ListImages => "list_images",
            Self::DeleteUploadedImage => "delete_uploaded_image",
            Self::DeleteDeletedImage => "delete_deleted_image",
            Self::GetDeletedImage => "get_deleted_image",
            Self::ListContentType => "list_content_type",
            Self::ListPaginated => "list_paginated",
            Self::ListFilteredByMime => "list_filtered_by_mime",
            Self::ListResponseTime => "list_response_time",
        }
    }

    /// Owning group.
    #[must_use]
    pub const fn group(self) -> ScenarioGroup {
        match self {
            Self::UploadValidImage | Self::UploadWithoutFile => ScenarioGroup::Upload,
            Self::GetUploadedImage | Self::GetUnknownImage => ScenarioGroup::FetchById,
            Self::ListImages => ScenarioGroup::Listing,
            Self::DeleteUploadedImage | Self::DeleteDeletedImage => ScenarioGroup::Deletion,
            Self::GetDeletedImage => ScenarioGroup::DeletedLookup,
            Self::ListContentType => ScenarioGroup::Headers,
            Self::ListPaginated => ScenarioGroup::Pagination,
            Self::ListFilteredByMime => ScenarioGroup::Filters,
            Self::ListResponseTime => ScenarioGroup::Performance,
        }
    }

    /// One-line description of the expected behavior.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::UploadValidImage => "uploads a valid image and returns 201 with id and url",
            Self::UploadWithoutFile => "rejects an upload without a file with 400",
            Self::GetUploadedImage => "returns the uploaded image by id",
            Self::GetUnknownImage => "returns 404 for an unknown id",
            Self::ListImages => "lists images as an array of {id, url}",
            Self::DeleteUploadedImage => "deletes the uploaded image",
            Self::DeleteDeletedImage => "returns 404 when deleting an already deleted image",
            Self::GetDeletedImage => "returns 404 when fetching a deleted image",
            Self::ListContentType => "serves listings as application/json",
            Self::ListPaginated => "accepts page and limit parameters",
            Self::ListFilteredByMime => "accepts a mime_types filter",
            Self::ListResponseTime => "lists images within the latency budget",
        }
    }

    /// Returns true when the scenario consumes the uploaded image id.
    #[must_use]
    pub const fn requires_image(self) -> bool {
        matches!(
            self,
            Self::GetUploadedImage
                | Self::DeleteUploadedImage
                | Self::DeleteDeletedImage
                | Self::GetDeletedImage
        )
    }
}

impl fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Execution Context
// ============================================================================

/// State threaded between scenarios of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuiteState {
    /// Id of the image uploaded by [`ScenarioId::UploadValidImage`].
    pub image_id: Option<ImageId>,
}

/// Schemas compiled once per run.
#[derive(Debug, Clone)]
pub struct SuiteSchemas {
    /// Listing response schema.
    pub image_list: CompiledSchema,
}

impl SuiteSchemas {
    /// Compiles the response schemas.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError::Schema`] when a schema fails to compile.
    pub fn compile() -> Result<Self, ScenarioError> {
        Ok(Self {
            image_list: CompiledSchema::compile(&image_list_schema())
                .map_err(ScenarioError::Schema)?,
        })
    }
}

/// Shared, read-only inputs for scenario execution.
#[derive(Debug, Clone, Copy)]
pub struct ScenarioContext<'a> {
    /// Authenticated client.
    pub client: &'a ImageApiClient,
    /// Run configuration.
    pub config: &'a ContractConfig,
    /// Compiled schemas.
    pub schemas: &'a SuiteSchemas,
}

// ============================================================================
// SECTION: Dispatch
// ============================================================================

/// Runs one scenario.
///
/// Callers are responsible for skipping scenarios whose
/// [`ScenarioId::requires_image`] precondition is unmet; when invoked without
/// an id such scenarios target an empty id and fail on the response.
///
/// # Errors
///
/// Returns [`ScenarioError`] describing the first failure.
pub async fn run_scenario(
    id: ScenarioId,
    ctx: ScenarioContext<'_>,
    state: &mut SuiteState,
) -> Result<(), ScenarioError> {
    let image_id = state.image_id.as_ref().map_or_else(String::new, |id| id.as_str().to_string());
    match id {
        ScenarioId::UploadValidImage => upload_valid_image(ctx, state).await,
        ScenarioId::UploadWithoutFile => upload_without_file(ctx).await,
        ScenarioId::GetUploadedImage => get_uploaded_image(ctx, &image_id).await,
        ScenarioId::GetUnknownImage => {
            expect_status(ctx.client.get_image(UNKNOWN_IMAGE_ID).await?, StatusCode::NOT_FOUND)
        }
        ScenarioId::ListImages => list_images(ctx).await,
        ScenarioId::DeleteUploadedImage => {
            let response = ctx.client.delete_image(&image_id).await?;
            Expectations::new()
                .status(StatusCode::OK)
                .json_like(JsonPattern::object([(
                    "message",
                    JsonPattern::exact(DELETE_SUCCESS_MESSAGE),
                )]))
                .verify(&response)?;
            tracing::info!(image_id = %image_id, "deleted uploaded image");
            Ok(())
        }
        ScenarioId::DeleteDeletedImage => {
            expect_status(ctx.client.delete_image(&image_id).await?, StatusCode::NOT_FOUND)
        }
        ScenarioId::GetDeletedImage => {
            expect_status(ctx.client.get_image(&image_id).await?, StatusCode::NOT_FOUND)
        }
        ScenarioId::ListContentType => {
            let response = ctx.client.list_images(&ListQuery::default()).await?;
            Expectations::new().header_matches("content-type", "application/json")?.verify(&response)?;
            Ok(())
        }
        ScenarioId::ListPaginated => {
            let query = ListQuery {
                page: Some(2),
                limit: Some(5),
                ..ListQuery::default()
            };
            expect_status(ctx.client.list_images(&query).await?, StatusCode::OK)
        }
        ScenarioId::ListFilteredByMime => {
            let query = ListQuery {
                mime_types: vec!["jpg".to_string(), "png".to_string()],
                ..ListQuery::default()
            };
            expect_status(ctx.client.list_images(&query).await?, StatusCode::OK)
        }
        ScenarioId::ListResponseTime => {
            let response = ctx.client.list_images(&ListQuery::default()).await?;
            Expectations::new().response_time_under(ctx.config.latency_budget).verify(&response)?;
            Ok(())
        }
    }
}

// ============================================================================
// SECTION: Scenario Bodies
// ============================================================================

/// Verifies only the status code.
fn expect_status(
    response: ApiResponse,
    status: StatusCode,
) -> Result<(), ScenarioError> {
    Expectations::new().status(status).verify(&response)?;
    Ok(())
}

/// Uploads the fixture and stores the returned id.
async fn upload_valid_image(
    ctx: ScenarioContext<'_>,
    state: &mut SuiteState,
) -> Result<(), ScenarioError> {
    let fixture = Fixture::load(&ctx.config.fixture_path).await?;
    let response = ctx.client.upload_image(&fixture).await?;
    Expectations::new()
        .status(StatusCode::CREATED)
        .json_like(JsonPattern::object([
            ("id", JsonPattern::regex(UPLOAD_ID_PATTERN)?),
            ("url", JsonPattern::regex(URL_PATTERN)?),
        ]))
        .verify(&response)?;
    let id = response
        .json()
        .and_then(|body| body.get("id"))
        .and_then(Value::as_str)
        .and_then(|id| ImageId::new(id))
        .ok_or(ScenarioError::MissingImageId)?;
    tracing::info!(image_id = %id, fixture = %fixture.path.display(), "uploaded fixture image");
    state.image_id = Some(id);
    Ok(())
}

/// Posts an upload with no file and checks the error mentions it.
async fn upload_without_file(ctx: ScenarioContext<'_>) -> Result<(), ScenarioError> {
    let response = ctx.client.upload_without_file().await?;
    Expectations::new()
        .status(StatusCode::BAD_REQUEST)
        .body(|body| match &body.json {
            Some(Value::Object(map)) => {
                let message = map.get("message").and_then(Value::as_str).unwrap_or_default();
                if message.to_lowercase().contains("file") {
                    Ok(())
                } else {
                    Err(format!("error message \"{message}\" does not mention file"))
                }
            }
            Some(Value::String(text)) => mentions_required_file(text),
            _ => mentions_required_file(&body.text),
        })
        .verify(&response)?;
    Ok(())
}

/// Checks a plain-text error mentions both `file` and `required`.
fn mentions_required_file(text: &str) -> Result<(), String> {
    let lowered = text.to_lowercase();
    if lowered.contains("file") && lowered.contains("required") {
        Ok(())
    } else {
        Err(format!("error text \"{text}\" does not mention a required file"))
    }
}

/// Fetches the uploaded image and checks the id round-trips.
async fn get_uploaded_image(ctx: ScenarioContext<'_>, image_id: &str) -> Result<(), ScenarioError> {
    let response = ctx.client.get_image(image_id).await?;
    Expectations::new()
        .status(StatusCode::OK)
        .json_like(JsonPattern::object([
            ("id", JsonPattern::exact(image_id)),
            ("url", JsonPattern::regex(URL_PATTERN)?),
        ]))
        .verify(&response)?;
    Ok(())
}

/// Lists images and validates schema and element shape.
async fn list_images(ctx: ScenarioContext<'_>) -> Result<(), ScenarioError> {
    let response = ctx.client.list_images(&ListQuery::default()).await?;
    Expectations::new()
        .status(StatusCode::OK)
        .json_schema(ctx.schemas.image_list.clone())
        .json_like(JsonPattern::array(vec![JsonPattern::object([
            ("id", JsonPattern::regex(LIST_ID_PATTERN)?),
            ("url", JsonPattern::regex(URL_PATTERN)?),
        ])]))
        .verify(&response)?;
    Ok(())
}

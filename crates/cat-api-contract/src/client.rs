// crates/cat-api-contract/src/client.rs
// ============================================================================
// Module: Image API Client
// Description: HTTP client for the image upload, lookup, listing, and delete endpoints.
// Purpose: Issue authenticated requests and capture timed responses with transcripts.
// Dependencies: reqwest, serde, serde_json, thiserror, tracing, url
// ============================================================================

//! ## Overview
//! [`ImageApiClient`] wraps a `reqwest` client configured with the run's
//! timeout. Every request carries the `x-api-key` header. Responses are read
//! in full and returned as [`ApiResponse`] values, including non-success
//! statuses, so scenarios can assert on 4xx codes. Transport failures are
//! surfaced as [`ClientError`] without retries.
//!
//! Each exchange is appended to a transcript. The transcript never contains
//! the API key or request bodies.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::time::Duration;
use std::time::Instant;

use reqwest::Client;
use reqwest::Method;
use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use reqwest::multipart::Form;
use reqwest::multipart::Part;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use url::Url;

use crate::config::ApiKey;
use crate::config::ContractConfig;
use crate::fixture::Fixture;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Header carrying the API credential.
pub const API_KEY_HEADER: &str = "x-api-key";
/// Multipart field name for the uploaded file.
pub const UPLOAD_FIELD: &str = "file";
/// User agent for outbound requests.
const USER_AGENT: &str = concat!("cat-api-contract/", env!("CARGO_PKG_VERSION"));

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Client construction and transport errors.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The underlying HTTP client could not be built.
    #[error("failed to build http client: {0}")]
    Build(String),
    /// An endpoint URL could not be derived from the base URL.
    #[error("invalid endpoint url: {0}")]
    Url(String),
    /// The multipart body could not be assembled.
    #[error("invalid multipart body: {0}")]
    Multipart(String),
    /// The request failed before a response was received.
    #[error("{method} {url} failed: {message}")]
    Transport {
        /// Request method.
        method: Method,
        /// Request URL.
        url: Url,
        /// Transport error message.
        message: String,
        /// Whether the failure was the configured timeout.
        timed_out: bool,
    },
    /// The response body could not be read.
    #[error("{method} {url} body read failed: {message}")]
    Body {
        /// Request method.
        method: Method,
        /// Request URL.
        url: Url,
        /// Read error message.
        message: String,
    },
}

// ============================================================================
// SECTION: Domain Types
// ============================================================================

/// Identifier assigned to an uploaded image by the remote service.
///
/// # Invariants
/// - Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ImageId(String);

impl ImageId {
    /// Wraps a non-empty identifier.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        if value.is_empty() { None } else { Some(Self(value)) }
    }

    /// Returns the identifier text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Query parameters accepted by `GET /images`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    /// Zero-based page index.
    pub page: Option<u32>,
    /// Page size.
    pub limit: Option<u32>,
    /// MIME type filter, sent comma-joined (`jpg,png`).
    pub mime_types: Vec<String>,
}

impl ListQuery {
    /// Returns the query as ordered name/value pairs; unset fields are omitted.
    #[must_use]
    pub fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(page) = self.page {
            pairs.push(("page", page.to_string()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        if !self.mime_types.is_empty() {
            pairs.push(("mime_types", self.mime_types.join(",")));
        }
        pairs
    }
}

/// Response body captured as text, with a JSON view when the text parses.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseBody {
    /// Raw body text.
    pub text: String,
    /// Parsed JSON, when the body is valid JSON.
    pub json: Option<Value>,
}

impl ResponseBody {
    /// Builds a body from raw text.
    #[must_use]
    pub fn from_text(text: String) -> Self {
        let json = if text.trim().is_empty() { None } else { serde_json::from_str(&text).ok() };
        Self {
            text,
            json,
        }
    }
}

/// A completed HTTP exchange.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    /// Request method.
    pub method: Method,
    /// Request URL (without credentials).
    pub url: Url,
    /// Response status.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// Response body.
    pub body: ResponseBody,
    /// Time from send until the body was fully read.
    pub elapsed: Duration,
}

impl ApiResponse {
    /// Returns a header value as text, if present and valid ASCII.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    /// Returns the parsed JSON body, if any.
    #[must_use]
    pub const fn json(&self) -> Option<&Value> {
        self.body.json.as_ref()
    }
}

/// Transcript record for one exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranscriptEntry {
    /// One-based position in the run.
    pub sequence: u64,
    /// Request method.
    pub method: String,
    /// Request URL.
    pub url: String,
    /// Response status, absent on transport failure.
    pub status: Option<u16>,
    /// Elapsed time in milliseconds.
    pub elapsed_ms: u64,
    /// Transport error, if any.
    pub error: Option<String>,
}

/// Request body variants.
enum RequestBody {
    /// No body.
    Empty,
    /// Multipart form.
    Multipart(Form),
}

// ============================================================================
// SECTION: Client
// ============================================================================

/// Authenticated client for the image API.
#[derive(Clone)]
pub struct ImageApiClient {
    /// Base URL that endpoint paths are appended to.
    base_url: Url,
    /// Credential sent on every request.
    api_key: ApiKey,
    /// Underlying HTTP client.
    client: Client,
    /// Shared exchange transcript.
    transcript: Arc<Mutex<Vec<TranscriptEntry>>>,
}

impl ImageApiClient {
    /// Builds a client from the run configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Build`] when the HTTP client cannot be created.
    pub fn new(config: &ContractConfig) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|err| ClientError::Build(err.to_string()))?;
        Ok(Self::with_client(config.base_url.clone(), config.api_key.clone(), client))
    }

    /// Builds a client around an existing `reqwest` client.
    #[must_use]
    pub fn with_client(base_url: Url, api_key: ApiKey, client: Client) -> Self {
        Self {
            base_url,
            api_key,
            client,
            transcript: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Returns the base URL.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Returns a snapshot of the transcript.
    #[must_use]
    pub fn transcript(&self) -> Vec<TranscriptEntry> {
        self.transcript.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// `POST /images/upload` with the fixture as multipart field `file`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] on transport failure.
    pub async fn upload_image(&self, fixture: &Fixture) -> Result<ApiResponse, ClientError> {
        let part = Part::bytes(fixture.bytes.clone())
            .file_name(fixture.file_name.clone())
            .mime_str(fixture.mime)
            .map_err(|err| ClientError::Multipart(err.to_string()))?;
        let form = Form::new().part(UPLOAD_FIELD, part);
        let url = self.endpoint(&["images", "upload"])?;
        self.send(Method::POST, url, RequestBody::Multipart(form)).await
    }

    /// `POST /images/upload` with no file attached.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] on transport failure.
    pub async fn upload_without_file(&self) -> Result<ApiResponse, ClientError> {
        let url = self.endpoint(&["images", "upload"])?;
        self.send(Method::POST, url, RequestBody::Empty).await
    }

    /// `GET /images/{id}`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] on transport failure.
    pub async fn get_image(&self, id: &str) -> Result<ApiResponse, ClientError> {
        let url = self.endpoint(&["images", id])?;
        self.send(Method::GET, url, RequestBody::Empty).await
    }

    /// `GET /images` with optional pagination and filters.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] on transport failure.
    pub async fn list_images(&self, query: &ListQuery) -> Result<ApiResponse, ClientError> {
        let mut url = self.endpoint(&["images"])?;
        let pairs = query.pairs();
        if !pairs.is_empty() {
            url.query_pairs_mut().extend_pairs(pairs);
        }
        self.send(Method::GET, url, RequestBody::Empty).await
    }

    /// `DELETE /images/{id}`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] on transport failure.
    pub async fn delete_image(&self, id: &str) -> Result<ApiResponse, ClientError> {
        let url = self.endpoint(&["images", id])?;
        self.send(Method::DELETE, url, RequestBody::Empty).await
    }

    /// Appends path segments to the base URL, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ClientError::Url(format!("{} cannot be a base", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Sends a request and reads the full response.
    async fn send(
        &self,
        method: Method,
        url: Url,
        body: RequestBody,
    ) -> Result<ApiResponse, ClientError> {
        let mut request = self
            .client
            .request(method.clone(), url.clone())
            .header(API_KEY_HEADER, self.api_key.expose());
        if let RequestBody::Multipart(form) = body {
            request = request.multipart(form);
        }

        let started = Instant::now();
        let response = match request.send().await {
            Ok(response) => response,
            Err(err) => {
                let elapsed = started.elapsed();
                let message = err.to_string();
                tracing::warn!(%method, %url, error = %message, "image api request failed");
                self.record(&method, &url, None, elapsed, Some(message.clone()));
                return Err(ClientError::Transport {
                    method,
                    url,
                    message,
                    timed_out: err.is_timeout(),
                });
            }
        };
        let status = response.status();
        let headers = response.headers().clone();
        let text = match response.text().await {
            Ok(text) => text,
            Err(err) => {
                let message = err.to_string();
                self.record(&method, &url, Some(status), started.elapsed(), Some(message.clone()));
                return Err(ClientError::Body {
                    method,
                    url,
                    message,
                });
            }
        };
        let elapsed = started.elapsed();
        tracing::debug!(
            %method,
            %url,
            status = status.as_u16(),
            elapsed_ms = millis(elapsed),
            "image api exchange"
        );
        self.record(&method, &url, Some(status), elapsed, None);
        Ok(ApiResponse {
            method,
            url,
            status,
            headers,
            body: ResponseBody::from_text(text),
            elapsed,
        })
    }

    /// Appends a transcript entry.
    fn record(
        &self,
        method: &Method,
        url: &Url,
        status: Option<StatusCode>,
        elapsed: Duration,
        error: Option<String>,
    ) {
        let mut guard = self.transcript.lock().unwrap_or_else(PoisonError::into_inner);
        let sequence = u64::try_from(guard.len()).unwrap_or(u64::MAX).saturating_add(1);
        guard.push(TranscriptEntry {
            sequence,
            method: method.to_string(),
            url: url.to_string(),
            status: status.map(|status| status.as_u16()),
            elapsed_ms: millis(elapsed),
            error,
        });
    }
}

impl fmt::Debug for ImageApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageApiClient")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &self.api_key)
            .finish_non_exhaustive()
    }
}

/// Converts a duration to whole milliseconds, saturating.
#[must_use]
pub fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

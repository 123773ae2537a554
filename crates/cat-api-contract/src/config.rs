// crates/cat-api-contract/src/config.rs
// ============================================================================
// Module: Contract Configuration
// Description: Typed configuration for contract runs against the image API.
// Purpose: Merge file settings with strict environment overrides.
// Dependencies: serde, thiserror, toml, url
// ============================================================================

//! ## Overview
//! Configuration is resolved in three layers: built-in defaults, an optional
//! TOML file, then environment variables. The API key is only accepted from
//! the environment and loading fails closed when it is absent. Environment
//! values are parsed with strict UTF-8 enforcement; empty or malformed values
//! are rejected rather than ignored.
//!
//! A relative `fixture` in the TOML file is resolved against the file's
//! directory. Relative paths from the environment, flags, or the default stay
//! relative to the working directory until [`ContractConfig::anchor_fixture`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use url::Url;

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Default base URL of the image API.
pub const DEFAULT_BASE_URL: &str = "https://api.thecatapi.com/v1";
/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Default latency budget for the listing performance scenario.
pub const DEFAULT_LATENCY_BUDGET: Duration = Duration::from_millis(2_000);
/// Default fixture image uploaded by the suite.
pub const DEFAULT_FIXTURE_PATH: &str = "fixtures/catphoto.jpg";
/// Maximum accepted size of a TOML configuration file.
const MAX_CONFIG_FILE_BYTES: u64 = 64 * 1024;

// ============================================================================
// SECTION: Environment Keys
// ============================================================================

/// Environment keys consulted by [`ContractConfig::load`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractEnv {
    /// API key sent as `x-api-key` (required).
    ApiKey,
    /// Base URL override.
    BaseUrl,
    /// Request timeout override in seconds (positive integer).
    TimeoutSeconds,
    /// Fixture image path override.
    Fixture,
    /// Listing latency budget override in milliseconds (positive integer).
    LatencyBudgetMs,
}

impl ContractEnv {
    /// All environment keys, in documentation order.
    pub const ALL: [Self; 5] =
        [Self::ApiKey, Self::BaseUrl, Self::TimeoutSeconds, Self::Fixture, Self::LatencyBudgetMs];

    /// Returns the canonical environment variable name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ApiKey => "CAT_API_KEY",
            Self::BaseUrl => "CAT_API_BASE_URL",
            Self::TimeoutSeconds => "CAT_API_TIMEOUT_SEC",
            Self::Fixture => "CAT_API_FIXTURE",
            Self::LatencyBudgetMs => "CAT_API_LATENCY_BUDGET_MS",
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No API key was supplied.
    #[error("{} must be set; refusing to run without an API key", ContractEnv::ApiKey.as_str())]
    MissingApiKey,
    /// An environment variable was present but unusable.
    #[error("{name} {reason}")]
    InvalidEnv {
        /// Environment variable name.
        name: &'static str,
        /// Human-readable reason.
        reason: String,
    },
    /// The configuration file could not be read.
    #[error("failed to read config {}: {source}", path.display())]
    Io {
        /// Config file path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The configuration file is larger than allowed.
    #[error("config {} exceeds {MAX_CONFIG_FILE_BYTES} bytes", path.display())]
    TooLarge {
        /// Config file path.
        path: PathBuf,
    },
    /// The configuration file is not valid TOML for the expected model.
    #[error("invalid config {}: {message}", path.display())]
    Parse {
        /// Config file path.
        path: PathBuf,
        /// Parser message.
        message: String,
    },
    /// The base URL is malformed or disallowed.
    #[error("invalid base url: {0}")]
    InvalidBaseUrl(String),
    /// A numeric or path setting failed validation.
    #[error("invalid {field}: {reason}")]
    InvalidValue {
        /// Setting name.
        field: &'static str,
        /// Human-readable reason.
        reason: String,
    },
}

// ============================================================================
// SECTION: API Key
// ============================================================================

/// API credential attached to every request.
///
/// # Invariants
/// - The value is non-empty.
/// - `Debug` and `Display` never print the value.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Wraps a credential string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingApiKey`] when the value is blank.
    pub fn new(value: impl Into<String>) -> Result<Self, ConfigError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(ConfigError::MissingApiKey);
        }
        Ok(Self(value))
    }

    /// Returns the raw credential for use in request headers.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(<redacted>)")
    }
}

impl fmt::Display for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}

// ============================================================================
// SECTION: File Model
// ============================================================================

/// On-disk TOML settings. The API key is intentionally absent.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    /// Base URL of the API.
    base_url: Option<String>,
    /// Request timeout in seconds.
    timeout_secs: Option<u64>,
    /// Fixture image path.
    fixture: Option<PathBuf>,
    /// Listing latency budget in milliseconds.
    latency_budget_ms: Option<u64>,
}

/// Explicit overrides applied after file and environment layers (CLI flags).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    /// Base URL override.
    pub base_url: Option<String>,
    /// Fixture path override.
    pub fixture: Option<PathBuf>,
    /// Timeout override in seconds.
    pub timeout_secs: Option<u64>,
    /// Latency budget override in milliseconds.
    pub latency_budget_ms: Option<u64>,
}

// ============================================================================
// SECTION: Config Types
// ============================================================================

/// Effective configuration for a contract run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractConfig {
    /// Base URL; endpoint paths are appended to it.
    pub base_url: Url,
    /// Credential sent as `x-api-key`.
    pub api_key: ApiKey,
    /// Timeout applied to every request.
    pub timeout: Duration,
    /// Image uploaded by the upload scenario.
    pub fixture_path: PathBuf,
    /// Maximum accepted latency for the listing performance scenario.
    pub latency_budget: Duration,
}

impl ContractConfig {
    /// Builds a configuration with defaults for everything but URL and key.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidBaseUrl`] when `base_url` is rejected.
    pub fn new(base_url: &str, api_key: ApiKey) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: parse_base_url(base_url)?,
            api_key,
            timeout: DEFAULT_TIMEOUT,
            fixture_path: PathBuf::from(DEFAULT_FIXTURE_PATH),
            latency_budget: DEFAULT_LATENCY_BUDGET,
        })
    }

    /// Loads configuration from an optional TOML file and the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file is unreadable or invalid, an
    /// environment value is malformed, or the API key is missing.
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with(file, read_env_strict)
    }

    /// Loads configuration using `lookup` in place of the process environment.
    ///
    /// # Errors
    ///
    /// Same as [`ContractConfig::load`].
    pub fn load_with<F>(file: Option<&Path>, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Result<Option<String>, ConfigError>,
    {
        let file = match file {
            Some(path) => {
                let mut parsed = read_config_file(path)?;
                let dir = path.parent().unwrap_or_else(|| Path::new(""));
                parsed.fixture = parsed.fixture.map(|fixture| dir.join(fixture));
                parsed
            }
            None => ConfigFile::default(),
        };
        let read = |key: ContractEnv| read_nonempty(&lookup, key.as_str());

        let api_key = read(ContractEnv::ApiKey)?.ok_or(ConfigError::MissingApiKey)?;
        let base_url = read(ContractEnv::BaseUrl)?
            .or(file.base_url)
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let timeout = match read(ContractEnv::TimeoutSeconds)? {
            Some(raw) => Duration::from_secs(parse_positive(ContractEnv::TimeoutSeconds, &raw)?),
            None => file
                .timeout_secs
                .map(|secs| positive_field("timeout_secs", secs).map(Duration::from_secs))
                .transpose()?
                .unwrap_or(DEFAULT_TIMEOUT),
        };
        let latency_budget = match read(ContractEnv::LatencyBudgetMs)? {
            Some(raw) => {
                Duration::from_millis(parse_positive(ContractEnv::LatencyBudgetMs, &raw)?)
            }
            None => file
                .latency_budget_ms
                .map(|ms| positive_field("latency_budget_ms", ms).map(Duration::from_millis))
                .transpose()?
                .unwrap_or(DEFAULT_LATENCY_BUDGET),
        };
        let fixture_path = read(ContractEnv::Fixture)?
            .map(PathBuf::from)
            .or(file.fixture)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_FIXTURE_PATH));

        Ok(Self {
            base_url: parse_base_url(&base_url)?,
            api_key: ApiKey::new(api_key)?,
            timeout,
            fixture_path,
            latency_budget,
        })
    }

    /// Applies explicit overrides on top of the loaded values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when an override fails validation.
    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) -> Result<(), ConfigError> {
        if let Some(base_url) = overrides.base_url {
            self.base_url = parse_base_url(&base_url)?;
        }
        if let Some(fixture) = overrides.fixture {
            self.fixture_path = fixture;
        }
        if let Some(secs) = overrides.timeout_secs {
            self.timeout = Duration::from_secs(positive_field("timeout_secs", secs)?);
        }
        if let Some(ms) = overrides.latency_budget_ms {
            self.latency_budget = Duration::from_millis(positive_field("latency_budget_ms", ms)?);
        }
        Ok(())
    }

    /// Resolves a relative fixture path against `root`. Absolute paths are kept.
    pub fn anchor_fixture(&mut self, root: &Path) {
        if self.fixture_path.is_relative() {
            self.fixture_path = root.join(&self.fixture_path);
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Reads an environment variable and enforces UTF-8 validity.
///
/// # Errors
///
/// Returns an error when the environment variable contains invalid UTF-8.
pub fn read_env_strict(name: &'static str) -> Result<Option<String>, ConfigError> {
    std::env::var_os(name).map_or(Ok(None), |raw| {
        raw.into_string().map(Some).map_err(|_| ConfigError::InvalidEnv {
            name,
            reason: "must be valid UTF-8".to_string(),
        })
    })
}

/// Reads a value through `lookup` and rejects blank values.
fn read_nonempty<F>(lookup: &F, name: &'static str) -> Result<Option<String>, ConfigError>
where
    F: Fn(&'static str) -> Result<Option<String>, ConfigError>,
{
    match lookup(name)? {
        Some(value) if value.trim().is_empty() => Err(ConfigError::InvalidEnv {
            name,
            reason: "must not be empty".to_string(),
        }),
        Some(value) => Ok(Some(value.trim().to_string())),
        None => Ok(None),
    }
}

/// Parses a positive integer from an environment value.
fn parse_positive(key: ContractEnv, raw: &str) -> Result<u64, ConfigError> {
    let value: u64 = raw.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        name: key.as_str(),
        reason: "must be a positive integer".to_string(),
    })?;
    if value == 0 {
        return Err(ConfigError::InvalidEnv {
            name: key.as_str(),
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(value)
}

/// Rejects zero for a numeric setting.
fn positive_field(field: &'static str, value: u64) -> Result<u64, ConfigError> {
    if value == 0 {
        return Err(ConfigError::InvalidValue {
            field,
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(value)
}

/// Reads and parses the TOML configuration file.
fn read_config_file(path: &Path) -> Result<ConfigFile, ConfigError> {
    let io_error = |source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    };
    let metadata = fs::metadata(path).map_err(io_error)?;
    if metadata.len() > MAX_CONFIG_FILE_BYTES {
        return Err(ConfigError::TooLarge {
            path: path.to_path_buf(),
        });
    }
    let text = fs::read_to_string(path).map_err(io_error)?;
    toml::from_str(&text).map_err(|err| ConfigError::Parse {
        path: path.to_path_buf(),
        message: err.to_string(),
    })
}

/// Parses and validates the base URL.
///
/// # Errors
///
/// Rejects non-HTTP schemes, embedded credentials, queries, and fragments.
pub fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw.trim()).map_err(|err| ConfigError::InvalidBaseUrl(err.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidBaseUrl(format!("unsupported scheme {}", url.scheme())));
    }
    if !url.username().is_empty() || url.password().is_some() {
        return Err(ConfigError::InvalidBaseUrl("credentials must not be embedded".to_string()));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(ConfigError::InvalidBaseUrl(
            "query and fragment are not allowed".to_string(),
        ));
    }
    if url.cannot_be_a_base() {
        return Err(ConfigError::InvalidBaseUrl("url cannot be a base".to_string()));
    }
    Ok(url)
}

// ============================================================================
// SECTION: Tests
// ============================================================================

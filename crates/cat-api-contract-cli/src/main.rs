// crates/cat-api-contract-cli/src/main.rs
// ============================================================================
// Module: Cat API Contract CLI Entry Point
// Description: Command dispatcher for contract runs and configuration checks.
// Purpose: Run the image API contract suite from the command line.
// Dependencies: cat-api-contract, clap, serde, serde_jcs, thiserror, tokio, tracing
// ============================================================================

//! ## Overview
//! The CLI loads configuration from an optional TOML file, the environment,
//! and flags (in increasing precedence), runs the selected scenario groups,
//! and exits non-zero when any scenario fails. Logs go to stderr; command
//! output goes to stdout.
//!
//! Security posture: the API key is read from `CAT_API_KEY` only and is never
//! printed.

// ============================================================================
// SECTION: Modules
// ============================================================================


// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use cat_api_contract::ArtifactReporter;
use cat_api_contract::ContractConfig;
use cat_api_contract::ContractEnv;
use cat_api_contract::LogReporter;
use cat_api_contract::ScenarioGroup;
use cat_api_contract::ScenarioId;
use cat_api_contract::ScenarioStatus;
use cat_api_contract::SuiteReport;
use cat_api_contract::SuiteRunner;
use cat_api_contract::client::millis;
use cat_api_contract::config::ConfigOverrides;
use clap::ArgAction;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use serde::Serialize;
use thiserror::Error;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "cat-api-contract", version, about = "Contract checks for The Cat API image endpoints")]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace). `RUST_LOG` takes priority.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the contract suite against the configured service.
    Run(RunCommand),
    /// Print the ordered scenario plan without running it.
    Scenarios(ScenariosCommand),
    /// Validate configuration and print the effective values.
    CheckConfig(CheckConfigCommand),
}

/// Configuration inputs shared by commands that load configuration.
#[derive(Args, Debug, Clone, Default)]
struct ConfigArgs {
    /// Optional TOML configuration file.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Base URL override.
    #[arg(long, value_name = "URL")]
    base_url: Option<String>,
    /// Fixture image override.
    #[arg(long, value_name = "PATH")]
    fixture: Option<PathBuf>,
    /// Per-request timeout override in seconds.
    #[arg(long, value_name = "N")]
    timeout_secs: Option<u64>,
    /// Listing latency budget override in milliseconds.
    #[arg(long, value_name = "N")]
    latency_budget_ms: Option<u64>,
}

/// Arguments for `run`.
#[derive(Args, Debug)]
struct RunCommand {
    /// Configuration inputs.
    #[command(flatten)]
    config: ConfigArgs,
    /// Restrict the run to these groups (repeatable).
    #[arg(long = "group", value_name = "GROUP")]
    groups: Vec<ScenarioGroup>,
    /// Directory receiving summary and transcript artifacts.
    #[arg(long, value_name = "DIR")]
    report_dir: Option<PathBuf>,
}

/// Arguments for `scenarios`.
#[derive(Args, Debug)]
struct ScenariosCommand {
    /// Restrict the listing to these groups (repeatable).
    #[arg(long = "group", value_name = "GROUP")]
    groups: Vec<ScenarioGroup>,
}

/// Arguments for `check-config`.
#[derive(Args, Debug)]
struct CheckConfigCommand {
    /// Configuration inputs.
    #[command(flatten)]
    config: ConfigArgs,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error carrying a user-facing message.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
async fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose, std::env::var_os("RUST_LOG").is_some());
    match cli.command {
        Commands::Run(command) => command_run(command).await,
        Commands::Scenarios(command) => command_scenarios(&command),
        Commands::CheckConfig(command) => command_check_config(&command),
    }
}

/// Installs the stderr log subscriber.
fn init_logging(verbose: u8, rust_log_set: bool) {
    let filter = if rust_log_set {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::new(default_filter(verbose))
    };
    tracing_subscriber::registry().with(fmt::layer().with_writer(std::io::stderr)).with(filter).init();
}

/// Maps `-v` counts to a filter directive.
const fn default_filter(verbose: u8) -> &'static str {
    match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

// ============================================================================
// SECTION: Commands
// ============================================================================

/// Runs the suite and maps the outcome to an exit code.
async fn command_run(command: RunCommand) -> CliResult<ExitCode> {
    let config = load_config(&command.config)?;
    tracing::info!(base_url = %config.base_url, fixture = %config.fixture_path.display(), "loaded configuration");

    let mut runner = SuiteRunner::new(config)
        .map_err(|err| CliError::new(format!("failed to initialize suite: {err}")))?
        .with_groups(command.groups)
        .with_reporter(Box::new(LogReporter));
    if let Some(dir) = command.report_dir {
        let reporter = ArtifactReporter::new(dir)
            .map_err(|err| CliError::new(format!("failed to prepare report directory: {err}")))?;
        runner = runner.with_reporter(Box::new(reporter));
    }

    let report = runner.run().await;
    write_stdout_line(&summary_line(&report))?;
    for outcome in report.outcomes.iter().filter(|outcome| outcome.status == ScenarioStatus::Failed) {
        write_stdout_line(&format!(
            "FAILED {}: {}",
            outcome.scenario,
            outcome.detail.as_deref().unwrap_or_default()
        ))?;
    }
    Ok(if report.passed() { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

/// Prints the ordered scenario plan.
fn command_scenarios(command: &ScenariosCommand) -> CliResult<ExitCode> {
    for line in plan_lines(&command.groups) {
        write_stdout_line(&line)?;
    }
    Ok(ExitCode::SUCCESS)
}

/// Validates configuration and prints the effective values as canonical JSON.
fn command_check_config(command: &CheckConfigCommand) -> CliResult<ExitCode> {
    let config = load_config(&command.config)?;
    let bytes = serde_jcs::to_vec(&ConfigView::from(&config))
        .map_err(|err| CliError::new(format!("failed to render configuration: {err}")))?;
    let text = String::from_utf8(bytes)
        .map_err(|err| CliError::new(format!("failed to render configuration: {err}")))?;
    write_stdout_line(&text)?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Redacted view of the effective configuration.
#[derive(Debug, Serialize)]
struct ConfigView {
    /// Base URL.
    base_url: String,
    /// Always `<redacted>`.
    api_key: String,
    /// Environment variable supplying the key.
    api_key_env: &'static str,
    /// Request timeout in milliseconds.
    timeout_ms: u64,
    /// Fixture path.
    fixture: String,
    /// Listing latency budget in milliseconds.
    latency_budget_ms: u64,
}

impl From<&ContractConfig> for ConfigView {
    fn from(config: &ContractConfig) -> Self {
        Self {
            base_url: config.base_url.to_string(),
            api_key: config.api_key.to_string(),
            api_key_env: ContractEnv::ApiKey.as_str(),
            timeout_ms: millis(config.timeout),
            fixture: config.fixture_path.display().to_string(),
            latency_budget_ms: millis(config.latency_budget),
        }
    }
}

/// Loads file and environment layers, then applies flag overrides.
fn load_config(args: &ConfigArgs) -> CliResult<ContractConfig> {
    let mut config = ContractConfig::load(args.config.as_deref())
        .map_err(|err| CliError::new(format!("invalid configuration: {err}")))?;
    config
        .apply_overrides(overrides(args))
        .map_err(|err| CliError::new(format!("invalid configuration: {err}")))?;
    Ok(config)
}

/// Extracts flag overrides.
fn overrides(args: &ConfigArgs) -> ConfigOverrides {
    ConfigOverrides {
        base_url: args.base_url.clone(),
        fixture: args.fixture.clone(),
        timeout_secs: args.timeout_secs,
        latency_budget_ms: args.latency_budget_ms,
    }
}

/// Renders the plan as `group<TAB>scenario<TAB>title` lines.
fn plan_lines(groups: &[ScenarioGroup]) -> Vec<String> {
    ScenarioId::ALL
        .into_iter()
        .filter(|id| groups.is_empty() || groups.contains(&id.group()))
        .map(|id| format!("{}\t{}\t{}", id.group(), id, id.title()))
        .collect()
}

/// One-line totals for a finished run.
fn summary_line(report: &SuiteReport) -> String {
    format!(
        "{} passed, {} failed, {} skipped ({} ms)",
        report.count(ScenarioStatus::Passed),
        report.count(ScenarioStatus::Failed),
        report.count(ScenarioStatus::Skipped),
        report.duration_ms
    )
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> CliResult<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
        .map_err(|err| CliError::new(format!("failed to write to stdout: {err}")))
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}

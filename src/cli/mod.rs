//! CLI module for the casework harness
//!
//! ## Commands
//!
//! - `run` - Run the built-in self-check suites (default when no subcommand is given)
//! - `list` - Print the discovered units without running them
//!
//! ## Design
//!
//! The CLI uses clap for argument parsing with derive macros.
//! Command functions return `CliResult<T>` instead of calling `process::exit`.
//! Only the top-level `run()` function handles errors and exits, either directly or through
//! [`TestRunner::run_all_and_exit`].

#![deny(clippy::expect_used)]

pub mod selfcheck;

use std::fmt;
use std::process;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::config::HarnessConfig;
use crate::runner::TestRunner;

// ============================================================================
// CLI Error handling
// ============================================================================

/// Exit code for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(pub i32);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);
    /// clap's own code for usage errors
    pub const USAGE: ExitCode = ExitCode(2);
}

/// Error type for CLI operations.
///
/// Contains a user-facing message and an exit code. The CLI entry point
/// catches these errors, prints the message, and exits with the code.
#[derive(Debug)]
pub struct CliError {
    /// User-facing error message (already formatted for display)
    pub message: String,
    /// Exit code to return to the shell
    pub exit_code: ExitCode,
}

impl CliError {
    pub fn new(message: impl Into<String>, exit_code: ExitCode) -> Self {
        Self {
            message: message.into(),
            exit_code,
        }
    }

    /// Create a usage error (exit code 2).
    pub fn usage(message: impl Into<String>) -> Self {
        Self::new(message, ExitCode::USAGE)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

const VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// Clap CLI definition
// ============================================================================

/// Minimal test-execution harness
#[derive(Parser, Debug)]
#[command(name = "casework")]
#[command(version = VERSION)]
#[command(about = "Run the casework self-check suites", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub options: RunOptions,
}

/// Overrides applied on top of the `CASEWORK_*` environment configuration.
#[derive(Args, Debug, Default, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Milliseconds handed to the run loop between expectation checks
    #[arg(long = "poll-interval-ms", value_name = "MS", global = true)]
    pub poll_interval_ms: Option<u64>,

    /// Runs per `measure` call
    #[arg(long = "measure-iterations", value_name = "N", global = true)]
    pub measure_iterations: Option<usize>,

    /// Exit with status 1 when any failure is reported
    #[arg(long, global = true)]
    pub strict: bool,

    /// Suppress progress narration
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run every self-check unit
    Run,
    /// List the self-check units in discovery order
    List,
}

// ============================================================================
// CLI entry point
// ============================================================================

/// Main CLI entry point.
///
/// This is the only place where the process exits on error. A successful `run` ends inside
/// [`TestRunner::run_all_and_exit`].
pub fn run() {
    let cli = Cli::parse();

    match execute(cli) {
        Ok(exit_code) => {
            if exit_code != ExitCode::SUCCESS {
                process::exit(exit_code.0);
            }
        }
        Err(e) => {
            if !e.message.is_empty() {
                eprintln!("{}", e.message);
            }
            process::exit(e.exit_code.0);
        }
    }
}

/// Execute the CLI command and return result.
fn execute(cli: Cli) -> CliResult<ExitCode> {
    let config = resolve_config(HarnessConfig::from_env(), &cli.options)?;

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => {
            tracing::debug!(?config, "running self-check suites");
            TestRunner::with_config(selfcheck::registry(), config).run_all_and_exit()
        }
        Command::List => {
            for unit in selfcheck::registry().discover() {
                println!("{unit}");
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Apply flag overrides to the environment configuration.
fn resolve_config(
    from_env: Result<HarnessConfig, crate::config::ConfigError>,
    options: &RunOptions,
) -> CliResult<HarnessConfig> {
    let mut config = from_env.map_err(|e| CliError::usage(format!("Error: {e}")))?;

    if let Some(ms) = options.poll_interval_ms {
        if ms == 0 {
            return Err(CliError::usage("Error: --poll-interval-ms must be greater than zero"));
        }
        config = config.with_poll_interval(Duration::from_millis(ms));
    }
    if let Some(iterations) = options.measure_iterations {
        if iterations == 0 {
            return Err(CliError::usage("Error: --measure-iterations must be greater than zero"));
        }
        config = config.with_measure_iterations(iterations);
    }
    if options.strict {
        config = config.with_strict_exit(true);
    }
    if options.quiet {
        config = config.with_quiet(true);
    }
    Ok(config)
}

// ============================================================================
// Tests
// ============================================================================

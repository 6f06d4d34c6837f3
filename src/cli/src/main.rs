//! Jobwire CLI - inspect and normalize job definitions.
//!
//! Provides commands for normalizing definitions, extracting trigger
//! arguments, loading configured jobs and Latin-1 coercion.

mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use jobwire_core::error::{ErrorResponse, JobwireError};
use jobwire_core::telemetry::{init_logging, LogFormat, LoggingConfig};

use commands::{definition, jobs, wsgi};
use output::OutputFormat;

/// Jobwire - job definition toolkit
#[derive(Parser)]
#[command(
    name = "jobwire",
    version = "0.1.0",
    about = "Jobwire - job definition toolkit",
    long_about = "Normalize job definitions, inspect trigger arguments and render configured jobs.",
    propagate_version = true
)]
pub struct Cli {
    /// Output format
    #[arg(short, long, global = true, default_value = "table")]
    output: OutputFormat,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Log filter, e.g. `debug` or `jobwire_core=trace`; overrides a config file's level
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a job definition with dates parsed and legacy triggers flattened
    Normalize(definition::DefinitionArgs),

    /// Split a job definition into trigger kind, trigger arguments and the rest
    TriggerArgs(definition::DefinitionArgs),

    /// Load a configuration file and list the jobs it defines
    Jobs(jobs::JobsArgs),

    /// Latin-1 coercion between text and bytes
    #[command(subcommand)]
    Wsgi(wsgi::WsgiCommands),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    let format = cli.output;
    let log_level = cli.log_level.as_deref();

    // `jobs` installs the logging its configuration file asks for
    if !matches!(cli.command, Commands::Jobs(_)) {
        init_logging(&cli_logging(log_level))?;
    }

    let result = match cli.command {
        Commands::Normalize(args) => definition::normalize(args, format),
        Commands::TriggerArgs(args) => definition::trigger_args(args, format),
        Commands::Jobs(args) => jobs::execute(args, log_level, format),
        Commands::Wsgi(cmd) => wsgi::execute(cmd, format),
    };

    if let Err(e) = result {
        if let Some(response) = error_response(&e) {
            if !matches!(format, OutputFormat::Table) {
                output::print_item(&response, format)?;
            }
        }
        output::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }

    Ok(())
}

/// Logging for commands without a configuration file: warnings and up.
fn cli_logging(level: Option<&str>) -> LoggingConfig {
    LoggingConfig {
        level: "warn".to_string(),
        format: LogFormat::Compact,
        ..LoggingConfig::default()
    }
    .with_level(level)
}

/// Log the jobwire error behind a failed command and build its response body.
fn error_response(error: &anyhow::Error) -> Option<ErrorResponse> {
    let error = error.downcast_ref::<JobwireError>()?;
    error.log();
    Some(ErrorResponse::from(error))
}

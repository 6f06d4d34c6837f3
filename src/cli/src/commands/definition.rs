//! Job definition commands.
//!
//! Definitions are read from JSON (`.json`) or YAML files.

use anyhow::{Context, Result};
use clap::Args;
use jobwire_core::definition::fix_job_def;
use jobwire_core::trigger::pop_trigger;
use jobwire_core::value::Mapping;
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::output::{self, OutputFormat};

#[derive(Args)]
pub struct DefinitionArgs {
    /// Path to a JSON or YAML job definition
    file: PathBuf,
}

/// Read a definition file, choosing the parser by extension.
pub fn read_definition(path: &Path) -> Result<Mapping> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    let definition = if is_json {
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {} as JSON", path.display()))?
    } else {
        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse {} as YAML", path.display()))?
    };
    Ok(definition)
}

pub fn normalize(args: DefinitionArgs, format: OutputFormat) -> Result<()> {
    let definition = fix_job_def(read_definition(&args.file)?)?;
    output::print_mapping("Normalized definition", &definition, format)
}

#[derive(Serialize)]
struct TriggerArgsOutput {
    trigger: String,
    args: Mapping,
    remaining: Mapping,
}

pub fn trigger_args(args: DefinitionArgs, format: OutputFormat) -> Result<()> {
    let definition = fix_job_def(read_definition(&args.file)?)?;
    let popped = pop_trigger(definition)?;

    match format {
        OutputFormat::Table => {
            output::print_header("Trigger");
            output::print_detail("kind", popped.kind.as_str());
            output::print_mapping("Trigger arguments", &popped.args, format)?;
            output::print_mapping("Remaining keys", &popped.remaining, format)
        }
        _ => output::print_item(
            &TriggerArgsOutput {
                trigger: popped.kind.to_string(),
                args: popped.args,
                remaining: popped.remaining,
            },
            format,
        ),
    }
}

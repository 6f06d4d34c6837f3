//! List the jobs a configuration file defines.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Args;
use jobwire_core::config::SchedulerConfig;
use jobwire_core::job::Job;
use jobwire_core::telemetry::{init_logging, LoggingConfig};
use std::path::PathBuf;
use tabled::Tabled;

use crate::output::{self, OutputFormat};

#[derive(Args)]
pub struct JobsArgs {
    /// Configuration file (TOML, YAML or JSON)
    config: PathBuf,
}

#[derive(Tabled)]
struct JobRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Func")]
    func: String,
    #[tabled(rename = "Trigger")]
    trigger: String,
    #[tabled(rename = "Max Instances")]
    max_instances: u32,
}

impl From<&Job> for JobRow {
    fn from(job: &Job) -> Self {
        Self {
            id: job.id.to_string(),
            name: job.name.clone(),
            func: job.func.clone(),
            trigger: job.trigger.to_string(),
            max_instances: job.max_instances,
        }
    }
}

/// Load the file, install its logging settings, then list its jobs.
///
/// `log_level` replaces the file's global level when given.
pub fn execute(args: JobsArgs, log_level: Option<&str>, format: OutputFormat) -> Result<()> {
    let loaded = SchedulerConfig::from_file(&args.config);
    let logging = match &loaded {
        Ok(config) => config.logging.clone(),
        Err(_) => LoggingConfig::default(),
    };
    init_logging(&logging.with_level(log_level))?;

    let config = loaded.with_context(|| format!("Failed to load {}", args.config.display()))?;
    let jobs = config.build_jobs(Utc::now())?;

    match format {
        OutputFormat::Table => {
            let rows: Vec<JobRow> = jobs.iter().map(JobRow::from).collect();
            output::print_table(&rows, "No jobs defined.");
            Ok(())
        }
        _ => output::print_item(&jobs, format),
    }
}

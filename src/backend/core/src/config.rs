//! Configuration management.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::path::Path;
use tracing::info;

use crate::definition::build_job;
use crate::error::Result;
use crate::job::{Job, JobDefaults};
use crate::telemetry::LoggingConfig;
use crate::value::Mapping;

/// Prefix of environment variables overriding file settings.
pub const ENV_PREFIX: &str = "JOBWIRE";

/// Scheduler-facing configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SchedulerConfig {
    /// Timezone name attached to triggers that do not set one
    #[serde(default)]
    pub timezone: Option<String>,

    /// Metadata applied to every configured job
    #[serde(default)]
    pub job_defaults: JobDefaults,

    /// Job definitions, in the same shape the JSON API accepts
    #[serde(default)]
    pub jobs: Vec<Mapping>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl SchedulerConfig {
    /// Load configuration from environment variables only.
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// Load from a file, with environment variables taking precedence.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// Turn every configured definition into a pending job.
    pub fn build_jobs(&self, now: DateTime<Utc>) -> Result<Vec<Job>> {
        let mut jobs = Vec::with_capacity(self.jobs.len());
        for definition in &self.jobs {
            let mut definition = definition.clone();
            if let Some(timezone) = &self.timezone {
                if !definition.contains_key("timezone") {
                    definition.insert("timezone".to_string(), timezone.as_str().into());
                }
            }
            jobs.push(build_job(definition, &self.job_defaults, now)?);
        }
        info!(count = jobs.len(), "Loaded job definitions");
        Ok(jobs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trigger::Trigger;
    use chrono::TimeZone;
    use std::time::Duration;

    #[test]
    fn test_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jobwire.toml");
        std::fs::write(
            &path,
            r#"
timezone = "Europe/Paris"

[job_defaults]
misfire_grace_time = "1m"
max_instances = 2

[[jobs]]
id = "cleanup"
func = "app.jobs:cleanup"
trigger = "interval"
hours = 6

[[jobs]]
id = "digest"
func = "app.jobs:digest"
trigger = { type = "cron", hour = "7", day_of_week = "mon" }
"#,
        )
        .unwrap();

        let config = SchedulerConfig::from_file(&path).unwrap();
        assert_eq!(config.job_defaults.misfire_grace_time, Some(Duration::from_secs(60)));
        assert_eq!(config.jobs.len(), 2);

        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let jobs = config.build_jobs(now).unwrap();
        assert_eq!(jobs[0].max_instances, 2);
        match &jobs[0].trigger {
            Trigger::Interval(interval) => {
                assert_eq!(interval.timezone.as_deref(), Some("Europe/Paris"));
            }
            other => panic!("unexpected trigger {other:?}"),
        }
        assert_eq!(jobs[1].trigger.to_string(), "cron[day_of_week='mon', hour='7']");
    }

    #[test]
    fn test_defaults_without_jobs() {
        let config = SchedulerConfig::default();
        assert!(config.jobs.is_empty());
        assert!(config.build_jobs(Utc::now()).unwrap().is_empty());
    }
}

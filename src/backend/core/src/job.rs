//! Jobs and their flattened mapping form.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::time::Duration;
use tracing::trace;
use uuid::Uuid;

use crate::trigger::Trigger;
use crate::value::{mapping_to_json, Mapping, Value};

// ═══════════════════════════════════════════════════════════════════════════════
// Job Identification
// ═══════════════════════════════════════════════════════════════════════════════

/// Identifier of a scheduled job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// A fresh random id: a v4 UUID as 32 lowercase hex digits.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for JobId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Job Defaults
// ═══════════════════════════════════════════════════════════════════════════════

/// Scheduling metadata applied to jobs that do not set their own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDefaults {
    /// How late a run may start before it is skipped; `None` means no limit
    #[serde(default = "default_misfire_grace_time", with = "humantime_serde")]
    pub misfire_grace_time: Option<Duration>,

    /// Maximum concurrently running instances of one job
    #[serde(default = "default_max_instances")]
    pub max_instances: u32,
}

impl Default for JobDefaults {
    fn default() -> Self {
        Self {
            misfire_grace_time: default_misfire_grace_time(),
            max_instances: default_max_instances(),
        }
    }
}

fn default_misfire_grace_time() -> Option<Duration> {
    Some(Duration::from_secs(1))
}

fn default_max_instances() -> u32 {
    1
}

// ═══════════════════════════════════════════════════════════════════════════════
// Job
// ═══════════════════════════════════════════════════════════════════════════════

/// A scheduled unit of work.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub id: JobId,
    /// Display name
    pub name: String,
    /// Textual reference to the callable, e.g. `package.module:function`
    pub func: String,
    pub args: Vec<Value>,
    pub kwargs: Mapping,
    pub trigger: Trigger,
    pub misfire_grace_time: Option<Duration>,
    pub max_instances: u32,
    /// `None` when the job will never run again (paused or finished)
    pub next_run_time: Option<DateTime<Utc>>,
    /// Not yet handed to a scheduler; next-run metadata is meaningless
    pub pending: bool,
}

impl Job {
    /// A pending job named after its callable, carrying the default metadata.
    pub fn new(id: impl Into<JobId>, func: impl Into<String>, trigger: Trigger) -> Self {
        let func = func.into();
        let defaults = JobDefaults::default();
        Self {
            id: id.into(),
            name: callable_name(&func).to_string(),
            func,
            args: Vec::new(),
            kwargs: Mapping::new(),
            trigger,
            misfire_grace_time: defaults.misfire_grace_time,
            max_instances: defaults.max_instances,
            next_run_time: None,
            pending: true,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_args(mut self, args: Vec<Value>) -> Self {
        self.args = args;
        self
    }

    pub fn with_kwargs(mut self, kwargs: Mapping) -> Self {
        self.kwargs = kwargs;
        self
    }

    pub fn with_defaults(mut self, defaults: &JobDefaults) -> Self {
        self.misfire_grace_time = defaults.misfire_grace_time;
        self.max_instances = defaults.max_instances;
        self
    }

    /// Mark the job as scheduled with the given next run.
    pub fn scheduled(mut self, next_run_time: Option<DateTime<Utc>>) -> Self {
        self.pending = false;
        self.next_run_time = next_run_time;
        self
    }

    /// Flatten into the ordered wire shape.
    ///
    /// Keys: `id`, `name`, `func`, `args`, `kwargs`, the trigger's keys, then
    /// `misfire_grace_time`, `max_instances`, `next_run_time` unless pending.
    pub fn to_mapping(&self) -> Mapping {
        let mut data = Mapping::new();
        data.insert("id".into(), Value::from(self.id.as_str()));
        data.insert("name".into(), Value::from(self.name.as_str()));
        data.insert("func".into(), Value::from(self.func.as_str()));
        data.insert("args".into(), Value::List(self.args.clone()));
        data.insert("kwargs".into(), Value::Map(self.kwargs.clone()));

        data.extend(self.trigger.to_mapping());

        if !self.pending {
            data.insert(
                "misfire_grace_time".into(),
                Value::from(self.misfire_grace_time.map(duration_seconds)),
            );
            data.insert("max_instances".into(), Value::from(self.max_instances));
            data.insert("next_run_time".into(), Value::from(self.next_run_time));
        }

        trace!(job_id = %self.id, keys = data.len(), "Converted job to mapping");
        data
    }

    /// JSON object form of [`Job::to_mapping`].
    pub fn to_json(&self) -> serde_json::Value {
        mapping_to_json(&self.to_mapping())
    }
}

impl Serialize for Job {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_map(self.to_mapping())
    }
}

/// The callable's own name within a `module:qualname` reference.
///
/// References without a colon are treated as dotted paths.
pub fn callable_name(func: &str) -> &str {
    match func.rsplit_once(':') {
        Some((_, qualname)) => qualname,
        None => func.rsplit('.').next().unwrap_or(func),
    }
}

fn duration_seconds(duration: Duration) -> i64 {
    i64::try_from(duration.as_secs()).unwrap_or(i64::MAX)
}

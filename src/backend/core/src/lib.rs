//! # Jobwire Core
//!
//! Converts scheduled jobs and their triggers to and from ordered mappings
//! suitable for JSON APIs and persistence.
//!
//! ## Modules
//!
//! - **Value**: Ordered mapping and value types used as the wire shape
//! - **Trigger**: Date, interval and cron triggers, flattening and argument extraction
//! - **Job**: Jobs and their flattened form
//! - **Definition**: Normalizing and applying incoming job definitions
//! - **Dates**: Free-form date parsing
//! - **Timedelta**: Splitting durations into weeks/days/hours/minutes/seconds
//! - **WSGI**: Latin-1 coercion between bytes and native strings
//! - **Context**: Running callables inside an optional application scope
//! - **Config** and **Telemetry**: Configuration loading and logging setup

pub mod config;
pub mod context;
pub mod dates;
pub mod definition;
pub mod error;
pub mod job;
pub mod telemetry;
pub mod timedelta;
pub mod trigger;
pub mod value;
pub mod wsgi;

pub use error::{ErrorCode, ErrorDetails, ErrorResponse, ErrorSeverity, JobwireError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::SchedulerConfig;
    pub use crate::context::{with_app_context, AppContext};
    pub use crate::dates::{DateParser, FlexibleDateParser};
    pub use crate::definition::{apply_changes, build_job, fix_job_def, fix_job_def_with};
    pub use crate::error::{ErrorCode, JobwireError, Result};
    pub use crate::job::{Job, JobDefaults, JobId};
    pub use crate::timedelta::{extract_timedelta, DurationParts};
    pub use crate::trigger::{
        pop_trigger, CronField, CronTrigger, DateTrigger, IntervalTrigger, PoppedTrigger, Trigger,
        TriggerKind,
    };
    pub use crate::value::{Mapping, Value};
    pub use crate::wsgi::{bytes_to_wsgi, wsgi_to_bytes, WsgiData};
}

//! Job definitions: the not-yet-constructed mapping form of a job.
//!
//! Definitions arrive from configuration files and JSON request bodies. They
//! are normalized with [`fix_job_def`], then either turned into a new [`Job`]
//! with [`build_job`] or applied to an existing one with [`apply_changes`].

use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::{debug, instrument};

use crate::dates::{DateParser, FlexibleDateParser};
use crate::error::{JobwireError, Result};
use crate::job::{Job, JobDefaults, JobId};
use crate::trigger::{pop_trigger, take_datetime, Trigger};
use crate::value::{Mapping, Value};

/// Keys holding dates that may arrive as text.
const DATE_KEYS: [&str; 3] = ["start_date", "end_date", "run_date"];

/// Keys a scheduler accepts that this layer does not model.
const PASSTHROUGH_KEYS: [&str; 4] = ["coalesce", "jobstore", "executor", "replace_existing"];

/// Normalize a definition with the default date parser.
pub fn fix_job_def(job_def: Mapping) -> Result<Mapping> {
    fix_job_def_with(job_def, &FlexibleDateParser)
}

/// Parse textual `start_date`, `end_date` and `run_date` values into dates and
/// flatten the legacy nested trigger shape.
///
/// In the legacy shape `trigger` holds a mapping whose `type` key (default
/// `date`) names the kind; its remaining keys are merged into the top level,
/// overwriting keys of the same name. Dates inside the nested mapping are
/// merged as they are, without parsing.
pub fn fix_job_def_with(mut job_def: Mapping, parser: &dyn DateParser) -> Result<Mapping> {
    for key in DATE_KEYS {
        if let Some(Value::Text(text)) = job_def.get(key) {
            let parsed = parser.parse(text)?;
            job_def.insert(key.to_string(), Value::DateTime(parsed));
        }
    }

    if matches!(job_def.get("trigger"), Some(Value::Map(_))) {
        if let Some(Value::Map(mut trigger)) = job_def.shift_remove("trigger") {
            let kind = trigger
                .shift_remove("type")
                .unwrap_or_else(|| Value::from("date"));
            debug!(trigger = %kind, "Flattening legacy nested trigger");
            job_def.insert("trigger".to_string(), kind);
            job_def.extend(trigger);
        }
    }

    Ok(job_def)
}

/// Build a pending job from a definition.
///
/// The id comes from the `id` key or is generated; `name` defaults to the
/// callable's name;
/// `func` is required. Without a `trigger` key the job gets a date trigger.
#[instrument(skip_all, fields(job_id = tracing::field::Empty))]
pub fn build_job(definition: Mapping, defaults: &JobDefaults, now: DateTime<Utc>) -> Result<Job> {
    let parser = FlexibleDateParser;
    let mut def = fix_job_def_with(definition, &parser)?;

    let id = match def.shift_remove("id") {
        None | Some(Value::Null) => JobId::generate(),
        Some(Value::Text(id)) => JobId::from(id),
        Some(other) => return Err(JobwireError::type_mismatch("id", "str", other.type_name())),
    };
    tracing::Span::current().record("job_id", id.as_str());

    let func = match def.shift_remove("func") {
        Some(Value::Text(func)) if !func.trim().is_empty() => func,
        None | Some(Value::Null) | Some(Value::Text(_)) => {
            return Err(JobwireError::missing_field("func"))
        }
        Some(other) => return Err(JobwireError::type_mismatch("func", "str", other.type_name())),
    };

    if !def.contains_key("trigger") {
        def.insert("trigger".to_string(), Value::from("date"));
    }
    let popped = pop_trigger(def)?;
    let trigger = Trigger::from_args(popped.kind, popped.args, now, &parser)?;

    let mut job = Job::new(id, func, trigger).with_defaults(defaults);
    let mut remaining = popped.remaining;
    if let Some(name) = take_name(&mut remaining)? {
        job.name = name;
    }
    apply_fields(&mut job, remaining, &parser)?;

    debug!(job_id = %job.id, trigger = %job.trigger, "Built job from definition");
    Ok(job)
}

/// Apply a partial definition to an existing job.
///
/// A `trigger` key replaces the trigger, consuming its arguments. All other
/// keys must name a modifiable job attribute. The job is left untouched when
/// any change is rejected.
pub fn apply_changes(job: &mut Job, changes: Mapping, now: DateTime<Utc>) -> Result<()> {
    let parser = FlexibleDateParser;
    let mut changes = fix_job_def_with(changes, &parser)?;
    let mut updated = job.clone();

    if changes.contains_key("trigger") {
        let popped = pop_trigger(changes)?;
        updated.trigger = Trigger::from_args(popped.kind, popped.args, now, &parser)?;
        changes = popped.remaining;
    }

    if let Some(id) = changes.get("id") {
        if id.as_str() != Some(job.id.as_str()) {
            return Err(JobwireError::invalid_input("The job id cannot be changed"));
        }
        changes.shift_remove("id");
    }
    if let Some(func) = changes.shift_remove("func") {
        match func {
            Value::Text(func) if !func.trim().is_empty() => updated.func = func,
            other => return Err(JobwireError::type_mismatch("func", "str", other.type_name())),
        }
    }
    if let Some(name) = take_name(&mut changes)? {
        updated.name = name;
    }
    apply_fields(&mut updated, changes, &parser)?;

    debug!(job_id = %updated.id, trigger = %updated.trigger, "Applied job changes");
    *job = updated;
    Ok(())
}

fn take_name(def: &mut Mapping) -> Result<Option<String>> {
    match def.shift_remove("name") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Text(name)) => Ok(Some(name)),
        Some(other) => Err(JobwireError::type_mismatch("name", "str", other.type_name())),
    }
}

/// Apply `args`, `kwargs` and the scheduling metadata; reject anything else.
fn apply_fields(job: &mut Job, mut fields: Mapping, parser: &dyn DateParser) -> Result<()> {
    match fields.shift_remove("args") {
        None | Some(Value::Null) => {}
        Some(Value::List(args)) => job.args = args,
        Some(other) => return Err(JobwireError::type_mismatch("args", "list", other.type_name())),
    }

    match fields.shift_remove("kwargs") {
        None | Some(Value::Null) => {}
        Some(Value::Map(kwargs)) => job.kwargs = kwargs,
        Some(other) => {
            return Err(JobwireError::type_mismatch("kwargs", "dict", other.type_name()))
        }
    }

    match fields.shift_remove("misfire_grace_time") {
        None => {}
        Some(Value::Null) => job.misfire_grace_time = None,
        Some(value) => match value.as_i64() {
            Some(secs) if secs > 0 => {
                job.misfire_grace_time = Some(Duration::from_secs(secs.unsigned_abs()))
            }
            _ => {
                return Err(JobwireError::invalid_input(
                    "misfire_grace_time must be a positive integer or null",
                ))
            }
        },
    }

    if let Some(value) = fields.shift_remove("max_instances") {
        match value.as_i64().and_then(|n| u32::try_from(n).ok()) {
            Some(n) if n > 0 => job.max_instances = n,
            _ => {
                return Err(JobwireError::invalid_input(
                    "max_instances must be a positive integer",
                ))
            }
        }
    }

    if fields.contains_key("next_run_time") {
        job.next_run_time = take_datetime(&mut fields, "next_run_time", parser)?;
    }

    for key in PASSTHROUGH_KEYS {
        if let Some(value) = fields.shift_remove(key) {
            debug!(key, value = %value, "Ignoring scheduler option");
        }
    }

    if !fields.is_empty() {
        let unexpected: Vec<&str> = fields.keys().map(String::as_str).collect();
        return Err(JobwireError::invalid_input(format!(
            "Unexpected job attributes: {}",
            unexpected.join(", ")
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::mapping;
    use crate::trigger::TriggerKind;
    use chrono::{Duration as ChronoDuration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap()
    }

    #[test]
    fn test_fix_parses_text_dates() {
        let fixed = fix_job_def(mapping! {
            "start_date" => "2024-01-01T00:00:00",
            "end_date" => "2024-02-01",
            "run_date" => 5,
        })
        .unwrap();
        assert_eq!(
            fixed["start_date"],
            Value::DateTime(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(
            fixed["end_date"],
            Value::DateTime(Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap())
        );
        // non-text values are left alone
        assert_eq!(fixed["run_date"], Value::Int(5));
    }

    #[test]
    fn test_fix_propagates_parse_errors() {
        let error = fix_job_def(mapping! { "run_date" => "soon" }).unwrap_err();
        assert_eq!(error.code(), ErrorCode::InvalidDate);
    }

    #[test]
    fn test_fix_flattens_legacy_trigger() {
        let fixed = fix_job_def(mapping! {
            "trigger" => mapping! { "type" => "cron", "hour" => "5" },
        })
        .unwrap();
        assert_eq!(fixed, mapping! { "trigger" => "cron", "hour" => "5" });
    }

    #[test]
    fn test_fix_legacy_trigger_defaults_to_date_and_overwrites() {
        let fixed = fix_job_def(mapping! {
            "id" => "a",
            "trigger" => mapping! { "run_date" => "2030-01-01" },
            "run_date" => "2024-01-01",
        })
        .unwrap();
        assert_eq!(fixed["trigger"], Value::from("date"));
        // the nested value wins and is not parsed
        assert_eq!(fixed["run_date"], Value::from("2030-01-01"));
    }

    #[test]
    fn test_build_job_from_cron_definition() {
        let job = build_job(
            mapping! {
                "id" => "nightly",
                "func" => "app.jobs:cleanup",
                "trigger" => "cron",
                "hour" => 3,
                "args" => vec![Value::from("tmp")],
                "max_instances" => 2,
            },
            &JobDefaults::default(),
            now(),
        )
        .unwrap();

        assert_eq!(job.id.as_str(), "nightly");
        assert_eq!(job.name, "cleanup");
        assert_eq!(job.trigger.kind(), Some(TriggerKind::Cron));
        assert_eq!(job.args, vec![Value::from("tmp")]);
        assert_eq!(job.max_instances, 2);
        assert!(job.pending);
    }

    #[test]
    fn test_build_job_defaults_to_date_trigger_now() {
        let job =
            build_job(mapping! { "func" => "app:run" }, &JobDefaults::default(), now()).unwrap();
        assert_eq!(job.name, "run");
        assert_eq!(job.trigger.to_mapping()["run_date"], Value::DateTime(now()));
        assert_eq!(job.id.as_str().len(), 32);
    }

    #[test]
    fn test_build_job_requires_func() {
        let error =
            build_job(mapping! { "id" => "x" }, &JobDefaults::default(), now()).unwrap_err();
        assert_eq!(error.code(), ErrorCode::MissingRequiredField);
    }

    #[test]
    fn test_build_job_rejects_unknown_attributes() {
        let definition = mapping! {
            "func" => "app:run",
            "trigger" => "cron",
            "hour" => "1",
            "colour" => "blue",
        };
        let error = build_job(definition, &JobDefaults::default(), now()).unwrap_err();
        assert_eq!(error.code(), ErrorCode::InvalidInput);
        assert!(error.user_message().contains("colour"));
    }

    #[test]
    fn test_build_job_tolerates_scheduler_options() {
        let job = build_job(
            mapping! { "func" => "app:run", "coalesce" => true, "replace_existing" => true },
            &JobDefaults::default(),
            now(),
        );
        assert!(job.is_ok());
    }

    #[test]
    fn test_apply_changes_reschedules_and_renames() {
        let mut job = build_job(
            mapping! { "id" => "j", "func" => "app:run", "trigger" => "interval", "minutes" => 5 },
            &JobDefaults::default(),
            now(),
        )
        .unwrap();

        apply_changes(
            &mut job,
            mapping! {
                "trigger" => "interval",
                "hours" => 1,
                "start_date" => "2024-05-02 00:00:00",
                "name" => "Hourly",
                "misfire_grace_time" => Value::Null,
            },
            now(),
        )
        .unwrap();

        assert_eq!(job.name, "Hourly");
        assert_eq!(job.misfire_grace_time, None);
        match &job.trigger {
            Trigger::Interval(interval) => {
                assert_eq!(interval.interval, ChronoDuration::hours(1));
                assert_eq!(interval.start_date, Utc.with_ymd_and_hms(2024, 5, 2, 0, 0, 0).unwrap());
            }
            other => panic!("unexpected trigger {other:?}"),
        }
    }

    #[test]
    fn test_apply_changes_is_all_or_nothing() {
        let mut job = build_job(
            mapping! { "id" => "j", "func" => "app:run" },
            &JobDefaults::default(),
            now(),
        )
        .unwrap();
        let before = job.clone();

        let changes = mapping! { "name" => "New", "max_instances" => 0 };
        let error = apply_changes(&mut job, changes, now()).unwrap_err();
        assert_eq!(error.code(), ErrorCode::InvalidInput);
        assert_eq!(job, before);
    }

    #[test]
    fn test_oversized_interval_leaves_job_untouched() {
        let mut job = build_job(
            mapping! { "id" => "j", "func" => "app:run", "trigger" => "interval", "hours" => 1 },
            &JobDefaults::default(),
            now(),
        )
        .unwrap();
        let before = job.clone();

        let changes = mapping! { "trigger" => "interval", "weeks" => 1_000_000_000_000i64 };
        let error = apply_changes(&mut job, changes, now()).unwrap_err();
        assert_eq!(error.code(), ErrorCode::InvalidTrigger);
        assert_eq!(job, before);
    }

    #[test]
    fn test_apply_changes_rejects_id_change() {
        let mut job = build_job(
            mapping! { "id" => "j", "func" => "app:run" },
            &JobDefaults::default(),
            now(),
        )
        .unwrap();
        assert!(apply_changes(&mut job, mapping! { "id" => "k" }, now()).is_err());
        assert!(apply_changes(&mut job, mapping! { "id" => "j" }, now()).is_ok());
    }
}

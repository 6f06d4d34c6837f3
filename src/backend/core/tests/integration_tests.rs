//! Integration tests for Jobwire.
//!
//! These tests exercise the public API end to end: definitions in, jobs and
//! mappings out.

use chrono::{DateTime, Duration, TimeZone, Utc};
use jobwire_core::error::ErrorCode;
use jobwire_core::mapping;
use jobwire_core::prelude::*;

// ============================================================================
// Test Utilities
// ============================================================================

fn midnight() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

fn keys(map: &Mapping) -> Vec<&str> {
    map.keys().map(String::as_str).collect()
}

// ============================================================================
// Conversion Properties
// ============================================================================

#[test]
fn test_hours_only_interval_mapping() {
    let trigger = Trigger::Interval(IntervalTrigger {
        interval: Duration::hours(3),
        start_date: midnight(),
        end_date: None,
        timezone: None,
    });

    let data = trigger.to_mapping();
    assert_eq!(keys(&data), ["trigger", "start_date", "hours"]);
    assert_eq!(data["hours"], Value::Int(3));
}

#[test]
fn test_pop_trigger_passes_unknown_keys_through() {
    let popped =
        pop_trigger(mapping! { "trigger" => "cron", "hour" => "5", "foo" => "bar" }).unwrap();

    assert_eq!(popped.kind, TriggerKind::Cron);
    assert_eq!(popped.args, mapping! { "hour" => "5" });
    assert_eq!(popped.remaining, mapping! { "foo" => "bar" });
}

#[test]
fn test_normalize_start_date() {
    let fixed = fix_job_def(mapping! { "start_date" => "2024-01-01T00:00:00" }).unwrap();
    assert_eq!(fixed["start_date"], Value::DateTime(midnight()));
}

#[test]
fn test_normalize_legacy_trigger() {
    let fixed = fix_job_def(mapping! {
        "trigger" => mapping! { "type" => "cron", "hour" => "5" },
    })
    .unwrap();
    assert_eq!(fixed, mapping! { "trigger" => "cron", "hour" => "5" });
}

#[test]
fn test_pending_job_lacks_scheduling_keys() {
    let job = Job::new(
        "once",
        "app:once",
        Trigger::Date(DateTrigger {
            run_date: midnight(),
            timezone: None,
        }),
    );
    assert!(job.pending);

    let data = job.to_mapping();
    assert!(!data.contains_key("misfire_grace_time"));
    assert!(!data.contains_key("max_instances"));
    assert!(!data.contains_key("next_run_time"));
}

#[test]
fn test_decomposition_matches_day_second_split() {
    let parts = extract_timedelta(Duration::days(15) + Duration::seconds(3_725));
    assert_eq!(parts.as_tuple(), (2, 1, 1, 2, 5));
    assert_eq!(parts.total_seconds(), Some(15 * 86_400 + 3_725));
}

#[test]
fn test_latin1_round_trips() {
    let bytes: Vec<u8> = (0..=255).collect();
    let text = bytes_to_wsgi(bytes.clone()).unwrap();
    assert_eq!(text.chars().count(), 256);
    assert_eq!(wsgi_to_bytes(text).unwrap(), bytes);

    let text = "Gr\u{fc}\u{df}e";
    assert_eq!(bytes_to_wsgi(wsgi_to_bytes(text).unwrap()).unwrap(), text);
}

// ============================================================================
// Definition Pipeline
// ============================================================================

#[test]
fn test_json_definition_to_job_json() {
    let body = r#"{
        "id": "backup",
        "func": "ops.backup:run",
        "trigger": {"type": "interval", "days": 1, "hours": 12},
        "start_date": "2024-01-01 00:00:00",
        "kwargs": {"target": "s3"}
    }"#;
    let definition: Mapping = serde_json::from_str(body).unwrap();

    let job = build_job(definition, &JobDefaults::default(), midnight())
        .unwrap()
        .scheduled(Some(midnight()));

    assert_eq!(
        job.to_json(),
        serde_json::json!({
            "id": "backup",
            "name": "run",
            "func": "ops.backup:run",
            "args": [],
            "kwargs": {"target": "s3"},
            "trigger": "interval",
            "start_date": "2024-01-01T00:00:00Z",
            "days": 1,
            "hours": 12,
            "misfire_grace_time": 1,
            "max_instances": 1,
            "next_run_time": "2024-01-01T00:00:00Z",
        })
    );
}

#[test]
fn test_mapping_back_to_trigger() {
    let original = Trigger::Cron({
        let mut cron = CronTrigger::from_fields([
            ("month", "1-6".to_string()),
            ("minute", "30".to_string()),
        ])
        .unwrap();
        cron.start_date = Some(midnight());
        cron
    });

    let popped = pop_trigger(original.to_mapping()).unwrap();
    assert!(popped.remaining.is_empty());

    let rebuilt =
        Trigger::from_args(popped.kind, popped.args, midnight(), &FlexibleDateParser).unwrap();
    assert_eq!(rebuilt.to_mapping(), original.to_mapping());
}

#[test]
fn test_unsupported_trigger_kind() {
    let error = build_job(
        mapping! { "func" => "app:run", "trigger" => "calendarinterval" },
        &JobDefaults::default(),
        midnight(),
    )
    .unwrap_err();

    assert_eq!(error.code(), ErrorCode::UnsupportedTrigger);
    assert_eq!(error.user_message(), "Trigger calendarinterval is not supported.");
}

#[test]
fn test_oversized_interval_is_rejected() {
    let definition = mapping! {
        "func" => "a:b",
        "trigger" => "interval",
        "weeks" => 1_000_000_000_000i64,
    };
    let error = build_job(definition, &JobDefaults::default(), midnight()).unwrap_err();
    assert_eq!(error.code(), ErrorCode::InvalidTrigger);

    let body = r#"{"func": "a:b", "trigger": "interval", "seconds": 1e300}"#;
    let definition: Mapping = serde_json::from_str(body).unwrap();
    let error = build_job(definition, &JobDefaults::default(), midnight()).unwrap_err();
    assert_eq!(error.code(), ErrorCode::InvalidTrigger);
}

#[test]
fn test_malformed_cron_field_is_rejected() {
    let definition = mapping! {
        "func" => "a:b",
        "trigger" => mapping! { "type" => "cron", "hour" => "99", "minute" => "a-b-c" },
    };
    let error = build_job(definition, &JobDefaults::default(), midnight()).unwrap_err();
    assert_eq!(error.code(), ErrorCode::InvalidTrigger);
    assert_eq!(error.details().field.as_deref(), Some("hour"));
}

#[test]
fn test_modify_job_through_changes() {
    let mut job = build_job(
        mapping! { "id" => "sync", "func" => "app:sync", "trigger" => "cron", "minute" => "0" },
        &JobDefaults::default(),
        midnight(),
    )
    .unwrap();

    let changes = mapping! {
        "trigger" => mapping! { "type" => "cron", "minute" => "*/10" },
        "max_instances" => 4,
    };
    apply_changes(&mut job, changes, midnight()).unwrap();

    let data = job.scheduled(None).to_mapping();
    assert_eq!(data["minute"], Value::from("*/10"));
    assert_eq!(data["max_instances"], Value::Int(4));
    assert_eq!(data["next_run_time"], Value::Null);
}

//! Trigger variants and their conversion to and from flat mappings.
//!
//! Three trigger kinds are understood:
//!
//! - **date**: fires once at `run_date`
//! - **interval**: fires every `interval`, starting at `start_date`
//! - **cron**: fires when the calendar matches a set of cron fields
//!
//! Anything else is carried as [`Trigger::Other`] holding its printed form.

use chrono::{DateTime, Duration, Utc};
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, trace};

use crate::dates::DateParser;
use crate::error::{JobwireError, Result};
use crate::timedelta::{extract_timedelta, DurationParts};
use crate::value::{Mapping, Value};

// ═══════════════════════════════════════════════════════════════════════════════
// Trigger Kind
// ═══════════════════════════════════════════════════════════════════════════════

/// Argument names consumed by a date trigger.
pub const DATE_ARGS: &[&str] = &["run_date", "timezone"];

/// Argument names consumed by an interval trigger.
pub const INTERVAL_ARGS: &[&str] = &[
    "weeks",
    "days",
    "hours",
    "minutes",
    "seconds",
    "start_date",
    "end_date",
    "timezone",
];

/// Argument names consumed by a cron trigger.
pub const CRON_ARGS: &[&str] = &[
    "year",
    "month",
    "day",
    "week",
    "day_of_week",
    "hour",
    "minute",
    "second",
    "start_date",
    "end_date",
    "timezone",
];

/// The supported trigger kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    Date,
    Interval,
    Cron,
}

impl TriggerKind {
    /// The tag stored under the `trigger` key.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Date => "date",
            Self::Interval => "interval",
            Self::Cron => "cron",
        }
    }

    /// Keys pulled out of a mapping for this kind, in extraction order.
    pub const fn arg_names(&self) -> &'static [&'static str] {
        match self {
            Self::Date => DATE_ARGS,
            Self::Interval => INTERVAL_ARGS,
            Self::Cron => CRON_ARGS,
        }
    }
}

impl fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TriggerKind {
    type Err = JobwireError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "date" => Ok(Self::Date),
            "interval" => Ok(Self::Interval),
            "cron" => Ok(Self::Cron),
            other => Err(JobwireError::unsupported_trigger(other)),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Trigger Variants
// ═══════════════════════════════════════════════════════════════════════════════

/// Fires once.
#[derive(Debug, Clone, PartialEq)]
pub struct DateTrigger {
    pub run_date: DateTime<Utc>,
    /// Zone name recorded for the scheduler. It is never applied here: dates
    /// are held in UTC and naive date text is read as UTC.
    pub timezone: Option<String>,
}

/// Fires at a fixed period.
#[derive(Debug, Clone, PartialEq)]
pub struct IntervalTrigger {
    pub interval: Duration,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    /// Recorded zone name, see [`DateTrigger::timezone`].
    pub timezone: Option<String>,
}

/// Cron field names in declaration order.
pub const CRON_FIELD_NAMES: [&str; 8] = [
    "year",
    "month",
    "day",
    "week",
    "day_of_week",
    "hour",
    "minute",
    "second",
];

/// Values assumed for fields less significant than the last one given.
const CRON_DEFAULTS: [&str; 8] = ["*", "1", "1", "*", "*", "0", "0", "0"];

/// Inclusive value range of each field, in [`CRON_FIELD_NAMES`] order.
const CRON_RANGES: [(u32, u32); 8] = [
    (1970, 9999),
    (1, 12),
    (1, 31),
    (1, 53),
    (0, 6),
    (0, 23),
    (0, 59),
    (0, 59),
];

const MONTH_FIELD: usize = 1;
const DAY_FIELD: usize = 2;
const DAY_OF_WEEK_FIELD: usize = 4;

const MONTH_NAMES: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];
const WEEKDAY_NAMES: [&str; 7] = ["mon", "tue", "wed", "thu", "fri", "sat", "sun"];

/// One field of a cron trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronField {
    name: &'static str,
    expression: String,
    is_default: bool,
}

impl CronField {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// True when the field was filled in rather than given explicitly.
    pub fn is_default(&self) -> bool {
        self.is_default
    }
}

impl fmt::Display for CronField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.expression)
    }
}

/// Fires on calendar matches.
#[derive(Debug, Clone, PartialEq)]
pub struct CronTrigger {
    pub fields: Vec<CronField>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    /// Recorded zone name, see [`DateTrigger::timezone`].
    pub timezone: Option<String>,
}

impl CronTrigger {
    /// Build the field list from explicitly given `(name, expression)` pairs.
    ///
    /// Fields ahead of the last given one default to `*`; fields after it take
    /// the conventional defaults (`month=1`, `day=1`, `hour=0`, ...).
    ///
    /// Each expression is a comma-separated list of `*`, `*/step`, `value`,
    /// `first-last` or `first-last/step` items. Months and weekdays also take
    /// three-letter names, and `day` takes `last`, `last fri` or `2nd mon`.
    pub fn from_fields<'a>(given: impl IntoIterator<Item = (&'a str, String)>) -> Result<Self> {
        let mut explicit: Vec<(usize, String)> = Vec::new();
        for (name, expression) in given {
            let index = CRON_FIELD_NAMES
                .iter()
                .position(|field| *field == name)
                .ok_or_else(|| {
                    JobwireError::invalid_trigger(name, format!("Unknown cron field: {}", name))
                })?;
            validate_cron_expression(index, &expression)?;
            explicit.push((index, expression.trim().to_string()));
        }

        let last_given = explicit.iter().map(|(index, _)| *index).max();
        let fields = CRON_FIELD_NAMES
            .iter()
            .enumerate()
            .map(|(index, &name)| {
                match explicit.iter().find(|(i, _)| *i == index) {
                    Some((_, expression)) => CronField {
                        name,
                        expression: expression.clone(),
                        is_default: false,
                    },
                    None => {
                        let expression = match last_given {
                            Some(last) if index > last => CRON_DEFAULTS[index],
                            _ => "*",
                        };
                        CronField {
                            name,
                            expression: expression.to_string(),
                            is_default: true,
                        }
                    }
                }
            })
            .collect();

        Ok(Self {
            fields,
            start_date: None,
            end_date: None,
            timezone: None,
        })
    }

    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&CronField> {
        self.fields.iter().find(|f| f.name == name)
    }
}

fn validate_cron_expression(index: usize, expression: &str) -> Result<()> {
    let name = CRON_FIELD_NAMES[index];
    let trimmed = expression.trim();
    if trimmed.is_empty() {
        return Err(JobwireError::invalid_trigger(
            name,
            format!("Cron field {} has an empty expression", name),
        ));
    }

    for item in trimmed.split(',') {
        check_cron_item(index, &item.trim().to_ascii_lowercase()).map_err(|reason| {
            JobwireError::invalid_trigger(
                name,
                format!("Invalid {} expression {:?}: {}", name, trimmed, reason),
            )
        })?;
    }
    Ok(())
}

fn check_cron_item(index: usize, item: &str) -> std::result::Result<(), String> {
    if item.is_empty() {
        return Err("empty list item".to_string());
    }
    if index == DAY_FIELD && is_day_keyword(item) {
        return Ok(());
    }

    let (range, step) = match item.split_once('/') {
        Some((range, step)) => (range, Some(step)),
        None => (item, None),
    };
    if let Some(step) = step {
        match step.parse::<u32>() {
            Ok(step) if step > 0 => {}
            _ => return Err(format!("invalid step {:?}", step)),
        }
    }
    if range == "*" {
        return Ok(());
    }

    let (first, last) = match range.split_once('-') {
        Some((first, last)) => (first, Some(last)),
        None => (range, None),
    };
    let first = cron_value(index, first)?;
    if let Some(last) = last {
        if cron_value(index, last)? < first {
            return Err(format!("range {:?} runs backwards", range));
        }
    }
    Ok(())
}

fn cron_value(index: usize, text: &str) -> std::result::Result<u32, String> {
    let (min, max) = CRON_RANGES[index];
    let names: &[&str] = match index {
        MONTH_FIELD => &MONTH_NAMES,
        DAY_OF_WEEK_FIELD => &WEEKDAY_NAMES,
        _ => &[],
    };
    if let Some(position) = names.iter().position(|name| *name == text) {
        return Ok(min + position as u32);
    }

    let value: u32 = text
        .parse()
        .map_err(|_| format!("{:?} is not a valid value", text))?;
    if !(min..=max).contains(&value) {
        return Err(format!("{} is outside {}-{}", value, min, max));
    }
    Ok(value)
}

/// `last`, `last <weekday>` or `<nth> <weekday>` in the day field.
fn is_day_keyword(item: &str) -> bool {
    let mut words = item.split_whitespace();
    match (words.next(), words.next(), words.next()) {
        (Some("last"), None, None) => true,
        (Some(nth), Some(weekday), None) => {
            matches!(nth, "1st" | "2nd" | "3rd" | "4th" | "5th" | "last")
                && WEEKDAY_NAMES.iter().any(|name| *name == weekday)
        }
        _ => false,
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Trigger
// ═══════════════════════════════════════════════════════════════════════════════

/// A rule deciding when a job runs next.
#[derive(Debug, Clone, PartialEq)]
pub enum Trigger {
    Date(DateTrigger),
    Interval(IntervalTrigger),
    Cron(CronTrigger),
    /// A trigger this layer cannot represent, kept as its printed form.
    Other(String),
}

impl Trigger {
    pub fn kind(&self) -> Option<TriggerKind> {
        match self {
            Self::Date(_) => Some(TriggerKind::Date),
            Self::Interval(_) => Some(TriggerKind::Interval),
            Self::Cron(_) => Some(TriggerKind::Cron),
            Self::Other(_) => None,
        }
    }

    /// Flatten into a mapping whose first key is always `trigger`.
    pub fn to_mapping(&self) -> Mapping {
        let mut data = Mapping::new();

        match self {
            Self::Date(trigger) => {
                data.insert("trigger".into(), Value::from("date"));
                data.insert("run_date".into(), Value::DateTime(trigger.run_date));
            }
            Self::Interval(trigger) => {
                data.insert("trigger".into(), Value::from("interval"));
                data.insert("start_date".into(), Value::DateTime(trigger.start_date));

                if let Some(end_date) = trigger.end_date {
                    data.insert("end_date".into(), Value::DateTime(end_date));
                }

                for (name, amount) in extract_timedelta(trigger.interval).named() {
                    if amount > 0 {
                        data.insert(name.into(), Value::Int(amount));
                    }
                }
            }
            Self::Cron(trigger) => {
                data.insert("trigger".into(), Value::from("cron"));

                if let Some(start_date) = trigger.start_date {
                    data.insert("start_date".into(), Value::DateTime(start_date));
                }
                if let Some(end_date) = trigger.end_date {
                    data.insert("end_date".into(), Value::DateTime(end_date));
                }

                for field in trigger.fields.iter().filter(|f| !f.is_default) {
                    data.insert(field.name.into(), Value::Text(field.to_string()));
                }
            }
            Self::Other(printed) => {
                data.insert("trigger".into(), Value::Text(printed.clone()));
            }
        }

        data
    }

    /// Build a trigger of `kind` from arguments extracted by [`pop_trigger`].
    ///
    /// `now` anchors the defaults: a date trigger without `run_date` fires at
    /// `now`, an interval trigger without `start_date` starts one interval
    /// after `now`. A `timezone` argument is stored verbatim and not checked
    /// against a zone database.
    pub fn from_args(
        kind: TriggerKind,
        mut args: Mapping,
        now: DateTime<Utc>,
        parser: &dyn DateParser,
    ) -> Result<Self> {
        let timezone = take_text(&mut args, "timezone")?;

        let trigger = match kind {
            TriggerKind::Date => Self::Date(DateTrigger {
                run_date: take_datetime(&mut args, "run_date", parser)?.unwrap_or(now),
                timezone,
            }),
            TriggerKind::Interval => {
                let parts = DurationParts {
                    weeks: take_int(&mut args, "weeks")?.unwrap_or(0),
                    days: take_int(&mut args, "days")?.unwrap_or(0),
                    hours: take_int(&mut args, "hours")?.unwrap_or(0),
                    minutes: take_int(&mut args, "minutes")?.unwrap_or(0),
                    seconds: take_int(&mut args, "seconds")?.unwrap_or(0),
                };
                let mut interval = parts.to_duration().ok_or_else(|| {
                    JobwireError::invalid_trigger("interval", "The interval is too long")
                })?;
                if interval <= Duration::zero() {
                    if interval < Duration::zero() {
                        return Err(JobwireError::invalid_trigger(
                            "interval",
                            "The interval must not be negative",
                        ));
                    }
                    interval = Duration::seconds(1);
                }
                let start_date = match take_datetime(&mut args, "start_date", parser)? {
                    Some(start_date) => start_date,
                    None => now.checked_add_signed(interval).ok_or_else(|| {
                        JobwireError::invalid_trigger(
                            "interval",
                            "The first run falls outside the supported date range",
                        )
                    })?,
                };
                Self::Interval(IntervalTrigger {
                    interval,
                    start_date,
                    end_date: take_datetime(&mut args, "end_date", parser)?,
                    timezone,
                })
            }
            TriggerKind::Cron => {
                let mut given = Vec::new();
                for name in CRON_FIELD_NAMES {
                    match args.shift_remove(name) {
                        None | Some(Value::Null) => {}
                        Some(Value::Text(text)) => given.push((name, text)),
                        Some(Value::Int(i)) => given.push((name, i.to_string())),
                        Some(other) => {
                            return Err(JobwireError::type_mismatch(
                                name,
                                "str or int",
                                other.type_name(),
                            ))
                        }
                    }
                }
                let mut cron = CronTrigger::from_fields(given)?;
                cron.start_date = take_datetime(&mut args, "start_date", parser)?;
                cron.end_date = take_datetime(&mut args, "end_date", parser)?;
                cron.timezone = timezone;
                Self::Cron(cron)
            }
        };

        if !args.is_empty() {
            let unexpected: Vec<&str> = args.keys().map(String::as_str).collect();
            return Err(JobwireError::invalid_trigger(
                "trigger",
                format!("Unexpected {} trigger arguments: {}", kind, unexpected.join(", ")),
            ));
        }

        debug!(trigger = %trigger, "Built trigger from arguments");
        Ok(trigger)
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Date(trigger) => {
                write!(f, "date[{}]", trigger.run_date.format("%Y-%m-%d %H:%M:%S %Z"))
            }
            Self::Interval(trigger) => {
                write!(f, "interval[{}]", format_interval(trigger.interval))
            }
            Self::Cron(trigger) => {
                let fields: Vec<String> = trigger
                    .fields
                    .iter()
                    .filter(|field| !field.is_default)
                    .map(|field| format!("{}='{}'", field.name, field))
                    .collect();
                write!(f, "cron[{}]", fields.join(", "))
            }
            Self::Other(printed) => f.write_str(printed),
        }
    }
}

impl Serialize for Trigger {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_map(self.to_mapping())
    }
}

/// `[D day[s], ]H:MM:SS`, the way a timedelta prints.
fn format_interval(interval: Duration) -> String {
    let total = interval.num_seconds();
    let (days, secs) = (total.div_euclid(86_400), total.rem_euclid(86_400));
    let clock = format!("{}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60);
    match days {
        0 => clock,
        1 | -1 => format!("{} day, {}", days, clock),
        _ => format!("{} days, {}", days, clock),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Argument Extraction
// ═══════════════════════════════════════════════════════════════════════════════

/// Result of [`pop_trigger`].
#[derive(Debug, Clone, PartialEq)]
pub struct PoppedTrigger {
    pub kind: TriggerKind,
    /// The consumed arguments, in the kind's declared argument order.
    pub args: Mapping,
    /// Every key that was not consumed, in its original order.
    pub remaining: Mapping,
}

/// Remove the `trigger` tag and the argument keys belonging to its kind.
///
/// Keys outside the kind's argument set are passed through untouched in
/// [`PoppedTrigger::remaining`].
pub fn pop_trigger(mut data: Mapping) -> Result<PoppedTrigger> {
    let tag = data
        .shift_remove("trigger")
        .ok_or_else(|| JobwireError::missing_field("trigger"))?;
    let kind: TriggerKind = match &tag {
        Value::Text(name) => name.parse()?,
        other => return Err(JobwireError::unsupported_trigger(other)),
    };

    let mut args = Mapping::new();
    for name in kind.arg_names() {
        if let Some(value) = data.shift_remove(*name) {
            args.insert((*name).to_string(), value);
        }
    }

    trace!(
        trigger = %kind,
        consumed = ?args.keys().collect::<Vec<_>>(),
        remaining = ?data.keys().collect::<Vec<_>>(),
        "Popped trigger arguments"
    );

    Ok(PoppedTrigger {
        kind,
        args,
        remaining: data,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Typed argument readers
// ─────────────────────────────────────────────────────────────────────────────

pub(crate) fn take_datetime(
    args: &mut Mapping,
    key: &str,
    parser: &dyn DateParser,
) -> Result<Option<DateTime<Utc>>> {
    match args.shift_remove(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::DateTime(dt)) => Ok(Some(dt)),
        Some(Value::Text(text)) => parser.parse(&text).map(Some),
        Some(other) => Err(JobwireError::type_mismatch(key, "datetime", other.type_name())),
    }
}

pub(crate) fn take_int(args: &mut Mapping, key: &str) -> Result<Option<i64>> {
    match args.shift_remove(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Text(text)) => text
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|_| JobwireError::type_mismatch(key, "int", "str")),
        Some(Value::Float(f)) if f.is_finite() && f.fract() == 0.0 => Value::Float(f)
            .as_i64()
            .map(Some)
            .ok_or_else(|| {
                JobwireError::invalid_trigger(key, format!("{} is out of range: {}", key, f))
            }),
        Some(other) => other
            .as_i64()
            .map(Some)
            .ok_or_else(|| JobwireError::type_mismatch(key, "int", other.type_name())),
    }
}

pub(crate) fn take_text(args: &mut Mapping, key: &str) -> Result<Option<String>> {
    match args.shift_remove(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Text(text)) => Ok(Some(text)),
        Some(other) => Err(JobwireError::type_mismatch(key, "str", other.type_name())),
    }
}

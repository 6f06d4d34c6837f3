//! Free-form date parsing for job definitions.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};

use crate::error::{JobwireError, Result};

/// Turns date text into a point in time.
pub trait DateParser: Send + Sync {
    fn parse(&self, text: &str) -> Result<DateTime<Utc>>;
}

/// Offset-aware layouts tried after RFC 3339.
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
];

/// Naive layouts, interpreted as UTC.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%Y%m%d"];

/// Accepts the common ISO-8601 shapes plus a few slash-separated variants.
///
/// Text without an offset is taken to be UTC; a bare date means midnight.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlexibleDateParser;

impl DateParser for FlexibleDateParser {
    fn parse(&self, text: &str) -> Result<DateTime<Utc>> {
        let trimmed = text.trim();

        if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
            return Ok(dt.with_timezone(&Utc));
        }

        for format in OFFSET_FORMATS {
            if let Ok(dt) = DateTime::parse_from_str(trimmed, format) {
                return Ok(dt.with_timezone(&Utc));
            }
        }

        for format in NAIVE_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
                return Ok(naive.and_utc());
            }
        }

        for format in DATE_FORMATS {
            if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
                return Ok(date.and_time(NaiveTime::MIN).and_utc());
            }
        }

        Err(JobwireError::invalid_date(text))
    }
}

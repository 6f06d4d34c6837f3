//! Decomposition of durations into calendar-style components.

use chrono::Duration;
use serde::{Deserialize, Serialize};

const SECONDS_PER_DAY: i64 = 86_400;

/// A duration split into weeks, days, hours, minutes and seconds.
///
/// Sub-second precision is discarded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DurationParts {
    pub weeks: i64,
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
}

impl DurationParts {
    /// The components as a `(weeks, days, hours, minutes, seconds)` tuple.
    pub fn as_tuple(&self) -> (i64, i64, i64, i64, i64) {
        (self.weeks, self.days, self.hours, self.minutes, self.seconds)
    }

    /// Total length in seconds, or `None` if it does not fit in an `i64`.
    pub fn total_seconds(&self) -> Option<i64> {
        self.weeks
            .checked_mul(7)?
            .checked_add(self.days)?
            .checked_mul(24)?
            .checked_add(self.hours)?
            .checked_mul(3600)?
            .checked_add(self.minutes.checked_mul(60)?)?
            .checked_add(self.seconds)
    }

    /// Recombine the components into a duration.
    ///
    /// Returns `None` when the total exceeds what [`Duration`] can hold.
    pub fn to_duration(&self) -> Option<Duration> {
        self.total_seconds().and_then(Duration::try_seconds)
    }

    /// Non-zero components paired with the keyword each one is emitted under.
    pub fn named(&self) -> [(&'static str, i64); 5] {
        [
            ("weeks", self.weeks),
            ("days", self.days),
            ("hours", self.hours),
            ("minutes", self.minutes),
            ("seconds", self.seconds),
        ]
    }
}

/// Split `delta` the same way a `timedelta` is split into days and seconds:
/// days by 7 into weeks, seconds by 60 into minutes, minutes by 60 into hours.
///
/// Negative durations are floored to whole days first, so the seconds part is
/// always in `0..86400`.
pub fn extract_timedelta(delta: Duration) -> DurationParts {
    let total = delta.num_seconds();
    let (days_total, secs) = (
        total.div_euclid(SECONDS_PER_DAY),
        total.rem_euclid(SECONDS_PER_DAY),
    );

    let (weeks, days) = (days_total.div_euclid(7), days_total.rem_euclid(7));
    let (minutes_total, seconds) = (secs / 60, secs % 60);
    let (hours, minutes) = (minutes_total / 60, minutes_total % 60);

    DurationParts {
        weeks,
        days,
        hours,
        minutes,
        seconds,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_extract_mixed_duration() {
        let delta =
            Duration::days(10) + Duration::hours(5) + Duration::minutes(3) + Duration::seconds(7);
        assert_eq!(extract_timedelta(delta).as_tuple(), (1, 3, 5, 3, 7));
    }

    #[test]
    fn test_extract_drops_subsecond_precision() {
        let delta = Duration::seconds(90) + Duration::milliseconds(999);
        assert_eq!(extract_timedelta(delta).as_tuple(), (0, 0, 0, 1, 30));
    }

    #[test]
    fn test_extract_zero() {
        assert_eq!(extract_timedelta(Duration::zero()), DurationParts::default());
    }

    #[test]
    fn test_oversized_parts_do_not_convert() {
        let overflowing = DurationParts {
            weeks: i64::MAX / 2,
            ..DurationParts::default()
        };
        assert_eq!(overflowing.total_seconds(), None);
        assert_eq!(overflowing.to_duration(), None);

        // fits in an i64 but not in a Duration
        let too_long = DurationParts {
            weeks: 1_000_000_000_000,
            ..DurationParts::default()
        };
        assert!(too_long.total_seconds().is_some());
        assert_eq!(too_long.to_duration(), None);
    }

    proptest! {
        #[test]
        fn test_extract_reconstructs_total(days in 0i64..100_000, secs in 0i64..86_400) {
            let parts = extract_timedelta(Duration::days(days) + Duration::seconds(secs));
            prop_assert_eq!(parts.weeks, days / 7);
            prop_assert_eq!(parts.days, days % 7);
            prop_assert!(parts.hours < 24 && parts.minutes < 60 && parts.seconds < 60);
            prop_assert_eq!(parts.hours * 3600 + parts.minutes * 60 + parts.seconds, secs);
            prop_assert_eq!(parts.total_seconds(), Some(days * 86_400 + secs));
        }
    }
}

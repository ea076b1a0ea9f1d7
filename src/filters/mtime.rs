//! Time window parsing and the two modification-time predicates.
//!
//! Both bounds are inclusive: an object modified exactly at `min_date` or
//! exactly at `max_date` passes.

use anyhow::{Result, anyhow};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta, Utc};
use tracing::debug;

use crate::filters::FilterSpec;
use crate::types::ObjectRecord;
use crate::types::error::S3cleanerError;

const MIN_DATE_FILTER_NAME: &str = "MinDateFilter";
const MAX_DATE_FILTER_NAME: &str = "MaxDateFilter";

// `%.f` also matches an absent fraction. `%b` accepts full month names too.
const OFFSET_DATE_TIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f %z",
    "%Y-%m-%dT%H:%M%z",
    "%Y-%m-%d %H:%M%z",
];
const NAIVE_DATE_TIME_FORMATS: [&str; 14] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%b %d %Y %H:%M:%S",
    "%b %d, %Y %H:%M:%S",
    "%b %d %Y %H:%M",
    "%b %d, %Y %I:%M %p",
    "%d %b %Y %H:%M:%S",
    "%d %b %Y %H:%M",
];
const NAIVE_DATE_FORMATS: [&str; 9] = [
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%b %d %Y",
    "%b %d, %Y",
    "%d %b %Y",
    "%d-%b-%Y",
    "%Y-%b-%d",
    "%a, %d %b %Y",
];

/// Parse `older_than` / `since` into `(min_date, max_date)`, relative to the current time.
///
/// `older_than` has the form `<integer><unit>` with unit one of `d`, `h`,
/// `m`, `w` (case-insensitive), and yields `max_date = now - value * unit`.
/// `since` is a date or date-time string and yields `min_date`.
pub fn parse_time_filter(
    older_than: Option<&str>,
    since: Option<&str>,
) -> Result<(Option<DateTime<Utc>>, Option<DateTime<Utc>>)> {
    parse_time_filter_at(Utc::now(), older_than, since)
}

/// Same as [`parse_time_filter`] with an explicit `now`.
pub fn parse_time_filter_at(
    now: DateTime<Utc>,
    older_than: Option<&str>,
    since: Option<&str>,
) -> Result<(Option<DateTime<Utc>>, Option<DateTime<Utc>>)> {
    let max_date = match older_than {
        Some(older_than) => Some(parse_older_than(now, older_than)?),
        None => None,
    };
    let min_date = match since {
        Some(since) => Some(parse_since(since)?),
        None => None,
    };

    Ok((min_date, max_date))
}

fn parse_older_than(now: DateTime<Utc>, older_than: &str) -> Result<DateTime<Utc>> {
    let delta = parse_age(older_than).map_err(|e| {
        anyhow!(S3cleanerError::InvalidFilter(format!(
            "invalid time format '{older_than}': {e}"
        )))
    })?;

    now.checked_sub_signed(delta).ok_or_else(|| {
        anyhow!(S3cleanerError::InvalidFilter(format!(
            "invalid time format '{older_than}': out of range"
        )))
    })
}

/// Parse `<integer><unit>` into a duration.
pub(crate) fn parse_age(value: &str) -> std::result::Result<TimeDelta, String> {
    let value = value.trim();
    let Some(unit) = value.chars().last() else {
        return Err("empty value".to_string());
    };
    let number = &value[..value.len() - unit.len_utf8()];

    let amount: i64 = number
        .parse()
        .map_err(|_| format!("'{number}' is not an integer"))?;
    if amount < 0 {
        return Err("value must not be negative".to_string());
    }

    let delta = match unit.to_ascii_lowercase() {
        'd' => TimeDelta::try_days(amount),
        'h' => TimeDelta::try_hours(amount),
        'm' => TimeDelta::try_minutes(amount),
        'w' => TimeDelta::try_weeks(amount),
        _ => {
            return Err(format!(
                "invalid time unit '{unit}'. Use 'd', 'h', 'm', or 'w'"
            ));
        }
    };

    delta.ok_or_else(|| "out of range".to_string())
}

/// Parse a `since` string.
///
/// Accepts RFC 3339, RFC 2822, ISO-like date-times with or without seconds
/// and fractions, US `month/day/year`, textual month names and compact
/// `YYYYMMDD`. Values without an offset are read as UTC and date-only values
/// as midnight.
pub(crate) fn parse_since(since: &str) -> Result<DateTime<Utc>> {
    let value = since.trim();

    parse_date_time(value).ok_or_else(|| {
        anyhow!(S3cleanerError::InvalidFilter(format!(
            "invalid date format '{since}'"
        )))
    })
}

fn parse_date_time(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(date_time) = DateTime::parse_from_rfc3339(value) {
        return Some(date_time.with_timezone(&Utc));
    }
    if let Ok(date_time) = DateTime::parse_from_rfc2822(value) {
        return Some(date_time.with_timezone(&Utc));
    }
    for format in OFFSET_DATE_TIME_FORMATS {
        if let Ok(date_time) = DateTime::parse_from_str(value, format) {
            return Some(date_time.with_timezone(&Utc));
        }
    }
    for format in NAIVE_DATE_TIME_FORMATS {
        if let Ok(date_time) = NaiveDateTime::parse_from_str(value, format) {
            return Some(date_time.and_utc());
        }
    }

    let date = NAIVE_DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
        .or_else(|| parse_compact_date(value))?;

    date.and_hms_opt(0, 0, 0).map(|date_time| date_time.and_utc())
}

/// `YYYYMMDD`. chrono's `%Y` is unbounded, so the digits are split here.
fn parse_compact_date(value: &str) -> Option<NaiveDate> {
    if value.len() != 8 || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let year = value[0..4].parse().ok()?;
    let month = value[4..6].parse().ok()?;
    let day = value[6..8].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

pub(crate) fn is_modified_on_or_after(record: &ObjectRecord, spec: &FilterSpec) -> bool {
    let Some(min_date) = spec.min_date else {
        return true;
    };

    if record.last_modified < min_date {
        debug!(
            name = MIN_DATE_FILTER_NAME,
            key = record.key,
            last_modified = record.last_modified.to_rfc3339(),
            config_time = min_date.to_rfc3339(),
            "object filtered."
        );
        return false;
    }

    true
}

pub(crate) fn is_modified_on_or_before(record: &ObjectRecord, spec: &FilterSpec) -> bool {
    let Some(max_date) = spec.max_date else {
        return true;
    };

    if record.last_modified > max_date {
        debug!(
            name = MAX_DATE_FILTER_NAME,
            key = record.key,
            last_modified = record.last_modified.to_rfc3339(),
            config_time = max_date.to_rfc3339(),
            "object filtered."
        );
        return false;
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::error::exit_code_from_error;
    use chrono::TimeZone;

    fn init_dummy_tracing_subscriber() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("dummy=trace")
            .try_init();
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn older_than_units() {
        init_dummy_tracing_subscriber();

        let cases = [
            ("7d", TimeDelta::days(7)),
            ("12h", TimeDelta::hours(12)),
            ("30m", TimeDelta::minutes(30)),
            ("2w", TimeDelta::weeks(2)),
            ("3D", TimeDelta::days(3)),
            ("0h", TimeDelta::zero()),
        ];

        for (value, delta) in cases {
            let (min_date, max_date) = parse_time_filter_at(now(), Some(value), None).unwrap();
            assert!(min_date.is_none());
            assert_eq!(max_date, Some(now() - delta), "{value}");
        }
    }

    #[test]
    fn older_than_invalid_values() {
        init_dummy_tracing_subscriber();

        for value in ["7y", "d", "", "x7d", "7.5d", "-1d", "7 days", "99999999999999w"] {
            let e = parse_time_filter_at(now(), Some(value), None).unwrap_err();
            assert!(
                matches!(
                    e.downcast_ref::<S3cleanerError>(),
                    Some(S3cleanerError::InvalidFilter(_))
                ),
                "{value}"
            );
            assert_eq!(exit_code_from_error(&e), 2);
        }
    }

    #[test]
    fn since_formats() {
        init_dummy_tracing_subscriber();

        let midnight = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let afternoon = Utc.with_ymd_and_hms(2024, 1, 2, 15, 30, 0).unwrap();

        assert_eq!(parse_since("2024-01-02").unwrap(), midnight);
        assert_eq!(parse_since("2024/01/02").unwrap(), midnight);
        assert_eq!(parse_since("2024-01-02 15:30:00").unwrap(), afternoon);
        assert_eq!(parse_since("2024-01-02T15:30:00").unwrap(), afternoon);
        assert_eq!(parse_since("2024-01-02T15:30:00Z").unwrap(), afternoon);
        assert_eq!(parse_since("2024-01-02T17:30:00+02:00").unwrap(), afternoon);
    }

    #[test]
    fn since_free_form_dates() {
        init_dummy_tracing_subscriber();

        let midnight = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let afternoon = Utc.with_ymd_and_hms(2024, 1, 2, 15, 30, 0).unwrap();

        for value in [
            "2024-01-02 15:30",
            "2024-01-02T15:30",
            "2024/01/02 15:30",
            "01/02/2024 15:30",
            "Jan 2 2024 15:30",
            "January 2, 2024 03:30 PM",
            "2 Jan 2024 15:30:00",
            "Tue, 02 Jan 2024 15:30:00 +0000",
            "2024-01-02 17:30:00 +0200",
        ] {
            let (min_date, _) = parse_time_filter_at(now(), None, Some(value)).unwrap();
            assert_eq!(min_date, Some(afternoon), "{value}");
        }

        for value in [
            "Jan 2 2024",
            "January 2, 2024",
            "2 January 2024",
            "02-Jan-2024",
            "2024-Jan-02",
            "01/02/2024",
            "20240102",
            "  2024-01-02  ",
        ] {
            let (min_date, _) = parse_time_filter_at(now(), None, Some(value)).unwrap();
            assert_eq!(min_date, Some(midnight), "{value}");
        }

        let with_millis = parse_since("2024-01-02T15:30:00.123").unwrap();
        assert_eq!(with_millis, afternoon + TimeDelta::milliseconds(123));
        assert_eq!(
            parse_since("2024-01-02 15:30:00.5").unwrap(),
            afternoon + TimeDelta::milliseconds(500)
        );
    }

    #[test]
    fn since_invalid_values() {
        init_dummy_tracing_subscriber();

        for value in [
            "yesterday",
            "2024-13-01",
            "01/02",
            "",
            "20241302",
            "2024010",
            "Smarch 2 2024",
        ] {
            let e = parse_time_filter_at(now(), None, Some(value)).unwrap_err();
            assert!(matches!(
                e.downcast_ref::<S3cleanerError>(),
                Some(S3cleanerError::InvalidFilter(_))
            ));
        }
    }

    #[test]
    fn both_bounds() {
        init_dummy_tracing_subscriber();

        let (min_date, max_date) =
            parse_time_filter_at(now(), Some("1d"), Some("2024-06-01")).unwrap();
        assert_eq!(min_date, Some(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()));
        assert_eq!(max_date, Some(Utc.with_ymd_and_hms(2024, 6, 14, 12, 0, 0).unwrap()));

        assert_eq!(parse_time_filter_at(now(), None, None).unwrap(), (None, None));
    }

    #[test]
    fn bounds_are_inclusive() {
        init_dummy_tracing_subscriber();

        let boundary = now();
        let spec = FilterSpec {
            min_date: Some(boundary),
            max_date: Some(boundary),
            ..Default::default()
        };

        let on_boundary = ObjectRecord::new("a", boundary, 0);
        let before = ObjectRecord::new("b", boundary - TimeDelta::seconds(1), 0);
        let after = ObjectRecord::new("c", boundary + TimeDelta::seconds(1), 0);

        assert!(is_modified_on_or_after(&on_boundary, &spec));
        assert!(is_modified_on_or_before(&on_boundary, &spec));
        assert!(!is_modified_on_or_after(&before, &spec));
        assert!(is_modified_on_or_before(&before, &spec));
        assert!(is_modified_on_or_after(&after, &spec));
        assert!(!is_modified_on_or_before(&after, &spec));
    }
}

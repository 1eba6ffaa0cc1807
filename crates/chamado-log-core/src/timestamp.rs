//! Timestamp normalizer.
//!
//! Persisted data spans multiple historical serialization formats: newer
//! code wrote RFC 3339 UTC strings, older snapshots (and externally edited
//! backups) carry locale-formatted `DD/MM/YYYY, HH:MM:SS` wall-clock
//! strings. The normalizer tolerates both and never panics; an unparsable
//! string yields `None`, which callers treat as "exclude from date-based
//! views".

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use regex::Regex;

/// Fixed-position capture of the legacy locale format, e.g.
/// `15/03/2024, 14:30:00`.
static LOCALE_FORMAT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{2})/(\d{2})/(\d{4}), (\d{2}):(\d{2}):(\d{2})").expect("static regex")
});

/// Parse an arbitrary timestamp string into a canonical instant.
///
/// Priority order:
/// 1. ISO-8601 shape with the UTC marker (`T` and `Z` present) — RFC 3339;
/// 2. legacy locale format, interpreted as wall-clock time in `tz`;
/// 3. generic fallbacks (RFC 3339 with offset, `YYYY-MM-DDTHH:MM:SS` local,
///    bare `YYYY-MM-DD` at local midnight);
/// 4. `None`.
#[must_use]
pub fn parse_timestamp_in<Tz: TimeZone>(raw: &str, tz: &Tz) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if raw.contains('T') && raw.contains('Z') {
        return DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|dt| dt.with_timezone(&Utc));
    }

    if let Some(caps) = LOCALE_FORMAT.captures(raw) {
        // Captures are all-digit by construction; the parses cannot fail.
        let field = |i: usize| caps[i].parse::<u32>().ok();
        let (day, month, hour, minute, second) =
            (field(1)?, field(2)?, field(4)?, field(5)?, field(6)?);
        let year = caps[3].parse::<i32>().ok()?;
        let date = NaiveDate::from_ymd_opt(year, month, day)?;
        let naive = date.and_hms_opt(hour, minute, second)?;
        return from_wall_clock(&naive, tz);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return from_wall_clock(&naive, tz);
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return from_wall_clock(&date.and_hms_opt(0, 0, 0)?, tz);
    }

    None
}

/// Resolve a wall-clock datetime in `tz` to an instant, taking the earliest
/// candidate across DST transitions.
fn from_wall_clock<Tz: TimeZone>(naive: &NaiveDateTime, tz: &Tz) -> Option<DateTime<Utc>> {
    tz.from_local_datetime(naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

/// The local calendar date of an instant in `tz`. All date bucketing keys
/// off this, never off the raw instant.
#[must_use]
pub fn local_date<Tz: TimeZone>(instant: &DateTime<Utc>, tz: &Tz) -> NaiveDate {
    instant.with_timezone(tz).date_naive()
}

/// Canonical storage encoding: RFC 3339 UTC with milliseconds, matching the
/// strings historically written by the application.
#[must_use]
pub fn to_canonical(instant: &DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Localized rendering for the report export, in the same locale format the
/// normalizer accepts back.
#[must_use]
pub fn to_locale<Tz: TimeZone>(instant: &DateTime<Utc>, tz: &Tz) -> String {
    instant
        .with_timezone(tz)
        .naive_local()
        .format("%d/%m/%Y, %H:%M:%S")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    fn brt() -> FixedOffset {
        FixedOffset::west_opt(3 * 3600).unwrap()
    }

    #[test]
    fn iso_and_locale_encodings_normalize_to_the_same_instant() {
        let tz = brt();
        // 14:30 wall clock at UTC-3 is 17:30 UTC.
        let locale = parse_timestamp_in("15/03/2024, 14:30:00", &tz).unwrap();
        let iso = parse_timestamp_in("2024-03-15T17:30:00.000Z", &tz).unwrap();
        assert_eq!(locale, iso);
    }

    #[test]
    fn canonical_encoding_round_trips() {
        let tz = brt();
        let instant = parse_timestamp_in("2024-03-15T17:30:00.000Z", &tz).unwrap();
        let encoded = to_canonical(&instant);
        assert_eq!(encoded, "2024-03-15T17:30:00.000Z");
        assert_eq!(parse_timestamp_in(&encoded, &tz), Some(instant));
    }

    #[test]
    fn generic_fallbacks_are_interpreted_as_local_time() {
        let tz = brt();
        let midnight = parse_timestamp_in("2024-03-01", &tz).unwrap();
        assert_eq!(to_canonical(&midnight), "2024-03-01T03:00:00.000Z");

        let datetime_local = parse_timestamp_in("2024-03-01T10:00:00", &tz).unwrap();
        assert_eq!(to_canonical(&datetime_local), "2024-03-01T13:00:00.000Z");

        let offset = parse_timestamp_in("2024-03-01T10:00:00-03:00", &tz).unwrap();
        assert_eq!(datetime_local, offset);
    }

    #[test]
    fn garbage_is_invalid_not_a_panic() {
        let tz = brt();
        assert_eq!(parse_timestamp_in("", &tz), None);
        assert_eq!(parse_timestamp_in("not a date", &tz), None);
        assert_eq!(parse_timestamp_in("99/99/2024, 10:00:00", &tz), None);
        assert_eq!(parse_timestamp_in("2024-13-40TZ", &tz), None);
    }

    #[test]
    fn locale_rendering_matches_the_legacy_shape() {
        let tz = brt();
        let instant = parse_timestamp_in("2024-03-15T17:30:00.000Z", &tz).unwrap();
        let rendered = to_locale(&instant, &tz);
        assert_eq!(rendered, "15/03/2024, 14:30:00");
        // The rendering is parseable by the normalizer itself.
        assert_eq!(parse_timestamp_in(&rendered, &tz), Some(instant));
    }

    #[test]
    fn local_date_buckets_by_wall_clock_day() {
        let tz = brt();
        // 02:00 UTC is still the previous local day at UTC-3.
        let instant = parse_timestamp_in("2024-03-02T02:00:00.000Z", &tz).unwrap();
        assert_eq!(
            local_date(&instant, &tz),
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
        );
    }
}

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};

/// Lenient parsing for `timestamp` attributes. Reports in the wild carry
/// RFC 3339 datetimes, naive datetimes, or bare dates; naive values are
/// taken as UTC. Anything else yields `None`, never an error.
pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|naive| naive.and_utc().fixed_offset())
        })
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
                .map(|naive| naive.and_utc().fixed_offset())
        })
}

//! Temporal parsing for FHIR `instant`, `dateTime` and `date` text.
//!
//! Accepted encodings, most specific first:
//! - RFC 3339 date-time with offset (`2024-03-01T10:15:00+02:00`, `...Z`)
//! - date-time without offset, read as UTC (`2024-03-01T10:15:00`)
//! - bare or partial date (`2024-03-01`, `2024-03`, `2024`), read as midnight UTC
//!   on the first day of the period

use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, Month, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};

use crate::error::{CoreError, Result};

pub fn now_utc() -> OffsetDateTime {
    OffsetDateTime::now_utc()
}

/// Parse any accepted temporal encoding into a UTC-normalizable timestamp.
pub fn parse_instant(text: &str) -> Result<OffsetDateTime> {
    let text = text.trim();
    if let Ok(dt) = OffsetDateTime::parse(text, &Rfc3339) {
        return Ok(dt);
    }
    let naive = format_description!(
        "[year]-[month]-[day]T[hour]:[minute]:[second][optional [.[subsecond]]]"
    );
    if let Ok(dt) = PrimitiveDateTime::parse(text, naive) {
        return Ok(dt.assume_utc());
    }
    let date = parse_date(text)?;
    Ok(PrimitiveDateTime::new(date, Time::MIDNIGHT).assume_utc())
}

/// Parse a full or partial FHIR date. Partial dates resolve to the first day.
pub fn parse_date(text: &str) -> Result<Date> {
    let text = text.trim();
    let invalid = || CoreError::invalid_date_time(text);

    let mut parts = text.splitn(3, '-');
    let year = parts
        .next()
        .filter(|y| y.len() == 4)
        .and_then(|y| y.parse::<i32>().ok())
        .ok_or_else(invalid)?;
    let month = match parts.next() {
        Some(m) if m.len() == 2 => m
            .parse::<u8>()
            .ok()
            .and_then(|m| Month::try_from(m).ok())
            .ok_or_else(invalid)?,
        Some(_) => return Err(invalid()),
        None => Month::January,
    };
    let day = match parts.next() {
        Some(d) if d.len() == 2 => d.parse::<u8>().map_err(|_| invalid())?,
        Some(_) => return Err(invalid()),
        None => 1,
    };
    Date::from_calendar_date(year, month, day).map_err(|_| invalid())
}

/// Render a timestamp in the single textual form used in stored documents:
/// RFC 3339 in UTC.
pub fn format_instant(value: &OffsetDateTime) -> Option<String> {
    value.to_offset(UtcOffset::UTC).format(&Rfc3339).ok()
}

pub fn format_date(value: &Date) -> Option<String> {
    value.format(format_description!("[year]-[month]-[day]")).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime};

    #[test]
    fn parses_rfc3339_with_offset() {
        let dt = parse_instant("2024-03-01T10:15:00+02:00").unwrap();
        assert_eq!(dt, datetime!(2024-03-01 08:15:00 UTC));
    }

    #[test]
    fn parses_zulu_with_fraction() {
        let dt = parse_instant("2024-03-01T10:15:00.250Z").unwrap();
        assert_eq!(dt, datetime!(2024-03-01 10:15:00.25 UTC));
    }

    #[test]
    fn naive_datetime_is_utc() {
        let dt = parse_instant("2024-03-01T10:15:00").unwrap();
        assert_eq!(dt, datetime!(2024-03-01 10:15:00 UTC));
    }

    #[test]
    fn date_only_becomes_midnight() {
        let dt = parse_instant("2024-03-01").unwrap();
        assert_eq!(dt, datetime!(2024-03-01 00:00:00 UTC));
    }

    #[test]
    fn partial_dates_resolve_to_first_day() {
        assert_eq!(parse_date("2024-03").unwrap(), date!(2024-03-01));
        assert_eq!(parse_date("1985").unwrap(), date!(1985-01-01));
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_instant("yesterday").is_err());
        assert!(parse_date("2024-13-01").is_err());
        assert!(parse_date("2024-02-30").is_err());
        assert!(parse_date("24-01-01").is_err());
        assert!(parse_date("").is_err());
    }

    #[test]
    fn formats_round_trip() {
        let dt = datetime!(2024-03-01 08:15:00 UTC);
        let text = format_instant(&dt).unwrap();
        assert_eq!(text, "2024-03-01T08:15:00Z");
        assert_eq!(parse_instant(&text).unwrap(), dt);
        assert_eq!(format_date(&date!(1985-05-15)).unwrap(), "1985-05-15");
    }

    #[test]
    fn offsets_are_rendered_in_utc() {
        let local = parse_instant("2024-03-01T10:15:00+02:00").unwrap();
        let zulu = parse_instant("2024-03-01T08:15:00Z").unwrap();
        assert_eq!(format_instant(&local), format_instant(&zulu));
        assert_eq!(format_instant(&local).unwrap(), "2024-03-01T08:15:00Z");
    }
}

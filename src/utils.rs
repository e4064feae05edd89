use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};

pub fn utc_from_millis(millis: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Parse a backend timestamp. The API emits RFC 3339 with offset for most
/// entities but bare naive datetimes for some data entries.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Local date+time string for display. Falls back to the raw string
/// unmodified when the value does not parse.
pub fn format_timestamp(raw: &str) -> String {
    match parse_timestamp(raw) {
        Some(ts) => DateTime::<Local>::from(ts)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string(),
        None => raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn parses_rfc3339_with_offset() {
        let ts = parse_timestamp("2024-05-01T12:30:00+02:00").unwrap();
        assert_eq!(ts.hour(), 10);
    }

    #[test]
    fn parses_naive_datetime() {
        assert!(parse_timestamp("2024-05-01T12:30:00.123").is_some());
        assert!(parse_timestamp("2024-05-01 12:30:00").is_some());
    }

    #[test]
    fn format_falls_back_to_raw_string() {
        assert_eq!(format_timestamp("not a date"), "not a date");
        assert_eq!(format_timestamp(""), "");
    }

    #[test]
    fn format_produces_date_and_time() {
        let formatted = format_timestamp("2024-05-01T12:30:00Z");
        assert_eq!(formatted.len(), 19);
        assert!(formatted.contains(' '));
    }
}

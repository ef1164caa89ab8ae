use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// Parses the date shapes the backend emits: RFC 3339 timestamps, naive
/// `YYYY-MM-DD HH:MM:SS` timestamps and plain `YYYY-MM-DD` dates.
pub(crate) fn parse_temporal(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(value) {
        return Some(timestamp.naive_utc());
    }

    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(timestamp) = NaiveDateTime::parse_from_str(value, format) {
            return Some(timestamp);
        }
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

/// Parses a range bound. Date-only upper bounds cover the whole day.
pub(crate) fn parse_bound(value: &str, upper: bool) -> Option<NaiveDateTime> {
    let trimmed = value.trim();
    if upper && let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return date.and_hms_opt(23, 59, 59);
    }

    parse_temporal(trimmed)
}

#[cfg(test)]
mod tests {
    use super::{parse_bound, parse_temporal};

    #[test]
    fn parses_backend_date_shapes() {
        assert!(parse_temporal("2025-01-15").is_some());
        assert!(parse_temporal("2025-01-15 08:30:00").is_some());
        assert!(parse_temporal("2025-01-15T08:30:00.000Z").is_some());
        assert!(parse_temporal("15/01/2025").is_none());
    }

    #[test]
    fn date_only_upper_bound_includes_the_whole_day() {
        let bound = parse_bound("2025-01-15", true);
        let evening = parse_temporal("2025-01-15 21:00:00");
        assert!(bound.is_some() && evening <= bound);
    }
}

//! Timestamp parsing for loaded tables.
//!
//! Accepted forms: `YYYY-MM-DD`, `YYYY-MM-DD HH:MM:SS[.fff]`, the same with
//! a `T` separator, and `YYYY/MM/DD[ HH:MM:SS]`. A bare date maps to midnight.

use chrono::{NaiveDate, NaiveDateTime};

use crate::domain::Timestamp;

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S%.f",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%Y%m%d"];

pub fn parse_timestamp(raw: &str) -> Option<Timestamp> {
    let raw = raw.trim();
    for fmt in DATETIME_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(ts);
        }
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_common_forms() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(14, 30, 0)
            .unwrap();
        assert_eq!(parse_timestamp("2024-03-05 14:30:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-05T14:30:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-05 14:30:00.000"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-05 14:30"), Some(expected));
    }

    #[test]
    fn bare_date_is_midnight() {
        let ts = parse_timestamp("2024-03-05").unwrap();
        assert_eq!(ts.date(), NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
        assert_eq!(ts.time(), chrono::NaiveTime::MIN);
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_timestamp("yesterday"), None);
        assert_eq!(parse_timestamp(""), None);
    }
}

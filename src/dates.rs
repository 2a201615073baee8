// Stay date handling: parsing check-in/check-out values and counting nights

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use thiserror::Error;

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DateError {
    #[error("Invalid date: {0:?}")]
    InvalidDate(String),
}

// Why a range cannot be booked yet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncompleteReason {
    MissingCheckIn,
    MissingCheckOut,
    CheckOutBeforeCheckIn,
    EmptyStay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StayRange {
    Complete {
        check_in: DateTime<Utc>,
        check_out: DateTime<Utc>,
        nights: u32,
    },
    Incomplete(IncompleteReason),
}

impl StayRange {
    /// Resolves a pair of stay boundaries into a night count.
    ///
    /// Any partial day counts as a full night. A check-out before the
    /// check-in, or two identical instants, yield an incomplete range with
    /// zero nights.
    pub fn resolve(check_in: Option<DateTime<Utc>>, check_out: Option<DateTime<Utc>>) -> Self {
        let (check_in, check_out) = match (check_in, check_out) {
            (None, _) => return Self::Incomplete(IncompleteReason::MissingCheckIn),
            (_, None) => return Self::Incomplete(IncompleteReason::MissingCheckOut),
            (Some(check_in), Some(check_out)) => (check_in, check_out),
        };

        let millis = (check_out - check_in).num_milliseconds();
        if millis < 0 {
            return Self::Incomplete(IncompleteReason::CheckOutBeforeCheckIn);
        }
        if millis == 0 {
            return Self::Incomplete(IncompleteReason::EmptyStay);
        }

        let nights = (millis + MILLIS_PER_DAY - 1) / MILLIS_PER_DAY;
        Self::Complete {
            check_in,
            check_out,
            nights: u32::try_from(nights).unwrap_or(u32::MAX),
        }
    }

    /// Same as [`StayRange::resolve`] for raw form values. Blank values count
    /// as absent.
    pub fn resolve_raw(check_in: Option<&str>, check_out: Option<&str>) -> Result<Self, DateError> {
        let check_in = non_blank(check_in).map(parse_stay_date).transpose()?;
        let check_out = non_blank(check_out).map(parse_stay_date).transpose()?;
        Ok(Self::resolve(check_in, check_out))
    }

    pub fn nights(&self) -> u32 {
        match self {
            Self::Complete { nights, .. } => *nights,
            Self::Incomplete(_) => 0,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete { .. })
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Parses a stay boundary. Calendar dates (`2025-06-01`) map to midnight UTC;
/// full RFC 3339 timestamps keep their instant.
pub fn parse_stay_date(raw: &str) -> Result<DateTime<Utc>, DateError> {
    parse_with_offset(raw).map(|instant| instant.with_timezone(&Utc))
}

// Calendar day as the guest entered it, ignoring any UTC shift of the offset
pub fn parse_entered_date(raw: &str) -> Result<NaiveDate, DateError> {
    parse_with_offset(raw).map(|instant| instant.date_naive())
}

fn parse_with_offset(raw: &str) -> Result<DateTime<FixedOffset>, DateError> {
    let raw = raw.trim();

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)).fixed_offset());
    }

    DateTime::parse_from_rfc3339(raw).map_err(|_| DateError::InvalidDate(raw.to_string()))
}

pub fn nights_label(nights: u32) -> String {
    if nights == 1 {
        "1 Night".to_string()
    } else {
        format!("{nights} Nights")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("2025-01-01", "2025-01-03", 2; "two calendar days")]
    #[test_case("2025-01-31", "2025-02-01", 1; "across month end")]
    #[test_case("2024-02-28", "2024-03-01", 2; "leap year february")]
    #[test_case("2025-01-01T00:00:00Z", "2025-01-02T01:00:00Z", 2; "partial day rounds up")]
    #[test_case("2025-01-01T12:00:00Z", "2025-01-01T13:00:00Z", 1; "one hour is a night")]
    #[test_case("2025-01-01T00:00:00+05:30", "2025-01-02T00:00:00+05:30", 1; "offset timestamps")]
    fn test_nights(check_in: &str, check_out: &str, expected: u32) {
        let range = StayRange::resolve_raw(Some(check_in), Some(check_out)).unwrap();
        assert!(range.is_complete());
        assert_eq!(range.nights(), expected);
    }

    #[test_case(None, Some("2025-01-03"), IncompleteReason::MissingCheckIn; "no check-in")]
    #[test_case(Some("2025-01-01"), None, IncompleteReason::MissingCheckOut; "no check-out")]
    #[test_case(Some("  "), Some("2025-01-03"), IncompleteReason::MissingCheckIn; "blank check-in")]
    #[test_case(Some("2025-01-05"), Some("2025-01-03"), IncompleteReason::CheckOutBeforeCheckIn; "reversed")]
    #[test_case(Some("2025-01-05"), Some("2025-01-05"), IncompleteReason::EmptyStay; "same day")]
    fn test_incomplete(check_in: Option<&str>, check_out: Option<&str>, reason: IncompleteReason) {
        let range = StayRange::resolve_raw(check_in, check_out).unwrap();
        assert_eq!(range, StayRange::Incomplete(reason));
        assert_eq!(range.nights(), 0);
        assert!(!range.is_complete());
    }

    #[test]
    fn test_invalid_date() {
        let result = StayRange::resolve_raw(Some("01/06/2025"), Some("2025-06-05"));
        assert_eq!(result, Err(DateError::InvalidDate("01/06/2025".to_string())));
    }

    #[test]
    fn test_calendar_date_is_midnight_utc() {
        let parsed = parse_stay_date("2025-06-01").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2025-06-01T00:00:00+00:00");
    }

    #[test_case("2025-01-01", "2025-01-01"; "calendar date")]
    #[test_case(" 2025-01-01T00:00:00+05:30 ", "2025-01-01"; "ahead of utc")]
    #[test_case("2025-01-01T22:00:00-08:00", "2025-01-01"; "behind utc")]
    fn test_entered_date_keeps_local_day(raw: &str, expected: &str) {
        assert_eq!(
            parse_entered_date(raw).unwrap().to_string(),
            expected
        );
    }

    #[test]
    fn test_nights_label() {
        assert_eq!(nights_label(1), "1 Night");
        assert_eq!(nights_label(0), "0 Nights");
        assert_eq!(nights_label(3), "3 Nights");
    }
}

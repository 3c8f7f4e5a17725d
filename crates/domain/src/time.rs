//! Time and timestamp helpers.

use chrono::{DateTime, Local, NaiveTime, Utc};

/// UTC timestamp used for request creation, timer scheduling, etc.
pub type Timestamp = DateTime<Utc>;

/// Return the current UTC time.
#[must_use]
pub fn now() -> Timestamp {
    Utc::now()
}

/// Current local wall-clock time of day, used by `time` conditions.
#[must_use]
pub fn local_time_of_day() -> NaiveTime {
    Local::now().time()
}

/// Format a time of day as zero-padded 24-hour `HH:MM`.
#[must_use]
pub fn clock_string(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

/// Check that `value` is a zero-padded 24-hour `HH:MM` string.
///
/// Only this exact shape keeps lexicographic and chronological ordering
/// identical, so looser forms like `7:05` are rejected.
#[must_use]
pub fn is_clock_string(value: &str) -> bool {
    value.len() == 5
        && value.as_bytes()[2] == b':'
        && NaiveTime::parse_from_str(value, "%H:%M").is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_return_current_utc_time() {
        let before = Utc::now();
        let ts = now();
        let after = Utc::now();
        assert!(ts >= before);
        assert!(ts <= after);
    }

    #[test]
    fn should_format_clock_string_with_zero_padding() {
        let time = NaiveTime::from_hms_opt(7, 5, 59).unwrap();
        assert_eq!(clock_string(time), "07:05");
    }

    #[test]
    fn should_accept_zero_padded_clock_strings() {
        assert!(is_clock_string("00:00"));
        assert!(is_clock_string("23:59"));
    }

    #[test]
    fn should_reject_malformed_clock_strings() {
        assert!(!is_clock_string("7:05"));
        assert!(!is_clock_string("24:00"));
        assert!(!is_clock_string("12-30"));
        assert!(!is_clock_string("noon"));
    }
}

//! Calendar-day keys in the user's local timezone.
//!
//! A day key is an ISO `YYYY-MM-DD` string. Keys compare lexicographically in
//! date order, which the history merge relies on.

use chrono::{Local, NaiveDate};

pub type DateKey = String;

const KEY_FORMAT: &str = "%Y-%m-%d";

/// Current local calendar date. Stable for the whole local day, regardless of
/// where UTC midnight falls.
pub fn today_key() -> DateKey {
    to_key(Local::now().date_naive())
}

pub fn to_key(date: NaiveDate) -> DateKey {
    date.format(KEY_FORMAT).to_string()
}

pub fn parse_key(key: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(key.trim(), KEY_FORMAT).ok()
}

pub fn is_valid_key(key: &str) -> bool {
    parse_key(key).is_some()
}

/// Rewrite any parseable key in canonical zero-padded form.
pub fn normalize_key(key: &str) -> Option<DateKey> {
    parse_key(key).map(to_key)
}

/// Whole days from `earlier` to `later`, or `None` if either key is malformed.
pub fn days_between(earlier: &str, later: &str) -> Option<i64> {
    let earlier = parse_key(earlier)?;
    let later = parse_key(later)?;
    Some((later - earlier).num_days())
}

/// 1-indexed day count: the start date itself is day 1. Never below 1.
pub fn days_active(start_date: &str, today: &str) -> i64 {
    match days_between(start_date, today) {
        Some(diff) => (diff + 1).max(1),
        None => 1,
    }
}

pub fn days_active_today(start_date: &str) -> i64 {
    days_active(start_date, &today_key())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_today_key_shape() {
        let key = today_key();
        assert_eq!(key.len(), 10);
        assert!(is_valid_key(&key));
        assert_eq!(key, to_key(Local::now().date_naive()));
    }

    #[test]
    fn test_days_active_counts_start_as_day_one() {
        assert_eq!(days_active("2024-01-01", "2024-01-01"), 1);
        assert_eq!(days_active("2024-01-01", "2024-01-03"), 3);
        assert_eq!(days_active("2024-02-28", "2024-03-01"), 3);
    }

    #[test]
    fn test_days_active_floors_at_one() {
        assert_eq!(days_active("2024-01-10", "2024-01-01"), 1);
        assert_eq!(days_active("not-a-date", "2024-01-01"), 1);
        assert_eq!(days_active("2024-01-01", ""), 1);
    }

    #[test]
    fn test_normalize_key_pads_and_trims() {
        assert_eq!(normalize_key("2024-1-5").as_deref(), Some("2024-01-05"));
        assert_eq!(normalize_key(" 2024-01-05 ").as_deref(), Some("2024-01-05"));
        assert_eq!(normalize_key("2024-02-30"), None);
        assert_eq!(normalize_key("yesterday"), None);
    }

    #[test]
    fn test_days_between() {
        assert_eq!(days_between("2024-01-01", "2024-01-08"), Some(7));
        assert_eq!(days_between("2024-01-08", "2024-01-01"), Some(-7));
        assert_eq!(days_between("2024-13-01", "2024-01-01"), None);
    }
}

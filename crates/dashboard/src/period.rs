//! Period selector: maps a symbolic range to the calendar days to load.
//!
//! Ranges are anchored two days before today, because the upstream daily
//! files for the last two days are not complete yet. The most recent day is
//! therefore never part of any range.
use chrono::{Duration, Local, NaiveDate};
use serde::Deserialize;
use std::fmt;

/// Days between today and the most recent day a range may include.
pub const ANCHOR_OFFSET_DAYS: i64 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Period {
    Today,
    ThisWeek,
    ThisMonth,
}

impl Period {
    pub const ALL: [Period; 3] = [Period::Today, Period::ThisWeek, Period::ThisMonth];

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "today" => Some(Self::Today),
            "this_week" => Some(Self::ThisWeek),
            "this_month" => Some(Self::ThisMonth),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Today => "today",
            Self::ThisWeek => "this_week",
            Self::ThisMonth => "this_month",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Today => "Today",
            Self::ThisWeek => "This week",
            Self::ThisMonth => "This month",
        }
    }

    pub fn day_count(&self) -> i64 {
        match self {
            Self::Today => 1,
            Self::ThisWeek => 7,
            Self::ThisMonth => 30,
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn anchor_date(today: NaiveDate) -> NaiveDate {
    today - Duration::days(ANCHOR_OFFSET_DAYS)
}

/// Dates covered by `period`, most recent first, as `YYYY-MM-DD`.
pub fn resolve(period: Period, today: NaiveDate) -> Vec<String> {
    let anchor = anchor_date(today);
    (0..period.day_count())
        .map(|i| (anchor - Duration::days(i)).format("%Y-%m-%d").to_string())
        .collect()
}

/// Like [`resolve`], for a raw tag. Unknown tags cover no days.
#[allow(dead_code)]
pub fn resolve_tag(tag: &str, today: NaiveDate) -> Vec<String> {
    Period::from_tag(tag).map_or_else(Vec::new, |p| resolve(p, today))
}

pub fn resolve_now(period: Period) -> Vec<String> {
    resolve(period, Local::now().date_naive())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_today_is_anchor_only() {
        assert_eq!(resolve(Period::Today, date("2024-03-15")), vec!["2024-03-13"]);
    }

    #[test]
    fn test_today_matches_system_date_minus_two() {
        let expected = (Local::now().date_naive() - Duration::days(2))
            .format("%Y-%m-%d")
            .to_string();
        let dates = resolve_now(Period::Today);
        // A midnight rollover between the two calls is the only way this can differ.
        assert_eq!(dates.len(), 1);
        assert!(dates[0] == expected || dates[0] > expected);
    }

    #[test]
    fn test_this_week_is_seven_descending_days() {
        let dates = resolve(Period::ThisWeek, date("2024-03-15"));
        assert_eq!(
            dates,
            vec![
                "2024-03-13",
                "2024-03-12",
                "2024-03-11",
                "2024-03-10",
                "2024-03-09",
                "2024-03-08",
                "2024-03-07",
            ]
        );
    }

    #[test]
    fn test_this_month_is_thirty_consecutive_days() {
        let today = date("2024-03-15");
        let dates = resolve(Period::ThisMonth, today);
        assert_eq!(dates.len(), 30);
        assert_eq!(dates[0], "2024-03-13");
        assert_eq!(dates[29], "2024-02-13");
        for pair in dates.windows(2) {
            let a = date(&pair[0]);
            let b = date(&pair[1]);
            assert_eq!(a - b, Duration::days(1));
        }
    }

    #[test]
    fn test_range_crosses_year_and_leap_day() {
        assert_eq!(resolve(Period::Today, date("2024-01-01")), vec!["2023-12-30"]);
        let week = resolve(Period::ThisWeek, date("2024-03-02"));
        assert_eq!(week[0], "2024-02-29");
        assert_eq!(week[6], "2024-02-23");
    }

    #[test]
    fn test_dates_are_zero_padded() {
        let dates = resolve(Period::Today, date("2024-01-07"));
        assert_eq!(dates, vec!["2024-01-05"]);
    }

    #[test]
    fn test_unknown_tag_yields_no_dates() {
        assert!(resolve_tag("last_year", date("2024-03-15")).is_empty());
        assert!(resolve_tag("", date("2024-03-15")).is_empty());
        assert_eq!(resolve_tag("this_week", date("2024-03-15")).len(), 7);
    }

    #[test]
    fn test_tag_roundtrip() {
        for p in Period::ALL {
            assert_eq!(Period::from_tag(p.as_str()), Some(p));
        }
        assert_eq!(Period::from_tag("This_Week"), None);
    }
}

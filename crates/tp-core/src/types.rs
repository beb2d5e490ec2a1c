//! Common date types used throughout Timepiece RS
//!
//! Weeks start on Monday. A date used as an instant bound means midnight
//! UTC at the start of that date.

use chrono::{DateTime, Datelike, Days, Months, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// Midnight UTC at the start of `date`
pub fn midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// Inclusive date range (start_date to end_date)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl DateRange {
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            start_date,
            end_date,
        }
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start_date <= day && day <= self.end_date
    }

    /// Range starting on the first of `day`'s month, ending on its last day
    pub fn month_of(day: NaiveDate) -> Self {
        let first = day.with_day(1).unwrap_or(day);
        let next = first + Months::new(1);
        Self::new(first, next - Days::new(1))
    }
}

/// A Monday-based calendar week
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Week {
    start: NaiveDate,
}

impl Week {
    /// The week that contains `day`
    pub fn containing(day: NaiveDate) -> Self {
        let offset = day.weekday().num_days_from_monday() as u64;
        Self {
            start: day - Days::new(offset),
        }
    }

    /// Monday of this week
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// Monday of the following week
    pub fn next_start(&self) -> NaiveDate {
        self.start + Days::new(7)
    }

    /// Sunday of this week
    pub fn last_day(&self) -> NaiveDate {
        self.start + Days::new(6)
    }

    pub fn next(&self) -> Self {
        Self {
            start: self.next_start(),
        }
    }

    pub fn previous(&self) -> Self {
        Self {
            start: self.start - Days::new(7),
        }
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day < self.next_start()
    }

    /// Half-open instant window `[monday 00:00, next monday 00:00)`
    pub fn window(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        (midnight(self.start), midnight(self.next_start()))
    }
}

impl std::fmt::Display for Week {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "week of {}", self.start)
    }
}

/// Week starts from the week containing `start` through the last week
/// start that is not after `end`
pub fn generate_weeks(start: NaiveDate, end: NaiveDate) -> Vec<Week> {
    let mut weeks = Vec::new();
    let mut week = Week::containing(start);
    while week.start() <= end {
        weeks.push(week);
        week = week.next();
    }
    weeks
}

/// Every week that shares at least one day with `day`'s month
pub fn weeks_in_month(day: NaiveDate) -> Vec<Week> {
    let month = DateRange::month_of(day);
    generate_weeks(month.start_date, month.end_date)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_week_containing() {
        // 2024-05-15 is a Wednesday
        let week = Week::containing(date(2024, 5, 15));
        assert_eq!(week.start(), date(2024, 5, 13));
        assert_eq!(week.next_start(), date(2024, 5, 20));
        assert_eq!(week.last_day(), date(2024, 5, 19));
        assert!(week.contains(date(2024, 5, 19)));
        assert!(!week.contains(date(2024, 5, 20)));
        assert_eq!(Week::containing(date(2024, 5, 13)), week);
        assert_eq!(Week::containing(date(2024, 5, 19)), week);
    }

    #[test]
    fn test_week_window() {
        let week = Week::containing(date(2024, 5, 15));
        let (lo, hi) = week.window();
        assert_eq!(lo, midnight(date(2024, 5, 13)));
        assert_eq!((hi - lo).num_days(), 7);
    }

    #[test]
    fn test_generate_weeks() {
        let weeks = generate_weeks(date(2024, 5, 15), date(2024, 6, 3));
        let starts: Vec<_> = weeks.iter().map(|w| w.start()).collect();
        assert_eq!(
            starts,
            vec![date(2024, 5, 13), date(2024, 5, 20), date(2024, 5, 27), date(2024, 6, 3)]
        );
        assert!(generate_weeks(date(2024, 6, 4), date(2024, 6, 2)).is_empty());
    }

    #[test]
    fn test_weeks_in_month() {
        // February 2024 starts on a Thursday and ends on a Thursday
        let weeks = weeks_in_month(date(2024, 2, 10));
        assert_eq!(weeks.len(), 5);
        assert_eq!(weeks[0].start(), date(2024, 1, 29));
        assert_eq!(weeks[4].start(), date(2024, 2, 26));
    }

    #[test]
    fn test_date_range() {
        let month = DateRange::month_of(date(2024, 2, 10));
        assert_eq!(month.start_date, date(2024, 2, 1));
        assert_eq!(month.end_date, date(2024, 2, 29));
        assert!(month.contains(date(2024, 2, 29)));
    }
}

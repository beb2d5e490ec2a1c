//! Repeat periods and billing windows
//!
//! Tables: repeat_periods, billing_windows, person_repeat_periods
//!
//! A repeat period is a recurrence rule ("2 weeks", "1 month"). Its billing
//! windows form an ordered, gapless sequence of `[date, end_date)` ranges
//! that is only ever extended forward.

use chrono::{Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use tp_core::traits::{Entity, Id, Identifiable};
use validator::Validate;

/// Unit of a repeat period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatInterval {
    Day,
    Week,
    Month,
    Year,
}

impl RepeatInterval {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
            Self::Year => "year",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "day" => Some(Self::Day),
            "week" => Some(Self::Week),
            "month" => Some(Self::Month),
            "year" => Some(Self::Year),
            _ => None,
        }
    }
}

/// Recurrence rule owning a sequence of billing windows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct RepeatPeriod {
    pub id: Option<Id>,

    #[validate(range(min = 1, max = 31))]
    pub count: u32,

    pub interval: RepeatInterval,

    /// Only active periods are extended by the batch update
    #[serde(default)]
    pub active: bool,
}

impl Identifiable for RepeatPeriod {
    fn id(&self) -> Option<Id> {
        self.id
    }
}

impl Entity for RepeatPeriod {
    const TABLE_NAME: &'static str = "repeat_periods";
    const TYPE_NAME: &'static str = "RepeatPeriod";
}

impl std::fmt::Display for RepeatPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}(s)", self.count, self.interval.as_str())
    }
}

impl RepeatPeriod {
    pub fn new(count: u32, interval: RepeatInterval) -> Self {
        Self {
            id: None,
            count,
            interval,
            active: true,
        }
    }

    /// `date` moved forward by one period. Month and year steps clamp to
    /// the end of shorter months.
    pub fn advance(&self, date: NaiveDate) -> Option<NaiveDate> {
        match self.interval {
            RepeatInterval::Day => date.checked_add_days(Days::new(self.count as u64)),
            RepeatInterval::Week => date.checked_add_days(Days::new(7 * self.count as u64)),
            RepeatInterval::Month => date.checked_add_months(Months::new(self.count)),
            RepeatInterval::Year => date.checked_add_months(Months::new(12 * self.count)),
        }
    }

    /// The first window of a period, starting at `date`
    pub fn seed_window(&self, period_id: Id, date: NaiveDate) -> Option<BillingWindow> {
        let end_date = self.advance(date)?;
        Some(BillingWindow::new(period_id, date, end_date))
    }

    /// Windows that follow `latest` up to `boundary`, in chronological order.
    ///
    /// Each step starts where the previous window's start plus one period
    /// lands. When that does not match the previous window's end (the
    /// period changed since it was generated) the new window starts at the
    /// previous end instead, so the sequence stays gapless.
    pub fn plan_windows(&self, latest: &BillingWindow, boundary: NaiveDate) -> Vec<BillingWindow> {
        let mut planned = Vec::new();
        if self.count == 0 {
            return planned;
        }

        let mut window = latest.clone();
        while let Some(next_start) = self.advance(window.date) {
            if next_start > boundary {
                break;
            }
            window.date = if next_start == window.end_date {
                next_start
            } else {
                window.end_date
            };
            window.end_date = match self.advance(window.end_date) {
                Some(end_date) => end_date,
                None => break,
            };
            window.id = None;
            planned.push(window.clone());
        }
        planned
    }
}

/// One window of a repeat period, `[date, end_date)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingWindow {
    pub id: Option<Id>,
    pub period_id: Id,
    pub date: NaiveDate,
    pub end_date: NaiveDate,
}

impl Identifiable for BillingWindow {
    fn id(&self) -> Option<Id> {
        self.id
    }
}

impl Entity for BillingWindow {
    const TABLE_NAME: &'static str = "billing_windows";
    const TYPE_NAME: &'static str = "BillingWindow";
}

impl std::fmt::Display for BillingWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} through {}", self.date, self.end_date)
    }
}

impl BillingWindow {
    pub fn new(period_id: Id, date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            id: None,
            period_id,
            date,
            end_date,
        }
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.date <= day && day < self.end_date
    }
}

/// Links a person (contact) to their repeat period. Unique on both sides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonRepeatPeriod {
    pub id: Option<Id>,
    pub contact_id: Id,
    pub repeat_period_id: Id,
}

impl Identifiable for PersonRepeatPeriod {
    fn id(&self) -> Option<Id> {
        self.id
    }
}

impl Entity for PersonRepeatPeriod {
    const TABLE_NAME: &'static str = "person_repeat_periods";
    const TYPE_NAME: &'static str = "PersonRepeatPeriod";
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_advance() {
        let two_weeks = RepeatPeriod::new(2, RepeatInterval::Week);
        assert_eq!(two_weeks.advance(date(2024, 1, 1)), Some(date(2024, 1, 15)));

        let month = RepeatPeriod::new(1, RepeatInterval::Month);
        assert_eq!(month.advance(date(2024, 1, 31)), Some(date(2024, 2, 29)));

        let year = RepeatPeriod::new(1, RepeatInterval::Year);
        assert_eq!(year.advance(date(2024, 2, 29)), Some(date(2025, 2, 28)));

        let days = RepeatPeriod::new(3, RepeatInterval::Day);
        assert_eq!(days.advance(date(2024, 1, 30)), Some(date(2024, 2, 2)));
    }

    #[test]
    fn test_plan_windows_same_delta() {
        let period = RepeatPeriod::new(1, RepeatInterval::Week);
        let latest = period.seed_window(1, date(2024, 1, 1)).unwrap();

        let planned = period.plan_windows(&latest, date(2024, 1, 22));
        let ranges: Vec<_> = planned.iter().map(|w| (w.date, w.end_date)).collect();
        assert_eq!(
            ranges,
            vec![
                (date(2024, 1, 8), date(2024, 1, 15)),
                (date(2024, 1, 15), date(2024, 1, 22)),
                (date(2024, 1, 22), date(2024, 1, 29)),
            ]
        );
        assert!(planned.iter().all(|w| w.id.is_none() && w.period_id == 1));
    }

    #[test]
    fn test_plan_windows_changed_delta_snaps_to_previous_end() {
        // last window was generated with a one week period
        let latest = BillingWindow::new(1, date(2024, 1, 1), date(2024, 1, 8));
        let period = RepeatPeriod::new(2, RepeatInterval::Week);

        let planned = period.plan_windows(&latest, date(2024, 1, 31));
        let ranges: Vec<_> = planned.iter().map(|w| (w.date, w.end_date)).collect();
        assert_eq!(
            ranges,
            vec![
                (date(2024, 1, 8), date(2024, 1, 22)),
                (date(2024, 1, 22), date(2024, 2, 5)),
            ]
        );
    }

    #[test]
    fn test_plan_windows_is_gapless() {
        let period = RepeatPeriod::new(1, RepeatInterval::Month);
        let latest = period.seed_window(7, date(2024, 1, 31)).unwrap();
        let planned = period.plan_windows(&latest, date(2024, 12, 31));

        let mut previous = latest;
        for window in &planned {
            assert_eq!(window.date, previous.end_date);
            assert!(window.date < window.end_date);
            previous = window.clone();
        }
        assert!(!planned.is_empty());
    }

    #[test]
    fn test_plan_windows_before_boundary_is_empty() {
        let period = RepeatPeriod::new(1, RepeatInterval::Week);
        let latest = period.seed_window(1, date(2024, 1, 1)).unwrap();
        assert!(period.plan_windows(&latest, date(2024, 1, 7)).is_empty());
    }

    #[test]
    fn test_window_contains() {
        let window = BillingWindow::new(1, date(2024, 1, 1), date(2024, 1, 15));
        assert!(window.contains(date(2024, 1, 1)));
        assert!(window.contains(date(2024, 1, 14)));
        assert!(!window.contains(date(2024, 1, 15)));
        assert_eq!(window.to_string(), "2024-01-01 through 2024-01-15");
    }

    #[test]
    fn test_count_validation() {
        assert!(RepeatPeriod::new(1, RepeatInterval::Day).validate().is_ok());
        assert!(RepeatPeriod::new(0, RepeatInterval::Day).validate().is_err());
        assert!(RepeatPeriod::new(32, RepeatInterval::Day).validate().is_err());
    }
}

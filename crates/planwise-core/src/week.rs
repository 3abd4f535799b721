use std::fmt;

use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};

/// An inclusive seven-day planning window starting on `start`.
///
/// No day-of-week alignment is enforced; [`PlanningWeek::containing`] is the
/// helper for callers that want Monday-aligned weeks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlanningWeek {
    start: NaiveDate,
}

impl PlanningWeek {
    /// Days from `start` to the last day of the window.
    const SPAN: Days = Days::new(6);

    pub fn starting(start: NaiveDate) -> Self {
        Self { start }
    }

    /// The Monday-aligned week that contains `day`.
    pub fn containing(day: NaiveDate) -> Self {
        let back = Days::new(u64::from(day.weekday().num_days_from_monday()));
        Self {
            start: day.checked_sub_days(back).unwrap_or(NaiveDate::MIN),
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// Last day of the window, saturating at the end of the calendar.
    pub fn end(&self) -> NaiveDate {
        self.start
            .checked_add_days(Self::SPAN)
            .unwrap_or(NaiveDate::MAX)
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end()
    }
}

impl fmt::Display for PlanningWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn end_is_six_days_later() {
        let week = PlanningWeek::starting(date(2024, 1, 1));
        assert_eq!(week.end(), date(2024, 1, 7));
        assert_eq!(week.to_string(), "2024-01-01..2024-01-07");
    }

    #[test]
    fn end_crosses_month_and_year() {
        let week = PlanningWeek::starting(date(2024, 12, 30));
        assert_eq!(week.end(), date(2025, 1, 5));
    }

    #[test]
    fn non_monday_start_is_kept() {
        let week = PlanningWeek::starting(date(2024, 1, 3));
        assert_eq!(week.start(), date(2024, 1, 3));
        assert_eq!(week.end(), date(2024, 1, 9));
    }

    #[test]
    fn containing_snaps_to_monday() {
        // 2024-01-04 is a Thursday.
        assert_eq!(PlanningWeek::containing(date(2024, 1, 4)).start(), date(2024, 1, 1));
        // Sunday belongs to the week that started the previous Monday.
        assert_eq!(PlanningWeek::containing(date(2024, 1, 7)).start(), date(2024, 1, 1));
        assert_eq!(PlanningWeek::containing(date(2024, 1, 8)).start(), date(2024, 1, 8));
    }

    #[test]
    fn contains_is_inclusive() {
        let week = PlanningWeek::starting(date(2024, 1, 1));
        assert!(week.contains(date(2024, 1, 1)));
        assert!(week.contains(date(2024, 1, 7)));
        assert!(!week.contains(date(2023, 12, 31)));
        assert!(!week.contains(date(2024, 1, 8)));
    }

    #[test]
    fn end_saturates() {
        let week = PlanningWeek::starting(NaiveDate::MAX);
        assert_eq!(week.end(), NaiveDate::MAX);
    }
}

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Row structs
// ---------------------------------------------------------------------------

/// A codified curriculum learning objective.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Outcome {
    pub id: Uuid,
    pub code: String,
    pub description: String,
    pub subject: String,
    pub grade: i32,
    pub created_at: DateTime<Utc>,
}

/// A dated unit of instruction that groups activities.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Milestone {
    pub id: Uuid,
    pub title: String,
    pub subject: Option<String>,
    pub user_id: Option<Uuid>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

impl Milestone {
    /// Whether this milestone is active during the inclusive window
    /// `[window_start, window_end]`.
    ///
    /// True when the milestone spans any part of the window, or starts inside
    /// it. The second arm only matters for rows with `end_date < start_date`;
    /// it mirrors the SQL predicate.
    pub fn overlaps(&self, window_start: NaiveDate, window_end: NaiveDate) -> bool {
        let spans = self.start_date <= window_end && self.end_date >= window_start;
        let starts_within = window_start <= self.start_date && self.start_date <= window_end;
        spans || starts_within
    }
}

/// A unit of teaching work belonging to exactly one milestone.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Activity {
    pub id: Uuid,
    pub milestone_id: Uuid,
    pub title: String,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Activity {
    pub fn is_complete(&self) -> bool {
        self.completed_at.is_some()
    }
}

/// Join row declaring that a milestone addresses an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct MilestoneOutcome {
    pub milestone_id: Uuid,
    pub outcome_id: Uuid,
}

/// Join row linking an activity to an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ActivityOutcome {
    pub activity_id: Uuid,
    pub outcome_id: Uuid,
}

/// Placement of an activity into a specific day's plan.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DailyPlanItem {
    pub id: Uuid,
    pub activity_id: Uuid,
    pub plan_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn milestone(start: NaiveDate, end: NaiveDate) -> Milestone {
        Milestone {
            id: Uuid::new_v4(),
            title: "Fractions".to_string(),
            subject: None,
            user_id: None,
            start_date: start,
            end_date: end,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn milestone_spanning_week_overlaps() {
        let m = milestone(date(2024, 1, 1), date(2024, 1, 15));
        assert!(m.overlaps(date(2024, 1, 8), date(2024, 1, 14)));
    }

    #[test]
    fn milestone_touching_window_edges_overlaps() {
        let ends_on_start = milestone(date(2023, 12, 20), date(2024, 1, 1));
        assert!(ends_on_start.overlaps(date(2024, 1, 1), date(2024, 1, 7)));

        let starts_on_end = milestone(date(2024, 1, 7), date(2024, 2, 1));
        assert!(starts_on_end.overlaps(date(2024, 1, 1), date(2024, 1, 7)));
    }

    #[test]
    fn milestone_outside_window_does_not_overlap() {
        let before = milestone(date(2023, 12, 1), date(2023, 12, 31));
        assert!(!before.overlaps(date(2024, 1, 1), date(2024, 1, 7)));

        let after = milestone(date(2024, 1, 8), date(2024, 1, 20));
        assert!(!after.overlaps(date(2024, 1, 1), date(2024, 1, 7)));
    }

    #[test]
    fn inverted_milestone_starting_in_window_overlaps() {
        let inverted = milestone(date(2024, 1, 3), date(2023, 12, 1));
        assert!(inverted.overlaps(date(2024, 1, 1), date(2024, 1, 7)));
    }

    #[test]
    fn activity_completion() {
        let mut a = Activity {
            id: Uuid::new_v4(),
            milestone_id: Uuid::new_v4(),
            title: "Number line warm-up".to_string(),
            completed_at: None,
            created_at: Utc::now(),
        };
        assert!(!a.is_complete());
        a.completed_at = Some(Utc::now());
        assert!(a.is_complete());
    }
}

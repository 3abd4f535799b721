//! The read-side collaborator the engine queries.
//!
//! [`CurriculumStore`] is the seam between the engine and persistence.
//! [`PgStore`] reads PostgreSQL through `planwise-db`; [`MemoryStore`] holds
//! rows in process for embedding and tests.

pub mod memory;
pub mod postgres;

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use planwise_db::models::{Activity, Milestone};
use planwise_db::queries::coverage::{CoverageFilter, OutcomeLinks};

use crate::week::PlanningWeek;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// An outcome linked to a candidate activity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutcomeRef {
    pub id: Uuid,
    pub code: String,
}

/// An incomplete, unscheduled activity from a milestone active in the
/// requested week.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateActivity {
    pub activity_id: Uuid,
    pub title: String,
    pub milestone_id: Uuid,
    pub milestone_title: String,
    pub subject: Option<String>,
    /// Linked outcomes ordered by code.
    pub outcomes: Vec<OutcomeRef>,
}

/// Everything one ranking call reads, taken from a single snapshot so the
/// coverage data and the candidates agree with each other.
#[derive(Debug, Clone, Default)]
pub struct PlanningSnapshot {
    /// Unfiltered outcome links, the classifier's input.
    pub outcome_links: Vec<OutcomeLinks>,
    /// Candidates ordered by milestone (start date, id), then activity
    /// (creation time, id).
    pub candidates: Vec<CandidateActivity>,
}

/// Query interface over outcomes, milestones, activities, and their joins.
///
/// Implementations must be safe to share between concurrent requests and
/// must never write.
#[async_trait]
pub trait CurriculumStore: Send + Sync {
    /// Outcomes matching `filter`, each with the activities of every
    /// milestone declaring it, ordered by outcome code then id.
    async fn outcome_links(&self, filter: &CoverageFilter) -> Result<Vec<OutcomeLinks>>;

    /// The unfiltered outcome links plus the candidate activities for
    /// `week`, optionally restricted to milestones owned by `user_id`.
    async fn planning_snapshot(
        &self,
        week: PlanningWeek,
        user_id: Option<Uuid>,
    ) -> Result<PlanningSnapshot>;
}

// Compile-time assertion: the store is used as `Arc<dyn CurriculumStore>`.
const _: () = {
    fn _assert_object_safe(_: &dyn CurriculumStore) {}
};

/// Build candidates from milestones (already in output order), their open
/// activities, and the outcomes linked to those activities.
///
/// Activities whose milestone is not in `milestones` are dropped. Outcome
/// lists are sorted by code.
pub(crate) fn assemble_candidates(
    milestones: &[Milestone],
    activities: Vec<Activity>,
    outcome_refs: impl IntoIterator<Item = (Uuid, OutcomeRef)>,
) -> Vec<CandidateActivity> {
    let mut outcomes_by_activity: HashMap<Uuid, Vec<OutcomeRef>> = HashMap::new();
    for (activity_id, outcome) in outcome_refs {
        outcomes_by_activity.entry(activity_id).or_default().push(outcome);
    }

    let mut activities_by_milestone: HashMap<Uuid, Vec<Activity>> = HashMap::new();
    for activity in activities {
        activities_by_milestone
            .entry(activity.milestone_id)
            .or_default()
            .push(activity);
    }

    let mut candidates = Vec::new();
    for milestone in milestones {
        let Some(activities) = activities_by_milestone.remove(&milestone.id) else {
            continue;
        };
        for activity in activities {
            let mut outcomes = outcomes_by_activity.remove(&activity.id).unwrap_or_default();
            outcomes.sort_by(|a, b| a.code.cmp(&b.code).then(a.id.cmp(&b.id)));
            candidates.push(CandidateActivity {
                activity_id: activity.id,
                title: activity.title,
                milestone_id: milestone.id,
                milestone_title: milestone.title.clone(),
                subject: milestone.subject.clone(),
                outcomes,
            });
        }
    }
    candidates
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};

    use super::*;

    fn milestone(title: &str, subject: Option<&str>) -> Milestone {
        Milestone {
            id: Uuid::new_v4(),
            title: title.to_string(),
            subject: subject.map(str::to_string),
            user_id: None,
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            created_at: Utc::now(),
        }
    }

    fn activity(milestone: &Milestone, title: &str) -> Activity {
        Activity {
            id: Uuid::new_v4(),
            milestone_id: milestone.id,
            title: title.to_string(),
            completed_at: None,
            created_at: Utc::now(),
        }
    }

    fn outcome(code: &str) -> OutcomeRef {
        OutcomeRef {
            id: Uuid::new_v4(),
            code: code.to_string(),
        }
    }

    #[test]
    fn candidates_follow_milestone_order() {
        let first = milestone("Measurement", Some("Math"));
        let second = milestone("Weather", None);
        let a = activity(&second, "Rain gauge");
        let b = activity(&first, "Measure the hallway");
        let c = activity(&first, "Ruler race");

        let candidates = assemble_candidates(
            &[first.clone(), second.clone()],
            vec![a.clone(), b.clone(), c.clone()],
            Vec::new(),
        );

        let titles: Vec<&str> = candidates.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["Measure the hallway", "Ruler race", "Rain gauge"]);
        assert_eq!(candidates[0].milestone_title, "Measurement");
        assert_eq!(candidates[0].subject.as_deref(), Some("Math"));
        assert_eq!(candidates[2].subject, None);
    }

    #[test]
    fn outcomes_are_attached_and_sorted_by_code() {
        let m = milestone("Measurement", Some("Math"));
        let a = activity(&m, "Measure the hallway");
        let candidates = assemble_candidates(
            &[m],
            vec![a.clone()],
            vec![(a.id, outcome("MA.2")), (a.id, outcome("MA.1"))],
        );
        let codes: Vec<&str> = candidates[0].outcomes.iter().map(|o| o.code.as_str()).collect();
        assert_eq!(codes, vec!["MA.1", "MA.2"]);
    }

    #[test]
    fn activities_of_unknown_milestones_are_dropped() {
        let m = milestone("Measurement", None);
        let stray = milestone("Elsewhere", None);
        let candidates = assemble_candidates(&[m], vec![activity(&stray, "Lost")], Vec::new());
        assert!(candidates.is_empty());
    }
}

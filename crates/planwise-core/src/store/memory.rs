//! In-process [`CurriculumStore`].
//!
//! Rows are added through the builder methods and never change once the
//! store is shared, so every read sees the same snapshot. Join rows may
//! point at ids that were never added; such references are ignored, the way
//! the SQL inner joins drop them.

use std::collections::HashSet;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use planwise_db::models::{
    Activity, ActivityOutcome, DailyPlanItem, Milestone, MilestoneOutcome, Outcome,
};
use planwise_db::queries::coverage::{CoverageFilter, LinkedActivity, OutcomeLinks};

use super::{CurriculumStore, OutcomeRef, PlanningSnapshot, assemble_candidates};
use crate::week::PlanningWeek;

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    outcomes: Vec<Outcome>,
    milestones: Vec<Milestone>,
    milestone_outcomes: Vec<MilestoneOutcome>,
    activities: Vec<Activity>,
    activity_outcomes: Vec<ActivityOutcome>,
    plan_items: Vec<DailyPlanItem>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_outcome(&mut self, code: &str, subject: &str, grade: i32) -> Outcome {
        let outcome = Outcome {
            id: Uuid::new_v4(),
            code: code.to_string(),
            description: String::new(),
            subject: subject.to_string(),
            grade,
            created_at: Utc::now(),
        };
        self.outcomes.push(outcome.clone());
        outcome
    }

    pub fn add_milestone(
        &mut self,
        title: &str,
        subject: Option<&str>,
        user_id: Option<Uuid>,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Milestone {
        let milestone = Milestone {
            id: Uuid::new_v4(),
            title: title.to_string(),
            subject: subject.map(str::to_string),
            user_id,
            start_date,
            end_date,
            created_at: Utc::now(),
        };
        self.milestones.push(milestone.clone());
        milestone
    }

    /// Declare that a milestone addresses an outcome. Idempotent.
    pub fn declare(&mut self, milestone_id: Uuid, outcome_id: Uuid) {
        let row = MilestoneOutcome {
            milestone_id,
            outcome_id,
        };
        if !self.milestone_outcomes.contains(&row) {
            self.milestone_outcomes.push(row);
        }
    }

    pub fn add_activity(&mut self, milestone_id: Uuid, title: &str) -> Activity {
        let activity = Activity {
            id: Uuid::new_v4(),
            milestone_id,
            title: title.to_string(),
            completed_at: None,
            created_at: Utc::now(),
        };
        self.activities.push(activity.clone());
        activity
    }

    /// Link an activity to an outcome. Idempotent.
    pub fn link(&mut self, activity_id: Uuid, outcome_id: Uuid) {
        let row = ActivityOutcome {
            activity_id,
            outcome_id,
        };
        if !self.activity_outcomes.contains(&row) {
            self.activity_outcomes.push(row);
        }
    }

    /// Mark an activity complete. Returns `false` if the id is unknown.
    pub fn complete(&mut self, activity_id: Uuid) -> bool {
        match self.activities.iter_mut().find(|a| a.id == activity_id) {
            Some(activity) => {
                activity.completed_at.get_or_insert_with(Utc::now);
                true
            }
            None => false,
        }
    }

    /// Place an activity on a day's plan.
    pub fn schedule(&mut self, activity_id: Uuid, plan_date: NaiveDate) -> DailyPlanItem {
        let item = DailyPlanItem {
            id: Uuid::new_v4(),
            activity_id,
            plan_date,
            created_at: Utc::now(),
        };
        self.plan_items.push(item.clone());
        item
    }

    fn links_for(&self, outcome: &Outcome) -> OutcomeLinks {
        let milestone_ids: HashSet<Uuid> = self
            .milestone_outcomes
            .iter()
            .filter(|mo| mo.outcome_id == outcome.id && self.has_milestone(mo.milestone_id))
            .map(|mo| mo.milestone_id)
            .collect();

        // One entry per (milestone, activity) path; an activity belongs to a
        // single milestone, so each appears at most once here.
        let mut activities: Vec<LinkedActivity> = self
            .activities
            .iter()
            .filter(|a| milestone_ids.contains(&a.milestone_id))
            .map(|a| LinkedActivity {
                activity_id: a.id,
                completed_at: a.completed_at,
            })
            .collect();
        activities.sort_by_key(|a| a.activity_id);

        OutcomeLinks {
            outcome_id: outcome.id,
            code: outcome.code.clone(),
            activities,
        }
    }

    fn matches(&self, outcome: &Outcome, filter: &CoverageFilter) -> bool {
        filter
            .subject
            .as_deref()
            .is_none_or(|subject| outcome.subject == subject)
            && filter.grade.is_none_or(|grade| outcome.grade == grade)
            && filter.milestone_id.is_none_or(|milestone_id| {
                self.has_milestone(milestone_id)
                    && self.milestone_outcomes.contains(&MilestoneOutcome {
                        milestone_id,
                        outcome_id: outcome.id,
                    })
            })
    }

    fn has_milestone(&self, milestone_id: Uuid) -> bool {
        self.milestones.iter().any(|m| m.id == milestone_id)
    }

    fn is_scheduled(&self, activity_id: Uuid) -> bool {
        self.plan_items.iter().any(|p| p.activity_id == activity_id)
    }

    fn collect_links(&self, filter: &CoverageFilter) -> Vec<OutcomeLinks> {
        let mut outcomes: Vec<&Outcome> = self
            .outcomes
            .iter()
            .filter(|o| self.matches(o, filter))
            .collect();
        outcomes.sort_by(|a, b| a.code.cmp(&b.code).then(a.id.cmp(&b.id)));
        outcomes.into_iter().map(|o| self.links_for(o)).collect()
    }
}

#[async_trait]
impl CurriculumStore for MemoryStore {
    async fn outcome_links(&self, filter: &CoverageFilter) -> Result<Vec<OutcomeLinks>> {
        Ok(self.collect_links(filter))
    }

    async fn planning_snapshot(
        &self,
        week: PlanningWeek,
        user_id: Option<Uuid>,
    ) -> Result<PlanningSnapshot> {
        let mut milestones: Vec<Milestone> = self
            .milestones
            .iter()
            .filter(|m| user_id.is_none_or(|user| m.user_id == Some(user)))
            .filter(|m| m.overlaps(week.start(), week.end()))
            .cloned()
            .collect();
        milestones.sort_by(|a, b| a.start_date.cmp(&b.start_date).then(a.id.cmp(&b.id)));

        let milestone_ids: HashSet<Uuid> = milestones.iter().map(|m| m.id).collect();
        let activities: Vec<Activity> = self
            .activities
            .iter()
            .filter(|a| milestone_ids.contains(&a.milestone_id))
            .filter(|a| !a.is_complete() && !self.is_scheduled(a.id))
            .cloned()
            .collect();

        let refs: Vec<(Uuid, OutcomeRef)> = self
            .activity_outcomes
            .iter()
            .filter_map(|ao| {
                let outcome = self.outcomes.iter().find(|o| o.id == ao.outcome_id)?;
                Some((
                    ao.activity_id,
                    OutcomeRef {
                        id: outcome.id,
                        code: outcome.code.clone(),
                    },
                ))
            })
            .collect();

        Ok(PlanningSnapshot {
            outcome_links: self.collect_links(&CoverageFilter::default()),
            candidates: assemble_candidates(&milestones, activities, refs),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn links_skip_dangling_declarations() {
        let mut store = MemoryStore::new();
        let o = store.add_outcome("MA.1", "Math", 3);
        let m = store.add_milestone("Place value", None, None, date(2024, 1, 1), date(2024, 1, 5));
        store.declare(m.id, o.id);
        store.declare(Uuid::new_v4(), o.id);
        store.declare(m.id, Uuid::new_v4());
        store.add_activity(m.id, "Base ten blocks");

        let links = store
            .outcome_links(&CoverageFilter::default())
            .await
            .unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].activities.len(), 1);
    }

    #[tokio::test]
    async fn activities_under_unknown_milestone_are_ignored() {
        let mut store = MemoryStore::new();
        let o = store.add_outcome("MA.2", "Math", 3);
        let ghost = Uuid::new_v4();
        store.declare(ghost, o.id);
        let a = store.add_activity(ghost, "Orphaned worksheet");
        assert!(store.complete(a.id));

        let links = store
            .outcome_links(&CoverageFilter::default())
            .await
            .unwrap();
        assert_eq!(links.len(), 1);
        assert!(links[0].activities.is_empty());

        let by_ghost = CoverageFilter {
            milestone_id: Some(ghost),
            ..CoverageFilter::default()
        };
        assert!(store.outcome_links(&by_ghost).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn filter_by_subject_grade_and_milestone() {
        let mut store = MemoryStore::new();
        let math3 = store.add_outcome("MA.3", "Math", 3);
        let math4 = store.add_outcome("MA.4", "Math", 4);
        let sci3 = store.add_outcome("SC.3", "Science", 3);
        let m = store.add_milestone("Mixed", None, None, date(2024, 1, 1), date(2024, 1, 5));
        store.declare(m.id, math4.id);
        store.declare(m.id, sci3.id);

        let ids = |links: Vec<OutcomeLinks>| links.into_iter().map(|l| l.outcome_id).collect::<Vec<_>>();

        let grade3 = CoverageFilter {
            grade: Some(3),
            ..Default::default()
        };
        assert_eq!(ids(store.outcome_links(&grade3).await.unwrap()), vec![math3.id, sci3.id]);

        let math_in_m = CoverageFilter {
            subject: Some("Math".to_string()),
            milestone_id: Some(m.id),
            ..Default::default()
        };
        assert_eq!(ids(store.outcome_links(&math_in_m).await.unwrap()), vec![math4.id]);
    }

    #[tokio::test]
    async fn snapshot_excludes_completed_scheduled_and_out_of_window() {
        let mut store = MemoryStore::new();
        let active = store.add_milestone("Active", None, None, date(2024, 1, 1), date(2024, 1, 15));
        let past = store.add_milestone("Past", None, None, date(2023, 11, 1), date(2023, 11, 30));

        let open = store.add_activity(active.id, "Open");
        let done = store.add_activity(active.id, "Done");
        store.complete(done.id);
        let planned = store.add_activity(active.id, "Planned");
        store.schedule(planned.id, date(2024, 1, 2));
        store.add_activity(past.id, "Old");

        let snapshot = store
            .planning_snapshot(PlanningWeek::starting(date(2024, 1, 1)), None)
            .await
            .unwrap();
        let ids: Vec<Uuid> = snapshot.candidates.iter().map(|c| c.activity_id).collect();
        assert_eq!(ids, vec![open.id]);
    }

    #[tokio::test]
    async fn snapshot_scopes_to_teacher() {
        let mut store = MemoryStore::new();
        let me = Uuid::new_v4();
        let mine = store.add_milestone("Mine", None, Some(me), date(2024, 1, 1), date(2024, 1, 5));
        let theirs = store.add_milestone(
            "Theirs",
            None,
            Some(Uuid::new_v4()),
            date(2024, 1, 1),
            date(2024, 1, 5),
        );
        let unowned = store.add_milestone("Unowned", None, None, date(2024, 1, 1), date(2024, 1, 5));
        store.add_activity(mine.id, "A");
        store.add_activity(theirs.id, "B");
        store.add_activity(unowned.id, "C");

        let week = PlanningWeek::starting(date(2024, 1, 1));
        let scoped = store.planning_snapshot(week, Some(me)).await.unwrap();
        assert_eq!(scoped.candidates.len(), 1);
        assert_eq!(scoped.candidates[0].milestone_id, mine.id);

        let all = store.planning_snapshot(week, None).await.unwrap();
        assert_eq!(all.candidates.len(), 3);
    }

    #[test]
    fn complete_unknown_activity_reports_false() {
        let mut store = MemoryStore::new();
        assert!(!store.complete(Uuid::new_v4()));
    }
}

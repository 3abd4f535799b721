//! Read queries feeding the coverage classifier: outcomes joined through the
//! milestones that declare them to those milestones' activities.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgExecutor};
use uuid::Uuid;

/// Narrows which outcomes are classified. All fields combine with AND; the
/// default filter matches every outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageFilter {
    pub subject: Option<String>,
    pub grade: Option<i32>,
    pub milestone_id: Option<Uuid>,
}

impl CoverageFilter {
    pub fn is_empty(&self) -> bool {
        self.subject.is_none() && self.grade.is_none() && self.milestone_id.is_none()
    }
}

/// An activity reachable from an outcome through one of its milestones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkedActivity {
    pub activity_id: Uuid,
    pub completed_at: Option<DateTime<Utc>>,
}

/// An outcome and every activity reachable from it, one entry per
/// (milestone, activity) path. The same activity may appear more than once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutcomeLinks {
    pub outcome_id: Uuid,
    pub code: String,
    pub activities: Vec<LinkedActivity>,
}

/// One row of the outcome -> milestone -> activity left join.
#[derive(Debug, Clone, FromRow)]
struct OutcomeActivityRow {
    outcome_id: Uuid,
    code: String,
    activity_id: Option<Uuid>,
    completed_at: Option<DateTime<Utc>>,
}

/// Fetch the filtered outcomes with the activities of every milestone that
/// declares them, ordered by outcome code then id.
///
/// Outcomes without any declaring milestone (or whose milestones have no
/// activities) come back with an empty `activities` list.
pub async fn list_outcome_links<'e, E>(executor: E, filter: &CoverageFilter) -> Result<Vec<OutcomeLinks>>
where
    E: PgExecutor<'e>,
{
    let rows = sqlx::query_as::<_, OutcomeActivityRow>(
        "SELECT o.id AS outcome_id, o.code, a.id AS activity_id, a.completed_at \
         FROM outcomes o \
         LEFT JOIN milestone_outcomes mo ON mo.outcome_id = o.id \
         LEFT JOIN activities a ON a.milestone_id = mo.milestone_id \
         WHERE ($1::text IS NULL OR o.subject = $1) \
           AND ($2::integer IS NULL OR o.grade = $2) \
           AND ($3::uuid IS NULL OR EXISTS ( \
               SELECT 1 FROM milestone_outcomes f \
               WHERE f.outcome_id = o.id AND f.milestone_id = $3 \
           )) \
         ORDER BY o.code, o.id, a.id",
    )
    .bind(filter.subject.as_deref())
    .bind(filter.grade)
    .bind(filter.milestone_id)
    .fetch_all(executor)
    .await
    .context("failed to list outcome coverage links")?;

    Ok(group_rows(rows))
}

/// Fold join rows (sorted by outcome) into one [`OutcomeLinks`] per outcome.
fn group_rows(rows: Vec<OutcomeActivityRow>) -> Vec<OutcomeLinks> {
    let mut grouped: Vec<OutcomeLinks> = Vec::new();
    for row in rows {
        let starts_new = grouped
            .last()
            .is_none_or(|last| last.outcome_id != row.outcome_id);
        if starts_new {
            grouped.push(OutcomeLinks {
                outcome_id: row.outcome_id,
                code: row.code,
                activities: Vec::new(),
            });
        }
        // A NULL activity id is the left join's "no activity" row.
        if let (Some(activity_id), Some(current)) = (row.activity_id, grouped.last_mut()) {
            current.activities.push(LinkedActivity {
                activity_id,
                completed_at: row.completed_at,
            });
        }
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(outcome: Uuid, code: &str, activity: Option<Uuid>, done: bool) -> OutcomeActivityRow {
        OutcomeActivityRow {
            outcome_id: outcome,
            code: code.to_string(),
            activity_id: activity,
            completed_at: done.then(Utc::now),
        }
    }

    #[test]
    fn groups_consecutive_rows_by_outcome() {
        let o1 = Uuid::new_v4();
        let o2 = Uuid::new_v4();
        let a1 = Uuid::new_v4();
        let a2 = Uuid::new_v4();

        let grouped = group_rows(vec![
            row(o1, "MA.1", Some(a1), true),
            row(o1, "MA.1", Some(a2), false),
            row(o2, "MA.2", None, false),
        ]);

        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[0].code, "MA.1");
        assert_eq!(grouped[0].activities.len(), 2);
        assert!(grouped[0].activities[0].completed_at.is_some());
        assert_eq!(grouped[1].outcome_id, o2);
        assert!(grouped[1].activities.is_empty());
    }

    #[test]
    fn keeps_duplicate_paths_for_the_classifier() {
        let o = Uuid::new_v4();
        let a = Uuid::new_v4();
        let grouped = group_rows(vec![row(o, "SC.4", Some(a), false), row(o, "SC.4", Some(a), false)]);
        assert_eq!(grouped.len(), 1);
        assert_eq!(grouped[0].activities.len(), 2);
    }

    #[test]
    fn empty_rows_give_no_outcomes() {
        assert!(group_rows(Vec::new()).is_empty());
    }

    #[test]
    fn filter_emptiness() {
        assert!(CoverageFilter::default().is_empty());
        let filter = CoverageFilter {
            grade: Some(3),
            ..Default::default()
        };
        assert!(!filter.is_empty());
    }
}

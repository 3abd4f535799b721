//! Coverage classifier: derives each outcome's status from the completion
//! state of the activities reachable through the milestones declaring it.
//!
//! | linked | completed            | status      |
//! |--------|----------------------|-------------|
//! | 0      | 0                    | `uncovered` |
//! | n > 0  | 0                    | `uncovered` |
//! | n > 0  | 0 < c < n            | `partial`   |
//! | n > 0  | n                    | `covered`   |

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use planwise_db::queries::coverage::{CoverageFilter, OutcomeLinks};

use crate::error::EngineError;
use crate::store::CurriculumStore;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// How completely an outcome's linked activities have been finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverageStatus {
    Covered,
    Partial,
    Uncovered,
}

impl CoverageStatus {
    /// Derive the status from de-duplicated counts.
    pub fn from_counts(linked: usize, completed: usize) -> Self {
        if linked == 0 || completed == 0 {
            Self::Uncovered
        } else if completed >= linked {
            Self::Covered
        } else {
            Self::Partial
        }
    }

    /// Uncovered and partial outcomes still need teaching.
    pub fn needs_work(self) -> bool {
        matches!(self, Self::Uncovered | Self::Partial)
    }
}

impl fmt::Display for CoverageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Covered => "covered",
            Self::Partial => "partial",
            Self::Uncovered => "uncovered",
        };
        f.write_str(s)
    }
}

impl FromStr for CoverageStatus {
    type Err = CoverageStatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "covered" => Ok(Self::Covered),
            "partial" => Ok(Self::Partial),
            "uncovered" => Ok(Self::Uncovered),
            other => Err(CoverageStatusParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`CoverageStatus`] string.
#[derive(Debug, Clone)]
pub struct CoverageStatusParseError(pub String);

impl fmt::Display for CoverageStatusParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid coverage status: {:?}", self.0)
    }
}

impl std::error::Error for CoverageStatusParseError {}

/// Coverage of a single outcome.
///
/// Serializes as `{outcomeId, status, linked, completed}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeCoverage {
    pub outcome_id: Uuid,
    /// Display code; not part of the wire format.
    #[serde(skip)]
    pub code: String,
    pub status: CoverageStatus,
    #[serde(rename = "linked")]
    pub linked_count: usize,
    #[serde(rename = "completed")]
    pub completed_count: usize,
}

/// Counts of outcomes per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageSummary {
    pub covered: usize,
    pub partial: usize,
    pub uncovered: usize,
    pub total: usize,
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Classify one outcome. Activities reachable through several milestones are
/// counted once.
pub fn classify_outcome(links: &OutcomeLinks) -> OutcomeCoverage {
    let mut seen = HashSet::with_capacity(links.activities.len());
    let mut linked = 0;
    let mut completed = 0;
    for activity in &links.activities {
        if !seen.insert(activity.activity_id) {
            continue;
        }
        linked += 1;
        if activity.completed_at.is_some() {
            completed += 1;
        }
    }

    OutcomeCoverage {
        outcome_id: links.outcome_id,
        code: links.code.clone(),
        status: CoverageStatus::from_counts(linked, completed),
        linked_count: linked,
        completed_count: completed,
    }
}

/// Classify every outcome, preserving input order.
pub fn classify_links(links: &[OutcomeLinks]) -> Vec<OutcomeCoverage> {
    links.iter().map(classify_outcome).collect()
}

/// Fetch the outcomes matching `filter` and classify each one.
///
/// Returns one record per matched outcome, ordered by outcome code then id.
/// A store failure is reported as [`EngineError::Coverage`].
pub async fn classify_coverage<S>(
    store: &S,
    filter: &CoverageFilter,
) -> Result<Vec<OutcomeCoverage>, EngineError>
where
    S: CurriculumStore + ?Sized,
{
    let links = store
        .outcome_links(filter)
        .await
        .map_err(EngineError::Coverage)?;

    let coverage = classify_links(&links);
    debug!(
        outcomes = coverage.len(),
        filtered = !filter.is_empty(),
        "classified outcome coverage"
    );
    Ok(coverage)
}

/// Tally statuses.
pub fn summarize(coverage: &[OutcomeCoverage]) -> CoverageSummary {
    let mut summary = CoverageSummary::default();
    for c in coverage {
        match c.status {
            CoverageStatus::Covered => summary.covered += 1,
            CoverageStatus::Partial => summary.partial += 1,
            CoverageStatus::Uncovered => summary.uncovered += 1,
        }
        summary.total += 1;
    }
    summary
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use planwise_db::queries::coverage::LinkedActivity;

    use super::*;

    fn links(activities: &[(Uuid, bool)]) -> OutcomeLinks {
        OutcomeLinks {
            outcome_id: Uuid::new_v4(),
            code: "MA.1".to_string(),
            activities: activities
                .iter()
                .map(|&(activity_id, done)| LinkedActivity {
                    activity_id,
                    completed_at: done.then(Utc::now),
                })
                .collect(),
        }
    }

    #[test]
    fn no_activities_is_uncovered() {
        let c = classify_outcome(&links(&[]));
        assert_eq!(c.status, CoverageStatus::Uncovered);
        assert_eq!((c.linked_count, c.completed_count), (0, 0));
    }

    #[test]
    fn nothing_finished_is_uncovered() {
        let c = classify_outcome(&links(&[(Uuid::new_v4(), false)]));
        assert_eq!(c.status, CoverageStatus::Uncovered);
        assert_eq!((c.linked_count, c.completed_count), (1, 0));
    }

    #[test]
    fn some_finished_is_partial() {
        let c = classify_outcome(&links(&[(Uuid::new_v4(), true), (Uuid::new_v4(), false)]));
        assert_eq!(c.status, CoverageStatus::Partial);
        assert_eq!((c.linked_count, c.completed_count), (2, 1));
    }

    #[test]
    fn all_finished_is_covered() {
        let c = classify_outcome(&links(&[(Uuid::new_v4(), true), (Uuid::new_v4(), true)]));
        assert_eq!(c.status, CoverageStatus::Covered);
        assert_eq!((c.linked_count, c.completed_count), (2, 2));
    }

    #[test]
    fn duplicate_paths_count_once() {
        let shared = Uuid::new_v4();
        let c = classify_outcome(&links(&[(shared, true), (shared, true), (Uuid::new_v4(), false)]));
        assert_eq!((c.linked_count, c.completed_count), (2, 1));
        assert_eq!(c.status, CoverageStatus::Partial);

        let c = classify_outcome(&links(&[(shared, true), (shared, true)]));
        assert_eq!((c.linked_count, c.completed_count), (1, 1));
        assert_eq!(c.status, CoverageStatus::Covered);
    }

    #[test]
    fn from_counts_table() {
        assert_eq!(CoverageStatus::from_counts(0, 0), CoverageStatus::Uncovered);
        assert_eq!(CoverageStatus::from_counts(3, 0), CoverageStatus::Uncovered);
        assert_eq!(CoverageStatus::from_counts(3, 1), CoverageStatus::Partial);
        assert_eq!(CoverageStatus::from_counts(3, 2), CoverageStatus::Partial);
        assert_eq!(CoverageStatus::from_counts(3, 3), CoverageStatus::Covered);
    }

    #[test]
    fn needs_work() {
        assert!(CoverageStatus::Uncovered.needs_work());
        assert!(CoverageStatus::Partial.needs_work());
        assert!(!CoverageStatus::Covered.needs_work());
    }

    #[test]
    fn status_display_roundtrip() {
        for v in [
            CoverageStatus::Covered,
            CoverageStatus::Partial,
            CoverageStatus::Uncovered,
        ] {
            let parsed: CoverageStatus = v.to_string().parse().expect("should parse");
            assert_eq!(v, parsed);
        }
        assert!("done".parse::<CoverageStatus>().is_err());
    }

    #[test]
    fn wire_format() {
        let id = Uuid::new_v4();
        let c = OutcomeCoverage {
            outcome_id: id,
            code: "MA.1".to_string(),
            status: CoverageStatus::Partial,
            linked_count: 2,
            completed_count: 1,
        };
        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "outcomeId": id.to_string(),
                "status": "partial",
                "linked": 2,
                "completed": 1,
            })
        );
    }

    #[test]
    fn summary_counts_each_status() {
        let coverage = classify_links(&[
            links(&[]),
            links(&[(Uuid::new_v4(), true)]),
            links(&[(Uuid::new_v4(), true), (Uuid::new_v4(), false)]),
            links(&[(Uuid::new_v4(), false)]),
        ]);
        assert_eq!(
            summarize(&coverage),
            CoverageSummary {
                covered: 1,
                partial: 1,
                uncovered: 2,
                total: 4,
            }
        );
    }
}

//! Suggestion ranker: recommends unscheduled, incomplete activities for a
//! planning week, favouring those that advance outcomes still needing work.

use std::cmp::Reverse;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::coverage::{OutcomeCoverage, classify_links};
use crate::error::EngineError;
use crate::store::{CandidateActivity, CurriculumStore, OutcomeRef};
use crate::week::PlanningWeek;

/// Subject reported for activities whose milestone has none.
pub const UNCATEGORIZED: &str = "Uncategorized";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Why an activity is worth scheduling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionCategory {
    /// Links at least one uncovered or partial outcome.
    CoversUncovered,
    /// Links no outcomes.
    General,
    /// Links outcomes, all of them already covered.
    AlreadyCovered,
}

impl fmt::Display for SuggestionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::CoversUncovered => "covers_uncovered",
            Self::General => "general",
            Self::AlreadyCovered => "already_covered",
        };
        f.write_str(s)
    }
}

impl FromStr for SuggestionCategory {
    type Err = SuggestionCategoryParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "covers_uncovered" => Ok(Self::CoversUncovered),
            "general" => Ok(Self::General),
            "already_covered" => Ok(Self::AlreadyCovered),
            other => Err(SuggestionCategoryParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`SuggestionCategory`] string.
#[derive(Debug, Clone)]
pub struct SuggestionCategoryParseError(pub String);

impl fmt::Display for SuggestionCategoryParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid suggestion category: {:?}", self.0)
    }
}

impl std::error::Error for SuggestionCategoryParseError {}

/// A ranked recommendation.
///
/// Serializes as `{activityId, title, milestoneTitle, subject,
/// linkedOutcomes, coverageStatus}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    pub activity_id: Uuid,
    pub title: String,
    pub milestone_title: String,
    pub subject: String,
    #[serde(rename = "linkedOutcomes")]
    pub linked_outcome_codes: Vec<String>,
    pub coverage_status: SuggestionCategory,
}

// ---------------------------------------------------------------------------
// Ranking
// ---------------------------------------------------------------------------

/// Categorize an activity by its linked outcomes against the set of outcome
/// ids that still need work.
pub fn categorize(outcomes: &[OutcomeRef], needs_work: &HashSet<Uuid>) -> SuggestionCategory {
    if outcomes.is_empty() {
        SuggestionCategory::General
    } else if outcomes.iter().any(|o| needs_work.contains(&o.id)) {
        SuggestionCategory::CoversUncovered
    } else {
        SuggestionCategory::AlreadyCovered
    }
}

/// Tag and order candidates.
///
/// `covers_uncovered` sorts first; ties go to the activity linking more
/// outcomes. The sort is stable, so remaining ties keep candidate order.
pub fn rank_candidates(
    candidates: Vec<CandidateActivity>,
    coverage: &[OutcomeCoverage],
) -> Vec<Suggestion> {
    let needs_work: HashSet<Uuid> = coverage
        .iter()
        .filter(|c| c.status.needs_work())
        .map(|c| c.outcome_id)
        .collect();

    let mut suggestions: Vec<Suggestion> = candidates
        .into_iter()
        .map(|candidate| {
            let coverage_status = categorize(&candidate.outcomes, &needs_work);
            Suggestion {
                activity_id: candidate.activity_id,
                title: candidate.title,
                milestone_title: candidate.milestone_title,
                subject: candidate
                    .subject
                    .unwrap_or_else(|| UNCATEGORIZED.to_string()),
                linked_outcome_codes: candidate.outcomes.into_iter().map(|o| o.code).collect(),
                coverage_status,
            }
        })
        .collect();

    suggestions.sort_by_key(|s| {
        (
            s.coverage_status != SuggestionCategory::CoversUncovered,
            Reverse(s.linked_outcome_codes.len()),
        )
    });
    suggestions
}

/// Rank the open activities of milestones active in `week`.
///
/// Coverage is classified once, unfiltered, from the same snapshot as the
/// candidates. Any store failure aborts the whole request with
/// [`EngineError::Suggestions`]; an empty candidate set is an empty list.
pub async fn rank_suggestions<S>(
    store: &S,
    week: PlanningWeek,
    user_id: Option<Uuid>,
) -> Result<Vec<Suggestion>, EngineError>
where
    S: CurriculumStore + ?Sized,
{
    let snapshot = store
        .planning_snapshot(week, user_id)
        .await
        .map_err(EngineError::Suggestions)?;

    let coverage = classify_links(&snapshot.outcome_links);
    debug!(
        %week,
        outcomes = coverage.len(),
        candidates = snapshot.candidates.len(),
        "ranking planner suggestions"
    );

    let suggestions = rank_candidates(snapshot.candidates, &coverage);
    let covering = suggestions
        .iter()
        .filter(|s| s.coverage_status == SuggestionCategory::CoversUncovered)
        .count();
    info!(
        %week,
        user_id = ?user_id,
        suggestions = suggestions.len(),
        covering,
        "generated planner suggestions"
    );
    Ok(suggestions)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

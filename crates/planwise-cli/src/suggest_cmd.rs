//! `planwise suggest` command: rank activities for a planning week.

use std::fmt::{self, Write as _};

use anyhow::Result;
use chrono::{Local, NaiveDate};
use uuid::Uuid;

use planwise_core::{CurriculumStore, PlanningWeek, Suggestion, rank_suggestions};

use crate::coverage_cmd::truncate;

/// Resolve the planning week: the given start date, or the Monday of the
/// current local week.
pub fn resolve_week(week_start: Option<NaiveDate>) -> PlanningWeek {
    match week_start {
        Some(start) => PlanningWeek::starting(start),
        None => PlanningWeek::containing(Local::now().date_naive()),
    }
}

/// Run the suggest command.
pub async fn run_suggest(
    store: &dyn CurriculumStore,
    week: PlanningWeek,
    user_id: Option<Uuid>,
    json: bool,
) -> Result<()> {
    let suggestions = rank_suggestions(store, week, user_id).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&suggestions)?);
    } else {
        print!("{}", render_table(week, &suggestions)?);
    }
    Ok(())
}

fn render_table(week: PlanningWeek, suggestions: &[Suggestion]) -> Result<String, fmt::Error> {
    let mut out = String::new();
    writeln!(out, "Week: {week}")?;

    if suggestions.is_empty() {
        writeln!(out, "No suggestions.")?;
        return Ok(out);
    }

    writeln!(out)?;
    writeln!(
        out,
        "{:<18} {:<30} {:<22} {:<16} OUTCOMES",
        "CATEGORY", "ACTIVITY", "MILESTONE", "SUBJECT"
    )?;
    writeln!(out, "{}", "-".repeat(100))?;

    for s in suggestions {
        let outcomes = if s.linked_outcome_codes.is_empty() {
            "-".to_string()
        } else {
            s.linked_outcome_codes.join(", ")
        };
        writeln!(
            out,
            "{:<18} {:<30} {:<22} {:<16} {}",
            s.coverage_status.to_string(),
            truncate(&s.title, 28),
            truncate(&s.milestone_title, 20),
            truncate(&s.subject, 14),
            outcomes
        )?;
    }
    Ok(out)
}

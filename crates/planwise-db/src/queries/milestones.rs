//! Database query functions for the `milestones` and `milestone_outcomes`
//! tables.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::models::Milestone;

/// Parameters for inserting a new milestone row.
#[derive(Debug, Clone)]
pub struct NewMilestone<'a> {
    pub title: &'a str,
    pub subject: Option<&'a str>,
    pub user_id: Option<Uuid>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// Insert a new milestone. Returns the row with server-generated defaults.
pub async fn insert_milestone(pool: &PgPool, new: &NewMilestone<'_>) -> Result<Milestone> {
    let milestone = sqlx::query_as::<_, Milestone>(
        "INSERT INTO milestones (title, subject, user_id, start_date, end_date) \
         VALUES ($1, $2, $3, $4, $5) \
         RETURNING *",
    )
    .bind(new.title)
    .bind(new.subject)
    .bind(new.user_id)
    .bind(new.start_date)
    .bind(new.end_date)
    .fetch_one(pool)
    .await
    .with_context(|| format!("failed to insert milestone {:?}", new.title))?;

    Ok(milestone)
}

/// Fetch a milestone by its ID.
pub async fn get_milestone(pool: &PgPool, id: Uuid) -> Result<Option<Milestone>> {
    let milestone = sqlx::query_as::<_, Milestone>("SELECT * FROM milestones WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch milestone")?;

    Ok(milestone)
}

/// Declare that a milestone addresses an outcome.
///
/// Uses `ON CONFLICT DO NOTHING` so this is idempotent.
pub async fn link_milestone_outcome(
    pool: &PgPool,
    milestone_id: Uuid,
    outcome_id: Uuid,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO milestone_outcomes (milestone_id, outcome_id) VALUES ($1, $2) \
         ON CONFLICT DO NOTHING",
    )
    .bind(milestone_id)
    .bind(outcome_id)
    .execute(pool)
    .await
    .context("failed to link milestone to outcome")?;

    Ok(())
}

/// List milestones active during the inclusive window
/// `[window_start, window_end]`, optionally restricted to one teacher.
///
/// A milestone qualifies when it spans the window or starts inside it; see
/// [`Milestone::overlaps`]. Ordered by start date, then id.
pub async fn list_milestones_in_window<'e, E>(
    executor: E,
    window_start: NaiveDate,
    window_end: NaiveDate,
    user_id: Option<Uuid>,
) -> Result<Vec<Milestone>>
where
    E: PgExecutor<'e>,
{
    let milestones = sqlx::query_as::<_, Milestone>(
        "SELECT * FROM milestones \
         WHERE ($3::uuid IS NULL OR user_id = $3) \
           AND ( \
               (start_date <= $2 AND end_date >= $1) \
               OR (start_date >= $1 AND start_date <= $2) \
           ) \
         ORDER BY start_date, id",
    )
    .bind(window_start)
    .bind(window_end)
    .bind(user_id)
    .fetch_all(executor)
    .await
    .context("failed to list milestones in window")?;

    Ok(milestones)
}

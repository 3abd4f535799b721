//! Database query functions for the `activities`, `activity_outcomes`, and
//! `daily_plan_items` tables.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use sqlx::{FromRow, PgExecutor, PgPool};
use uuid::Uuid;

use crate::models::{Activity, DailyPlanItem};

/// Insert a new, incomplete activity under a milestone.
pub async fn insert_activity(pool: &PgPool, milestone_id: Uuid, title: &str) -> Result<Activity> {
    let activity = sqlx::query_as::<_, Activity>(
        "INSERT INTO activities (milestone_id, title) \
         VALUES ($1, $2) \
         RETURNING *",
    )
    .bind(milestone_id)
    .bind(title)
    .fetch_one(pool)
    .await
    .with_context(|| format!("failed to insert activity {title:?}"))?;

    Ok(activity)
}

/// Fetch a single activity by ID.
pub async fn get_activity(pool: &PgPool, id: Uuid) -> Result<Option<Activity>> {
    let activity = sqlx::query_as::<_, Activity>("SELECT * FROM activities WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch activity")?;

    Ok(activity)
}

/// Link an activity to an outcome.
///
/// Uses `ON CONFLICT DO NOTHING` so this is idempotent.
pub async fn link_activity_outcome(pool: &PgPool, activity_id: Uuid, outcome_id: Uuid) -> Result<()> {
    sqlx::query(
        "INSERT INTO activity_outcomes (activity_id, outcome_id) VALUES ($1, $2) \
         ON CONFLICT DO NOTHING",
    )
    .bind(activity_id)
    .bind(outcome_id)
    .execute(pool)
    .await
    .context("failed to link activity to outcome")?;

    Ok(())
}

/// Mark an activity complete, setting `completed_at` to now.
///
/// Already-completed activities keep their original timestamp.
pub async fn complete_activity(pool: &PgPool, id: Uuid) -> Result<Activity> {
    let activity = sqlx::query_as::<_, Activity>(
        "UPDATE activities \
         SET completed_at = COALESCE(completed_at, now()) \
         WHERE id = $1 \
         RETURNING *",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("failed to complete activity")?;

    activity.with_context(|| format!("activity {id} not found"))
}

/// Place an activity into a day's plan.
pub async fn insert_daily_plan_item(
    pool: &PgPool,
    activity_id: Uuid,
    plan_date: NaiveDate,
) -> Result<DailyPlanItem> {
    let item = sqlx::query_as::<_, DailyPlanItem>(
        "INSERT INTO daily_plan_items (activity_id, plan_date) \
         VALUES ($1, $2) \
         RETURNING *",
    )
    .bind(activity_id)
    .bind(plan_date)
    .fetch_one(pool)
    .await
    .context("failed to insert daily plan item")?;

    Ok(item)
}

/// List the activities of the given milestones that are neither completed
/// nor placed on any daily plan, ordered by creation time then id.
pub async fn list_open_activities<'e, E>(executor: E, milestone_ids: &[Uuid]) -> Result<Vec<Activity>>
where
    E: PgExecutor<'e>,
{
    let activities = sqlx::query_as::<_, Activity>(
        "SELECT a.* FROM activities a \
         WHERE a.milestone_id = ANY($1) \
           AND a.completed_at IS NULL \
           AND NOT EXISTS ( \
               SELECT 1 FROM daily_plan_items d WHERE d.activity_id = a.id \
           ) \
         ORDER BY a.created_at, a.id",
    )
    .bind(milestone_ids)
    .fetch_all(executor)
    .await
    .context("failed to list open activities")?;

    Ok(activities)
}

/// An outcome linked to an activity, with its display code.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct ActivityOutcomeRef {
    pub activity_id: Uuid,
    pub outcome_id: Uuid,
    pub code: String,
}

/// Resolve the outcomes linked to each of the given activities.
///
/// Join rows pointing at a missing outcome drop out of the inner join.
/// Ordered by activity id, then outcome code.
pub async fn list_outcome_refs_for_activities<'e, E>(
    executor: E,
    activity_ids: &[Uuid],
) -> Result<Vec<ActivityOutcomeRef>>
where
    E: PgExecutor<'e>,
{
    let refs = sqlx::query_as::<_, ActivityOutcomeRef>(
        "SELECT ao.activity_id, o.id AS outcome_id, o.code \
         FROM activity_outcomes ao \
         JOIN outcomes o ON o.id = ao.outcome_id \
         WHERE ao.activity_id = ANY($1) \
         ORDER BY ao.activity_id, o.code",
    )
    .bind(activity_ids)
    .fetch_all(executor)
    .await
    .context("failed to list outcomes for activities")?;

    Ok(refs)
}

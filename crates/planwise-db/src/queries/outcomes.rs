//! Database query functions for the `outcomes` table.

use anyhow::{Context, Result};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::Outcome;

/// Parameters for inserting a new outcome row.
#[derive(Debug, Clone)]
pub struct NewOutcome<'a> {
    pub code: &'a str,
    pub description: &'a str,
    pub subject: &'a str,
    pub grade: i32,
}

/// Insert a new outcome. Returns the row with server-generated defaults.
pub async fn insert_outcome(pool: &PgPool, new: &NewOutcome<'_>) -> Result<Outcome> {
    let outcome = sqlx::query_as::<_, Outcome>(
        "INSERT INTO outcomes (code, description, subject, grade) \
         VALUES ($1, $2, $3, $4) \
         RETURNING *",
    )
    .bind(new.code)
    .bind(new.description)
    .bind(new.subject)
    .bind(new.grade)
    .fetch_one(pool)
    .await
    .with_context(|| format!("failed to insert outcome {:?}", new.code))?;

    Ok(outcome)
}

/// Fetch an outcome by its ID.
pub async fn get_outcome(pool: &PgPool, id: Uuid) -> Result<Option<Outcome>> {
    let outcome = sqlx::query_as::<_, Outcome>("SELECT * FROM outcomes WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch outcome")?;

    Ok(outcome)
}

/// List all outcomes ordered by code.
pub async fn list_outcomes(pool: &PgPool) -> Result<Vec<Outcome>> {
    let outcomes = sqlx::query_as::<_, Outcome>("SELECT * FROM outcomes ORDER BY code, id")
        .fetch_all(pool)
        .await
        .context("failed to list outcomes")?;

    Ok(outcomes)
}

//! [`CurriculumStore`] backed by PostgreSQL.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use planwise_db::queries::activities as activity_db;
use planwise_db::queries::coverage::{self as coverage_db, CoverageFilter, OutcomeLinks};
use planwise_db::queries::milestones as milestone_db;

use super::{CurriculumStore, OutcomeRef, PlanningSnapshot, assemble_candidates};
use crate::week::PlanningWeek;

/// Reads curriculum data through the `planwise-db` query functions.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CurriculumStore for PgStore {
    async fn outcome_links(&self, filter: &CoverageFilter) -> Result<Vec<OutcomeLinks>> {
        coverage_db::list_outcome_links(&self.pool, filter).await
    }

    /// Runs every read inside one `REPEATABLE READ, READ ONLY` transaction
    /// so coverage and candidates come from the same snapshot.
    async fn planning_snapshot(
        &self,
        week: PlanningWeek,
        user_id: Option<Uuid>,
    ) -> Result<PlanningSnapshot> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("failed to begin snapshot transaction")?;

        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await
            .context("failed to set snapshot isolation")?;

        let outcome_links =
            coverage_db::list_outcome_links(&mut *tx, &CoverageFilter::default()).await?;

        let milestones =
            milestone_db::list_milestones_in_window(&mut *tx, week.start(), week.end(), user_id)
                .await?;

        let milestone_ids: Vec<Uuid> = milestones.iter().map(|m| m.id).collect();
        let activities = if milestone_ids.is_empty() {
            Vec::new()
        } else {
            activity_db::list_open_activities(&mut *tx, &milestone_ids).await?
        };

        let activity_ids: Vec<Uuid> = activities.iter().map(|a| a.id).collect();
        let refs = if activity_ids.is_empty() {
            Vec::new()
        } else {
            activity_db::list_outcome_refs_for_activities(&mut *tx, &activity_ids).await?
        };

        tx.commit()
            .await
            .context("failed to close snapshot transaction")?;

        debug!(
            %week,
            milestones = milestones.len(),
            activities = activities.len(),
            outcomes = outcome_links.len(),
            "loaded planning snapshot"
        );

        let candidates = assemble_candidates(
            &milestones,
            activities,
            refs.into_iter().map(|r| {
                (
                    r.activity_id,
                    OutcomeRef {
                        id: r.outcome_id,
                        code: r.code,
                    },
                )
            }),
        );

        Ok(PlanningSnapshot {
            outcome_links,
            candidates,
        })
    }
}

//! Shared test utilities for planwise integration tests.
//!
//! Provides a PostgreSQL instance shared across tests. Each test gets its
//! own database within the instance.
//!
//! Two modes:
//! - **`PLANWISE_TEST_PG_URL`** set: use that server directly (no container
//!   per test binary).
//! - **No env var**: spin up a container via testcontainers, shared per
//!   binary through a `OnceCell`.
//!
//! [`Fixture`] wraps the `planwise-db` insert helpers so tests can lay out a
//! curriculum in a few lines.

use std::time::Duration;

use chrono::NaiveDate;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, PgPool};
use testcontainers::ContainerAsync;
use testcontainers::ImageExt;
use testcontainers::runners::AsyncRunner;
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;
use uuid::Uuid;

use planwise_db::models::{Activity, Milestone, Outcome};
use planwise_db::pool;
use planwise_db::queries::activities as activity_db;
use planwise_db::queries::milestones::{self as milestone_db, NewMilestone};
use planwise_db::queries::outcomes::{self as outcome_db, NewOutcome};

/// Shared container state: base URL and optional container handle (kept alive).
struct SharedPg {
    base_url: String,
    /// Held to keep the container alive. `None` when using an external URL.
    _container: Option<ContainerAsync<Postgres>>,
}

static SHARED_PG: OnceCell<SharedPg> = OnceCell::const_new();

async fn init_shared_pg() -> SharedPg {
    if let Ok(url) = std::env::var("PLANWISE_TEST_PG_URL") {
        return SharedPg {
            base_url: url,
            _container: None,
        };
    }

    let container = Postgres::default()
        .with_tag("16")
        .start()
        .await
        .expect("failed to start PostgreSQL container");

    let host = container.get_host().await.expect("failed to get host");
    let port = container
        .get_host_port_ipv4(5432)
        .await
        .expect("failed to get mapped port");

    SharedPg {
        base_url: format!("postgresql://postgres:postgres@{host}:{port}"),
        _container: Some(container),
    }
}

/// Base URL for the shared PostgreSQL (server root, no database name).
pub async fn pg_url() -> &'static str {
    let shared = SHARED_PG.get_or_init(init_shared_pg).await;
    &shared.base_url
}

async fn maintenance_pool() -> PgPool {
    let maint_url = format!("{}/postgres", pg_url().await);
    PgPoolOptions::new()
        .max_connections(1)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&maint_url)
        .await
        .expect("failed to connect to maintenance database")
}

/// Create a temporary database with migrations applied.
///
/// Returns `(pool, db_name)`. Call [`drop_test_db`] with the returned
/// `db_name` when the test is done.
pub async fn create_test_db() -> (PgPool, String) {
    let maint_pool = maintenance_pool().await;
    let db_name = format!("planwise_test_{}", Uuid::new_v4().simple());
    let stmt = format!("CREATE DATABASE {db_name}");
    maint_pool
        .execute(stmt.as_str())
        .await
        .unwrap_or_else(|e| panic!("failed to create temp database {db_name}: {e}"));
    maint_pool.close().await;

    let temp_url = format!("{}/{db_name}", pg_url().await);
    let temp_pool = PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&temp_url)
        .await
        .unwrap_or_else(|e| panic!("failed to connect to temp database {db_name}: {e}"));

    pool::run_migrations(&temp_pool)
        .await
        .expect("migrations should succeed");

    (temp_pool, db_name)
}

/// Drop a temporary database, terminating its connections first. Safe to
/// call even if the database was already dropped.
pub async fn drop_test_db(db_name: &str) {
    let maint_pool = maintenance_pool().await;

    let terminate = format!(
        "SELECT pg_terminate_backend(pid) \
         FROM pg_stat_activity \
         WHERE datname = '{db_name}' AND pid <> pg_backend_pid()"
    );
    let _ = maint_pool.execute(terminate.as_str()).await;

    let stmt = format!("DROP DATABASE IF EXISTS {db_name}");
    let _ = maint_pool.execute(stmt.as_str()).await;
    maint_pool.close().await;
}

/// Shorthand for a calendar date.
pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid calendar date")
}

/// Curriculum builder over a test database. Every method panics on failure.
pub struct Fixture<'a> {
    pool: &'a PgPool,
}

impl<'a> Fixture<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn outcome(&self, code: &str, subject: &str, grade: i32) -> Outcome {
        let new = NewOutcome {
            code,
            description: code,
            subject,
            grade,
        };
        outcome_db::insert_outcome(self.pool, &new)
            .await
            .expect("insert_outcome should succeed")
    }

    pub async fn milestone(
        &self,
        title: &str,
        subject: Option<&str>,
        user_id: Option<Uuid>,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Milestone {
        let new = NewMilestone {
            title,
            subject,
            user_id,
            start_date,
            end_date,
        };
        milestone_db::insert_milestone(self.pool, &new)
            .await
            .expect("insert_milestone should succeed")
    }

    /// Declare outcomes on a milestone.
    pub async fn declare(&self, milestone: &Milestone, outcomes: &[&Outcome]) {
        for outcome in outcomes {
            milestone_db::link_milestone_outcome(self.pool, milestone.id, outcome.id)
                .await
                .expect("link_milestone_outcome should succeed");
        }
    }

    /// Insert an activity under `milestone` linked to `outcomes`.
    pub async fn activity(&self, milestone: &Milestone, title: &str, outcomes: &[&Outcome]) -> Activity {
        let activity = activity_db::insert_activity(self.pool, milestone.id, title)
            .await
            .expect("insert_activity should succeed");
        for outcome in outcomes {
            activity_db::link_activity_outcome(self.pool, activity.id, outcome.id)
                .await
                .expect("link_activity_outcome should succeed");
        }
        activity
    }

    pub async fn complete(&self, activity: &Activity) -> Activity {
        activity_db::complete_activity(self.pool, activity.id)
            .await
            .expect("complete_activity should succeed")
    }

    pub async fn schedule(&self, activity: &Activity, on: NaiveDate) {
        activity_db::insert_daily_plan_item(self.pool, activity.id, on)
            .await
            .expect("insert_daily_plan_item should succeed");
    }
}

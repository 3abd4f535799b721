use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::Deserialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use planwise_core::coverage::summarize;
use planwise_core::{
    CoverageFilter, CurriculumStore, EngineError, PlanningWeek, classify_coverage,
    rank_suggestions,
};

type AppState = Arc<dyn CurriculumStore>;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

pub struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    /// The response carries only the engine's message; the cause is logged.
    pub fn internal(err: EngineError) -> Self {
        match std::error::Error::source(&err) {
            Some(cause) => tracing::error!(error = %err, cause = %cause, "request failed"),
            None => tracing::error!(error = %err, "request failed"),
        }
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let body = serde_json::json!({ "error": self.message });
        (self.status, Json(body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionsQuery {
    pub week_start: NaiveDate,
    pub user_id: Option<Uuid>,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn build_router(store: AppState) -> Router {
    Router::new()
        .route("/api/coverage", get(get_coverage))
        .route("/api/coverage/summary", get(get_coverage_summary))
        .route("/api/planner/suggestions", get(get_suggestions))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(store)
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub async fn run_serve(store: AppState, bind: &str, port: u16) -> Result<()> {
    let app = build_router(store);
    let addr: SocketAddr = format!("{bind}:{port}").parse()?;
    tracing::info!("planwise serve listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("planwise serve shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn get_coverage(
    State(store): State<AppState>,
    Query(filter): Query<CoverageFilter>,
) -> Result<axum::response::Response, AppError> {
    let coverage = classify_coverage(store.as_ref(), &filter)
        .await
        .map_err(AppError::internal)?;

    Ok(Json(coverage).into_response())
}

async fn get_coverage_summary(
    State(store): State<AppState>,
    Query(filter): Query<CoverageFilter>,
) -> Result<axum::response::Response, AppError> {
    let coverage = classify_coverage(store.as_ref(), &filter)
        .await
        .map_err(AppError::internal)?;

    Ok(Json(summarize(&coverage)).into_response())
}

async fn get_suggestions(
    State(store): State<AppState>,
    Query(query): Query<SuggestionsQuery>,
) -> Result<axum::response::Response, AppError> {
    let week = PlanningWeek::starting(query.week_start);
    let suggestions = rank_suggestions(store.as_ref(), week, query.user_id)
        .await
        .map_err(AppError::internal)?;

    Ok(Json(suggestions).into_response())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

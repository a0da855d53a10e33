//! Control API route handlers.
//!
//! All endpoints return JSON. State is shared via `Arc<ControlState>`.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::engine::Orchestrator;
use crate::scheduler::TimezoneScheduler;
use crate::types::{PostOutcome, RespondMode, RespondOutcome, SchedulerHealth};

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

pub struct ControlState {
    pub orchestrator: Arc<Orchestrator>,
    pub scheduler: Arc<TimezoneScheduler>,
}

pub type AppState = Arc<ControlState>;

// ---------------------------------------------------------------------------
// Request/response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct PostNowParams {
    #[serde(default)]
    pub force_enrichment: bool,
}

#[derive(Debug, Deserialize)]
pub struct RespondNowParams {
    pub mode: String,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct ScheduleParams {
    pub time: String,
}

#[derive(Debug, Serialize)]
pub struct BannerResponse {
    pub service: &'static str,
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ScheduleResponse {
    pub job_id: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

/// GET /
pub async fn banner() -> Json<BannerResponse> {
    Json(BannerResponse {
        service: "coin-herald",
        status: "running",
    })
}

/// POST /api/post-now
pub async fn post_now(
    State(state): State<AppState>,
    Query(params): Query<PostNowParams>,
) -> Json<PostOutcome> {
    let outcome = state
        .orchestrator
        .run_post_workflow(params.force_enrichment)
        .await;
    Json(outcome)
}

/// POST /api/respond-now
pub async fn respond_now(
    State(state): State<AppState>,
    Query(params): Query<RespondNowParams>,
) -> Result<Json<RespondOutcome>, (StatusCode, Json<ErrorResponse>)> {
    let mode: RespondMode = params.mode.parse().map_err(|e: anyhow::Error| {
        (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        )
    })?;

    let outcome = state
        .orchestrator
        .run_respond_workflow(mode, params.limit)
        .await;
    Ok(Json(outcome))
}

/// POST /api/schedule
pub async fn schedule(
    State(state): State<AppState>,
    Query(params): Query<ScheduleParams>,
) -> Result<Json<ScheduleResponse>, (StatusCode, Json<ErrorResponse>)> {
    match state.scheduler.schedule_at(&params.time) {
        Ok(job_id) => Ok(Json(ScheduleResponse { job_id })),
        Err(e) => Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        )),
    }
}

/// GET /api/health
pub async fn health(State(state): State<AppState>) -> Json<SchedulerHealth> {
    Json(state.scheduler.health_status())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

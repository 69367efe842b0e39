//! Handlers for `/api/v1/schedule/*`. Each one is a thin layer over the
//! services: acquire whatever lock the operation needs, call the service,
//! shape the response. No business logic lives here.

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{Duration, NaiveDate, Utc};
use uuid::Uuid;

use super::AppState;
use crate::db::queries::appointments;
use crate::errors::{ApiError, ApiResult};
use crate::services::snapshot::{load_snapshot, load_snapshot_for_reoptimize, SolverInput};
use crate::services::solver::{reoptimize, solve, SolverConfig};
use crate::services::{capacity, clear_audit, emergency, persister};
use crate::types::{
    AuditDetail, AuditSummary, CapacityResponse, ClearRequest, ClearResponse,
    EmergencyInsertAssignment, EmergencyInsertRequest, EmergencyInsertResponse, JobSnapshot,
    ReoptimizeRequest, RestoreResponse, ScheduleGenerateRequest, ScheduleResponse,
};

fn jobs_and_staff_names(input: &SolverInput) -> (HashMap<Uuid, JobSnapshot>, HashMap<Uuid, String>) {
    let jobs_by_id = input.jobs.iter().map(|j| (j.job_id, j.clone())).collect();
    let staff_names = input.staff.iter().map(|s| (s.staff_id, s.name.clone())).collect();
    (jobs_by_id, staff_names)
}

/// `POST /schedule/generate` — solves and persists.
pub async fn generate(
    State(state): State<AppState>,
    Json(request): Json<ScheduleGenerateRequest>,
) -> ApiResult<Json<ScheduleResponse>> {
    let _guard = state
        .locks
        .try_acquire(request.schedule_date)
        .ok_or_else(|| ApiError::Conflict(request.schedule_date.to_string()))?;

    let input = load_snapshot(&state.pool, request.schedule_date, None).await.map_err(ApiError::Internal)?;
    let config = request.timeout_seconds.map(SolverConfig::with_timeout).unwrap_or_default();

    let provider = state.provider.as_deref();
    let result = solve(provider, &input, &config).await;

    persister::persist_schedule(&state.pool, request.schedule_date, &result.assignments)
        .await
        .map_err(ApiError::Internal)?;

    let (jobs_by_id, staff_names) = jobs_and_staff_names(&input);
    Ok(Json(ScheduleResponse::from_result(&result, &jobs_by_id, &staff_names)))
}

/// `POST /schedule/preview` — solves without persisting. Only needs the
/// concurrency permit, not the per-date exclusion lock, since nothing
/// written is at stake.
pub async fn preview(
    State(state): State<AppState>,
    Json(request): Json<ScheduleGenerateRequest>,
) -> ApiResult<Json<ScheduleResponse>> {
    let _permit = state.locks.try_acquire_permit().ok_or(ApiError::Busy)?;

    let input = load_snapshot(&state.pool, request.schedule_date, None).await.map_err(ApiError::Internal)?;
    let config = request.timeout_seconds.map(SolverConfig::with_timeout).unwrap_or_else(SolverConfig::fast);

    let provider = state.provider.as_deref();
    let result = solve(provider, &input, &config).await;

    let (jobs_by_id, staff_names) = jobs_and_staff_names(&input);
    Ok(Json(ScheduleResponse::from_result(&result, &jobs_by_id, &staff_names)))
}

/// `GET /schedule/capacity/{date}`
pub async fn capacity(
    State(state): State<AppState>,
    Path(date): Path<NaiveDate>,
) -> ApiResult<Json<CapacityResponse>> {
    let response = capacity::capacity_for_date(&state.pool, date).await.map_err(ApiError::Internal)?;
    Ok(Json(response))
}

/// `POST /schedule/insert-emergency`
pub async fn insert_emergency(
    State(state): State<AppState>,
    Json(request): Json<EmergencyInsertRequest>,
) -> ApiResult<Json<EmergencyInsertResponse>> {
    let _guard = state
        .locks
        .try_acquire(request.target_date)
        .ok_or_else(|| ApiError::Conflict(request.target_date.to_string()))?;

    let provider = state.provider.as_deref();
    let outcome = emergency::insert_emergency(
        &state.pool,
        provider,
        request.target_date,
        request.job_id,
        request.priority_level,
    )
    .await
    .map_err(ApiError::Internal)?;

    Ok(Json(EmergencyInsertResponse {
        success: outcome.placement.is_some(),
        assignment: outcome
            .placement
            .map(|(staff_id, stop)| EmergencyInsertAssignment { staff_id, stop }),
        reason: outcome.reason,
    }))
}

/// `POST /schedule/re-optimize/{date}` — re-solves an already-scheduled day,
/// seeded from its currently persisted tours, running local search only.
/// Never drops an in-progress or completed stop: those never enter the
/// snapshot or the seed in the first place.
pub async fn re_optimize(
    State(state): State<AppState>,
    Path(date): Path<NaiveDate>,
    Json(request): Json<ReoptimizeRequest>,
) -> ApiResult<Json<ScheduleResponse>> {
    let _guard = state.locks.try_acquire(date).ok_or_else(|| ApiError::Conflict(date.to_string()))?;

    let input = load_snapshot_for_reoptimize(&state.pool, date).await.map_err(ApiError::Internal)?;
    let seed = appointments::list_scheduled_assignments_for_date(&state.pool, date).await.map_err(ApiError::Internal)?;
    let config = request.timeout_seconds.map(SolverConfig::with_timeout).unwrap_or_else(SolverConfig::quality);

    let provider = state.provider.as_deref();
    let result = reoptimize(provider, &input, &seed, &config).await;

    persister::persist_schedule(&state.pool, date, &result.assignments).await.map_err(ApiError::Internal)?;

    let (jobs_by_id, staff_names) = jobs_and_staff_names(&input);
    Ok(Json(ScheduleResponse::from_result(&result, &jobs_by_id, &staff_names)))
}

/// `POST /schedule/clear`
pub async fn clear(
    State(state): State<AppState>,
    Json(request): Json<ClearRequest>,
) -> ApiResult<Json<ClearResponse>> {
    let _guard = state
        .locks
        .try_acquire(request.schedule_date)
        .ok_or_else(|| ApiError::Conflict(request.schedule_date.to_string()))?;

    let (audit_id, appointments_deleted, jobs_reset) =
        clear_audit::clear(&state.pool, request.schedule_date, None, request.notes.as_deref())
            .await
            .map_err(ApiError::Internal)?;

    Ok(Json(ClearResponse { audit_id, appointments_deleted, jobs_reset, cleared_at: Utc::now() }))
}

/// `POST /schedule/clear/{audit_id}/restore`
pub async fn restore(
    State(state): State<AppState>,
    Path(audit_id): Path<Uuid>,
) -> ApiResult<Json<RestoreResponse>> {
    let audit = clear_audit::detail(&state.pool, audit_id)
        .await
        .map_err(ApiError::Internal)?
        .ok_or_else(|| ApiError::NotFound(format!("clear audit {audit_id}")))?;

    let _guard = state
        .locks
        .try_acquire(audit.schedule_date)
        .ok_or_else(|| ApiError::Conflict(audit.schedule_date.to_string()))?;

    let (appointments_restored, jobs_updated) = clear_audit::restore(&state.pool, audit_id)
        .await
        .map_err(ApiError::Internal)?
        .ok_or_else(|| ApiError::NotFound(format!("clear audit {audit_id}")))?;

    Ok(Json(RestoreResponse { audit_id, appointments_restored, jobs_updated }))
}

#[derive(serde::Deserialize)]
pub struct RecentQuery {
    hours: Option<i64>,
}

/// `GET /schedule/clear/recent?hours=24`
pub async fn recent(
    State(state): State<AppState>,
    Query(params): Query<RecentQuery>,
) -> ApiResult<Json<Vec<AuditSummary>>> {
    let hours = params.hours.unwrap_or(24);
    let cutoff = Utc::now() - Duration::hours(hours.max(0));

    let summaries = clear_audit::recent(&state.pool, 500).await.map_err(ApiError::Internal)?;
    let recent = summaries.into_iter().filter(|s| s.cleared_at >= cutoff).collect();
    Ok(Json(recent))
}

/// `GET /schedule/clear/{audit_id}`
pub async fn detail(
    State(state): State<AppState>,
    Path(audit_id): Path<Uuid>,
) -> ApiResult<Json<AuditDetail>> {
    let audit = clear_audit::detail(&state.pool, audit_id)
        .await
        .map_err(ApiError::Internal)?
        .ok_or_else(|| ApiError::NotFound(format!("clear audit {audit_id}")))?;

    Ok(Json(AuditDetail { audit }))
}

//! Schedule authoring route handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use tracing::info;
use validator::Validate;

use domain::models::schedule::schedulable_report_type;
use domain::models::{CreateScheduleRequest, ExecutionLogEntry, Schedule, UpdateScheduleRequest};
use domain::services::{plan_new_schedule, plan_schedule_update, ScheduleValidationError};

use crate::app::AppState;
use crate::error::ApiError;
use crate::services::scheduler_now;

use super::active_tenant;

pub const DEFAULT_LOG_LIMIT: i64 = 20;
pub const MAX_LOG_LIMIT: i64 = 200;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ListSchedulesQuery {
    pub report_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ListLogsQuery {
    pub limit: Option<i64>,
}

fn log_limit(requested: Option<i64>) -> i64 {
    requested.unwrap_or(DEFAULT_LOG_LIMIT).clamp(1, MAX_LOG_LIMIT)
}

fn schedule_not_found(id: i64) -> ApiError {
    ApiError::NotFound(format!("Schedule {} not found", id))
}

/// List active schedules, newest first.
///
/// GET /api/v1/tenants/:tenant/schedules
pub async fn list_schedules(
    State(state): State<AppState>,
    Path(tenant_code): Path<String>,
    Query(query): Query<ListSchedulesQuery>,
) -> Result<Json<Vec<Schedule>>, ApiError> {
    let tenant = active_tenant(&state, &tenant_code).await?;
    let store = state.stores.schedule_store(&tenant)?;
    let report_type = query
        .report_type
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());
    let schedules = store.list_active(report_type).await?;
    Ok(Json(schedules))
}

/// Create a schedule.
///
/// POST /api/v1/tenants/:tenant/schedules
///
/// Enforces the tenant's per-report quota and computes the first run.
pub async fn create_schedule(
    State(state): State<AppState>,
    Path(tenant_code): Path<String>,
    Json(request): Json<CreateScheduleRequest>,
) -> Result<(StatusCode, Json<Schedule>), ApiError> {
    request.validate()?;

    let tenant = active_tenant(&state, &tenant_code).await?;
    let settings = state.stores.settings_store(&tenant)?.load().await?;
    let store = state.stores.schedule_store(&tenant)?;

    let report_type = schedulable_report_type(&request.report_type)
        .ok_or_else(|| ScheduleValidationError::UnsupportedReportType(request.report_type.clone()))?;
    let active = store.count_active_for_report(report_type).await?;

    let now = scheduler_now(state.config.scheduler.use_utc);
    let new_schedule = plan_new_schedule(&request, &settings, active, now)?;
    let schedule = store.create(&new_schedule).await?;

    info!(
        tenant = %tenant.code,
        schedule_id = schedule.id,
        next_run_at = ?schedule.next_run_at,
        "Schedule created"
    );
    Ok((StatusCode::CREATED, Json(schedule)))
}

/// Read one schedule.
///
/// GET /api/v1/tenants/:tenant/schedules/:id
pub async fn get_schedule(
    State(state): State<AppState>,
    Path((tenant_code, id)): Path<(String, i64)>,
) -> Result<Json<Schedule>, ApiError> {
    let tenant = active_tenant(&state, &tenant_code).await?;
    let store = state.stores.schedule_store(&tenant)?;
    let schedule = store.get(id).await?.ok_or_else(|| schedule_not_found(id))?;
    Ok(Json(schedule))
}

/// Update a schedule and recompute its next run.
///
/// PUT /api/v1/tenants/:tenant/schedules/:id
///
/// Reactivating an inactive schedule counts against the quota.
pub async fn update_schedule(
    State(state): State<AppState>,
    Path((tenant_code, id)): Path<(String, i64)>,
    Json(request): Json<UpdateScheduleRequest>,
) -> Result<Json<Schedule>, ApiError> {
    request.validate()?;

    let tenant = active_tenant(&state, &tenant_code).await?;
    let settings = state.stores.settings_store(&tenant)?.load().await?;
    let store = state.stores.schedule_store(&tenant)?;
    let existing = store.get(id).await?.ok_or_else(|| schedule_not_found(id))?;

    let now = scheduler_now(state.config.scheduler.use_utc);
    let changes = plan_schedule_update(&request, &existing, &settings, now)?;

    if changes.is_active && !existing.is_active {
        let active = store.count_active_for_report(&existing.report_type).await?;
        if active >= i64::from(settings.max_schedules_per_report) {
            return Err(ScheduleValidationError::QuotaReached(settings.max_schedules_per_report).into());
        }
    }

    let schedule = store.update(id, &changes).await?;
    info!(
        tenant = %tenant.code,
        schedule_id = id,
        next_run_at = ?schedule.next_run_at,
        is_active = schedule.is_active,
        "Schedule updated"
    );
    Ok(Json(schedule))
}

/// Deactivate a schedule.
///
/// DELETE /api/v1/tenants/:tenant/schedules/:id
pub async fn delete_schedule(
    State(state): State<AppState>,
    Path((tenant_code, id)): Path<(String, i64)>,
) -> Result<StatusCode, ApiError> {
    let tenant = active_tenant(&state, &tenant_code).await?;
    let store = state.stores.schedule_store(&tenant)?;
    store.get(id).await?.ok_or_else(|| schedule_not_found(id))?;
    store.deactivate(id).await?;

    info!(tenant = %tenant.code, schedule_id = id, "Schedule deactivated");
    Ok(StatusCode::NO_CONTENT)
}

/// Recent execution log entries, newest first.
///
/// GET /api/v1/tenants/:tenant/schedules/:id/logs
pub async fn list_schedule_logs(
    State(state): State<AppState>,
    Path((tenant_code, id)): Path<(String, i64)>,
    Query(query): Query<ListLogsQuery>,
) -> Result<Json<Vec<ExecutionLogEntry>>, ApiError> {
    let tenant = active_tenant(&state, &tenant_code).await?;
    let store = state.stores.schedule_store(&tenant)?;
    store.get(id).await?.ok_or_else(|| schedule_not_found(id))?;
    let logs = store.list_logs(id, log_limit(query.limit)).await?;
    Ok(Json(logs))
}

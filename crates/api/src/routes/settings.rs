//! Per-tenant scheduler settings.

use axum::{
    extract::{Path, State},
    Json,
};
use tracing::info;
use validator::Validate;

use domain::models::DatabaseSettings;

use crate::app::AppState;
use crate::error::ApiError;

use super::active_tenant;

/// GET /api/v1/tenants/:tenant/settings
pub async fn get_settings(
    State(state): State<AppState>,
    Path(tenant_code): Path<String>,
) -> Result<Json<DatabaseSettings>, ApiError> {
    let tenant = active_tenant(&state, &tenant_code).await?;
    let settings = state.stores.settings_store(&tenant)?.load().await?;
    Ok(Json(settings))
}

/// PUT /api/v1/tenants/:tenant/settings
pub async fn update_settings(
    State(state): State<AppState>,
    Path(tenant_code): Path<String>,
    Json(settings): Json<DatabaseSettings>,
) -> Result<Json<DatabaseSettings>, ApiError> {
    settings.validate()?;
    let tenant = active_tenant(&state, &tenant_code).await?;
    state.stores.settings_store(&tenant)?.save(&settings).await?;

    info!(
        tenant = %tenant.code,
        scheduler_enabled = settings.scheduler_enabled,
        max_schedules_per_report = settings.max_schedules_per_report,
        "Tenant settings updated"
    );
    Ok(Json(settings))
}

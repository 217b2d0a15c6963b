//! Tenant listing.

use axum::{extract::State, Json};
use serde::Serialize;

use domain::models::Tenant;

use crate::app::AppState;
use crate::error::ApiError;

/// Public view of a tenant database.
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct TenantResponse {
    pub code: String,
    pub display_name: String,
    pub company_code: String,
}

impl From<Tenant> for TenantResponse {
    fn from(tenant: Tenant) -> Self {
        Self {
            code: tenant.code,
            display_name: tenant.display_name,
            company_code: tenant.company_code,
        }
    }
}

/// List active tenants.
///
/// GET /api/v1/tenants
pub async fn list_tenants(State(state): State<AppState>) -> Result<Json<Vec<TenantResponse>>, ApiError> {
    let tenants = state.catalog.list_active_tenants().await?;
    Ok(Json(tenants.into_iter().map(TenantResponse::from).collect()))
}

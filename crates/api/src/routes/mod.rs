//! HTTP route handlers.

pub mod health;
pub mod runs;
pub mod schedules;
pub mod settings;
pub mod tenants;

use domain::models::Tenant;

use crate::app::AppState;
use crate::error::ApiError;

/// Resolves the `:tenant` path segment against the active tenant catalog.
pub(crate) async fn active_tenant(state: &AppState, code: &str) -> Result<Tenant, ApiError> {
    state
        .catalog
        .find_tenant(code)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Tenant '{}' not found", code)))
}

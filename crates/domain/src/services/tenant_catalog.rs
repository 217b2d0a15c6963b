//! Tenant discovery and per-tenant collaborator binding.

use std::sync::Arc;

use super::report_engine::ReportEngine;
use super::schedule_store::{ScheduleStore, SettingsStore, StoreError};
use crate::models::Tenant;

/// Enumerates tenant databases.
#[async_trait::async_trait]
pub trait TenantCatalog: Send + Sync {
    async fn list_active_tenants(&self) -> Result<Vec<Tenant>, StoreError>;

    async fn find_tenant(&self, code: &str) -> Result<Option<Tenant>, StoreError>;

    /// Checks that the catalog is reachable.
    async fn ping(&self) -> Result<(), StoreError>;
}

/// Binds tenant-scoped collaborators to a tenant's connection.
pub trait TenantStores: Send + Sync {
    fn schedule_store(&self, tenant: &Tenant) -> Result<Arc<dyn ScheduleStore>, StoreError>;

    fn settings_store(&self, tenant: &Tenant) -> Result<Arc<dyn SettingsStore>, StoreError>;

    fn report_engine(&self, tenant: &Tenant) -> Result<Arc<dyn ReportEngine>, StoreError>;

    /// Releases resources held for tenants missing from `active`.
    fn retain_tenants(&self, _active: &[Tenant]) {}
}

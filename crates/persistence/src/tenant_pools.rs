//! Per-tenant connection pools.
//!
//! Pools are opened lazily the first time a tenant is touched and reused for
//! later runs. A tenant whose connection parameters changed in the catalog
//! gets a fresh pool and the old one is closed. Tenants that drop out of the
//! catalog have their pools closed on the next scan.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use sqlx::PgPool;

use domain::models::Tenant;
use domain::services::{ReportEngine, ScheduleStore, SettingsStore, StoreError, TenantStores};
use shared::crypto::SecretCipher;

use crate::db::{connect_tenant_lazy, TenantConnection};
use crate::repositories::{AverageBasketRepository, ScheduleRepository, SettingsRepository};

/// Pool sizing applied to every tenant database.
#[derive(Debug, Clone)]
pub struct TenantPoolConfig {
    pub max_connections: u32,
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

impl Default for TenantPoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 5,
            connect_timeout_secs: 10,
            idle_timeout_secs: 300,
        }
    }
}

struct CachedPool {
    fingerprint: String,
    pool: PgPool,
}

fn fingerprint(tenant: &Tenant) -> String {
    format!(
        "{}:{}/{}@{}#{}",
        tenant.server_host,
        tenant.server_port,
        tenant.db_name,
        tenant.db_user,
        tenant.db_password_encrypted
    )
}

/// Closes a pool that is no longer cached.
fn retire(code: &str, pool: PgPool) {
    tracing::info!(tenant = %code, "Closing tenant connection pool");
    if let Ok(runtime) = tokio::runtime::Handle::try_current() {
        runtime.spawn(async move { pool.close().await });
    }
}

/// Cache of tenant pools keyed by tenant code.
pub struct TenantPools {
    cipher: SecretCipher,
    config: TenantPoolConfig,
    pools: RwLock<HashMap<String, CachedPool>>,
}

impl TenantPools {
    pub fn new(cipher: SecretCipher, config: TenantPoolConfig) -> Self {
        Self {
            cipher,
            config,
            pools: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the pool of a tenant, opening it on first use.
    pub fn pool_for(&self, tenant: &Tenant) -> Result<PgPool, StoreError> {
        let expected = fingerprint(tenant);
        {
            let pools = self.pools.read().unwrap_or_else(|e| e.into_inner());
            if let Some(cached) = pools.get(&tenant.code) {
                if cached.fingerprint == expected {
                    return Ok(cached.pool.clone());
                }
            }
        }

        let password = self
            .cipher
            .decrypt(&tenant.db_password_encrypted)
            .map_err(|e| {
                tracing::warn!(tenant = %tenant.code, error = %e, "Failed to decrypt tenant password");
                StoreError::Unavailable(format!("cannot decrypt credentials: {}", e))
            })?;

        let pool = connect_tenant_lazy(
            &TenantConnection {
                host: &tenant.server_host,
                port: tenant.server_port,
                database: &tenant.db_name,
                user: &tenant.db_user,
                password: &password,
            },
            self.config.max_connections,
            self.config.connect_timeout_secs,
            self.config.idle_timeout_secs,
        );

        tracing::info!(
            tenant = %tenant.code,
            host = %tenant.server_host,
            database = %tenant.db_name,
            "Opened tenant connection pool"
        );

        let mut pools = self.pools.write().unwrap_or_else(|e| e.into_inner());
        if let Some(cached) = pools.get(&tenant.code) {
            if cached.fingerprint == expected {
                return Ok(cached.pool.clone());
            }
        }
        let replaced = pools.insert(
            tenant.code.clone(),
            CachedPool {
                fingerprint: expected,
                pool: pool.clone(),
            },
        );
        drop(pools);
        if let Some(old) = replaced {
            retire(&tenant.code, old.pool);
        }
        Ok(pool)
    }

    /// Closes the pools of tenants absent from `active`.
    pub fn retain(&self, active: &[Tenant]) {
        let evicted: Vec<(String, PgPool)> = {
            let mut pools = self.pools.write().unwrap_or_else(|e| e.into_inner());
            let stale: Vec<String> = pools
                .keys()
                .filter(|code| !active.iter().any(|t| t.code == **code))
                .cloned()
                .collect();
            stale
                .into_iter()
                .filter_map(|code| pools.remove(&code).map(|cached| (code, cached.pool)))
                .collect()
        };
        for (code, pool) in evicted {
            retire(&code, pool);
        }
    }

    /// Snapshot of the open pools, for metrics.
    pub fn pools(&self) -> Vec<(String, PgPool)> {
        let pools = self.pools.read().unwrap_or_else(|e| e.into_inner());
        pools
            .iter()
            .map(|(code, cached)| (code.clone(), cached.pool.clone()))
            .collect()
    }

    /// Closes every open pool.
    pub async fn close_all(&self) {
        let drained: Vec<PgPool> = {
            let mut pools = self.pools.write().unwrap_or_else(|e| e.into_inner());
            pools.drain().map(|(_, cached)| cached.pool).collect()
        };
        for pool in drained {
            pool.close().await;
        }
    }
}

impl TenantStores for TenantPools {
    fn schedule_store(&self, tenant: &Tenant) -> Result<Arc<dyn ScheduleStore>, StoreError> {
        Ok(Arc::new(ScheduleRepository::new(self.pool_for(tenant)?)))
    }

    fn settings_store(&self, tenant: &Tenant) -> Result<Arc<dyn SettingsStore>, StoreError> {
        Ok(Arc::new(SettingsRepository::new(self.pool_for(tenant)?)))
    }

    fn report_engine(&self, tenant: &Tenant) -> Result<Arc<dyn ReportEngine>, StoreError> {
        Ok(Arc::new(AverageBasketRepository::new(self.pool_for(tenant)?)))
    }

    fn retain_tenants(&self, active: &[Tenant]) {
        self.retain(active);
    }
}

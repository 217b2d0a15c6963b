//! Tenant catalog repository over the central database.

use sqlx::PgPool;

use domain::models::Tenant;
use domain::services::{StoreError, TenantCatalog};

use crate::entities::TenantDatabaseEntity;
use crate::error::store_error;
use crate::metrics::QueryTimer;

const TENANT_QUERY: &str = r#"
    SELECT t.db_code, t.display_name, t.db_name, t.server_host, t.server_port,
           t.db_user, t.db_password_encrypted, t.company_code
    FROM tenant_databases t
    INNER JOIN companies c ON c.company_code = t.company_code
    WHERE t.is_active AND c.is_active
"#;

/// Repository for active tenant databases.
#[derive(Clone)]
pub struct TenantRepository {
    pool: PgPool,
}

impl TenantRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait::async_trait]
impl TenantCatalog for TenantRepository {
    async fn list_active_tenants(&self) -> Result<Vec<Tenant>, StoreError> {
        let timer = QueryTimer::new("list_active_tenants");
        let sql = format!("{TENANT_QUERY} ORDER BY t.display_name, t.db_code");
        let result = sqlx::query_as::<_, TenantDatabaseEntity>(&sql)
            .fetch_all(&self.pool)
            .await;
        timer.record();
        result
            .map(|rows| rows.into_iter().map(Tenant::from).collect())
            .map_err(store_error)
    }

    async fn find_tenant(&self, code: &str) -> Result<Option<Tenant>, StoreError> {
        let timer = QueryTimer::new("find_tenant");
        let sql = format!("{TENANT_QUERY} AND t.db_code = $1");
        let result = sqlx::query_as::<_, TenantDatabaseEntity>(&sql)
            .bind(code)
            .fetch_optional(&self.pool)
            .await;
        timer.record();
        result
            .map(|row| row.map(Tenant::from))
            .map_err(store_error)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(store_error)
    }
}

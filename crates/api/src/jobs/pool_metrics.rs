//! Background job to record connection pool metrics.

use sqlx::PgPool;
use std::sync::Arc;

use persistence::TenantPools;

use super::scheduler::{Job, JobFrequency};

/// Job that periodically records central and tenant pool metrics.
pub struct PoolMetricsJob {
    central: PgPool,
    tenants: Arc<TenantPools>,
}

impl PoolMetricsJob {
    pub fn new(central: PgPool, tenants: Arc<TenantPools>) -> Self {
        Self { central, tenants }
    }
}

#[async_trait::async_trait]
impl Job for PoolMetricsJob {
    fn name(&self) -> &'static str {
        "pool_metrics"
    }

    fn frequency(&self) -> JobFrequency {
        JobFrequency::Seconds(10)
    }

    async fn execute(&self) -> Result<(), String> {
        persistence::metrics::record_pool_metrics("central", &self.central);
        for (code, pool) in self.tenants.pools() {
            persistence::metrics::record_pool_metrics(&code, &pool);
        }
        Ok(())
    }
}

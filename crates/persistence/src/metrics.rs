//! Database metrics collection.

use metrics::{gauge, histogram};
use sqlx::PgPool;
use std::time::Instant;

/// Record database query duration.
pub fn record_query_duration(query_name: &str, duration_secs: f64) {
    histogram!(
        "database_query_duration_seconds",
        "query" => query_name.to_string()
    )
    .record(duration_secs);
}

/// Record connection pool gauges, labelled with the pool name
/// (`central` or a tenant code).
pub fn record_pool_metrics(pool_name: &str, pool: &PgPool) {
    let size = pool.size() as usize;
    let idle = pool.num_idle();
    let active = size.saturating_sub(idle);

    gauge!("database_connections_active", "pool" => pool_name.to_string()).set(active as f64);
    gauge!("database_connections_idle", "pool" => pool_name.to_string()).set(idle as f64);
    gauge!("database_connections_total", "pool" => pool_name.to_string()).set(size as f64);
}

/// Times one query and records it on [`QueryTimer::record`].
///
/// ```ignore
/// let timer = QueryTimer::new("list_due_schedules");
/// let result = sqlx::query_as::<_, ReportScheduleEntity>(...).fetch_all(&pool).await;
/// timer.record();
/// ```
pub struct QueryTimer {
    query_name: &'static str,
    start: Instant,
}

impl QueryTimer {
    pub fn new(query_name: &'static str) -> Self {
        Self {
            query_name,
            start: Instant::now(),
        }
    }

    pub fn record(self) {
        record_query_duration(self.query_name, self.start.elapsed().as_secs_f64());
    }
}

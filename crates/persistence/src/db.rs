//! Database connection pool management.

use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::PgPool;
use std::time::Duration;

/// Central catalog database configuration.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

/// Creates the central catalog connection pool.
pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .connect(&config.url)
        .await
}

/// Connection parameters of one tenant database, password already decrypted.
#[derive(Clone)]
pub struct TenantConnection<'a> {
    pub host: &'a str,
    pub port: u16,
    pub database: &'a str,
    pub user: &'a str,
    pub password: &'a str,
}

/// Opens a tenant pool without connecting; the first query establishes the connection.
pub fn connect_tenant_lazy(
    conn: &TenantConnection<'_>,
    max_connections: u32,
    connect_timeout_secs: u64,
    idle_timeout_secs: u64,
) -> PgPool {
    let options = PgConnectOptions::new()
        .host(conn.host)
        .port(conn.port)
        .database(conn.database)
        .username(conn.user)
        .password(conn.password);

    PgPoolOptions::new()
        .max_connections(max_connections)
        .min_connections(0)
        .acquire_timeout(Duration::from_secs(connect_timeout_secs))
        .idle_timeout(Duration::from_secs(idle_timeout_secs))
        .connect_lazy_with(options)
}

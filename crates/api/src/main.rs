use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

use persistence::repositories::TenantRepository;
use persistence::TenantPools;
use shared::crypto::SecretCipher;

use report_scheduler_api::app::{create_app, AppState};
use report_scheduler_api::config::Config;
use report_scheduler_api::jobs::{JobScheduler, PoolMetricsJob, ScheduledReportsJob};
use report_scheduler_api::middleware::{init_metrics, logging::init_logging};
use report_scheduler_api::services::{EmailService, ExportRenderer, ScheduleExecutionService};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = Config::load()?;

    init_logging(&config.logging);
    init_metrics().context("failed to install Prometheus recorder")?;

    info!("Starting report scheduler v{}", env!("CARGO_PKG_VERSION"));

    let pool = persistence::db::create_pool(&config.database.pool_config()).await?;

    info!("Running central database migrations...");
    sqlx::migrate!("../persistence/src/migrations")
        .run(&pool)
        .await?;
    info!("Migrations completed");

    let catalog = Arc::new(TenantRepository::new(pool.clone()));
    let tenant_pools = Arc::new(TenantPools::new(
        SecretCipher::from_passphrase(&config.security.tenant_secret_key),
        config.tenant_database.pool_config(),
    ));
    let executor = Arc::new(ScheduleExecutionService::new(
        catalog.clone(),
        tenant_pools.clone(),
        Arc::new(ExportRenderer::new()),
        Arc::new(EmailService::new(config.email.clone())),
        config.scheduler.tenant_concurrency,
    ));

    let shutdown = CancellationToken::new();
    let mut scheduler = JobScheduler::new(shutdown.child_token());
    scheduler.register(PoolMetricsJob::new(pool.clone(), tenant_pools.clone()));
    if config.scheduler.enabled {
        scheduler.register(ScheduledReportsJob::new(
            executor.clone(),
            config.scheduler.interval_secs,
            config.scheduler.use_utc,
            shutdown.clone(),
        ));
    } else {
        info!("Report scheduler disabled; runs only via POST /api/v1/schedules/run");
    }
    scheduler.start();

    let addr = config.socket_addr()?;
    let state = AppState {
        config: Arc::new(config),
        catalog,
        stores: tenant_pools.clone(),
        executor,
        shutdown: shutdown.clone(),
    };
    let app = create_app(state);

    info!("Server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let signal = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
            }
            info!("Shutdown signal received");
            signal.cancel();
        })
        .await?;

    scheduler.shutdown();
    scheduler.wait_for_shutdown(Duration::from_secs(30)).await;
    tenant_pools.close_all().await;
    pool.close().await;

    info!("Shutdown complete");
    Ok(())
}

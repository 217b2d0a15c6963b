//! Manual trigger of the scheduler run.

use axum::{extract::State, Json};
use tracing::info;

use domain::models::RunSummary;

use crate::app::AppState;
use crate::services::scheduler_now;

/// Run all due schedules now.
///
/// POST /api/v1/schedules/run
pub async fn run_due_schedules(State(state): State<AppState>) -> Json<RunSummary> {
    let now = scheduler_now(state.config.scheduler.use_utc);
    info!(%now, "Manual scheduler run requested");
    let summary = state.executor.run_due_schedules(now, &state.shutdown).await;
    Json(summary)
}

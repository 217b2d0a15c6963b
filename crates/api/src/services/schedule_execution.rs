//! Execution of due report schedules across every tenant.
//!
//! One invocation enumerates the tenant catalog, runs each tenant on its own
//! task (bounded by `scheduler.tenant_concurrency`) and executes that tenant's
//! due schedules one after another. Failures are contained at the level they
//! happen: a schedule failure becomes a `Failed` log entry, a tenant failure
//! becomes an entry in `RunSummary::errors`, and only a catalog failure aborts
//! the whole run.

use chrono::{Local, NaiveDateTime, Utc};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn, Instrument};

use domain::models::{
    DatabaseSettings, ExecutionStatus, NewExecutionLogEntry, ReportFilter, RunSummary, Schedule,
    ScheduleParameters, Tenant,
};
use domain::services::{
    plan_after_run, resolve, EmailAttachment, NotifyError, RenderError, ReportEmail, ReportEngine,
    ReportError, ReportNotifier, ReportRenderer, ScheduleStore, StoreError, TenantCatalog,
    TenantStores,
};

use crate::middleware::metrics::{record_run_summary, record_schedule_execution};
use crate::services::email::{report_html_body, report_subject, report_text_body, ReportMailDetails};

pub const RUN_IN_PROGRESS: &str = "run already in progress";

/// Reads the clock the scheduler runs on.
pub fn scheduler_now(use_utc: bool) -> NaiveDateTime {
    if use_utc {
        Utc::now().naive_utc()
    } else {
        Local::now().naive_local()
    }
}

/// Why a single schedule execution failed.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error(transparent)]
    Report(#[from] ReportError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("Failed to update schedule state: {0}")]
    StateUpdate(StoreError),

    #[error("Execution aborted: {0}")]
    Aborted(String),
}

/// What a successful execution produced.
#[derive(Debug, Clone, Copy)]
struct ExecutionOutput {
    rows: usize,
    bytes: usize,
}

/// Collaborators shared by every tenant task.
#[derive(Clone)]
struct ExecutionContext {
    stores: Arc<dyn TenantStores>,
    renderer: Arc<dyn ReportRenderer>,
    notifier: Arc<dyn ReportNotifier>,
}

/// Runs due schedules for all active tenants.
pub struct ScheduleExecutionService {
    catalog: Arc<dyn TenantCatalog>,
    context: ExecutionContext,
    tenant_concurrency: usize,
    run_lock: Mutex<()>,
}

impl ScheduleExecutionService {
    pub fn new(
        catalog: Arc<dyn TenantCatalog>,
        stores: Arc<dyn TenantStores>,
        renderer: Arc<dyn ReportRenderer>,
        notifier: Arc<dyn ReportNotifier>,
        tenant_concurrency: usize,
    ) -> Self {
        Self {
            catalog,
            context: ExecutionContext {
                stores,
                renderer,
                notifier,
            },
            tenant_concurrency: tenant_concurrency.max(1),
            run_lock: Mutex::new(()),
        }
    }

    /// Executes every schedule due at `now`.
    ///
    /// Overlapping invocations return immediately with [`RUN_IN_PROGRESS`].
    /// `cancel` is honored between tenants and between schedules.
    pub async fn run_due_schedules(&self, now: NaiveDateTime, cancel: &CancellationToken) -> RunSummary {
        let Ok(_guard) = self.run_lock.try_lock() else {
            warn!("Scheduler run requested while another run is in progress");
            return RunSummary::aborted(RUN_IN_PROGRESS);
        };

        let started = Instant::now();
        let summary = self.run_tenants(now, cancel).await;
        let elapsed = started.elapsed();
        record_run_summary(&summary, elapsed);

        info!(
            processed = summary.processed,
            succeeded = summary.succeeded,
            failed = summary.failed,
            errors = summary.errors.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Scheduled report run finished"
        );
        summary
    }

    async fn run_tenants(&self, now: NaiveDateTime, cancel: &CancellationToken) -> RunSummary {
        let tenants = match self.catalog.list_active_tenants().await {
            Ok(tenants) => tenants,
            Err(e) => {
                error!(error = %e, "Failed to enumerate tenant databases");
                return RunSummary::aborted(format!("tenant catalog: {}", e));
            }
        };

        debug!(tenants = tenants.len(), "Scanning tenants for due schedules");
        self.context.stores.retain_tenants(&tenants);

        let permits = Arc::new(Semaphore::new(self.tenant_concurrency));
        let mut handles: Vec<(String, JoinHandle<RunSummary>)> = Vec::with_capacity(tenants.len());

        for tenant in tenants {
            let permit = tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Scheduler run cancelled before all tenants started");
                    break;
                }
                permit = Arc::clone(&permits).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };
            if cancel.is_cancelled() {
                break;
            }

            let tenant_name = tenant.display_name.clone();
            let context = self.context.clone();
            let cancel = cancel.clone();
            let span = tracing::info_span!("tenant", tenant = %tenant.code);
            let handle = tokio::spawn(
                async move {
                    let summary = run_tenant(&context, &tenant, now, &cancel).await;
                    drop(permit);
                    summary
                }
                .instrument(span),
            );
            handles.push((tenant_name, handle));
        }

        let mut summary = RunSummary::default();
        for (tenant_name, handle) in handles {
            match handle.await {
                Ok(tenant_summary) => summary.merge(tenant_summary),
                Err(e) => {
                    error!(tenant = %tenant_name, error = %e, "Tenant task terminated abnormally");
                    summary.errors.push(format!("tenant {}: {}", tenant_name, e));
                }
            }
        }
        summary
    }
}

async fn load_settings(context: &ExecutionContext, tenant: &Tenant) -> DatabaseSettings {
    let loaded = match context.stores.settings_store(tenant) {
        Ok(store) => store.load().await,
        Err(e) => Err(e),
    };
    loaded.unwrap_or_else(|e| {
        warn!(error = %e, "Failed to read tenant settings, using defaults");
        DatabaseSettings::default()
    })
}

fn tenant_error(tenant: &Tenant, e: &StoreError) -> RunSummary {
    warn!(error = %e, "Skipping tenant");
    RunSummary::aborted(format!("tenant {}: {}", tenant.display_name, e))
}

async fn run_tenant(
    context: &ExecutionContext,
    tenant: &Tenant,
    now: NaiveDateTime,
    cancel: &CancellationToken,
) -> RunSummary {
    let settings = load_settings(context, tenant).await;
    if !settings.scheduler_enabled {
        debug!("Scheduler disabled for tenant, skipping");
        return RunSummary::default();
    }

    let store = match context.stores.schedule_store(tenant) {
        Ok(store) => store,
        Err(e) => return tenant_error(tenant, &e),
    };
    let due = match store.list_due(now).await {
        Ok(due) => due,
        Err(e) => return tenant_error(tenant, &e),
    };
    if due.is_empty() {
        return RunSummary::default();
    }
    let engine = match context.stores.report_engine(tenant) {
        Ok(engine) => engine,
        Err(e) => return tenant_error(tenant, &e),
    };

    info!(due = due.len(), "Executing due schedules");

    let mut summary = RunSummary::default();
    for schedule in due {
        if cancel.is_cancelled() {
            info!("Scheduler run cancelled, remaining schedules deferred");
            break;
        }

        let executor = TenantExecutor {
            context,
            tenant,
            store: store.as_ref(),
            engine: &engine,
        };
        if executor.execute(&schedule, now).await == ExecutionStatus::Success {
            summary.record_success();
        } else {
            summary.record_failure();
        }
    }
    summary
}

struct TenantExecutor<'a> {
    context: &'a ExecutionContext,
    tenant: &'a Tenant,
    store: &'a dyn ScheduleStore,
    engine: &'a Arc<dyn ReportEngine>,
}

impl TenantExecutor<'_> {
    /// Runs one schedule, advances its state, then appends the log entry.
    ///
    /// Generation and delivery run on their own task so a panic there is
    /// recorded as a failed execution of this schedule only.
    async fn execute(&self, schedule: &Schedule, now: NaiveDateTime) -> ExecutionStatus {
        let started = Instant::now();
        let task = tokio::spawn(
            generate_and_deliver(
                self.context.clone(),
                self.tenant.clone(),
                Arc::clone(self.engine),
                schedule.clone(),
                now,
            )
            .in_current_span(),
        );
        let outcome = match task.await {
            Ok(outcome) => outcome,
            Err(e) => Err(ExecutionError::Aborted(e.to_string())),
        };

        let advance = plan_after_run(schedule, now);
        let state_update = self
            .store
            .record_execution(schedule.id, now, advance.next_run_at, advance.deactivate)
            .await
            .map_err(ExecutionError::StateUpdate);

        let outcome = outcome.and_then(|output| state_update.map(|()| output));
        let duration = started.elapsed();
        let duration_ms = duration.as_millis() as i64;

        let (status, entry) = match outcome {
            Ok(output) => {
                info!(
                    schedule_id = schedule.id,
                    rows = output.rows,
                    bytes = output.bytes,
                    next_run_at = ?advance.next_run_at,
                    deactivated = advance.deactivate,
                    elapsed_ms = duration_ms,
                    "Schedule executed"
                );
                (
                    ExecutionStatus::Success,
                    NewExecutionLogEntry::success(schedule.id, now, output.rows, output.bytes, duration_ms),
                )
            }
            Err(e) => {
                error!(
                    schedule_id = schedule.id,
                    error = %e,
                    elapsed_ms = duration_ms,
                    "Schedule execution failed"
                );
                (
                    ExecutionStatus::Failed,
                    NewExecutionLogEntry::failed(schedule.id, now, e.to_string(), duration_ms),
                )
            }
        };

        if let Err(e) = self.store.append_log(&entry).await {
            warn!(schedule_id = schedule.id, error = %e, "Failed to append execution log");
        }
        record_schedule_execution(status, duration);
        status
    }
}

async fn generate_and_deliver(
    context: ExecutionContext,
    tenant: Tenant,
    engine: Arc<dyn ReportEngine>,
    schedule: Schedule,
    now: NaiveDateTime,
) -> Result<ExecutionOutput, ExecutionError> {
    let params = ScheduleParameters::parse(schedule.parameters_json.as_deref());
    let span = resolve(params.date_range.as_ref(), now.date());
    let filter = ReportFilter::from_parameters(&params, span.from, span.to);

    let output = engine.generate(&schedule.report_type, &filter).await?;
    let rendered = context.renderer.render(
        schedule.export_format,
        &schedule.report_type,
        &output,
        &filter,
        now,
    )?;

    let result = ExecutionOutput {
        rows: output.rows.len(),
        bytes: rendered.bytes.len(),
    };

    let recipients = schedule.recipient_list();
    if recipients.is_empty() {
        warn!(schedule_id = schedule.id, "Schedule has no recipients, delivery skipped");
        return Ok(result);
    }

    let details = ReportMailDetails {
        schedule_name: &schedule.schedule_name,
        tenant_name: &tenant.display_name,
        report_type: &schedule.report_type,
        filter: &filter,
        rows: result.rows,
        format: schedule.export_format,
        file_name: &rendered.file_name,
        generated_at: now,
    };
    let subject = report_subject(&schedule, &tenant.display_name);
    let html_body = report_html_body(&details);
    let text_body = report_text_body(&details);
    let attachment = EmailAttachment {
        file_name: rendered.file_name.clone(),
        content: rendered.bytes,
        content_type: rendered.content_type,
    };

    for to in recipients {
        let email = ReportEmail {
            to,
            subject: subject.clone(),
            html_body: html_body.clone(),
            text_body: text_body.clone(),
            attachments: vec![attachment.clone()],
        };
        match context.notifier.send(&email).await {
            Ok(()) => debug!(schedule_id = schedule.id, to = %email.to, "Report delivered"),
            Err(NotifyError::Disabled) => {
                debug!(schedule_id = schedule.id, to = %email.to, "Report delivery disabled")
            }
            Err(e) => warn!(
                schedule_id = schedule.id,
                to = %email.to,
                error = %e,
                "Report delivery failed"
            ),
        }
    }

    Ok(result)
}
